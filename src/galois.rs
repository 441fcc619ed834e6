//! Binary Galois field `GF(2^m)` arithmetic and polynomials over it.
//!
//! A field is characterized by its exponent `m` (`3 <= m <= 12`) and a fixed primitive
//! polynomial of degree `m`, from which a pair of dual tables is built: `log_to_vector`
//! maps a power `i` of the generator `alpha` to its bit-vector representation, and
//! `vector_to_log` is its inverse. These tables are process-wide read-only data, so each
//! `m` is built at most once and shared by every `GaloisField` constructed for it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use error::{Error, Result};

/// Smallest supported field exponent.
pub const M_MIN: u32 = 3;
/// Largest supported field exponent.
pub const M_MAX: u32 = 12;

/// High bit of the degree-`m` primitive polynomial, for `m` in `[M_MIN, M_MAX]`.
const PRIMITIVE_POLY: [u32; (M_MAX - M_MIN + 1) as usize] = [
    0b1011,
    0b10011,
    0b100101,
    0b1000011,
    0b10001001,
    0b100011101,
    0b1000010001,
    0b10000001001,
    0b100000000101,
    0b1000001010011,
];

/// Dual exponent/vector tables for one value of `m`.
struct FieldTables {
    /// `log_to_vector[i]` is the bit-vector form of `alpha^i`, for `i` in `[0, n)`.
    log_to_vector: Vec<u16>,
    /// `vector_to_log[v]` is the exponent `i` with `alpha^i = v`, for `v` in `[1, 2^m)`.
    /// The entry at index 0 is a sentinel and must never be read.
    vector_to_log: Vec<i32>,
}

impl FieldTables {
    fn build(m: u32) -> FieldTables {
        let n = (1usize << m) - 1;
        let poly = PRIMITIVE_POLY[(m - M_MIN) as usize];

        let mut log_to_vector = vec![0u16; n];
        for i in 0..m as usize {
            log_to_vector[i] = 1 << i;
        }
        log_to_vector[m as usize] = ((1 << m) ^ poly) as u16;

        for i in (m as usize + 1)..n {
            let mut vector = (log_to_vector[i - 1] as u32) << 1;
            if vector & (1 << m) != 0 {
                vector ^= 1 << m;
                vector ^= log_to_vector[m as usize] as u32;
            }
            log_to_vector[i] = vector as u16;
        }

        let mut vector_to_log = vec![-1i32; n + 1];
        for (i, &v) in log_to_vector.iter().enumerate() {
            vector_to_log[v as usize] = i as i32;
        }

        FieldTables { log_to_vector, vector_to_log }
    }
}

/// Process-wide cache of field tables, keyed by `m`.
static TABLE_CACHE: OnceLock<Mutex<HashMap<u32, Arc<FieldTables>>>> = OnceLock::new();

fn tables_for(m: u32) -> Arc<FieldTables> {
    let cache = TABLE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().unwrap();
    guard.entry(m).or_insert_with(|| Arc::new(FieldTables::build(m))).clone()
}

/// A `GF(2^m)` binary Galois field.
///
/// Cheap to construct: the underlying tables are built once per `m` and shared via
/// reference counting.
#[derive(Clone)]
pub struct GaloisField {
    m: u32,
    n: usize,
    tables: Arc<FieldTables>,
}

impl GaloisField {
    /// Construct the field `GF(2^m)`. Fails with `FieldParameterOutOfRange` unless
    /// `3 <= m <= 12`.
    pub fn new(m: u32) -> Result<GaloisField> {
        if m < M_MIN || m > M_MAX {
            return Err(Error::FieldParameterOutOfRange(m));
        }

        Ok(GaloisField {
            m,
            n: (1usize << m) - 1,
            tables: tables_for(m),
        })
    }

    /// The field's exponent `m`.
    pub fn m(&self) -> u32 { self.m }

    /// The field's multiplicative order `n = 2^m - 1`.
    pub fn n(&self) -> usize { self.n }

    /// `alpha^i`, for `i` taken modulo `n`.
    pub fn log_to_vector(&self, i: usize) -> u16 {
        self.tables.log_to_vector[i % self.n]
    }

    /// The exponent `i` with `alpha^i = v`, for nonzero `v`. Returns `None` for `v = 0`.
    pub fn vector_to_log(&self, v: u16) -> Option<usize> {
        if v == 0 {
            None
        } else {
            Some(self.tables.vector_to_log[v as usize] as usize)
        }
    }

    /// Add (equivalently, subtract) two field elements.
    pub fn add(&self, x: u16, y: u16) -> u16 { x ^ y }

    /// Subtract two field elements. Identical to `add` in characteristic 2.
    pub fn sub(&self, x: u16, y: u16) -> u16 { x ^ y }

    /// Multiply two field elements.
    pub fn multiply(&self, x: u16, y: u16) -> u16 {
        if x == 0 || y == 0 {
            return 0;
        }

        let exponent = (self.vector_to_log(x).unwrap() + self.vector_to_log(y).unwrap()) % self.n;
        self.log_to_vector(exponent)
    }

    /// Divide `x` by `y`. Fails with `DivideByZero` when `y = 0`.
    pub fn divide(&self, x: u16, y: u16) -> Result<u16> {
        if y == 0 {
            return Err(Error::DivideByZero);
        }
        if x == 0 {
            return Ok(0);
        }

        let exponent = (self.vector_to_log(x).unwrap() + self.n - self.vector_to_log(y).unwrap()) % self.n;
        Ok(self.log_to_vector(exponent))
    }

    /// Raise `x` to a non-negative power `e`. `x^0 = 1` for all `x`, including 0.
    pub fn pow(&self, x: u16, e: u32) -> u16 {
        if e == 0 {
            return 1;
        }
        if x == 0 {
            return 0;
        }

        let exponent = (self.vector_to_log(x).unwrap() * (e as usize)) % self.n;
        self.log_to_vector(exponent)
    }

    /// The multiplicative inverse of `x`. Fails with `DivideByZero` when `x = 0`.
    pub fn inverse(&self, x: u16) -> Result<u16> {
        if x == 0 {
            return Err(Error::DivideByZero);
        }

        let exponent = (self.n - self.vector_to_log(x).unwrap()) % self.n;
        Ok(self.log_to_vector(exponent))
    }

    /// Scale every coefficient of `poly` (low-degree-first) by the constant `s`.
    pub fn poly_scale(&self, poly: &[u16], s: u16) -> Vec<u16> {
        poly.iter().map(|&c| self.multiply(c, s)).collect()
    }

    /// Add two polynomials (low-degree-first), coefficient-wise.
    pub fn poly_add(&self, p: &[u16], q: &[u16]) -> Vec<u16> {
        let len = p.len().max(q.len());
        let mut res = vec![0u16; len];
        for (i, &c) in p.iter().enumerate() { res[i] = c; }
        for (i, &c) in q.iter().enumerate() { res[i] ^= c; }
        res
    }

    /// Multiply two polynomials (low-degree-first).
    pub fn poly_mul(&self, p: &[u16], q: &[u16]) -> Vec<u16> {
        if p.is_empty() || q.is_empty() {
            return Vec::new();
        }

        let mut res = vec![0u16; p.len() + q.len() - 1];
        for (i, &a) in p.iter().enumerate() {
            for (j, &b) in q.iter().enumerate() {
                res[i + j] ^= self.multiply(a, b);
            }
        }
        res
    }

    /// Evaluate `p(x)` via Horner's method, from the highest-degree coefficient downward.
    pub fn poly_eval(&self, poly: &[u16], x: u16) -> u16 {
        poly.iter().rev().fold(0u16, |acc, &c| self.multiply(acc, x) ^ c)
    }
}

impl fmt::Debug for GaloisField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GaloisField(m={}, n={})", self.m, self.n)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gf16_tables() {
        let gf = GaloisField::new(4).unwrap();

        let expected_log_to_vector = [1, 2, 4, 8, 3, 6, 12, 11, 5, 10, 7, 14, 15, 13, 9];
        for (i, &v) in expected_log_to_vector.iter().enumerate() {
            assert_eq!(gf.log_to_vector(i), v);
        }

        let expected_vector_to_log = [-1, 0, 1, 4, 2, 8, 5, 10, 3, 14, 9, 7, 6, 13, 11, 12];
        for (v, &l) in expected_vector_to_log.iter().enumerate().skip(1) {
            assert_eq!(gf.vector_to_log(v as u16).unwrap() as i32, l);
        }
    }

    #[test]
    fn test_gf16_multiply() {
        let gf = GaloisField::new(4).unwrap();
        assert_eq!(gf.multiply(13, 14), 10);
    }

    #[test]
    fn test_gf256_arithmetic() {
        let gf = GaloisField::new(8).unwrap();
        assert_eq!(gf.multiply(137, 42), 195);
        assert_eq!(gf.divide(137, 195).unwrap(), 31);
        assert_eq!(gf.inverse(195).unwrap(), 53);
    }

    #[test]
    fn test_field_parameter_range() {
        assert_eq!(GaloisField::new(2), Err(Error::FieldParameterOutOfRange(2)));
        assert_eq!(GaloisField::new(13), Err(Error::FieldParameterOutOfRange(13)));
        assert!(GaloisField::new(3).is_ok());
        assert!(GaloisField::new(12).is_ok());
    }

    #[test]
    fn test_field_laws() {
        for m in M_MIN..=M_MAX {
            let gf = GaloisField::new(m).unwrap();

            for x in 0..=gf.n() as u16 {
                assert_eq!(gf.multiply(x, 0), 0);
                assert_eq!(gf.multiply(x, 1), x);
                assert_eq!(gf.pow(x, 0), 1);

                if x != 0 {
                    assert_eq!(gf.multiply(x, gf.inverse(x).unwrap()), 1);
                } else {
                    assert_eq!(gf.pow(x, 1), 0);
                }
            }

            assert_eq!(gf.divide(5, 0), Err(Error::DivideByZero));
            assert_eq!(gf.inverse(0), Err(Error::DivideByZero));
        }
    }

    #[test]
    fn test_poly_ops() {
        let gf = GaloisField::new(8).unwrap();

        let p = [1u16, 0, 1];
        let q = [1u16, 1];
        let sum = gf.poly_add(&p, &q);
        assert_eq!(sum, vec![0, 1, 1]);

        let prod = gf.poly_mul(&p, &q);
        assert_eq!(prod.len(), 4);

        let scaled = gf.poly_scale(&p, 0);
        assert_eq!(scaled, vec![0, 0, 0]);

        assert_eq!(gf.poly_eval(&[5, 0, 0], 9), 5);
    }
}
