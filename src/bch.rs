//! Decoding of primitive, narrow-sense, binary BCH codes.
//!
//! A `Bch(m, k, t)` code has length `n = 2^m - 1` over `GF(2^m)` and corrects up to `t`
//! bit errors. This module implements the standard syndrome -> Berlekamp-Massey -> root
//! search -> correction pipeline described in Hankerson, Hoffman, et al's *Coding Theory
//! and Cryptography: The Essentials*. Received words are represented as `u32`, which
//! comfortably covers every configuration this crate constructs (the QR format code has
//! `n = 15`; the largest test configuration has `n = 31`).

use error::{Error, Result};
use galois::GaloisField;

/// A `(n = 2^m - 1, k, t)` primitive narrow-sense BCH code.
///
/// Decoding only depends on `m` and `t`; `k` and the generator polynomial `g` are carried
/// for completeness and aren't consulted by any operation here.
#[derive(Clone)]
pub struct Bch {
    field: GaloisField,
    n: usize,
    #[allow(dead_code)]
    k: usize,
    t: usize,
    #[allow(dead_code)]
    g: u32,
}

impl Bch {
    /// Construct a `Bch(m, k, t, g)` decoder. Fails with `FieldParameterOutOfRange` if
    /// `m` is outside `[3, 12]`.
    pub fn new(m: u32, k: usize, t: usize, g: u32) -> Result<Bch> {
        let field = GaloisField::new(m)?;
        let n = field.n();

        Ok(Bch { field, n, k, t, g })
    }

    /// The code length `n = 2^m - 1`.
    pub fn n(&self) -> usize { self.n }

    /// The error-correcting capacity `t`.
    pub fn t(&self) -> usize { self.t }

    /// Evaluate the received word `r` (bit `i` is the `x^i` coefficient) at `alpha^j`.
    ///
    /// Implemented as a summation of `alpha^(i*j mod n)` over the set bits of `r`, which
    /// is equivalent to (and must agree with) a Horner evaluation of `r`'s coefficient
    /// list -- see `syndrome_horner` in the test module for the cross-check.
    pub fn syndrome(&self, j: usize, r: u32) -> u16 {
        (0..32).fold(0u16, |s, pos| {
            if r >> pos & 1 == 0 {
                s
            } else {
                s ^ self.field.log_to_vector((pos * j) % self.n)
            }
        })
    }

    /// The ordered syndrome sequence `[S_1, ..., S_2t]`.
    pub fn syndromes(&self, r: u32) -> Vec<u16> {
        (1..=2 * self.t).map(|j| self.syndrome(j, r)).collect()
    }

    /// Compute the error-locator polynomial `sigma(x)` (low-degree-first, constant term
    /// 1) from the syndrome sequence, using the iterative Berlekamp-Massey algorithm.
    pub fn berlekamp_massey(&self, syndromes: &[u16]) -> Vec<u16> {
        let gf = &self.field;

        let mut sigma = vec![1u16];
        let mut sigma_old = vec![1u16];
        let mut big_l = 0usize;
        let mut disc_old = 1u16;
        let mut shift = 1usize;

        for j in 1..=syndromes.len() {
            let mut d = syndromes[j - 1];
            for i in 1..=big_l.min(j - 1) {
                if i < sigma.len() {
                    d ^= gf.multiply(sigma[i], syndromes[j - i - 1]);
                }
            }

            if d == 0 {
                shift += 1;
                continue;
            }

            let backup = sigma.clone();
            let c = gf.multiply(d, gf.inverse(disc_old).expect("disc_old is never zero"));

            let needed = shift + sigma_old.len();
            if sigma.len() < needed {
                sigma.resize(needed, 0);
            }
            for (i, &so) in sigma_old.iter().enumerate() {
                sigma[i + shift] ^= gf.multiply(c, so);
            }

            if 2 * big_l >= j {
                shift += 1;
            } else {
                big_l = j - big_l;
                sigma_old = backup;
                disc_old = d;
                shift = 1;
            }
        }

        sigma
    }

    /// Find every root `beta` in `[1, n]` (vector form) of `sigma(x) = 0`, by brute-force
    /// evaluation. The inverse of each root gives an error position in the received word.
    pub fn root_search(&self, sigma: &[u16]) -> Vec<u16> {
        (1..=self.n as u16).filter(|&beta| self.field.poly_eval(sigma, beta) == 0).collect()
    }

    /// Attempt to decode the received word `r`.
    ///
    /// Returns `(false, r)` if `r` is already a valid codeword, `(true, corrected)` if up
    /// to `t` bit errors were found and fixed, or fails with `BchDecodingFailure` if the
    /// word cannot be corrected.
    pub fn decode(&self, r: u32) -> Result<(bool, u32)> {
        let syndromes = self.syndromes(r);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok((false, r));
        }

        let sigma = self.berlekamp_massey(&syndromes);
        let degree = poly_degree(&sigma);
        if degree > self.t {
            return Err(Error::BchDecodingFailure);
        }

        let roots = self.root_search(&sigma);
        if roots.len() != degree {
            return Err(Error::BchDecodingFailure);
        }

        let mut corrected = r;
        for beta in roots {
            let log_beta = self.field.vector_to_log(beta).expect("roots are nonzero");
            let position = (self.n - log_beta) % self.n;
            corrected ^= 1 << position;
        }

        Ok((true, corrected))
    }
}

/// The degree of a low-degree-first polynomial. `sigma(x)` always has a nonzero constant
/// term, so this is always well-defined.
fn poly_degree(p: &[u16]) -> usize {
    for i in (0..p.len()).rev() {
        if p[i] != 0 {
            return i;
        }
    }
    0
}

#[cfg(test)]
mod test {
    use super::*;

    /// Horner evaluation of the received word, used to cross-check `Bch::syndrome`'s
    /// summation strategy.
    fn syndrome_horner(bch: &Bch, j: usize, r: u32) -> u16 {
        let bits = 32 - r.leading_zeros().max(1);
        let coefs: Vec<u16> = (0..bits).map(|i| ((r >> i) & 1) as u16).collect();
        let alpha_j = bch.field.log_to_vector(j % bch.n);
        bch.field.poly_eval(&coefs, alpha_j)
    }

    #[test]
    fn test_qr_format_syndrome() {
        let bch = Bch::new(4, 5, 3, 0).unwrap();
        let f = 0b001111010110010u32;

        assert_eq!(bch.syndrome(1, f), 0);
        assert_eq!(bch.syndrome(1, f ^ 1), 1);
    }

    #[test]
    fn test_syndrome_strategies_agree() {
        let bch = Bch::new(4, 5, 3, 0).unwrap();
        for r in 0..1u32 << 15 {
            for j in 1..=6 {
                assert_eq!(bch.syndrome(j, r), syndrome_horner(&bch, j, r));
            }
        }
    }

    #[test]
    fn test_syndromes_gf16_book_example() {
        let bch = Bch::new(4, 5, 3, 0).unwrap();
        let r = 0b100001010u32;
        assert_eq!(bch.syndromes(r), vec![15, 10, 8, 8, 0, 12]);
    }

    #[test]
    fn test_syndromes_and_bm_gf32_book_example() {
        let bch = Bch::new(5, 21, 2, 0b11101101001).unwrap();
        let r = 0b11101100110100010101101001u32;

        assert_eq!(bch.syndromes(r), vec![19, 8, 1, 10]);
        assert_eq!(bch.berlekamp_massey(&bch.syndromes(r)), vec![1, 19, 21]);
    }

    #[test]
    fn test_decode_qr_formats_all_flip_patterns() {
        const FORMATS: [u32; 32] = [
            0b111011111000100, 0b111001011110011, 0b111110110101010, 0b111100010011101,
            0b110011000101111, 0b110001100011000, 0b110110001000001, 0b110100101110110,
            0b101010000010010, 0b101000100100101, 0b101111001111100, 0b101101101001011,
            0b100010111111001, 0b100000011001110, 0b100111110010111, 0b100101010100000,
            0b011010101011111, 0b011000001101000, 0b011111100110001, 0b011101000000110,
            0b010010010110100, 0b010000110000011, 0b010111011011010, 0b010101111101101,
            0b001011010001001, 0b001001110111110, 0b001110011100111, 0b001100111010000,
            0b000011101100010, 0b000001001010101, 0b000110100001100, 0b000100000111011,
        ];
        const MASK: u32 = 0b101010000010010;

        let bch = Bch::new(4, 5, 3, 0).unwrap();

        for &raw in FORMATS.iter() {
            let f = raw ^ MASK;
            assert_eq!(bch.decode(f).unwrap(), (false, f));

            for b in 0..15 {
                assert_eq!(bch.decode(f ^ (1 << b)).unwrap(), (true, f));
            }

            for i in 0..14 {
                for j in (i + 1)..15 {
                    let e = (1 << i) | (1 << j);
                    assert_eq!(bch.decode(f ^ e).unwrap(), (true, f));
                }
            }

            let three_bit_errors = [
                0b111u32, 0b1110, 0b100101000000, 0b10011, 0b101000100000, 0b11100000000000,
            ];
            for &e in three_bit_errors.iter() {
                assert_eq!(bch.decode(f ^ e).unwrap(), (true, f));
            }

            assert_eq!(bch.decode(f ^ 0b11110000000), Err(Error::BchDecodingFailure));
        }
    }
}
