//! A decoder for QR Code symbols (ISO/IEC 18004), built from a binary Galois field
//! engine, a BCH decoder for the 15-bit format word, and the structural pipeline that
//! turns a module matrix into text.
//!
//! Encoding, image capture/localization, Reed-Solomon correction of data codewords, and
//! Kanji/ECI/FNC1/structured-append segments are out of scope -- see `decoder` for what
//! happens when a symbol needs one of those to be read correctly.

pub mod bch;
pub mod decoder;
pub mod error;
pub mod galois;
pub mod tables;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub use decoder::QrDecoder;
pub use error::{Error, Result};

/// Decode a QR symbol from its module rows (one string of `'0'`/`'1'` per row).
pub fn decode_rows(rows: &[String]) -> Result<String> {
    QrDecoder::new(rows)?.decode()
}

/// Decode a QR symbol stored as a text file, one row of `'0'`/`'1'` modules per line.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let file = File::open(path)?;
    let rows = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<String>>>()?;
    decode_rows(&rows)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_rows_rejects_malformed_matrix() {
        let rows = vec!["01".to_string(), "1".to_string()];
        assert!(decode_rows(&rows).is_err());
    }
}
