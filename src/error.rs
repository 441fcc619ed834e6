//! Standard errors that may occur when working with QR decoding.

use std;

/// QR decoding runtime errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The module matrix failed structural validation. Carries a human-readable
    /// description of the offending row/column when one is available.
    InvalidMatrix(String),
    /// The matrix side length doesn't correspond to any QR version 1-40.
    UnsupportedVersion(usize),
    /// Neither format information copy could be BCH-decoded.
    FormatUnrecoverable,
    /// Both format information copies decoded, but to different values.
    FormatsDisagree,
    /// A segment's mode indicator isn't one of the supported data modes.
    UnsupportedSegmentMode(u8),
    /// The bitstream ran out of bits before a segment's declared character count
    /// could be satisfied.
    BitstreamUnderflow,
    /// A decoded numeric or alphanumeric group exceeded the bound of its charset.
    CharsetOverflow,
    /// The BCH decoder could not correct the received word.
    BchDecodingFailure,
    /// A Galois field division or inversion was attempted with a zero divisor.
    DivideByZero,
    /// A Galois field was constructed with `m` outside `[3, 12]`.
    FieldParameterOutOfRange(u32),
    /// The on-disk matrix file could not be read.
    Io(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::InvalidMatrix(ref msg) => write!(f, "invalid QR matrix: {}", msg),
            Error::UnsupportedVersion(size) => {
                write!(f, "matrix side length {} doesn't match any QR version", size)
            },
            Error::FormatUnrecoverable => {
                write!(f, "both format information copies are unrecoverable")
            },
            Error::FormatsDisagree => {
                write!(f, "format information copies disagree after correction")
            },
            Error::UnsupportedSegmentMode(mode) => {
                write!(f, "unsupported segment mode indicator {:#06b}", mode)
            },
            Error::BitstreamUnderflow => {
                write!(f, "bitstream exhausted before segment's declared length")
            },
            Error::CharsetOverflow => write!(f, "decoded group exceeds its charset bound"),
            Error::BchDecodingFailure => write!(f, "BCH decoding failed to correct the word"),
            Error::DivideByZero => write!(f, "Galois field division by zero"),
            Error::FieldParameterOutOfRange(m) => {
                write!(f, "Galois field exponent {} is out of the supported range [3, 12]", m)
            },
            Error::Io(ref msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err.to_string())
    }
}

/// Standard result using `Error`.
pub type Result<T> = std::result::Result<T, Error>;
