//! Structural and data-encoding constants for QR symbols, versions 1-40.
//!
//! Most of the geometry (finder/timing/alignment/version patterns) and the per-block
//! error-correction grouping are derived from closed-form formulas rather than
//! transcribed per-version tables, following the same approach as reference QR
//! implementations: a 40-entry literal table and a formula agree by construction, but
//! the formula can't have a typo in row 37.

use error::{Error, Result};

/// Side length, in modules, of a finder pattern plus its separator.
pub const FINDER_PATTERN_SIZE: usize = 8;
/// Row/column index of the timing patterns.
pub const TIMING_PATTERN_ROW_COL: usize = 6;
/// First version carrying alignment patterns.
pub const ALIGNMENT_PATTERN_VERSION_START: usize = 2;
/// First version carrying version information blocks.
pub const VERSION_BLOCK_VERSION_START: usize = 7;
/// Dimensions (rows, cols) of each version information block.
pub const VERSION_DIM: (usize, usize) = (6, 3);

/// Side length in modules of a QR symbol of the given version.
pub fn side_for_version(version: usize) -> usize {
    21 + 4 * (version - 1)
}

/// The version corresponding to a symbol's side length, if it names a valid QR version.
pub fn version_for_side(side: usize) -> Result<usize> {
    if side < 21 || (side - 21) % 4 != 0 {
        return Err(Error::UnsupportedVersion(side));
    }
    let version = (side - 21) / 4 + 1;
    if version > 40 {
        return Err(Error::UnsupportedVersion(side));
    }
    Ok(version)
}

/// The alignment pattern center coordinates along one axis, per ISO/IEC 18004 Annex E.
/// Empty for version 1, which has no alignment patterns.
pub fn alignment_pattern_centers(version: usize) -> Vec<usize> {
    if version == 1 {
        return Vec::new();
    }

    let num_align = version / 7 + 2;
    let step = if version != 32 {
        (version * 4 + num_align * 2 + 1) / (2 * num_align - 2) * 2
    } else {
        26
    };

    let mut result = vec![6usize];
    let mut pos = version * 4 + 10;
    for _ in 0..num_align - 1 {
        result.insert(1, pos);
        pos -= step;
    }
    result
}

/// Every alignment pattern center `(row, col)` for a version, excluding the three
/// positions that overlap the finder patterns.
pub fn alignment_patterns(version: usize) -> Vec<(usize, usize)> {
    let centers = alignment_pattern_centers(version);
    let mut patterns = Vec::with_capacity(centers.len() * centers.len());

    for &r in &centers {
        for &c in &centers {
            if r == centers[0] && c == centers[0] {
                continue;
            }
            let ends = (r == centers[0] && c == *centers.last().unwrap())
                || (c == centers[0] && r == *centers.last().unwrap());
            if ends {
                continue;
            }
            patterns.push((r, c));
        }
    }

    patterns
}

/// The number of data-bearing modules (data + error-correction bits, including
/// remainder bits) in a symbol of the given version.
pub fn num_raw_data_modules(version: usize) -> usize {
    let mut result = (16 * version + 128) * version + 64;
    if version >= 2 {
        let num_align = version / 7 + 2;
        result -= (25 * num_align - 10) * num_align - 55;
        if version >= 7 {
            result -= 18 * 2;
        }
    }
    result
}

/// Error correction level, keyed the way the 15-bit format word encodes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EcLevel {
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    /// Recover the level from the 2-bit field carried in format information.
    pub fn from_format_bits(bits: u8) -> Result<EcLevel> {
        match bits {
            0b01 => Ok(EcLevel::L),
            0b00 => Ok(EcLevel::M),
            0b11 => Ok(EcLevel::Q),
            0b10 => Ok(EcLevel::H),
            _ => Err(Error::UnsupportedSegmentMode(bits)),
        }
    }

    fn table_index(&self) -> usize {
        match *self {
            EcLevel::L => 0,
            EcLevel::M => 1,
            EcLevel::Q => 2,
            EcLevel::H => 3,
        }
    }
}

/// Error-correction codewords per block, indexed `[level][version]`. Index 0 is unused
/// padding so `version` can index directly.
static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [-1,  7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
    [-1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28],
    [-1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
    [-1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],
];

/// Number of error-correction blocks, indexed `[level][version]`, same layout as above.
static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [-1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4,  4,  4,  4,  4,  6,  6,  6,  6,  7,  8,  8,  9,  9, 10, 12, 12, 12, 13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25],
    [-1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5,  5,  8,  9,  9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49],
    [-1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8,  8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68],
    [-1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81],
];

/// One group of identically-sized error-correction blocks: `(count, (n, k, t))`, i.e.
/// `count` blocks each with `n` total codewords, `k` data codewords, and `t` correctable
/// errors.
pub type BlockGroup = (usize, (usize, usize, usize));

/// `(version, level)` pairs where the ISO/IEC 18004 Tables 13-22 error-correction
/// capacity is one codeword below the naive `ecc_len / 2` bound. Transcribed from
/// `EC_BLOCKS` in `original_source/src/qr/consts.py`, which lists these literally as
/// `4` (not `5`), `2` (not `3`), and `4` (not `5`) respectively.
const T_OVERRIDES: [(usize, EcLevel, usize); 3] = [
    (1, EcLevel::M, 4),
    (1, EcLevel::L, 2),
    (2, EcLevel::L, 4),
];

/// The error-correcting capacity per block for a version/level: `ecc_len / 2`, except
/// for the handful of low-version entries where ISO/IEC 18004 specifies a lower value
/// (see `T_OVERRIDES`).
fn block_t(version: usize, level: EcLevel, block_ecc_len: usize) -> usize {
    for &(v, l, t) in T_OVERRIDES.iter() {
        if v == version && l == level {
            return t;
        }
    }
    block_ecc_len / 2
}

/// The ordered block groups for a version/level, shorter blocks first -- matching the
/// layout ISO/IEC 18004 Tables 13-22 lay the groups out in.
pub fn ec_block_groups(version: usize, level: EcLevel) -> Vec<BlockGroup> {
    let idx = level.table_index();
    let num_blocks = NUM_ERROR_CORRECTION_BLOCKS[idx][version] as usize;
    let block_ecc_len = ECC_CODEWORDS_PER_BLOCK[idx][version] as usize;
    let raw_codewords = num_raw_data_modules(version) / 8;

    let short_block_len = raw_codewords / num_blocks;
    let num_short_blocks = num_blocks - raw_codewords % num_blocks;

    let t = block_t(version, level, block_ecc_len);
    let mut groups = Vec::with_capacity(2);

    if num_short_blocks > 0 {
        groups.push((num_short_blocks, (short_block_len, short_block_len - block_ecc_len, t)));
    }
    if num_short_blocks < num_blocks {
        let n = short_block_len + 1;
        groups.push((num_blocks - num_short_blocks, (n, n - block_ecc_len, t)));
    }

    groups
}

/// One of the 8 data-area mask patterns, indexed 0-7 as encoded in format information.
pub fn mask_pattern(pattern: u8, row: usize, col: usize) -> bool {
    let (i, j) = (row as i64, col as i64);
    match pattern {
        0 => (i + j) % 2 == 0,
        1 => i % 2 == 0,
        2 => j % 3 == 0,
        3 => (i + j) % 3 == 0,
        4 => (i / 2 + j / 3) % 2 == 0,
        5 => (i * j) % 2 + (i * j) % 3 == 0,
        6 => ((i * j) % 2 + (i * j) % 3) % 2 == 0,
        7 => ((i * j) % 3 + (i + j) % 2) % 2 == 0,
        _ => false,
    }
}

/// Mask applied (via XOR) to the raw 15-bit format word before BCH decoding.
pub const FORMAT_MASK_PATTERN: u32 = 0b101010000010010;
/// Width, in bits, of the mask-pattern field within format data.
pub const FORMAT_DATA_MP_BIT_LEN: u32 = 3;
/// Width, in bits, of the BCH error-correction suffix of a format word.
pub const FORMAT_EC_BIT_LEN: u32 = 10;

/// Segment mode indicators, as carried by the 4-bit mode field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataMode {
    Terminator,
    Numeric,
    Alphanumeric,
    EightBitByte,
}

impl DataMode {
    pub fn from_bits(bits: u8) -> Result<DataMode> {
        match bits {
            0b0000 => Ok(DataMode::Terminator),
            0b0001 => Ok(DataMode::Numeric),
            0b0010 => Ok(DataMode::Alphanumeric),
            0b0100 => Ok(DataMode::EightBitByte),
            _ => Err(Error::UnsupportedSegmentMode(bits)),
        }
    }
}

/// Width, in bits, of a segment's mode indicator.
pub const DATA_MODE_INDICATOR_BIT_LEN: u32 = 4;

/// Width, in bits, of a segment's character-count indicator, which depends on both the
/// symbol's version and the segment's mode.
pub fn char_count_bit_len(version: usize, mode: DataMode) -> u32 {
    let band = if version <= 9 {
        0
    } else if version <= 26 {
        1
    } else {
        2
    };

    match mode {
        DataMode::Numeric => [10, 12, 14][band],
        DataMode::Alphanumeric => [9, 11, 13][band],
        DataMode::EightBitByte => [8, 16, 16][band],
        DataMode::Terminator => 0,
    }
}

pub const NUM_TRIPLE_BIT_LEN: u32 = 10;
pub const NUM_DOUBLE_BIT_LEN: u32 = 7;
pub const NUM_SINGLE_BIT_LEN: u32 = 4;
pub const NUM_TRIPLE_MAX: u32 = 999;
pub const NUM_DOUBLE_MAX: u32 = 99;
pub const NUM_SINGLE_MAX: u32 = 9;

pub const ALPHANUM_DOUBLE_BIT_LEN: u32 = 11;
pub const ALPHANUM_SINGLE_BIT_LEN: u32 = 6;
pub const ALPHANUM_DOUBLE_MAX: u32 = 2024;
pub const ALPHANUM_SINGLE_MAX: u32 = 44;
pub const ALPHANUM_CHARSET: &'static [u8; 45] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_side_and_version_roundtrip() {
        for version in 1..=40 {
            let side = side_for_version(version);
            assert_eq!(version_for_side(side).unwrap(), version);
        }
        assert_eq!(version_for_side(20), Err(Error::UnsupportedVersion(20)));
        assert_eq!(version_for_side(177 + 4), Err(Error::UnsupportedVersion(181)));
    }

    #[test]
    fn test_alignment_pattern_centers_known_versions() {
        assert_eq!(alignment_pattern_centers(1), Vec::<usize>::new());
        assert_eq!(alignment_pattern_centers(2), vec![6, 18]);
        assert_eq!(alignment_pattern_centers(7), vec![6, 22, 38]);
        assert_eq!(alignment_pattern_centers(32), vec![6, 34, 60, 86, 112, 138]);
    }

    #[test]
    fn test_alignment_patterns_excludes_finder_corners() {
        let patterns = alignment_patterns(7);
        assert_eq!(patterns.len(), 3 * 3 - 3);
        assert!(!patterns.contains(&(6, 6)));
        assert!(!patterns.contains(&(6, 38)));
        assert!(!patterns.contains(&(38, 6)));
    }

    #[test]
    fn test_ec_block_groups_known_versions() {
        assert_eq!(ec_block_groups(1, EcLevel::M), vec![(1, (26, 16, 4))]);
        assert_eq!(
            ec_block_groups(5, EcLevel::H),
            vec![(2, (33, 11, 11)), (2, (34, 12, 11))]
        );
        assert_eq!(
            ec_block_groups(7, EcLevel::H),
            vec![(4, (39, 13, 13)), (1, (40, 14, 13))]
        );
    }

    #[test]
    fn test_char_count_bit_len_bands() {
        assert_eq!(char_count_bit_len(1, DataMode::Numeric), 10);
        assert_eq!(char_count_bit_len(9, DataMode::Alphanumeric), 9);
        assert_eq!(char_count_bit_len(10, DataMode::Alphanumeric), 11);
        assert_eq!(char_count_bit_len(26, DataMode::EightBitByte), 16);
        assert_eq!(char_count_bit_len(27, DataMode::Numeric), 14);
        assert_eq!(char_count_bit_len(40, DataMode::EightBitByte), 16);
    }

    #[test]
    fn test_mask_pattern_0() {
        assert!(mask_pattern(0, 0, 0));
        assert!(!mask_pattern(0, 0, 1));
        assert!(mask_pattern(0, 1, 1));
    }

    #[test]
    fn test_ec_level_from_format_bits() {
        assert_eq!(EcLevel::from_format_bits(0b01).unwrap(), EcLevel::L);
        assert_eq!(EcLevel::from_format_bits(0b00).unwrap(), EcLevel::M);
        assert_eq!(EcLevel::from_format_bits(0b11).unwrap(), EcLevel::Q);
        assert_eq!(EcLevel::from_format_bits(0b10).unwrap(), EcLevel::H);
    }
}
