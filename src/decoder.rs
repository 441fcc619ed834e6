//! The QR symbol decoding pipeline: version detection, function-pattern masking, format
//! recovery, unmasking, module-stream unfolding, block de-interleaving, and segment
//! decoding.
//!
//! Reed-Solomon correction of the data/error-correction blocks is out of scope here --
//! `QrDecoder` reads the data codewords as received. Kanji, ECI, FNC1, and structured
//! append segments are not supported; encountering one fails with
//! `UnsupportedSegmentMode`.

use bch::Bch;
use error::{Error, Result};
use tables::{
    self, BlockGroup, DataMode, EcLevel, ALPHANUM_CHARSET, ALPHANUM_DOUBLE_BIT_LEN,
    ALPHANUM_DOUBLE_MAX, ALPHANUM_SINGLE_BIT_LEN, ALPHANUM_SINGLE_MAX,
    DATA_MODE_INDICATOR_BIT_LEN, FINDER_PATTERN_SIZE, FORMAT_DATA_MP_BIT_LEN,
    FORMAT_EC_BIT_LEN, FORMAT_MASK_PATTERN, NUM_DOUBLE_BIT_LEN, NUM_DOUBLE_MAX,
    NUM_SINGLE_BIT_LEN, NUM_SINGLE_MAX, NUM_TRIPLE_BIT_LEN, NUM_TRIPLE_MAX,
    TIMING_PATTERN_ROW_COL,
};

/// A square module matrix plus the state recovered from it while decoding.
pub struct QrDecoder {
    size: usize,
    matrix: Vec<Vec<u8>>,
    version: usize,
    fp_mask: Vec<Vec<bool>>,
    ec_level: EcLevel,
    mask_pattern: u8,
    bch: Bch,
}

impl QrDecoder {
    /// Load a symbol from its module rows. Each row must have the same length as the
    /// number of rows, and every character must be `'0'` or `'1'`.
    pub fn new(rows: &[String]) -> Result<QrDecoder> {
        let size = rows.len();
        let mut matrix = vec![vec![0u8; size]; size];

        for (row_idx, row) in rows.iter().enumerate() {
            let row = row.trim();
            if row.chars().count() != size {
                return Err(Error::InvalidMatrix(format!(
                    "row {} has length {}, expected {}",
                    row_idx,
                    row.chars().count(),
                    size
                )));
            }

            for (col_idx, module) in row.chars().enumerate() {
                matrix[row_idx][col_idx] = match module {
                    '0' => 0,
                    '1' => 1,
                    other => {
                        return Err(Error::InvalidMatrix(format!(
                            "module at ({}, {}) is {:?}, expected '0' or '1'",
                            row_idx, col_idx, other
                        )))
                    },
                };
            }
        }

        let version = tables::version_for_side(size)?;

        Ok(QrDecoder {
            size,
            matrix,
            version,
            fp_mask: Vec::new(),
            ec_level: EcLevel::M,
            mask_pattern: 0,
            bch: Bch::new(4, 5, 3, 0)?,
        })
    }

    /// The QR version (1-40) this symbol was recognized as.
    pub fn version(&self) -> usize { self.version }

    /// Run the full decoding pipeline and return the concatenated text of every segment.
    pub fn decode(&mut self) -> Result<String> {
        let alignment_patterns = tables::alignment_patterns(self.version);
        self.fp_mask = self.compute_function_pattern_mask(&alignment_patterns);

        self.decode_format()?;
        self.unmask();

        let blocks = self.deinterlace_blocks()?;
        self.decode_data_blocks_segments(&blocks)
    }

    fn compute_function_pattern_mask(&self, alignment_patterns: &[(usize, usize)]) -> Vec<Vec<bool>> {
        let size = self.size;
        let mut fp = vec![vec![false; size]; size];

        for i in 0..=FINDER_PATTERN_SIZE {
            for j in 0..FINDER_PATTERN_SIZE {
                let j_mirror = size - FINDER_PATTERN_SIZE + j;
                fp[i][j] = true;
                fp[i][j_mirror] = true;
                fp[j_mirror][i] = true;
            }
            fp[i][FINDER_PATTERN_SIZE] = true;
        }

        for i in FINDER_PATTERN_SIZE..(size - FINDER_PATTERN_SIZE) {
            fp[TIMING_PATTERN_ROW_COL][i] = true;
            fp[i][TIMING_PATTERN_ROW_COL] = true;
        }

        if self.version < tables::ALIGNMENT_PATTERN_VERSION_START {
            return fp;
        }

        for &(r, c) in alignment_patterns {
            for i in r - 2..=r + 2 {
                for j in c - 2..=c + 2 {
                    fp[i][j] = true;
                }
            }
        }

        if self.version < tables::VERSION_BLOCK_VERSION_START {
            return fp;
        }

        let (rows, cols) = tables::VERSION_DIM;
        for i in 0..rows {
            for j in 0..cols {
                let j_mirror = size - FINDER_PATTERN_SIZE - cols + j;
                fp[j_mirror][i] = true;
                fp[i][j_mirror] = true;
            }
        }

        fp
    }

    /// Read the two redundant 15-bit format words: the horizontal-then-vertical strip
    /// around the NW finder pattern, and the vertical-then-horizontal strip spanning the
    /// SW and NE finder patterns.
    fn unfold_formats(&self) -> (u32, u32) {
        let mut nw = 0u32;
        let mut swne = 0u32;

        for i in 0..FINDER_PATTERN_SIZE {
            if i != TIMING_PATTERN_ROW_COL {
                nw = (nw << 1) | self.matrix[FINDER_PATTERN_SIZE][i] as u32;
            }
            if i != FINDER_PATTERN_SIZE - 1 {
                swne = (swne << 1) | self.matrix[self.size - 1 - i][FINDER_PATTERN_SIZE] as u32;
            }
        }

        let mut i = FINDER_PATTERN_SIZE as isize;
        while i >= 0 {
            if i as usize != TIMING_PATTERN_ROW_COL {
                nw = (nw << 1) | self.matrix[i as usize][FINDER_PATTERN_SIZE] as u32;
            }
            if i > 0 {
                swne = (swne << 1) | self.matrix[FINDER_PATTERN_SIZE][self.size - i as usize] as u32;
            }
            i -= 1;
        }

        (nw, swne)
    }

    fn decode_format(&mut self) -> Result<()> {
        let (nw, swne) = self.unfold_formats();
        let mut valid: Vec<(u32, u8, u8)> = Vec::new();

        for &raw in [nw, swne].iter() {
            let masked = raw ^ FORMAT_MASK_PATTERN;
            if let Ok((_, corrected)) = self.bch.decode(masked) {
                let format_data = corrected >> FORMAT_EC_BIT_LEN;
                let ec_level_bits = (format_data >> FORMAT_DATA_MP_BIT_LEN) as u8;
                let mp_mask = (1u32 << FORMAT_DATA_MP_BIT_LEN) - 1;
                let mask_pattern = (format_data & mp_mask) as u8;
                valid.push((corrected, ec_level_bits, mask_pattern));
            }
        }

        if valid.is_empty() {
            return Err(Error::FormatUnrecoverable);
        }
        if valid.len() == 2 && valid[0].0 != valid[1].0 {
            return Err(Error::FormatsDisagree);
        }

        let (_, ec_level_bits, mask_pattern) = valid[0];
        self.ec_level = EcLevel::from_format_bits(ec_level_bits)?;
        self.mask_pattern = mask_pattern;
        Ok(())
    }

    fn unmask(&mut self) {
        for row in 0..self.size {
            for col in 0..self.size {
                if self.fp_mask[row][col] {
                    continue;
                }
                if tables::mask_pattern(self.mask_pattern, row, col) {
                    self.matrix[row][col] ^= 1;
                }
            }
        }
    }

    /// Unfold the data-area modules into bytes by the zig-zag column-pair traversal.
    fn unfold_module_stream(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut go_up = true;
        let mut bit: i32 = 7;
        let mut byte: u8 = 0;

        let mut outer_col = self.size as isize - 1;
        while outer_col > 0 {
            let mut column_right = outer_col;
            if column_right as usize <= TIMING_PATTERN_ROW_COL {
                column_right -= 1;
            }

            let (row_start, row_end, row_dir) = if go_up {
                (self.size as isize - 1, -1isize, -1isize)
            } else {
                (0isize, self.size as isize, 1isize)
            };

            let mut row = row_start;
            while row != row_end {
                for i in 0..2isize {
                    let col = column_right - i;
                    let (r, c) = (row as usize, col as usize);

                    if self.fp_mask[r][c] {
                        continue;
                    }

                    byte |= self.matrix[r][c] << bit;
                    bit -= 1;
                    if bit == -1 {
                        bytes.push(byte);
                        byte = 0;
                        bit = 7;
                    }
                }
                row += row_dir;
            }

            go_up = !go_up;
            outer_col -= 2;
        }

        bytes
    }

    /// Split the unfolded byte stream into per-block data and error-correction words.
    fn deinterlace_blocks(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let groups = tables::ec_block_groups(self.version, self.ec_level);
        let words = self.unfold_module_stream();
        let mut word_iter = words.into_iter();

        let &(max_nb_words, max_nb_data_words, _) = &groups.last().expect("at least one block group").1;
        let max_words_per_block = [max_nb_data_words, max_nb_words - max_nb_data_words];

        let mut blocks: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        for &(nb_blocks, (nb_words, nb_data_words, _)) in &groups {
            let nb_error_words = nb_words - nb_data_words;
            for _ in 0..nb_blocks {
                blocks.push((vec![0u8; nb_data_words], vec![0u8; nb_error_words]));
            }
        }

        for is_error in 0..2 {
            for word_idx in 0..max_words_per_block[is_error] {
                let mut block_idx = 0;
                for &(nb_blocks, (nb_words, nb_data_words, _)) in &groups {
                    let lens = [nb_data_words, nb_words - nb_data_words];
                    if word_idx == lens[is_error] {
                        block_idx += nb_blocks;
                        continue;
                    }

                    for _ in 0..nb_blocks {
                        let byte = word_iter.next().ok_or(Error::BitstreamUnderflow)?;
                        if is_error == 0 {
                            blocks[block_idx].0[word_idx] = byte;
                        } else {
                            blocks[block_idx].1[word_idx] = byte;
                        }
                        block_idx += 1;
                    }
                }
            }
        }

        Ok(blocks)
    }

    fn decode_data_blocks_segments(&self, blocks: &[(Vec<u8>, Vec<u8>)]) -> Result<String> {
        let mut bytes = Vec::new();
        for &(ref data, _) in blocks {
            bytes.extend_from_slice(data);
        }

        let mut reader = BitReader::new(&bytes);
        let mut output = String::new();

        loop {
            if reader.remaining() < DATA_MODE_INDICATOR_BIT_LEN as usize {
                break;
            }

            let mode_bits = reader.read(DATA_MODE_INDICATOR_BIT_LEN)? as u8;
            let mode = DataMode::from_bits(mode_bits)?;
            if mode == DataMode::Terminator {
                break;
            }

            let count_bits = tables::char_count_bit_len(self.version, mode);
            if reader.remaining() < count_bits as usize {
                return Err(Error::BitstreamUnderflow);
            }
            let char_count = reader.read(count_bits)? as usize;

            match mode {
                DataMode::EightBitByte => decode_eightbitbyte_segment(&mut reader, char_count, &mut output)?,
                DataMode::Alphanumeric => decode_alphanumeric_segment(&mut reader, char_count, &mut output)?,
                DataMode::Numeric => decode_numeric_segment(&mut reader, char_count, &mut output)?,
                DataMode::Terminator => unreachable!("terminator handled above"),
            }
        }

        Ok(output)
    }
}

/// A big-endian bit cursor over a byte slice.
struct BitReader<'a> {
    bytes: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> BitReader<'a> {
        BitReader { bytes, bit_pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() * 8 - self.bit_pos
    }

    fn read(&mut self, n: u32) -> Result<u32> {
        if n as usize > self.remaining() {
            return Err(Error::BitstreamUnderflow);
        }

        let mut v = 0u32;
        for _ in 0..n {
            let byte = self.bytes[self.bit_pos / 8];
            let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
            v = (v << 1) | bit as u32;
            self.bit_pos += 1;
        }
        Ok(v)
    }
}

fn decode_numeric_segment(reader: &mut BitReader, char_count: usize, output: &mut String) -> Result<()> {
    let rest = char_count % 3;
    let mut needed_bits = NUM_TRIPLE_BIT_LEN as usize * (char_count / 3);
    needed_bits += match rest {
        2 => NUM_DOUBLE_BIT_LEN as usize,
        1 => NUM_SINGLE_BIT_LEN as usize,
        _ => 0,
    };
    if needed_bits > reader.remaining() {
        return Err(Error::BitstreamUnderflow);
    }

    for _ in 0..(char_count - rest) / 3 {
        let v = reader.read(NUM_TRIPLE_BIT_LEN)?;
        if v > NUM_TRIPLE_MAX {
            return Err(Error::CharsetOverflow);
        }
        output.push_str(&format!("{:03}", v));
    }

    if rest == 2 {
        let v = reader.read(NUM_DOUBLE_BIT_LEN)?;
        if v > NUM_DOUBLE_MAX {
            return Err(Error::CharsetOverflow);
        }
        output.push_str(&format!("{:02}", v));
    } else if rest == 1 {
        let v = reader.read(NUM_SINGLE_BIT_LEN)?;
        if v > NUM_SINGLE_MAX {
            return Err(Error::CharsetOverflow);
        }
        output.push_str(&v.to_string());
    }

    Ok(())
}

fn decode_alphanumeric_segment(reader: &mut BitReader, char_count: usize, output: &mut String) -> Result<()> {
    let charset_len = ALPHANUM_CHARSET.len() as u32;
    let pairs = char_count & !1;
    let needed_bits = ALPHANUM_DOUBLE_BIT_LEN as usize * (char_count >> 1)
        + ALPHANUM_SINGLE_BIT_LEN as usize * (char_count & 1);
    if needed_bits > reader.remaining() {
        return Err(Error::BitstreamUnderflow);
    }

    let mut i = 0;
    while i < pairs {
        let v = reader.read(ALPHANUM_DOUBLE_BIT_LEN)?;
        if v > ALPHANUM_DOUBLE_MAX {
            return Err(Error::CharsetOverflow);
        }
        let c1 = (v / charset_len) as usize;
        let c2 = (v % charset_len) as usize;
        output.push(ALPHANUM_CHARSET[c1] as char);
        output.push(ALPHANUM_CHARSET[c2] as char);
        i += 2;
    }

    if char_count & 1 == 1 {
        let v = reader.read(ALPHANUM_SINGLE_BIT_LEN)?;
        if v > ALPHANUM_SINGLE_MAX {
            return Err(Error::CharsetOverflow);
        }
        output.push(ALPHANUM_CHARSET[v as usize] as char);
    }

    Ok(())
}

fn decode_eightbitbyte_segment(reader: &mut BitReader, char_count: usize, output: &mut String) -> Result<()> {
    if char_count * 8 > reader.remaining() {
        return Err(Error::BitstreamUnderflow);
    }

    let mut bytes = Vec::with_capacity(char_count);
    for _ in 0..char_count {
        bytes.push(reader.read(8)? as u8);
    }

    match String::from_utf8(bytes) {
        Ok(s) => {
            output.push_str(&s);
            Ok(())
        },
        Err(_) => Err(Error::CharsetOverflow),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rows_of(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_non_square() {
        let rows = rows_of(&["010", "101"]);
        match QrDecoder::new(&rows) {
            Err(Error::InvalidMatrix(_)) => {},
            other => panic!("expected InvalidMatrix, got {:?}", other.map(|d| d.version())),
        }
    }

    #[test]
    fn test_rejects_bad_module_char() {
        let rows = rows_of(&["0102", "0102", "0102", "0102"]);
        match QrDecoder::new(&rows) {
            Err(Error::InvalidMatrix(_)) => {},
            other => panic!("expected InvalidMatrix, got {:?}", other.map(|d| d.version())),
        }
    }

    #[test]
    fn test_rejects_unsupported_side() {
        let rows: Vec<String> = (0..20).map(|_| "0".repeat(20)).collect();
        assert_eq!(QrDecoder::new(&rows).unwrap_err(), Error::UnsupportedVersion(20));
    }

    #[test]
    fn test_recognizes_version_from_side_length() {
        let rows: Vec<String> = (0..21).map(|_| "0".repeat(21)).collect();
        let decoder = QrDecoder::new(&rows).unwrap();
        assert_eq!(decoder.version(), 1);
    }

    #[test]
    fn test_bit_reader_reads_msb_first() {
        let mut reader = BitReader::new(&[0b1011_0010]);
        assert_eq!(reader.read(4).unwrap(), 0b1011);
        assert_eq!(reader.read(4).unwrap(), 0b0010);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.read(1), Err(Error::BitstreamUnderflow));
    }

    #[test]
    fn test_decode_numeric_segment_exact() {
        // "123456": two groups of 3 digits, 10 bits each (123 = 0b0001111011, 456 = 0b0111001000).
        let bytes = [0b0001_1110, 0b1101_1100, 0b1000_0000];
        let mut reader = BitReader::new(&bytes);
        let mut out = String::new();
        decode_numeric_segment(&mut reader, 6, &mut out).unwrap();
        assert_eq!(out, "123456");
    }

    #[test]
    fn test_decode_alphanumeric_segment_exact() {
        // "AC-42": pairs (A,C) and (-,4) at 11 bits each, then trailing '2' at 6 bits.
        let bytes = [0b0011_1001, 0b1101_1100, 0b1110_0100, 0b0010_0000];
        let mut reader = BitReader::new(&bytes);
        let mut out = String::new();
        decode_alphanumeric_segment(&mut reader, 5, &mut out).unwrap();
        assert_eq!(out, "AC-42");
    }

    #[test]
    fn test_decode_eightbitbyte_segment_exact() {
        let bytes = b"hi!";
        let mut reader = BitReader::new(bytes);
        let mut out = String::new();
        decode_eightbitbyte_segment(&mut reader, 3, &mut out).unwrap();
        assert_eq!(out, "hi!");
    }

    #[test]
    fn test_decode_eightbitbyte_rejects_truncated_stream() {
        let bytes = b"hi";
        let mut reader = BitReader::new(bytes);
        let mut out = String::new();
        assert_eq!(
            decode_eightbitbyte_segment(&mut reader, 3, &mut out),
            Err(Error::BitstreamUnderflow)
        );
    }
}
