//! Canonical Huffman decoding for the v5 hunk map.
//!
//! Code lengths arrive as a run-length-encoded table; codes are then
//! assigned canonically from the longest length down, so longer codes take
//! the numerically smaller values. Decoding walks one bit at a time and
//! stops as soon as the accumulated prefix falls inside the code range of
//! its length.

use retro_chd_core::ChdError;

use crate::bitstream::BitReader;

/// Longest code length the assignment loop considers.
const MAX_CODE_LENGTH: usize = 32;

/// Decoder for a small canonical Huffman alphabet.
#[derive(Debug, Clone)]
pub struct HuffmanDecoder {
    num_codes: usize,
    max_bits: u32,
    /// Code length per symbol (0 = unused symbol).
    lengths: Vec<u8>,
    /// First code value of each length.
    first_code: [u32; MAX_CODE_LENGTH + 1],
    /// Symbols of each length, in symbol order.
    symbols_by_length: Vec<Vec<u8>>,
}

impl HuffmanDecoder {
    /// Create a decoder for `num_codes` symbols with codes of at most `max_bits`.
    pub fn new(num_codes: usize, max_bits: u32) -> Self {
        Self {
            num_codes,
            max_bits: max_bits.min(MAX_CODE_LENGTH as u32),
            lengths: vec![0; num_codes],
            first_code: [0; MAX_CODE_LENGTH + 1],
            symbols_by_length: vec![Vec::new(); MAX_CODE_LENGTH + 1],
        }
    }

    /// Width of each code-length field in the RLE table.
    fn length_field_bits(&self) -> u32 {
        match self.max_bits {
            16.. => 5,
            8.. => 4,
            _ => 3,
        }
    }

    /// Read the RLE code-length table and build the canonical code.
    ///
    /// A field value other than 1 is a literal length. A 1 escapes: if the
    /// next field is also 1 it is a literal 1, otherwise that field is the
    /// length to repeat and a third field holds the repeat count minus 3.
    pub fn import_tree_rle(&mut self, reader: &mut BitReader<'_>) -> Result<(), ChdError> {
        let field = self.length_field_bits();
        let mut node = 0;
        while node < self.num_codes {
            let value = reader.read(field);
            if value != 1 {
                self.lengths[node] = value as u8;
                node += 1;
                continue;
            }
            let value = reader.read(field);
            if value == 1 {
                self.lengths[node] = 1;
                node += 1;
                continue;
            }
            let repeat = reader.read(field) as usize + 3;
            if node + repeat > self.num_codes {
                return Err(ChdError::invalid_header(format!(
                    "huffman length run of {repeat} overflows {} codes at {node}",
                    self.num_codes
                )));
            }
            self.lengths[node..node + repeat].fill(value as u8);
            node += repeat;
        }
        self.assign_canonical_codes()
    }

    /// Set the code lengths directly and build the canonical code.
    pub fn set_lengths(&mut self, lengths: &[u8]) -> Result<(), ChdError> {
        if lengths.len() != self.num_codes {
            return Err(ChdError::invalid_header(format!(
                "expected {} code lengths, got {}",
                self.num_codes,
                lengths.len()
            )));
        }
        self.lengths.copy_from_slice(lengths);
        self.assign_canonical_codes()
    }

    fn assign_canonical_codes(&mut self) -> Result<(), ChdError> {
        let mut histogram = [0u32; MAX_CODE_LENGTH + 1];
        for (symbol, &len) in self.lengths.iter().enumerate() {
            if len as u32 > self.max_bits {
                return Err(ChdError::invalid_header(format!(
                    "huffman code length {len} for symbol {symbol} exceeds {}",
                    self.max_bits
                )));
            }
            histogram[len as usize] += 1;
        }

        let mut current: u32 = 0;
        for len in (1..=MAX_CODE_LENGTH).rev() {
            let next = (current + histogram[len]) >> 1;
            if len != 1 && next * 2 != current + histogram[len] {
                return Err(ChdError::invalid_header(format!(
                    "huffman tree does not close at length {len}"
                )));
            }
            self.first_code[len] = current;
            current = next;
        }

        for bucket in &mut self.symbols_by_length {
            bucket.clear();
        }
        for (symbol, &len) in self.lengths.iter().enumerate() {
            if len > 0 {
                self.symbols_by_length[len as usize].push(symbol as u8);
            }
        }
        Ok(())
    }

    /// Decode one symbol, consuming exactly its code bits.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u8, ChdError> {
        let mut code: u32 = 0;
        for len in 1..=self.max_bits as usize {
            code = (code << 1) | reader.read_bit();
            let symbols = &self.symbols_by_length[len];
            let first = self.first_code[len];
            if code >= first && ((code - first) as usize) < symbols.len() {
                return Ok(symbols[(code - first) as usize]);
            }
        }
        Err(ChdError::invalid_header(format!(
            "no huffman code matches within {} bits",
            self.max_bits
        )))
    }

    /// Code length assigned to `symbol`.
    pub fn code_length(&self, symbol: usize) -> u8 {
        self.lengths.get(symbol).copied().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "tests/huffman_tests.rs"]
mod tests;
