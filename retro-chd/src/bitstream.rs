//! MSB-first bit reader over a packed byte buffer.

/// Reads variable-width bit fields, most significant bit first.
///
/// Reads past the end of the buffer yield zero bits instead of failing: the
/// compressed hunk map is tightly packed and its last field may straddle
/// the final byte.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Absolute bit position of the next unread bit.
    position: u64,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read `count` bits (0..=32) as an unsigned value.
    pub fn read(&mut self, count: u32) -> u32 {
        debug_assert!(count <= 32, "bit count {count} out of range");
        let mut remaining = count.min(32);
        let mut value: u64 = 0;
        while remaining > 0 {
            let bit_in_byte = (self.position % 8) as u32;
            let take = (8 - bit_in_byte).min(remaining);
            let byte = self
                .data
                .get((self.position / 8) as usize)
                .copied()
                .unwrap_or(0) as u32;
            let bits = (byte >> (8 - bit_in_byte - take)) & ((1 << take) - 1);
            value = (value << take) | bits as u64;
            self.position += take as u64;
            remaining -= take;
        }
        value as u32
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> u32 {
        self.next_bit()
    }

    fn next_bit(&mut self) -> u32 {
        let byte_index = (self.position / 8) as usize;
        let bit = match self.data.get(byte_index) {
            Some(&byte) => (byte >> (7 - (self.position % 8))) & 1,
            None => 0,
        };
        self.position += 1;
        bit as u32
    }

    /// Bits consumed so far, including any zero-extension past the end.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once a read has run past the end of the buffer.
    pub fn overflowed(&self) -> bool {
        self.position > self.data.len() as u64 * 8
    }
}

#[cfg(test)]
#[path = "tests/bitstream_tests.rs"]
mod tests;
