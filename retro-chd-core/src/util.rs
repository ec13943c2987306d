/// Format a byte count with fractional KB/MB (e.g., "1.5 KB", "2.3 MB").
pub fn format_bytes_approx(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Lowercase hex string of a digest.
pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// Big-endian field readers. Callers check the buffer length first.

pub fn be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

pub fn be_u24(buf: &[u8], offset: usize) -> u32 {
    (buf[offset] as u32) << 16 | (buf[offset + 1] as u32) << 8 | buf[offset + 2] as u32
}

pub fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

pub fn be_u48(buf: &[u8], offset: usize) -> u64 {
    buf[offset..offset + 6]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

pub fn be_u64(buf: &[u8], offset: usize) -> u64 {
    buf[offset..offset + 8]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
