//! CRC32 hashing utilities.
//!
//! PNG protects every chunk with the ISO-HDLC CRC32 (reflected polynomial
//! `0xEDB88320`) computed over the chunk type followed by the chunk data.
//! The lookup table is evaluated at compile time, so no call ever rebuilds it.

/// Reflected CRC32 polynomial used by PNG, zlib and gzip.
pub const POLYNOMIAL: u32 = 0xEDB8_8320;

static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLYNOMIAL ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// Incremental CRC32 hasher.
///
/// Lets a chunk checksum be folded over the type and data slices without
/// concatenating them first.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// Create a hasher with the initial accumulator `0xFFFFFFFF`.
    #[inline]
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// Fold more bytes into the checksum.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut c = self.state;
        for &byte in data {
            c = TABLE[((c ^ byte as u32) & 0xFF) as usize] ^ (c >> 8);
        }
        self.state = c;
    }

    /// Finish and return the checksum.
    #[inline]
    pub const fn finalize(self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the CRC32 of a byte slice.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(data);
    hasher.finalize()
}

/// Compute the CRC32 of a PNG chunk, covering `chunk_type ++ data`.
#[inline]
pub fn crc32_chunk(chunk_type: &[u8; 4], data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(chunk_type);
    hasher.update(data);
    hasher.finalize()
}
