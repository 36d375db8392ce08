//! Table-driven CRCs used to validate FLAC frame boundaries.
//!
//! Both checksums are MSB-first with a zero initial value and no final xor, so
//! running the CRC-16 over a whole frame including its stored checksum gives 0.

/// CRC algorithm specification with polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-8 over a frame header, up to but excluding the stored checksum.
pub const CRC_FRAME_HEADER_ALG: Algorithm<u8> = Algorithm {
    poly: 0x07,
    init: 0x00,
};

/// CRC-16 over a whole frame, header included.
pub const CRC_FRAME_ALG: Algorithm<u16> = Algorithm {
    poly: 0x8005,
    init: 0x0000,
};

const fn crc8_table(poly: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < table.len() {
        let mut value = i as u8;
        let mut bit = 0;
        while bit < 8 {
            value = (value << 1) ^ (((value >> 7) & 1) * poly);
            bit += 1;
        }
        table[i] = value;
        i += 1;
    }

    table
}

const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < table.len() {
        let mut value = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            value = (value << 1) ^ (((value >> 15) & 1) * poly);
            bit += 1;
        }
        table[i] = value;
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc8 {
    pub init: u8,
    table: [u8; 256],
}

#[derive(Debug)]
pub struct Crc16 {
    pub init: u16,
    table: [u16; 256],
}

impl Crc8 {
    pub const fn new(algorithm: &Algorithm<u8>) -> Self {
        Self {
            init: algorithm.init,
            table: crc8_table(algorithm.poly),
        }
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u8, bytes: &[u8]) -> u8 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.table[(crc ^ bytes[i]) as usize];
            i += 1;
        }

        crc
    }

    pub const fn checksum(&self, bytes: &[u8]) -> u8 {
        self.update(self.init, bytes)
    }
}

impl Crc16 {
    pub const fn new(algorithm: &Algorithm<u16>) -> Self {
        Self {
            init: algorithm.init,
            table: crc16_table(algorithm.poly),
        }
    }

    #[inline(always)]
    pub const fn update_byte(&self, crc: u16, byte: u8) -> u16 {
        (crc << 8) ^ self.table[((crc >> 8) as u8 ^ byte) as usize]
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u16, bytes: &[u8]) -> u16 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.update_byte(crc, bytes[i]);
            i += 1;
        }

        crc
    }

    pub const fn checksum(&self, bytes: &[u8]) -> u16 {
        self.update(self.init, bytes)
    }
}
