//! Frame integrity: CRC-CCITT (XMODEM flavour) and the classic additive
//! checksum. Both cover exactly the payload region of a frame, never the
//! header or sequence bytes.

/// 16-bit CRC-CCITT, polynomial 0x1021, initial value 0, no reflection.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    crc16::State::<crc16::XMODEM>::calculate(data)
}

/// Classic XMODEM checksum: the wrapping sum of the payload bytes.
pub fn checksum8(data: &[u8]) -> u8 {
    data.iter().fold(0, |x, &y| x.wrapping_add(y))
}
