//! XMODEM frame assembly and validation.
//!
//! A frame on the wire is `SOH|seq|~seq|payload[128]|trailer` or
//! `STX|seq|~seq|payload[1024]|trailer`. The trailer is one additive
//! checksum byte in classic mode or a big-endian CRC-CCITT word in CRC
//! mode. Framing is position-based; payload bytes are never stuffed or
//! escaped, so control values inside the payload are fine.

use crate::check;

pub(crate) const SOH: u8 = 0x01;
pub(crate) const STX: u8 = 0x02;
pub(crate) const EOT: u8 = 0x04;
pub(crate) const ACK: u8 = 0x06;
pub(crate) const NAK: u8 = 0x15;
pub(crate) const CAN: u8 = 0x18;
pub(crate) const SUB: u8 = 0x1A;
pub(crate) const CRC: u8 = 0x43;

/// The integrity variant in use for a session. Chosen by the receiver's
/// sync character and frozen once the first frame header is seen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Checksum {
    Standard,
    CRC16,
}

impl Checksum {
    pub(crate) fn trailer_len(self) -> usize {
        match self {
            Checksum::Standard => 1,
            Checksum::CRC16 => 2,
        }
    }
}

/// Transmit frame size. The receiver accepts both sizes regardless of
/// this setting; it only selects what the transmitter emits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockLength {
    Standard = 128,
    OneK = 1024,
}

impl BlockLength {
    pub(crate) fn header(self) -> u8 {
        match self {
            BlockLength::Standard => SOH,
            BlockLength::OneK => STX,
        }
    }
}

/// Assemble a complete frame. `data` may be shorter than the block; the
/// remainder is padded with SUB.
pub(crate) fn build(seq: u8, data: &[u8], mode: Checksum, length: BlockLength) -> Vec<u8> {
    let size = length as usize;
    debug_assert!(data.len() <= size);

    let mut frame = vec![SUB; size + 3];
    frame[0] = length.header();
    frame[1] = seq;
    frame[2] = !seq;
    frame[3..3 + data.len()].copy_from_slice(data);

    match mode {
        Checksum::Standard => {
            let cks = check::checksum8(&frame[3..3 + size]);
            frame.push(cks);
        }
        Checksum::CRC16 => {
            let crc = check::crc16_ccitt(&frame[3..3 + size]);
            frame.extend_from_slice(&crc.to_be_bytes());
        }
    }
    frame
}

/// Validate a frame body (everything after the header byte): the sequence
/// pair `seq|~seq` followed by `size` payload bytes and the trailer.
/// Returns the sequence number iff the pair matches and the trailer agrees
/// with the recomputed integrity value. Window placement is the caller's
/// concern.
pub(crate) fn validate(body: &[u8], size: usize, mode: Checksum) -> Option<u8> {
    if body.len() != 2 + size + mode.trailer_len() {
        return None;
    }
    let seq = body[0];
    if body[1] != !seq {
        return None;
    }
    let payload = &body[2..2 + size];
    let ok = match mode {
        Checksum::Standard => check::checksum8(payload) == body[2 + size],
        Checksum::CRC16 => {
            let wire = u16::from_be_bytes([body[2 + size], body[3 + size]]);
            check::crc16_ccitt(payload) == wire
        }
    };
    if ok {
        Some(seq)
    } else {
        None
    }
}
