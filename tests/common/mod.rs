#![allow(dead_code)]

//! Shared wiring for the integration tests: an in-memory bidirectional
//! link with real timeout semantics, a scripted one-sided port, and frame
//! construction that is independent of the crate's own codec.

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

use xmodem_link::{check, BytePort, Xmodem};

pub const SOH: u8 = 0x01;
pub const STX: u8 = 0x02;
pub const EOT: u8 = 0x04;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;
pub const CAN: u8 = 0x18;
pub const SUB: u8 = 0x1A;
pub const CRC: u8 = 0x43;

/// One end of an in-memory serial link. Reads block with a real timeout,
/// writes never block.
pub struct WireEnd {
    rx: Receiver<u8>,
    tx: Sender<u8>,
}

impl BytePort for WireEnd {
    fn in_byte(&mut self, timeout_ms: u16) -> Option<u8> {
        self.rx
            .recv_timeout(Duration::from_millis(timeout_ms.into()))
            .ok()
    }

    fn out_byte(&mut self, byte: u8) {
        // The peer may have hung up already; stragglers just vanish.
        let _ = self.tx.send(byte);
    }
}

/// A connected pair of link ends.
pub fn wire() -> (WireEnd, WireEnd) {
    let (s1, r1) = channel();
    let (s2, r2) = channel();
    (WireEnd { rx: r1, tx: s2 }, WireEnd { rx: r2, tx: s1 })
}

/// Protocol timings shrunk so the timeout-driven paths stay fast under
/// test.
pub fn fast_config() -> Xmodem {
    let mut cfg = Xmodem::new();
    cfg.byte_timeout_ms = 100;
    cfg.reply_timeout_ms = 250;
    cfg.quiet_window_ms = 50;
    cfg
}

/// A port driven from a prerecorded script of read outcomes. `Some(b)`
/// hands the engine a byte, `None` is one timed-out read; an exhausted
/// script times out forever. Everything the engine writes is recorded.
pub struct ScriptPort {
    script: VecDeque<Option<u8>>,
    pub sent: Vec<u8>,
}

impl ScriptPort {
    pub fn new() -> Self {
        ScriptPort {
            script: VecDeque::new(),
            sent: Vec::new(),
        }
    }

    pub fn push_byte(&mut self, byte: u8) {
        self.script.push_back(Some(byte));
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.script.push_back(Some(b));
        }
    }

    /// One timed-out read. Also what stops a drain between staged frames.
    pub fn push_timeout(&mut self) {
        self.script.push_back(None);
    }
}

impl BytePort for ScriptPort {
    fn in_byte(&mut self, _timeout_ms: u16) -> Option<u8> {
        self.script.pop_front().flatten()
    }

    fn out_byte(&mut self, byte: u8) {
        self.sent.push(byte);
    }
}

/// Build a complete frame by hand, padding the payload with SUB up to
/// `block` bytes.
pub fn frame(seq: u8, data: &[u8], crc_mode: bool, block: usize) -> Vec<u8> {
    assert!(data.len() <= block);
    let mut payload = data.to_vec();
    payload.resize(block, SUB);

    let mut out = vec![if block == 128 { SOH } else { STX }, seq, !seq];
    out.extend_from_slice(&payload);
    if crc_mode {
        out.extend_from_slice(&check::crc16_ccitt(&payload).to_be_bytes());
    } else {
        out.push(check::checksum8(&payload));
    }
    out
}

/// Deterministic test payload.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}
