//! XMODEM file transfer over an abstract byte-oriented serial link.
//!
//! The crate provides the two halves of the protocol as independent
//! engines: [`Xmodem::receive`] reconstructs a contiguous byte stream from
//! a remote sender's packets, and [`Xmodem::transmit`] frames a
//! caller-supplied byte stream into packets and drives it to completion.
//! Both negotiate the integrity variant (classic 8-bit checksum or 16-bit
//! CRC-CCITT), retransmit on demand, drop duplicate packets, and wind the
//! session down so the peer is never left waiting.
//!
//! The engines talk to the outside world through two small contracts: a
//! [`BytePort`] for the physical link (one read-with-timeout and one write)
//! and the [`TxSource`] / [`RxSink`] buffer suppliers for application data.
//! Everything else (threading, file I/O, the actual UART) stays with the
//! caller.
//!
//! ```no_run
//! use xmodem_link::{SliceSource, Xmodem};
//! # fn open_port() -> impl xmodem_link::BytePort { struct P; impl xmodem_link::BytePort for P {
//! #     fn in_byte(&mut self, _t: u16) -> Option<u8> { None }
//! #     fn out_byte(&mut self, _b: u8) {} } P }
//!
//! let mut port = open_port();
//! let data = b"firmware image".to_vec();
//! let sent = Xmodem::new().transmit(&mut port, &mut SliceSource::new(&data))?;
//! # Ok::<(), xmodem_link::Error>(())
//! ```

pub mod buffers;
pub mod check;
mod packet;
pub mod port;
mod receiver;
mod transmitter;

pub use buffers::{RxSink, SliceSink, SliceSource, TxSource};
pub use packet::{BlockLength, Checksum};
pub use port::{BytePort, DLY_1S};

pub type Result<T> = std::result::Result<T, Error>;

/// Terminal session outcomes other than success.
///
/// Integrity failures on single frames never surface here; they are
/// absorbed by the retry machinery and only show up once a budget runs
/// out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The peer sent two consecutive CAN bytes.
    #[error("transfer cancelled by remote")]
    CancelledByRemote,

    /// Sync negotiation (or a mid-session wait for the next packet start)
    /// exhausted its attempts.
    #[error("no sync with remote")]
    NoSync,

    /// The receiver ran out of its accepted/rejected packet budget.
    #[error("too many retries")]
    TooManyRetries,

    /// The transmitter exhausted its retransmit rounds on one packet.
    #[error("transmit retry limit reached")]
    TransmitError,

    /// The EOT handshake never drew an ACK.
    #[error("unexpected response to EOT")]
    UnexpectedResponse,

    /// The receive sink declined to provide further buffer capacity.
    #[error("receive buffer space exhausted")]
    BufferFull,
}

impl Error {
    /// The stable negative status code for this outcome, matching the
    /// classic C API.
    pub fn code(self) -> i32 {
        match self {
            Error::CancelledByRemote => -1,
            Error::NoSync => -2,
            Error::TooManyRetries => -3,
            Error::TransmitError => -4,
            Error::UnexpectedResponse => -5,
            Error::BufferFull => -6,
        }
    }
}

/// Configuration for the XMODEM session engines.
///
/// The defaults reproduce the classic protocol timings; tests (and
/// unusually fast or slow links) can tune every one of them.
#[derive(Copy, Clone, Debug)]
pub struct Xmodem {
    /// Retry budget. For the receiver: the number of accepted-or-rejected
    /// packets tolerated without the stream advancing. For the
    /// transmitter: retransmit rounds per packet.
    pub max_retrans: u32,

    /// Attempts per sync round (one round polling 'C', one polling NAK)
    /// and per mid-session wait for a packet start.
    pub sync_retries: u32,

    /// How many times EOT is offered before giving up on the final ACK.
    pub eot_retries: u32,

    /// The transmit frame size. There are only two options: 128-byte
    /// frames (standard XMODEM) or 1024-byte frames (XMODEM-1k). The
    /// receiver accepts both regardless.
    pub block_length: BlockLength,

    /// Timeout for a byte inside an in-progress frame and for the
    /// follow-up byte after a lone CAN.
    pub byte_timeout_ms: u16,

    /// Timeout when waiting on a packet start or a peer reply.
    pub reply_timeout_ms: u16,

    /// Quiet window used to drain the link before any terminal action.
    pub quiet_window_ms: u16,
}

impl Xmodem {
    /// Creates the configuration with the classic protocol parameters.
    pub fn new() -> Self {
        Xmodem {
            max_retrans: 25,
            sync_retries: 16,
            eot_retries: 10,
            block_length: BlockLength::Standard,
            byte_timeout_ms: DLY_1S,
            reply_timeout_ms: DLY_1S * 2,
            quiet_window_ms: DLY_1S / 2 * 3,
        }
    }

    /// Receive a transfer, delivering payload into buffers supplied by
    /// `sink`. Returns the number of payload bytes delivered; the trailing
    /// SUB padding of the final frame is stripped before delivery.
    pub fn receive<P: BytePort, S: RxSink>(&self, port: &mut P, sink: &mut S) -> Result<usize> {
        receiver::receive(self, port, sink)
    }

    /// Transmit a transfer, pulling payload from `source`. Returns the
    /// number of bytes put on the wire in whole frames, so the total is
    /// always a multiple of the frame size and includes any SUB padding of
    /// the final frame.
    pub fn transmit<P: BytePort, S: TxSource>(&self, port: &mut P, source: &mut S) -> Result<usize> {
        transmitter::transmit(self, port, source)
    }
}

impl Default for Xmodem {
    fn default() -> Self {
        Xmodem::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(Error::CancelledByRemote.code(), -1);
        assert_eq!(Error::NoSync.code(), -2);
        assert_eq!(Error::TooManyRetries.code(), -3);
        assert_eq!(Error::TransmitError.code(), -4);
        assert_eq!(Error::UnexpectedResponse.code(), -5);
        assert_eq!(Error::BufferFull.code(), -6);
    }

    #[test]
    fn default_timings_follow_the_one_second_unit() {
        let cfg = Xmodem::new();
        assert_eq!(cfg.byte_timeout_ms, 1000);
        assert_eq!(cfg.reply_timeout_ms, 2000);
        assert_eq!(cfg.quiet_window_ms, 1500);
    }
}
