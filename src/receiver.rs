//! Receive-side state machine: sync negotiation, packet acceptance,
//! duplicate handling, sink delivery, and EOT/CAN termination.

use log::{debug, trace, warn};

use crate::buffers::RxSink;
use crate::packet::{self, Checksum, ACK, CAN, CRC, EOT, NAK, SOH, STX, SUB};
use crate::port::{self, BytePort};
use crate::{Error, Result, Xmodem};

enum Start {
    Frame(usize),
    Eot,
}

enum Event {
    Packet(Vec<u8>),
    Eot,
}

struct Receiver<'a, P: BytePort> {
    cfg: &'a Xmodem,
    port: &'a mut P,
    /// The sync byte currently being polled ('C' then NAK), cleared once
    /// the first frame header arrives.
    sync_char: Option<u8>,
    mode: Checksum,
    expected_seq: u8,
    retrans_left: u32,
}

pub(crate) fn receive<P: BytePort, S: RxSink>(
    cfg: &Xmodem,
    port: &mut P,
    sink: &mut S,
) -> Result<usize> {
    let mut rx = Receiver {
        cfg,
        port,
        sync_char: Some(CRC),
        mode: Checksum::Standard,
        expected_seq: 1,
        retrans_left: cfg.max_retrans,
    };
    debug!("Rx session start");

    // Delivery runs one packet behind acceptance: a packet is flushed to
    // the sink when its successor is accepted, and the last packet is
    // flushed on EOT with its trailing SUB padding stripped.
    let mut held: Option<Vec<u8>> = None;
    // Committed bytes part-way into the sink, carried across buffers.
    let mut pending: Option<(Vec<u8>, usize)> = None;
    let mut finishing = false;
    let mut total = 0usize;

    'buffers: loop {
        let buf = match sink.next_buffer() {
            Some(b) if !b.is_empty() => b,
            _ => {
                warn!("Rx sink declined a buffer after {} bytes", total);
                rx.bail();
                return Err(Error::BufferFull);
            }
        };
        let mut used = 0usize;
        loop {
            let delivered = if let Some((data, off)) = pending.as_mut() {
                let n = (data.len() - *off).min(buf.len() - used);
                buf[used..used + n].copy_from_slice(&data[*off..*off + n]);
                used += n;
                *off += n;
                total += n;
                *off == data.len()
            } else {
                true
            };
            if !delivered {
                continue 'buffers;
            }
            pending = None;

            if finishing {
                port::drain(rx.port, rx.cfg.quiet_window_ms);
                rx.port.out_byte(ACK);
                debug!("Rx done, {} bytes delivered", total);
                return Ok(total);
            }
            match rx.next_event()? {
                Event::Packet(data) => {
                    if let Some(prev) = held.replace(data) {
                        pending = Some((prev, 0));
                    }
                }
                Event::Eot => {
                    debug!("Rx EOT");
                    if let Some(mut last) = held.take() {
                        while last.last() == Some(&SUB) {
                            last.pop();
                        }
                        pending = Some((last, 0));
                    }
                    finishing = true;
                }
            }
        }
    }
}

impl<P: BytePort> Receiver<'_, P> {
    /// Run the wire until something deliverable happens: the next unique
    /// in-sequence packet (already ACKed) or a clean EOT. Duplicates and
    /// rejects are absorbed here against the retry budget.
    fn next_event(&mut self) -> Result<Event> {
        loop {
            let size = match self.wait_start()? {
                Start::Frame(size) => size,
                Start::Eot => return Ok(Event::Eot),
            };
            let body = match self.read_body(size) {
                Some(body) => body,
                None => {
                    warn!("Rx timeout inside frame");
                    self.reject()?;
                    continue;
                }
            };
            match packet::validate(&body, size, self.mode) {
                Some(seq) if seq == self.expected_seq => {
                    let payload = body[2..2 + size].to_vec();
                    self.retrans_left = self.cfg.max_retrans + 1;
                    self.use_budget()?;
                    self.expected_seq = self.expected_seq.wrapping_add(1);
                    self.port.out_byte(ACK);
                    debug!("Rx packet {} accepted", seq);
                    return Ok(Event::Packet(payload));
                }
                Some(seq) if seq == self.expected_seq.wrapping_sub(1) => {
                    // Retransmission of a packet we already have: ACK it
                    // again but deliver nothing.
                    debug!("Rx duplicate packet {}", seq);
                    self.use_budget()?;
                    self.port.out_byte(ACK);
                }
                Some(seq) => {
                    warn!("Rx packet {} outside window, expected {}", seq, self.expected_seq);
                    self.reject()?;
                }
                None => {
                    warn!("Rx packet failed validation");
                    self.reject()?;
                }
            }
        }
    }

    /// Wait for the start of the next frame, polling the sync byte while
    /// negotiation is still open. Falls back from 'C' to NAK after one
    /// exhausted round; a second exhausted round is fatal.
    fn wait_start(&mut self) -> Result<Start> {
        loop {
            for _ in 0..self.cfg.sync_retries {
                if let Some(c) = self.sync_char {
                    trace!("Rx sync poll 0x{:02X}", c);
                    self.port.out_byte(c);
                }
                match self.port.in_byte(self.cfg.reply_timeout_ms) {
                    Some(SOH) => return Ok(self.start_frame(128)),
                    Some(STX) => return Ok(self.start_frame(1024)),
                    Some(EOT) => return Ok(Start::Eot),
                    Some(CAN) => {
                        if self.port.in_byte(self.cfg.byte_timeout_ms) == Some(CAN) {
                            warn!("Rx cancelled by remote");
                            port::drain(self.port, self.cfg.quiet_window_ms);
                            self.port.out_byte(ACK);
                            return Err(Error::CancelledByRemote);
                        }
                    }
                    Some(other) => trace!("Rx ignoring byte 0x{:02X}", other),
                    None => {}
                }
            }
            if self.sync_char == Some(CRC) {
                debug!("Rx falling back to checksum sync");
                self.sync_char = Some(NAK);
                continue;
            }
            warn!("Rx no sync");
            self.bail();
            return Err(Error::NoSync);
        }
    }

    /// A frame header fixes the frame size and, the first time, freezes
    /// the integrity mode chosen by the sync byte.
    fn start_frame(&mut self, size: usize) -> Start {
        if let Some(c) = self.sync_char.take() {
            self.mode = if c == CRC { Checksum::CRC16 } else { Checksum::Standard };
            debug!("Rx mode fixed to {:?}", self.mode);
        }
        Start::Frame(size)
    }

    /// Read the rest of a frame after its header byte: sequence pair,
    /// payload, trailer. `None` on any per-byte timeout.
    fn read_body(&mut self, size: usize) -> Option<Vec<u8>> {
        let mut body = vec![0u8; 2 + size + self.mode.trailer_len()];
        for slot in body.iter_mut() {
            *slot = self.port.in_byte(self.cfg.byte_timeout_ms)?;
        }
        Some(body)
    }

    /// Every accepted or rejected packet spends budget; only an advancing
    /// packet refills it.
    fn use_budget(&mut self) -> Result<()> {
        self.retrans_left = self.retrans_left.saturating_sub(1);
        if self.retrans_left == 0 {
            warn!("Rx too many retries");
            self.bail();
            return Err(Error::TooManyRetries);
        }
        Ok(())
    }

    fn reject(&mut self) -> Result<()> {
        self.use_budget()?;
        port::drain(self.port, self.cfg.quiet_window_ms);
        self.port.out_byte(NAK);
        Ok(())
    }

    fn bail(&mut self) {
        port::drain(self.port, self.cfg.quiet_window_ms);
        for _ in 0..3 {
            self.port.out_byte(CAN);
        }
    }
}
