//! Transmit-side state machine: sync wait, frame staging, the retransmit
//! loop, and the EOT handshake.

use log::{debug, error, info, warn};

use crate::buffers::TxSource;
use crate::packet::{self, Checksum, ACK, CAN, CRC, EOT, NAK};
use crate::port::{self, BytePort};
use crate::{Error, Result, Xmodem};

struct Transmitter<'a, P: BytePort> {
    cfg: &'a Xmodem,
    port: &'a mut P,
    mode: Checksum,
    next_seq: u8,
    total: usize,
}

pub(crate) fn transmit<P: BytePort, S: TxSource>(
    cfg: &Xmodem,
    port: &mut P,
    source: &mut S,
) -> Result<usize> {
    let mut tx = Transmitter {
        cfg,
        port,
        mode: Checksum::Standard,
        next_seq: 1,
        total: 0,
    };
    tx.wait_sync()?;

    // Source chunks are staged into whole frames; supplier granularity
    // never shows on the wire. Only the final frame may run short, and it
    // is padded up to the block size.
    let block = cfg.block_length as usize;
    let mut stage: Vec<u8> = Vec::with_capacity(block);
    'chunks: loop {
        let chunk = match source.next_chunk() {
            Some(c) if !c.is_empty() => c,
            _ => break 'chunks,
        };
        let mut pos = 0usize;
        if !stage.is_empty() {
            let take = (block - stage.len()).min(chunk.len());
            stage.extend_from_slice(&chunk[..take]);
            pos = take;
            if stage.len() == block {
                tx.send_packet(&stage)?;
                stage.clear();
            }
        }
        while chunk.len() - pos >= block {
            tx.send_packet(&chunk[pos..pos + block])?;
            pos += block;
        }
        stage.extend_from_slice(&chunk[pos..]);
    }
    if !stage.is_empty() {
        tx.send_packet(&stage)?;
    }
    tx.finish()
}

impl<P: BytePort> Transmitter<'_, P> {
    /// Wait for the receiver's sync byte. 'C' selects CRC mode, NAK the
    /// classic checksum.
    fn wait_sync(&mut self) -> Result<()> {
        debug!("Tx waiting for sync");
        for _ in 0..self.cfg.sync_retries {
            match self.port.in_byte(self.cfg.reply_timeout_ms) {
                Some(CRC) => {
                    debug!("Tx 16-bit CRC requested");
                    self.mode = Checksum::CRC16;
                    return Ok(());
                }
                Some(NAK) => {
                    debug!("Tx standard checksum requested");
                    self.mode = Checksum::Standard;
                    return Ok(());
                }
                Some(CAN) => {
                    if self.port.in_byte(self.cfg.byte_timeout_ms) == Some(CAN) {
                        warn!("Tx cancelled by remote during sync");
                        self.port.out_byte(ACK);
                        port::drain(self.port, self.cfg.quiet_window_ms);
                        return Err(Error::CancelledByRemote);
                    }
                }
                Some(other) => warn!("Tx unknown byte during sync: 0x{:02X}", other),
                None => {}
            }
        }
        warn!("Tx no sync");
        self.bail();
        Err(Error::NoSync)
    }

    /// Frame `data` under the next sequence number and drive it until the
    /// receiver ACKs or the retransmit budget runs out. The built frame is
    /// kept so every round puts identical bytes on the wire.
    fn send_packet(&mut self, data: &[u8]) -> Result<()> {
        let frame = packet::build(self.next_seq, data, self.mode, self.cfg.block_length);
        for round in 0..self.cfg.max_retrans {
            debug!("Tx packet {} round {}", self.next_seq, round + 1);
            for &b in &frame {
                self.port.out_byte(b);
            }
            match self.port.in_byte(self.cfg.reply_timeout_ms) {
                Some(ACK) => {
                    self.next_seq = self.next_seq.wrapping_add(1);
                    self.total += self.cfg.block_length as usize;
                    return Ok(());
                }
                Some(CAN) => {
                    if self.port.in_byte(self.cfg.byte_timeout_ms) == Some(CAN) {
                        warn!("Tx cancelled by remote");
                        self.port.out_byte(ACK);
                        port::drain(self.port, self.cfg.quiet_window_ms);
                        return Err(Error::CancelledByRemote);
                    }
                }
                Some(NAK) => warn!("Tx packet {} rejected", self.next_seq),
                Some(other) => warn!("Tx expected reply, got 0x{:02X}", other),
                None => warn!("Tx reply timeout for packet {}", self.next_seq),
            }
        }
        error!("Tx retransmit limit reached on packet {}", self.next_seq);
        self.bail();
        Err(Error::TransmitError)
    }

    /// Offer EOT until it is ACKed or the attempts run out, then leave the
    /// link quiet either way.
    fn finish(&mut self) -> Result<usize> {
        let mut acked = false;
        for _ in 0..self.cfg.eot_retries {
            debug!("Tx EOT");
            self.port.out_byte(EOT);
            if self.port.in_byte(self.cfg.reply_timeout_ms) == Some(ACK) {
                acked = true;
                break;
            }
        }
        port::drain(self.port, self.cfg.quiet_window_ms);
        if acked {
            info!("Tx complete, {} bytes sent", self.total);
            Ok(self.total)
        } else {
            warn!("Tx EOT never acknowledged");
            Err(Error::UnexpectedResponse)
        }
    }

    fn bail(&mut self) {
        for _ in 0..3 {
            self.port.out_byte(CAN);
        }
        port::drain(self.port, self.cfg.quiet_window_ms);
    }
}
