//! Serial-port exercise tool: push or pull a single file over a real
//! device with either engine.

use std::env;
use std::fs;
use std::io::{Read, Write};
use std::time::Duration;

use xmodem_link::{BlockLength, BytePort, SliceSink, SliceSource, Xmodem};

/// Adapter from a `serialport` device to the engine's byte link. The
/// device timeout is moved to whatever the engine asks for on each read.
struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl BytePort for SerialLink {
    fn in_byte(&mut self, timeout_ms: u16) -> Option<u8> {
        let _ = self.port.set_timeout(Duration::from_millis(timeout_ms.into()));
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn out_byte(&mut self, byte: u8) {
        let _ = self.port.write_all(&[byte]);
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <send|recv> <device> <file> [--1k]", args[0]);
        std::process::exit(2);
    }
    let role = args[1].as_str();
    let device = args[2].as_str();
    let path = args[3].as_str();

    let mut config = Xmodem::new();
    if args.iter().any(|a| a == "--1k") {
        config.block_length = BlockLength::OneK;
    }

    let port = serialport::new(device, 115_200)
        .open()
        .expect("Failed to open port");
    let mut link = SerialLink { port };

    match role {
        "send" => {
            let data = fs::read(path).expect("Failed to read input file");
            println!("Sending {} ({} bytes)...", path, data.len());
            match config.transmit(&mut link, &mut SliceSource::new(&data)) {
                Ok(sent) => println!("Sent {} bytes on the wire", sent),
                Err(e) => {
                    eprintln!("Transmit failed: {} (status {})", e, e.code());
                    std::process::exit(1);
                }
            }
        }
        "recv" => {
            println!("Receiving into {}...", path);
            let mut store = vec![0u8; 4 * 1024 * 1024];
            let received = {
                let mut sink = SliceSink::new(&mut store);
                config.receive(&mut link, &mut sink)
            };
            match received {
                Ok(len) => {
                    fs::File::create(path)
                        .and_then(|mut f| f.write_all(&store[..len]))
                        .expect("Failed to write output file");
                    println!("Received {} bytes", len);
                }
                Err(e) => {
                    eprintln!("Receive failed: {} (status {})", e, e.code());
                    std::process::exit(1);
                }
            }
        }
        other => {
            eprintln!("unknown role: {}", other);
            std::process::exit(2);
        }
    }
}
