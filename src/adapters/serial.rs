//! Serial port adapter for the sensor link.
//!
//! Implements [`Connector`] / [`LineTransport`] on top of `serialport`.
//! When the configured device cannot be opened and `scan_fallback` is
//! set, every other detected port is tried in enumeration order; the
//! first that opens becomes the preferred device for later reconnects.

use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use log::{info, warn};
use serialport::{ClearBuffer, SerialPort};

use crate::config::SerialConfig;
use crate::error::LinkError;
use crate::link::{Connector, LineTransport};

/// A line longer than this without a terminator is discarded as noise.
const MAX_LINE: usize = 4096;

pub struct SerialConnector {
    preferred: String,
    baud: u32,
    timeout: Duration,
    scan_fallback: bool,
}

impl SerialConnector {
    pub fn new(config: &SerialConfig) -> Self {
        Self {
            preferred: config.device.clone(),
            baud: config.baud,
            timeout: Duration::from_millis(config.read_timeout_ms),
            scan_fallback: config.scan_fallback,
        }
    }

    fn open_path(&self, path: &str) -> Result<SerialTransport, serialport::Error> {
        let port = serialport::new(path, self.baud)
            .timeout(self.timeout)
            .open()?;
        Ok(SerialTransport::new(port))
    }

    fn candidates(&self) -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports
                .into_iter()
                .map(|p| p.port_name)
                .filter(|name| *name != self.preferred)
                .collect(),
            Err(e) => {
                warn!("Serial: port enumeration failed ({e})");
                Vec::new()
            }
        }
    }
}

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn open(&mut self) -> Result<SerialTransport, LinkError> {
        let first = match self.open_path(&self.preferred) {
            Ok(t) => {
                info!("Serial: opened {} @ {}", self.preferred, self.baud);
                return Ok(t);
            }
            Err(e) => e,
        };
        if !self.scan_fallback {
            return Err(LinkError::Open(format!("{}: {first}", self.preferred)));
        }

        warn!("Serial: {} unavailable ({first}), scanning", self.preferred);
        for name in self.candidates() {
            match self.open_path(&name) {
                Ok(t) => {
                    info!("Serial: opened fallback {name} @ {}", self.baud);
                    self.preferred = name;
                    return Ok(t);
                }
                Err(e) => warn!("Serial: {name} failed ({e})"),
            }
        }
        Err(LinkError::Open(format!(
            "{}: {first} (no fallback port opened)",
            self.preferred
        )))
    }
}

/// An open port with a partial-line buffer that survives read timeouts.
pub struct SerialTransport {
    reader: BufReader<Box<dyn SerialPort>>,
    pending: Vec<u8>,
}

impl SerialTransport {
    fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            reader: BufReader::new(port),
            pending: Vec::new(),
        }
    }
}

impl LineTransport for SerialTransport {
    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        next_line(&mut self.reader, &mut self.pending)
    }

    fn discard_input(&mut self) -> Result<(), LinkError> {
        self.pending.clear();
        self.reader
            .get_ref()
            .clear(ClearBuffer::Input)
            .map_err(|e| LinkError::Io(io::Error::from(e).kind()))?;
        // Drop whatever BufReader already pulled in.
        let buffered = self.reader.buffer().len();
        self.reader.consume(buffered);
        Ok(())
    }
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Move at most one buffered chunk into `pending`, up to and including
/// the first `\n`.  Returns the line once it is complete; a partial line
/// stays in `pending` for the next call.  `pending` is capped at
/// [`MAX_LINE`] per chunk, so a stream with no terminators cannot grow it
/// without bound.
fn next_line<R: BufRead>(
    reader: &mut R,
    pending: &mut Vec<u8>,
) -> Result<Option<String>, LinkError> {
    let chunk = match reader.fill_buf() {
        Ok([]) => return Err(LinkError::Closed),
        Ok(chunk) => chunk,
        Err(e) if is_idle(&e) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let (used, complete) = match chunk.iter().position(|&b| b == b'\n') {
        Some(end) => (end + 1, true),
        None => (chunk.len(), false),
    };
    pending.extend_from_slice(&chunk[..used]);
    reader.consume(used);

    if complete {
        return Ok(Some(take_line(pending)));
    }
    if pending.len() > MAX_LINE {
        warn!("Serial: discarding {} unterminated bytes", pending.len());
        pending.clear();
    }
    Ok(None)
}

/// Decode and clear `pending`, stripping the line terminator.
fn take_line(pending: &mut Vec<u8>) -> String {
    let line = String::from_utf8_lossy(pending)
        .trim_end_matches(['\r', '\n'])
        .to_string();
    pending.clear();
    line
}
