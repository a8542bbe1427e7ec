use std::io;
use std::time::Duration;

/// Abstraction over a UART byte stream, so ingest logic can run against an
/// in-memory fixture in tests instead of a real serial port. A `hardware`
/// feature provides a `serialport`-backed implementation for the device.
pub trait UartPort: Send {
    /// Reads up to `buf.len()` bytes, blocking for at most the port's
    /// configured timeout. Returns `Ok(0)` on timeout with nothing read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// A fixed byte sequence played back once, useful for deterministic tests.
pub struct FixtureUartPort {
    data: Vec<u8>,
    pos: usize,
}

impl FixtureUartPort {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl UartPort for FixtureUartPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(feature = "hardware")]
pub struct SerialUartPort {
    port: Box<dyn serialport::SerialPort>,
}

#[cfg(feature = "hardware")]
impl SerialUartPort {
    /// Opens `path` at the fixed 256000-8N1 configuration both radar
    /// streams use, with a 100 ms read timeout per the driver contract.
    pub fn open(path: &str) -> io::Result<Self> {
        let port = serialport::new(path, 256_000)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(Self { port })
    }
}

#[cfg(feature = "hardware")]
impl UartPort for SerialUartPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}
