//! Byte transport between the driver and a mount.
//!
//! The driver only needs to send a command and then collect a reply of a
//! known shape before a deadline. [`Transport`] captures that, with the
//! reply collection built on a single byte-at-a-time primitive so both
//! real serial ports and the [simulator](crate::simulator::Simulator)
//! share the same framing code.

use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use arrayvec::ArrayVec;

/// Upper bound on any reply the mount sends.
pub const MAX_REPLY_LEN: usize = 32;

/// Reply bytes collected from the transport.
pub type ReplyBytes = ArrayVec<u8, MAX_REPLY_LEN>;

pub trait Transport {
    /// Send all of `data` to the mount.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Receive a single byte, waiting at most `timeout`.
    /// `Ok(None)` means nothing arrived in time, or the stream ended.
    fn recv_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;

    /// Collect bytes up to and including `terminator`, or until `max_len`
    /// bytes have been read.
    ///
    /// Running out of time after at least one byte returns the partial
    /// reply, so the caller can report it as a framing problem. Receiving
    /// nothing at all is a [`ErrorKind::TimedOut`] error.
    fn read_until(&mut self, terminator: u8, max_len: usize, timeout: Duration) -> io::Result<ReplyBytes> {
        read_frame(self, Some(terminator), max_len, timeout)
    }

    /// Collect exactly `len` bytes, with the same timeout rules as
    /// [`read_until`](Self::read_until).
    fn read_exact(&mut self, len: usize, timeout: Duration) -> io::Result<ReplyBytes> {
        read_frame(self, None, len, timeout)
    }
}

fn read_frame<T: Transport + ?Sized>(
    transport: &mut T,
    terminator: Option<u8>,
    max_len: usize,
    timeout: Duration,
) -> io::Result<ReplyBytes> {
    let max_len = max_len.min(MAX_REPLY_LEN);
    let deadline = Instant::now() + timeout;
    let mut reply = ReplyBytes::new();

    while reply.len() < max_len {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining == Duration::ZERO {
            break;
        }
        match transport.recv_byte(remaining)? {
            Some(byte) => {
                reply.push(byte);
                if Some(byte) == terminator {
                    break;
                }
            }
            None => break,
        }
    }

    if reply.is_empty() && max_len > 0 {
        Err(io::Error::new(ErrorKind::TimedOut, "no reply from mount"))
    } else {
        Ok(reply)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).send(data)
    }

    fn recv_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).recv_byte(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).send(data)
    }

    fn recv_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).recv_byte(timeout)
    }
}

/// Adapts any `Read + Write` stream, e.g. a serial port, into a [`Transport`].
///
/// The stream's own read timeout should be short compared to the reply
/// timeout; timed out reads are retried until the deadline passes.
#[derive(Debug)]
pub struct StreamTransport<IO> {
    io: IO,
}

impl<IO> StreamTransport<IO>
where
    IO: Read + Write,
{
    pub const fn new(io: IO) -> Self {
        Self { io }
    }

    pub fn get_ref(&self) -> &IO {
        &self.io
    }

    pub fn get_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    pub fn into_inner(self) -> IO {
        self.io
    }
}

impl<IO> Transport for StreamTransport<IO>
where
    IO: Read + Write,
{
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.io.write_all(data)?;
        self.io.flush()
    }

    fn recv_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0; 1];
        loop {
            match self.io.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(err) => match err.kind() {
                    ErrorKind::Interrupted => {}
                    ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                        if Instant::now() >= deadline {
                            return Ok(None);
                        }
                        if err.kind() == ErrorKind::WouldBlock {
                            std::thread::sleep(Duration::from_millis(1));
                        }
                    }
                    _ => return Err(err),
                },
            }
        }
    }
}

/// A transport with nothing on the other end, for clients that only ever
/// run against the simulated mount.
#[derive(Debug, Default, Copy, Clone)]
pub struct Offline;

impl Transport for Offline {
    fn send(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(ErrorKind::NotConnected, "no mount connected"))
    }

    fn recv_byte(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        Err(io::Error::new(ErrorKind::NotConnected, "no mount connected"))
    }
}
