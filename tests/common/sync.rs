use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Write};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

type LineT = Arc<Mutex<VecDeque<u8>>>;

/// A point to point serial line between the driver (host) and a mount,
/// for running the two ends in separate threads.
#[derive(Default)]
pub struct SerialLine {
    to_mount: LineT,
    to_host: LineT,
    mount_data_available: Arc<Condvar>,
    host_data_available: Arc<Condvar>,
    eof: AtomicBool,
}

impl SerialLine {
    pub fn new() -> Arc<SerialLine> {
        Default::default()
    }

    pub fn disconnect(&self) {
        self.eof.store(true, SeqCst);
        self.mount_data_available.notify_all();
        self.host_data_available.notify_all();
    }

    pub fn new_host_interface(self: &Arc<Self>) -> BusInterface {
        BusInterface::new(Arc::clone(self), true)
    }

    pub fn new_mount_interface(self: &Arc<Self>) -> BusInterface {
        BusInterface::new(Arc::clone(self), false)
    }

    fn send(&self, to_mount: bool, data: &[u8]) {
        let (line, condvar) = if to_mount {
            (&self.to_mount, &self.mount_data_available)
        } else {
            (&self.to_host, &self.host_data_available)
        };
        line.lock().unwrap().extend(data.iter().copied());
        condvar.notify_all();
    }
}

pub struct BusInterface {
    line: Arc<SerialLine>,
    is_host: bool,
    pub timeout: Duration,
    pub do_read_error: bool,
    pub do_write_error: bool,
}

impl BusInterface {
    fn new(line: Arc<SerialLine>, is_host: bool) -> BusInterface {
        BusInterface {
            line,
            is_host,
            timeout: Duration::from_millis(100),
            do_read_error: false,
            do_write_error: false,
        }
    }

    pub fn putc(&mut self, byte: u8) {
        self.write(&[byte]).unwrap();
    }

    fn rx(&self) -> (&LineT, &Condvar) {
        if self.is_host {
            (&self.line.to_host, &self.line.host_data_available)
        } else {
            (&self.line.to_mount, &self.line.mount_data_available)
        }
    }
}

impl std::io::Read for BusInterface {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            panic!("Testsuite called read with zero length buffer.")
        }
        if self.do_read_error {
            self.do_read_error = false;
            return Err(Error::new(ErrorKind::PermissionDenied, "IO read error"));
        }

        let (line, condvar) = self.rx();
        let mut rx = line.lock().expect("Read mutex is poisoned");

        if let Some(byte) = rx.pop_front() {
            buf[0] = byte;
            return Ok(1);
        }
        if self.line.eof.load(SeqCst) {
            return Ok(0);
        }

        let mut rx = condvar
            .wait_timeout(rx, self.timeout)
            .expect("Mutex lock failed")
            .0;
        if let Some(byte) = rx.pop_front() {
            buf[0] = byte;
            Ok(1)
        } else if self.line.eof.load(SeqCst) {
            Ok(0)
        } else {
            Err(Error::new(ErrorKind::TimedOut, "IO read timeout"))
        }
    }
}

impl std::io::Write for BusInterface {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.do_write_error {
            self.do_write_error = false;
            Err(Error::new(ErrorKind::PermissionDenied, "IO write error"))
        } else {
            self.line.send(self.is_host, buf);
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
