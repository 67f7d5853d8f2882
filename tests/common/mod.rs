#![allow(dead_code)]

pub mod sync;

use std::cell::RefCell;
use std::cmp::min;
use std::io::{Error, ErrorKind};
use std::rc::Rc;
use std::time::Duration;

use ieqpro_proto::{Config, IeqPro, StreamTransport};

/// Scripted serial port: replies are served from `rx`, everything the
/// driver writes ends up in `tx`.
pub struct SerialInterface {
    rx: Vec<u8>,
    rx_pos: usize,
    tx: Vec<u8>,
    writes: usize,
    do_read_error: bool,
    do_write_error: bool,
}

pub struct SerialIOPlane(Rc<RefCell<SerialInterface>>);

impl SerialIOPlane {
    pub fn new(serial_if: &Rc<RefCell<SerialInterface>>) -> SerialIOPlane {
        SerialIOPlane(serial_if.clone())
    }
}

impl SerialInterface {
    pub fn new(rx: &[u8]) -> Rc<RefCell<SerialInterface>> {
        Rc::new(RefCell::new(SerialInterface {
            rx: rx.to_vec(),
            tx: Vec::new(),
            rx_pos: 0,
            writes: 0,
            do_read_error: false,
            do_write_error: false,
        }))
    }

    pub fn trigger_write_error(&mut self) {
        self.do_write_error = true;
    }

    pub fn trigger_read_error(&mut self) {
        self.do_read_error = true;
    }

    /// Queue more reply bytes.
    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend_from_slice(data);
    }

    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    pub fn take_tx(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    /// Number of write calls that reached the port.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn unread(&self) -> &[u8] {
        &self.rx[self.rx_pos..]
    }
}

impl std::io::Read for SerialIOPlane {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        if inner.do_read_error {
            inner.do_read_error = false;
            Err(Error::new(ErrorKind::PermissionDenied, "IO read error"))
        } else {
            let old_pos = inner.rx_pos;
            inner.rx_pos = min(old_pos + buf.len(), inner.rx.len());
            let len = inner.rx_pos - old_pos;
            buf[..len].copy_from_slice(&inner.rx[old_pos..inner.rx_pos]);
            Ok(len)
        }
    }
}

impl std::io::Write for SerialIOPlane {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        if inner.do_write_error {
            inner.do_write_error = false;
            Err(Error::new(ErrorKind::PermissionDenied, "IO write error"))
        } else {
            inner.writes += 1;
            inner.tx.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub type MockMount = IeqPro<StreamTransport<SerialIOPlane>>;

/// A driver talking to a scripted serial port that will answer with `rx`.
pub fn mock_mount(rx: &[u8]) -> (Rc<RefCell<SerialInterface>>, MockMount) {
    let serial = SerialInterface::new(rx);
    let config = Config::default()
        .timeout(Duration::from_millis(50))
        .probe_backoff(Duration::ZERO)
        .debug(true);
    let mount = IeqPro::new(StreamTransport::new(SerialIOPlane::new(&serial)), config);
    (serial, mount)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
