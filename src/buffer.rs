/// Receive buffer for a byte stream that is parsed one command frame at a time.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    read_pos: usize,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer {
            data: Vec::with_capacity(64),
            read_pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.read_pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop `len` bytes from the front of the unread data.
    /// Consuming more than is available empties the buffer.
    pub fn consume(&mut self, len: usize) {
        self.read_pos = self.data.len().min(self.read_pos + len);
        if self.read_pos == self.data.len() {
            self.clear();
        }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        if self.read_pos == self.data.len() {
            self.clear();
        }
        let write_pos = self.data.len();
        self.data.extend_from_slice(bytes);
        for byte in self.data[write_pos..].iter_mut() {
            if *byte > 0x7f {
                *byte = 0; // map all non-ASCII bytes to NUL
            }
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.read_pos = 0;
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.data[self.read_pos..]
    }
}
