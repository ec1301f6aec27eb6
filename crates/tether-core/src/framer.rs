//! Length-prefix deframer for byte-stream transports.
//!
//! Each package travels as a 4-byte little-endian total length followed
//! by the package bytes. The framer accepts arbitrary chunkings, never
//! delivers a partial package and never conflates two packages. A body
//! declared larger than the configured maximum resets the framer and
//! reports a framing error; the next complete package starts cleanly.

use bytes::BytesMut;
use tracing::warn;

const HEADER_LEN: usize = 4;

pub struct Framer {
    max_body_size: u32,
    buf: BytesMut,
    /// Body length decoded from the header; 0 while the header itself is
    /// still being accumulated.
    body_size: u32,
    on_package: Option<Box<dyn FnMut(Vec<u8>)>>,
}

impl std::fmt::Debug for Framer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framer")
            .field("max_body_size", &self.max_body_size)
            .field("buffered", &self.buf.len())
            .field("body_size", &self.body_size)
            .finish_non_exhaustive()
    }
}

impl Framer {
    pub fn new(max_body_size: u32) -> Self {
        Self {
            max_body_size,
            buf: BytesMut::new(),
            body_size: 0,
            on_package: None,
        }
    }

    /// Install the whole-package sink.
    pub fn set_on_package(&mut self, on_package: impl FnMut(Vec<u8>) + 'static) {
        self.on_package = Some(Box::new(on_package));
    }

    /// Prefix `data` with its length. `None` when the body exceeds `max`.
    pub fn pack_with_limit(data: &[u8], max: u32) -> Option<Vec<u8>> {
        if data.len() > max as usize {
            warn!(size = data.len(), max, "package exceeds max body size");
            return None;
        }
        let mut out = Vec::with_capacity(HEADER_LEN + data.len());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        Some(out)
    }

    /// Prefix `data` with its length under this framer's limit.
    pub fn pack(&self, data: &[u8]) -> Option<Vec<u8>> {
        Self::pack_with_limit(data, self.max_body_size)
    }

    /// Feed a chunk of stream bytes, delivering every package completed by
    /// it. Returns `false` on a framing error (the framer has reset).
    pub fn feed(&mut self, mut data: &[u8]) -> bool {
        loop {
            if self.body_size == 0 && self.buf.len() < HEADER_LEN {
                let need = HEADER_LEN - self.buf.len();
                if data.len() < need {
                    self.buf.extend_from_slice(data);
                    return true;
                }
                self.buf.extend_from_slice(&data[..need]);
                data = &data[need..];

                let header: [u8; HEADER_LEN] = self.buf[..HEADER_LEN].try_into().expect("header buffered");
                let size = u32::from_le_bytes(header);
                self.buf.clear();
                if size > self.max_body_size {
                    warn!(size, max = self.max_body_size, "framing error: body too large");
                    self.reset();
                    return false;
                }
                self.body_size = size;
            }

            let need = self.body_size as usize - self.buf.len();
            if data.len() < need {
                self.buf.extend_from_slice(data);
                return true;
            }
            self.buf.extend_from_slice(&data[..need]);
            data = &data[need..];

            let package = self.buf.split().to_vec();
            self.body_size = 0;
            if let Some(on_package) = self.on_package.as_mut() {
                on_package(package);
            }

            if data.is_empty() {
                return true;
            }
        }
    }

    /// Drop any partial state. Call on connect/disconnect.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.body_size = 0;
    }
}
