// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Host-side byte sink a UARTE instance transmits into.
///
/// `write_all` blocks until the transport has accepted the bytes or
/// reports failure; it is the only suspension point in the register
/// model. The inbound direction has no trait of its own: the device's
/// `can_receive`/`receive` methods are the two callbacks a host
/// transport pump invokes when data arrives.
pub trait Transport: std::fmt::Debug + Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Pass-through to the process stdout, flushed per write.
#[derive(Debug, Default)]
pub struct StdoutTransport;

impl StdoutTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for StdoutTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = io::stdout();
        out.write_all(bytes)?;
        out.flush()
    }
}

/// TX capture sink shared between the device and the host. Used by CI
/// runners and tests to assert on serial output.
#[derive(Debug, Clone, Default)]
pub struct SharedBufferTransport {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedBufferTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> Arc<Mutex<Vec<u8>>> {
        self.buffer.clone()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl Transport for SharedBufferTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self
            .buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture buffer poisoned"))?;
        guard.extend_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_buffer_accumulates() {
        let mut transport = SharedBufferTransport::new();
        let observer = transport.clone();

        transport.write_all(b"Hel").unwrap();
        transport.write_all(b"lo").unwrap();

        assert_eq!(observer.contents(), b"Hello");
    }
}
