// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single numbered interrupt input on the fabric.
///
/// Clones share the same underlying line level: the owning device
/// drives it, the fabric and tests observe it.
#[derive(Debug, Clone, Default)]
pub struct InterruptLine {
    asserted: Arc<AtomicBool>,
}

impl InterruptLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assert(&self) {
        self.asserted.store(true, Ordering::SeqCst);
    }

    pub fn deassert(&self) {
        self.asserted.store(false, Ordering::SeqCst);
    }

    pub fn set(&self, level: bool) {
        self.asserted.store(level, Ordering::SeqCst);
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted.load(Ordering::SeqCst)
    }
}

/// One-way reset notification from a device up to the emulation host.
///
/// Asserting it requests a full guest reset; it does not reset any
/// register state by itself. The host acknowledges the request and
/// then performs its own reset broadcast back down to the devices.
#[derive(Debug, Clone, Default)]
pub struct ResetRequestLine {
    requested: Arc<AtomicBool>,
}

impl ResetRequestLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn acknowledge(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_line_shared_level() {
        let line = InterruptLine::new();
        let observer = line.clone();

        assert!(!observer.is_asserted());
        line.assert();
        assert!(observer.is_asserted());
        line.deassert();
        assert!(!observer.is_asserted());

        line.set(true);
        assert!(observer.is_asserted());
    }

    #[test]
    fn test_reset_request_round_trip() {
        let line = ResetRequestLine::new();
        let host_side = line.clone();

        assert!(!host_side.is_requested());
        line.request();
        assert!(host_side.is_requested());
        host_side.acknowledge();
        assert!(!line.is_requested());
    }
}
