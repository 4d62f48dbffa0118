// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::LinearMemory;
use crate::{Peripheral, SimResult, SimulationError};

pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub irq: Option<u32>,
    pub dev: Box<dyn Peripheral>,
}

/// Global address space: the read-only code region, the SRAM region
/// and the peripheral windows, decoded in that order.
pub struct SystemBus {
    pub code: LinearMemory,
    pub ram: LinearMemory,
    pub peripherals: Vec<PeripheralEntry>,
}

impl SystemBus {
    pub fn new(code: LinearMemory, ram: LinearMemory) -> Self {
        Self {
            code,
            ram,
            peripherals: Vec::new(),
        }
    }

    pub fn read_u16(&self, addr: u64) -> SimResult<u16> {
        <Self as crate::Bus>::read_u16(self, addr)
    }

    pub fn read_u32(&self, addr: u64) -> SimResult<u32> {
        <Self as crate::Bus>::read_u32(self, addr)
    }

    pub fn write_u16(&mut self, addr: u64, value: u16) -> SimResult<()> {
        <Self as crate::Bus>::write_u16(self, addr, value)
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        <Self as crate::Bus>::write_u32(self, addr, value)
    }
}

impl crate::Bus for SystemBus {
    fn read_u8(&self, addr: u64) -> SimResult<u8> {
        if let Some(val) = self.ram.read_u8(addr) {
            return Ok(val);
        }
        if let Some(val) = self.code.read_u8(addr) {
            return Ok(val);
        }

        for p in &self.peripherals {
            if addr >= p.base && addr < p.base + p.size {
                return p.dev.read(addr - p.base);
            }
        }

        Err(SimulationError::MemoryViolation(addr))
    }

    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()> {
        if self.ram.write_u8(addr, value) {
            return Ok(());
        }
        if self.code.contains(addr) {
            // The code region is flash-backed; plain guest stores are
            // accepted and dropped rather than faulted. Population
            // happens only through the boot-image load path.
            tracing::warn!("Ignoring store {:#04x} to read-only code region at {:#x}", value, addr);
            return Ok(());
        }

        for p in &mut self.peripherals {
            if addr >= p.base && addr < p.base + p.size {
                return p.dev.write(addr - p.base, value);
            }
        }

        Err(SimulationError::MemoryViolation(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Segment;
    use crate::Bus;
    use crate::peripherals::uarte::{self, Uarte};
    use crate::signals::InterruptLine;
    use crate::transport::SharedBufferTransport;

    fn bus_with_two_uartes() -> (
        SystemBus,
        [SharedBufferTransport; 2],
        [InterruptLine; 2],
    ) {
        let mut bus = SystemBus::new(
            LinearMemory::new(4 * 1024, 0x0),
            LinearMemory::new(4 * 1024, 0x2000_0000),
        );
        let transports = [SharedBufferTransport::new(), SharedBufferTransport::new()];
        let lines = [InterruptLine::new(), InterruptLine::new()];

        for (i, (base, irq)) in [(0x4000_2000u64, 18u32), (0x4002_8000, 56)].into_iter().enumerate()
        {
            bus.peripherals.push(PeripheralEntry {
                name: format!("uarte{}", i),
                base,
                size: uarte::REG_WINDOW_SIZE,
                irq: Some(irq),
                dev: Box::new(Uarte::new(
                    Box::new(transports[i].clone()),
                    lines[i].clone(),
                )),
            });
        }

        (bus, transports, lines)
    }

    #[test]
    fn test_instances_are_independent() {
        let (mut bus, transports, lines) = bus_with_two_uartes();

        bus.write_u32(0x4000_2000 + uarte::INTENSET, 1 << 7).unwrap();
        bus.write_u32(0x4000_2000 + uarte::TXD, b'A' as u32).unwrap();

        // First instance transmitted and raised its line.
        assert_eq!(transports[0].contents(), vec![b'A']);
        assert_eq!(bus.read_u32(0x4000_2000 + uarte::EVENTS_TXDRDY).unwrap(), 1);
        assert!(lines[0].is_asserted());

        // Second instance saw none of it.
        assert!(transports[1].contents().is_empty());
        assert_eq!(bus.read_u32(0x4002_8000 + uarte::EVENTS_TXDRDY).unwrap(), 0);
        assert_eq!(bus.read_u32(0x4002_8000 + uarte::INTEN).unwrap(), 0);
        assert!(!lines[1].is_asserted());
    }

    #[test]
    fn test_out_of_window_access_is_a_violation() {
        let (mut bus, _transports, _lines) = bus_with_two_uartes();

        // Last mapped byte of the window decodes into the device.
        assert!(bus.read_u8(0x4000_2000 + uarte::REG_WINDOW_SIZE - 1).is_ok());

        // One past the window hits nothing.
        let err = bus.read_u8(0x4000_2000 + uarte::REG_WINDOW_SIZE).unwrap_err();
        assert!(matches!(err, SimulationError::MemoryViolation(_)));
        assert!(bus.write_u8(0x4000_2000 + uarte::REG_WINDOW_SIZE, 0xFF).is_err());
    }

    #[test]
    fn test_code_region_is_read_only_through_bus() {
        let (mut bus, _transports, _lines) = bus_with_two_uartes();

        bus.code.load_from_segment(&Segment {
            start_addr: 0x0,
            data: vec![0xDE, 0xAD],
        });

        // Guest store is accepted but has no effect.
        bus.write_u8(0x0, 0x00).unwrap();
        assert_eq!(bus.read_u8(0x0).unwrap(), 0xDE);
        assert_eq!(bus.read_u8(0x1).unwrap(), 0xAD);
    }

    #[test]
    fn test_ram_round_trip() {
        let (mut bus, _transports, _lines) = bus_with_two_uartes();

        bus.write_u32(0x2000_0000, 0x1234_5678).unwrap();
        assert_eq!(bus.read_u32(0x2000_0000).unwrap(), 0x1234_5678);
        assert_eq!(bus.read_u16(0x2000_0002).unwrap(), 0x1234);
    }
}
