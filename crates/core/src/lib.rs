// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod interrupt;
pub mod memory;
pub mod peripherals;
pub mod signals;
pub mod system;
pub mod transport;

use std::any::Any;

use crate::memory::ProgramImage;
use crate::signals::ResetRequestLine;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Construction-time parameters handed to the CPU factory by the SoC
/// composer.
///
/// The clock scale is carried here instead of process-wide state so
/// that several machines can coexist in one process (tests in
/// particular) without interfering.
#[derive(Debug, Clone)]
pub struct CpuConfig {
    /// Number of external interrupt lines wired into the CPU's
    /// interrupt controller.
    pub num_irq: u32,
    /// Nanoseconds per CPU clock tick, derived from the SoC HFCLK.
    pub clock_scale_ns: u64,
    /// Line the CPU asserts on SYSRESETREQ. Asserting it only notifies
    /// the host; the host performs the actual reset broadcast.
    pub sys_reset: ResetRequestLine,
}

/// Trait representing the instruction-set CPU core.
///
/// The core itself lives outside this crate; the SoC only needs it to
/// drive bus accesses and accept pending exceptions.
pub trait Cpu: Send {
    fn reset(&mut self, bus: &mut dyn Bus) -> SimResult<()>;
    fn step(&mut self, bus: &mut dyn Bus) -> SimResult<()>;
    fn set_exception_pending(&mut self, exception_num: u32);
    fn set_pc(&mut self, val: u32);
    fn get_pc(&self) -> u32;
}

/// Trait representing a memory-mapped peripheral.
///
/// Accesses are byte-granular; the bus composes wider accesses from
/// little-endian byte lanes, so devices decode `offset & !3` plus the
/// lane index internally.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64) -> SimResult<u8>;
    fn write(&mut self, offset: u64, value: u8) -> SimResult<()>;

    /// Reinitialize register state to power-on defaults. Invoked by
    /// the system-wide reset broadcast.
    fn reset(&mut self) {}

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Trait representing the system bus
pub trait Bus {
    fn read_u8(&self, addr: u64) -> SimResult<u8>;
    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()>;

    fn read_u16(&self, addr: u64) -> SimResult<u16> {
        let b0 = self.read_u8(addr)? as u16;
        let b1 = self.read_u8(addr + 1)? as u16;
        // Little Endian
        Ok(b0 | (b1 << 8))
    }

    fn read_u32(&self, addr: u64) -> SimResult<u32> {
        let b0 = self.read_u8(addr)? as u32;
        let b1 = self.read_u8(addr + 1)? as u32;
        let b2 = self.read_u8(addr + 2)? as u32;
        let b3 = self.read_u8(addr + 3)? as u32;
        Ok(b0 | (b1 << 8) | (b2 << 16) | (b3 << 24))
    }

    fn write_u16(&mut self, addr: u64, value: u16) -> SimResult<()> {
        self.write_u8(addr, (value & 0xFF) as u8)?;
        self.write_u8(addr + 1, ((value >> 8) & 0xFF) as u8)?;
        Ok(())
    }

    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        self.write_u8(addr, (value & 0xFF) as u8)?;
        self.write_u8(addr + 1, ((value >> 8) & 0xFF) as u8)?;
        self.write_u8(addr + 2, ((value >> 16) & 0xFF) as u8)?;
        self.write_u8(addr + 3, ((value >> 24) & 0xFF) as u8)?;
        Ok(())
    }
}

/// One SoC instance: memory map, CPU, interrupt fabric and the
/// peripherals hanging off the bus.
pub struct Machine<C: Cpu> {
    pub cpu: C,
    pub bus: bus::SystemBus,
    pub fabric: interrupt::InterruptFabric,
    pub sys_reset: ResetRequestLine,
    pub total_steps: u64,
}

impl<C: Cpu> Machine<C> {
    pub fn new(
        cpu: C,
        bus: bus::SystemBus,
        fabric: interrupt::InterruptFabric,
        sys_reset: ResetRequestLine,
    ) -> Self {
        Self {
            cpu,
            bus,
            fabric,
            sys_reset,
            total_steps: 0,
        }
    }

    /// Place the boot image into the code/RAM regions and bring the
    /// machine to its power-on state.
    pub fn load_firmware(&mut self, image: &ProgramImage) -> SimResult<()> {
        for segment in &image.segments {
            if !self.bus.code.load_from_segment(segment) && !self.bus.ram.load_from_segment(segment)
            {
                tracing::warn!(
                    "Failed to load segment at {:#x} - outside of memory map",
                    segment.start_addr
                );
            }
        }

        self.reset()?;

        // Fallback if the vector table is missing/zero
        if self.cpu.get_pc() == 0 {
            self.cpu.set_pc(image.entry_point as u32);
        }

        Ok(())
    }

    /// System-wide reset broadcast: every peripheral back to power-on
    /// defaults, all fabric lines deasserted, CPU reset last. Memory
    /// regions are left in place.
    pub fn reset(&mut self) -> SimResult<()> {
        for p in &mut self.bus.peripherals {
            p.dev.reset();
        }
        self.fabric.deassert_all();
        self.cpu.reset(&mut self.bus)
    }

    /// Execute one instruction, then deliver asserted interrupt lines
    /// as pending exceptions (exception number = 16 + line).
    pub fn step(&mut self) -> SimResult<()> {
        self.total_steps += 1;
        let res = self.cpu.step(&mut self.bus);

        for line in self.fabric.asserted() {
            self.cpu.set_exception_pending(16 + line);
            tracing::debug!("Exception {} Pend", 16 + line);
        }

        res
    }

    /// True once a device (normally the CPU's SYSRESETREQ) has asked
    /// the host to restart the guest.
    pub fn reset_requested(&self) -> bool {
        self.sys_reset.is_requested()
    }

    pub fn peek_peripheral(&self, name: &str) -> Option<serde_json::Value> {
        self.bus
            .peripherals
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.dev.snapshot())
    }
}
