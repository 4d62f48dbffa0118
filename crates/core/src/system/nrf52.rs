// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{PeripheralEntry, SystemBus};
use crate::interrupt::InterruptFabric;
use crate::memory::LinearMemory;
use crate::peripherals::uarte::{Uarte, REG_WINDOW_SIZE};
use crate::signals::ResetRequestLine;
use crate::transport::Transport;
use crate::{Cpu, CpuConfig, Machine};

// Board memory layout:
//
//  -------- 0x6000_0000
//  Peripheral
//  -------- 0x4000_0000
//  SRAM
//  -------- 0x2000_0000
//  CODE
//  -------- 0x0
pub const NRF52_CODE_BASE: u64 = 0x0;
pub const NRF52_SRAM_BASE: u64 = 0x2000_0000;

// The CODE/SRAM architectural windows span 512 MiB each; the backing
// stores use the physical device's 1 MiB flash and 256 KiB RAM.
pub const NRF52_CODE_SIZE: usize = 1024 * 1024;
pub const NRF52_SRAM_SIZE: usize = 256 * 1024;

pub const NRF52_NUM_IRQ: u32 = 64;
pub const NRF52_HFCLK_HZ: u64 = 16_000_000;

const NANOSECONDS_PER_SECOND: u64 = 1_000_000_000;

pub const NRF52_UARTE_COUNT: usize = 2;

/// Fixed placement of the UARTE instances: (base address, IRQ line).
pub const NRF52_UARTE_MAP: [(u64, u32); NRF52_UARTE_COUNT] =
    [(0x4000_2000, 18), (0x4002_8000, 56)];

/// Nanoseconds per CPU clock tick on this SoC variant.
pub fn clock_scale_ns() -> u64 {
    NANOSECONDS_PER_SECOND / NRF52_HFCLK_HZ
}

/// Compose one nRF52840 machine: code and SRAM regions at their fixed
/// bases, a 64-line interrupt fabric, the CPU built from `make_cpu`
/// with the variant's configuration, and both UARTE instances wired to
/// their fixed lines and the supplied transports.
pub fn build_nrf52<C, F>(
    make_cpu: F,
    transports: [Box<dyn Transport>; NRF52_UARTE_COUNT],
) -> anyhow::Result<Machine<C>>
where
    C: Cpu,
    F: FnOnce(&CpuConfig) -> C,
{
    let mut bus = SystemBus::new(
        LinearMemory::new(NRF52_CODE_SIZE, NRF52_CODE_BASE),
        LinearMemory::new(NRF52_SRAM_SIZE, NRF52_SRAM_BASE),
    );

    let fabric = InterruptFabric::new(NRF52_NUM_IRQ);
    let sys_reset = ResetRequestLine::new();

    let cpu = make_cpu(&CpuConfig {
        num_irq: NRF52_NUM_IRQ,
        clock_scale_ns: clock_scale_ns(),
        sys_reset: sys_reset.clone(),
    });

    for (index, ((base, irq), transport)) in
        NRF52_UARTE_MAP.into_iter().zip(transports).enumerate()
    {
        let line = fabric.line(irq)?;
        tracing::debug!("Mapping uarte{} at {:#x}, IRQ {}", index, base, irq);
        bus.peripherals.push(PeripheralEntry {
            name: format!("uarte{}", index),
            base,
            size: REG_WINDOW_SIZE,
            irq: Some(irq),
            dev: Box::new(Uarte::new(transport, line)),
        });
    }

    Ok(Machine::new(cpu, bus, fabric, sys_reset))
}
