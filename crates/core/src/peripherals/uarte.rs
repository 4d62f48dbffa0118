// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::signals::InterruptLine;
use crate::transport::Transport;
use crate::SimResult;
use bitflags::bitflags;
use std::any::Any;

/// Size of the addressable register block. The alternate 0x400-byte
/// stub revision of this peripheral is not modeled; DESIGN.md records
/// the choice.
pub const REG_WINDOW_SIZE: u64 = 0x58C;

// Register offsets, relative to the device base address.
// Task registers: write-only triggers, read as zero.
pub const TASKS_STARTRX: u64 = 0x000; // Start UART receiver
pub const TASKS_STOPRX: u64 = 0x004; // Stop UART receiver
pub const TASKS_STARTTX: u64 = 0x008; // Start UART transmitter
pub const TASKS_STOPTX: u64 = 0x00C; // Stop UART transmitter
pub const TASKS_FLUSHRX: u64 = 0x02C; // Flush RX FIFO into RX buffer

// Event registers: set by hardware, acknowledged by guest write.
pub const EVENTS_CTS: u64 = 0x100; // CTS is activated
pub const EVENTS_NCTS: u64 = 0x104; // CTS is deactivated
pub const EVENTS_RXDRDY: u64 = 0x108; // Data received in RXD
pub const EVENTS_ENDRX: u64 = 0x110; // Receive buffer is filled up
pub const EVENTS_TXDRDY: u64 = 0x11C; // Data sent from TXD
pub const EVENTS_ENDTX: u64 = 0x120; // Last TX byte transmitted
pub const EVENTS_ERROR: u64 = 0x124; // Error detected
pub const EVENTS_RXTO: u64 = 0x144; // Receiver timeout
pub const EVENTS_RXSTARTED: u64 = 0x14C; // Receiver has started
pub const EVENTS_TXSTARTED: u64 = 0x150; // Transmitter has started
pub const EVENTS_TXSTOPPED: u64 = 0x158; // Transmitter stopped

pub const SHORTS: u64 = 0x200; // Event->task shortcuts (storage only)
pub const INTEN: u64 = 0x300; // Enable or disable interrupt
pub const INTENSET: u64 = 0x304; // Enable interrupt
pub const INTENCLR: u64 = 0x308; // Disable interrupt
pub const ERRORSRC: u64 = 0x480; // Error source, write one to clear
pub const ENABLE: u64 = 0x500; // Enable UART
pub const PSEL_RTS: u64 = 0x508; // Pin select for RTS signal
pub const PSEL_TXD: u64 = 0x50C; // Pin select for TXD signal
pub const PSEL_CTS: u64 = 0x510; // Pin select for CTS signal
pub const PSEL_RXD: u64 = 0x514; // Pin select for RXD signal
pub const RXD: u64 = 0x518; // RXD register
pub const TXD: u64 = 0x51C; // TXD register
pub const BAUDRATE: u64 = 0x524; // Baud rate
pub const RXD_PTR: u64 = 0x534; // RX data pointer
pub const RXD_MAXCNT: u64 = 0x538; // Max bytes in receive buffer
pub const RXD_AMOUNT: u64 = 0x53C; // Bytes in last RX transaction
pub const TXD_PTR: u64 = 0x544; // TX data pointer
pub const TXD_MAXCNT: u64 = 0x548; // Max bytes in transmit buffer
pub const TXD_AMOUNT: u64 = 0x54C; // Bytes in last TX transaction
pub const CONFIG: u64 = 0x56C; // Parity and flow control

/// Pin-select reset value: pin disconnected.
pub const PSEL_DISCONNECTED: u32 = 0xFFFF_FFFF;

bitflags! {
    /// Event flags in their hardware INTEN bit positions, so the same
    /// set doubles as the interrupt-enable mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventFlags: u32 {
        const CTS = 1 << 0;
        const NCTS = 1 << 1;
        const RXDRDY = 1 << 2;
        const ENDRX = 1 << 4;
        const TXDRDY = 1 << 7;
        const ENDTX = 1 << 8;
        const ERROR = 1 << 9;
        const RXTO = 1 << 17;
        const RXSTARTED = 1 << 19;
        const TXSTARTED = 1 << 20;
        const TXSTOPPED = 1 << 22;
    }
}

fn event_flag(reg: u64) -> Option<EventFlags> {
    Some(match reg {
        EVENTS_CTS => EventFlags::CTS,
        EVENTS_NCTS => EventFlags::NCTS,
        EVENTS_RXDRDY => EventFlags::RXDRDY,
        EVENTS_ENDRX => EventFlags::ENDRX,
        EVENTS_TXDRDY => EventFlags::TXDRDY,
        EVENTS_ENDTX => EventFlags::ENDTX,
        EVENTS_ERROR => EventFlags::ERROR,
        EVENTS_RXTO => EventFlags::RXTO,
        EVENTS_RXSTARTED => EventFlags::RXSTARTED,
        EVENTS_TXSTARTED => EventFlags::TXSTARTED,
        EVENTS_TXSTOPPED => EventFlags::TXSTOPPED,
        _ => return None,
    })
}

/// Register classes of the UARTE block. Every offset inside the window
/// falls into exactly one class, and each class carries a default
/// handler, so wiring up a new register can never break the
/// "unknown offset is inert" guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterClass {
    Task(u64),
    Event(EventFlags),
    IntMask(u64),
    Config(u64),
    Unknown,
}

fn classify(reg: u64) -> RegisterClass {
    if let Some(flag) = event_flag(reg) {
        return RegisterClass::Event(flag);
    }
    match reg {
        TASKS_STARTRX | TASKS_STOPRX | TASKS_STARTTX | TASKS_STOPTX | TASKS_FLUSHRX => {
            RegisterClass::Task(reg)
        }
        INTEN | INTENSET | INTENCLR => RegisterClass::IntMask(reg),
        SHORTS | ERRORSRC | ENABLE | PSEL_RTS | PSEL_TXD | PSEL_CTS | PSEL_RXD | RXD | TXD
        | BAUDRATE | RXD_PTR | RXD_MAXCNT | RXD_AMOUNT | TXD_PTR | TXD_MAXCNT | TXD_AMOUNT
        | CONFIG => RegisterClass::Config(reg),
        _ => RegisterClass::Unknown,
    }
}

fn patch_lane(cur: u32, lane: u32, value: u8) -> u32 {
    let mask = 0xFFu32 << (lane * 8);
    (cur & !mask) | ((value as u32) << (lane * 8))
}

/// UARTE serial peripheral: event/task register file bound to one host
/// transport and one interrupt line for the device's lifetime.
#[derive(Debug)]
pub struct Uarte {
    events: EventFlags,
    inten: EventFlags,
    rx_active: bool,
    tx_active: bool,
    shorts: u32,
    errorsrc: u32,
    enable: u32,
    psel_rts: u32,
    psel_txd: u32,
    psel_cts: u32,
    psel_rxd: u32,
    /// Single-byte RX holding register. Only ever read today; the
    /// receive path stub below is the one place that would fill it.
    rx_data: u8,
    baudrate: u32,
    rxd_ptr: u32,
    rxd_maxcnt: u32,
    rxd_amount: u32,
    txd_ptr: u32,
    txd_maxcnt: u32,
    txd_amount: u32,
    config: u32,
    transport: Box<dyn Transport>,
    irq: InterruptLine,
}

impl Uarte {
    pub fn new(transport: Box<dyn Transport>, irq: InterruptLine) -> Self {
        Self {
            events: EventFlags::empty(),
            inten: EventFlags::empty(),
            rx_active: false,
            tx_active: false,
            shorts: 0,
            errorsrc: 0,
            enable: 0,
            psel_rts: PSEL_DISCONNECTED,
            psel_txd: PSEL_DISCONNECTED,
            psel_cts: PSEL_DISCONNECTED,
            psel_rxd: PSEL_DISCONNECTED,
            rx_data: 0,
            baudrate: 0,
            rxd_ptr: 0,
            rxd_maxcnt: 0,
            rxd_amount: 0,
            txd_ptr: 0,
            txd_maxcnt: 0,
            txd_amount: 0,
            config: 0,
            transport,
            irq,
        }
    }

    pub fn is_rx_active(&self) -> bool {
        self.rx_active
    }

    pub fn is_tx_active(&self) -> bool {
        self.tx_active
    }

    /// Backpressure predicate for the host transport pump: a new
    /// inbound byte fits only while the receive-not-empty flag is
    /// clear. Pure function of the event state, no side effects.
    pub fn can_receive(&self) -> bool {
        !self.events.contains(EventFlags::RXDRDY)
    }

    /// Inbound-byte handler invoked by the host transport pump.
    ///
    /// Incomplete on purpose: bytes are dropped. The full path stores
    /// the byte into `rx_data`, raises RXDRDY and with it the
    /// interrupt line via `set_event`.
    pub fn receive(&mut self, bytes: &[u8]) {
        tracing::trace!("Dropping {} inbound byte(s): receive path not modeled", bytes.len());
    }

    /// The line follows `events & inten` after every event or mask
    /// mutation.
    fn update_irq(&self) {
        self.irq.set(self.events.intersects(self.inten));
    }

    fn set_event(&mut self, flag: EventFlags, raised: bool) {
        self.events.set(flag, raised);
        self.update_irq();
    }

    fn trigger_task(&mut self, reg: u64) {
        match reg {
            TASKS_STARTRX => self.rx_active = true,
            TASKS_STOPRX => self.rx_active = false,
            TASKS_STARTTX => self.tx_active = true,
            TASKS_STOPTX => self.tx_active = false,
            // FLUSHRX would drain an RX FIFO into the DMA buffer; no
            // FIFO is modeled, so the trigger is accepted and dropped.
            TASKS_FLUSHRX => {}
            _ => {}
        }
    }

    fn transmit(&mut self, byte: u8) {
        if let Err(err) = self.transport.write_all(&[byte]) {
            // Transmit failure is not reflected in register state;
            // tracked as an open gap in DESIGN.md.
            tracing::warn!("UARTE transmit failed: {}", err);
            return;
        }
        tracing::trace!("Wrote in TXD: {:#04x}", byte);
        self.set_event(EventFlags::TXDRDY, true);
    }

    fn read_reg(&self, reg: u64) -> u32 {
        match classify(reg) {
            RegisterClass::Task(_) => 0,
            RegisterClass::Event(flag) => self.events.contains(flag) as u32,
            // INTENSET/INTENCLR read back as the plain mask.
            RegisterClass::IntMask(_) => self.inten.bits(),
            RegisterClass::Config(r) => match r {
                SHORTS => self.shorts,
                ERRORSRC => self.errorsrc,
                ENABLE => self.enable,
                PSEL_RTS => self.psel_rts,
                PSEL_TXD => self.psel_txd,
                PSEL_CTS => self.psel_cts,
                PSEL_RXD => self.psel_rxd,
                RXD => self.rx_data as u32,
                BAUDRATE => self.baudrate,
                RXD_PTR => self.rxd_ptr,
                RXD_MAXCNT => self.rxd_maxcnt,
                RXD_AMOUNT => self.rxd_amount,
                TXD_PTR => self.txd_ptr,
                TXD_MAXCNT => self.txd_maxcnt,
                TXD_AMOUNT => self.txd_amount,
                _ => 0, // TXD and anything unwired read as zero
            },
            RegisterClass::Unknown => 0,
        }
    }

    /// Apply one byte-lane write. Side-effecting registers act on the
    /// written lane directly instead of a read-modify-write of the
    /// whole word, so a 32-bit store decomposed into four lanes
    /// triggers each action exactly once.
    fn write_lane(&mut self, reg: u64, lane: u32, value: u8) {
        let lane_bits = (value as u32) << (lane * 8);
        match classify(reg) {
            RegisterClass::Task(r) => {
                if lane == 0 {
                    self.trigger_task(r);
                }
            }
            RegisterClass::Event(flag) => {
                // The flag becomes the LSB of the written value; the
                // guest acknowledges by writing zero.
                if lane == 0 {
                    self.set_event(flag, value & 1 != 0);
                }
            }
            RegisterClass::IntMask(r) => {
                match r {
                    INTEN => {
                        self.inten =
                            EventFlags::from_bits_truncate(patch_lane(self.inten.bits(), lane, value));
                    }
                    INTENSET => self.inten |= EventFlags::from_bits_truncate(lane_bits),
                    INTENCLR => self.inten &= !EventFlags::from_bits_truncate(lane_bits),
                    _ => {}
                }
                self.update_irq();
            }
            RegisterClass::Config(r) => self.write_config(r, lane, value),
            RegisterClass::Unknown => {}
        }
    }

    fn write_config(&mut self, reg: u64, lane: u32, value: u8) {
        match reg {
            TXD => {
                if lane == 0 {
                    self.transmit(value);
                }
            }
            RXD => {} // holding register, read-only
            ERRORSRC => self.errorsrc &= !((value as u32) << (lane * 8)),
            SHORTS => self.shorts = patch_lane(self.shorts, lane, value),
            ENABLE => self.enable = patch_lane(self.enable, lane, value),
            PSEL_RTS => self.psel_rts = patch_lane(self.psel_rts, lane, value),
            PSEL_TXD => self.psel_txd = patch_lane(self.psel_txd, lane, value),
            PSEL_CTS => self.psel_cts = patch_lane(self.psel_cts, lane, value),
            PSEL_RXD => self.psel_rxd = patch_lane(self.psel_rxd, lane, value),
            BAUDRATE => self.baudrate = patch_lane(self.baudrate, lane, value),
            RXD_PTR => self.rxd_ptr = patch_lane(self.rxd_ptr, lane, value),
            RXD_MAXCNT => self.rxd_maxcnt = patch_lane(self.rxd_maxcnt, lane, value),
            RXD_AMOUNT => self.rxd_amount = patch_lane(self.rxd_amount, lane, value),
            TXD_PTR => self.txd_ptr = patch_lane(self.txd_ptr, lane, value),
            TXD_MAXCNT => self.txd_maxcnt = patch_lane(self.txd_maxcnt, lane, value),
            TXD_AMOUNT => self.txd_amount = patch_lane(self.txd_amount, lane, value),
            CONFIG => self.config = patch_lane(self.config, lane, value),
            _ => {}
        }
    }
}

impl crate::Peripheral for Uarte {
    fn read(&self, offset: u64) -> SimResult<u8> {
        let reg = offset & !3;
        let lane = (offset % 4) as u32;
        Ok(((self.read_reg(reg) >> (lane * 8)) & 0xFF) as u8)
    }

    fn write(&mut self, offset: u64, value: u8) -> SimResult<()> {
        let reg = offset & !3;
        let lane = (offset % 4) as u32;
        self.write_lane(reg, lane, value);
        Ok(())
    }

    fn reset(&mut self) {
        self.events = EventFlags::empty();
        self.inten = EventFlags::empty();
        self.rx_active = false;
        self.tx_active = false;
        self.shorts = 0;
        self.errorsrc = 0;
        self.enable = 0;
        self.psel_rts = PSEL_DISCONNECTED;
        self.psel_txd = PSEL_DISCONNECTED;
        self.psel_cts = PSEL_DISCONNECTED;
        self.psel_rxd = PSEL_DISCONNECTED;
        self.rx_data = 0;
        self.baudrate = 0;
        self.rxd_ptr = 0;
        self.rxd_maxcnt = 0;
        self.rxd_amount = 0;
        self.txd_ptr = 0;
        self.txd_maxcnt = 0;
        self.txd_amount = 0;
        self.config = 0;
        self.irq.deassert();
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "events": self.events.bits(),
            "inten": self.inten.bits(),
            "rx_active": self.rx_active,
            "tx_active": self.tx_active,
            "shorts": self.shorts,
            "errorsrc": self.errorsrc,
            "enable": self.enable,
            "psel": [self.psel_rts, self.psel_txd, self.psel_cts, self.psel_rxd],
            "rx_data": self.rx_data,
            "baudrate": self.baudrate,
            "config": self.config,
        })
    }
}
