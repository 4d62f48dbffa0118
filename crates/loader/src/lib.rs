// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{anyhow, Context, Result};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use nrf52sim_core::memory::ProgramImage;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read and parse the guest kernel image. Invoked once at machine
/// start, before the first instruction fetch.
pub fn load_elf(path: &Path) -> Result<ProgramImage> {
    let buffer = fs::read(path).with_context(|| format!("Failed to read ELF file: {:?}", path))?;
    load_elf_bytes(&buffer)
}

pub fn load_elf_bytes(buffer: &[u8]) -> Result<ProgramImage> {
    let elf = Elf::parse(buffer).context("Failed to parse ELF binary")?;

    info!("ELF Entry Point: {:#x}", elf.entry);

    if elf.header.e_machine != goblin::elf::header::EM_ARM {
        warn!(
            "ELF machine type {} is not ARM; loading anyway",
            elf.header.e_machine
        );
    }

    let mut program_image = ProgramImage::new(elf.entry);

    for ph in elf.program_headers {
        if ph.p_type == PT_LOAD {
            // Physical address (LMA) is what flash programming wants
            let start_addr = ph.p_paddr;
            let size = ph.p_filesz as usize;
            let offset = ph.p_offset as usize;

            if size == 0 {
                continue;
            }

            debug!(
                "Found Loadable Segment: Addr={:#x}, Size={} bytes, Offset={:#x}",
                start_addr, size, offset
            );

            if offset + size > buffer.len() {
                return Err(anyhow!("Segment out of bounds in ELF file"));
            }

            let segment_data = buffer[offset..offset + size].to_vec();
            program_image.add_segment(start_addr, segment_data);
        }
    }

    if program_image.segments.is_empty() {
        warn!("No loadable segments found in ELF file");
    }

    Ok(program_image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_arm_elf(entry: u32, load_addr: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        // ELF32 header
        buf.extend_from_slice(&[0x7F, b'E', b'L', b'F', 1, 1, 1, 0]);
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
        buf.extend_from_slice(&40u16.to_le_bytes()); // EM_ARM
        buf.extend_from_slice(&1u32.to_le_bytes()); // EV_CURRENT
        buf.extend_from_slice(&entry.to_le_bytes());
        buf.extend_from_slice(&52u32.to_le_bytes()); // e_phoff
        buf.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
        buf.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        buf.extend_from_slice(&52u16.to_le_bytes()); // e_ehsize
        buf.extend_from_slice(&32u16.to_le_bytes()); // e_phentsize
        buf.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
        buf.extend_from_slice(&40u16.to_le_bytes()); // e_shentsize
        buf.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
        buf.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
        // One PT_LOAD program header
        buf.extend_from_slice(&1u32.to_le_bytes()); // PT_LOAD
        buf.extend_from_slice(&84u32.to_le_bytes()); // p_offset
        buf.extend_from_slice(&load_addr.to_le_bytes()); // p_vaddr
        buf.extend_from_slice(&load_addr.to_le_bytes()); // p_paddr
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes()); // p_filesz
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes()); // p_memsz
        buf.extend_from_slice(&5u32.to_le_bytes()); // p_flags R+X
        buf.extend_from_slice(&4u32.to_le_bytes()); // p_align
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_load_minimal_arm_elf() {
        let payload = [0x2A, 0x20, 0x00, 0xBF];
        let elf = minimal_arm_elf(0x0, 0x0, &payload);

        let image = load_elf_bytes(&elf).unwrap();

        assert_eq!(image.entry_point, 0x0);
        assert_eq!(image.segments.len(), 1);
        assert_eq!(image.segments[0].start_addr, 0x0);
        assert_eq!(image.segments[0].data, payload);
    }

    #[test]
    fn test_entry_point_is_preserved() {
        let elf = minimal_arm_elf(0x1C0, 0x100, b"vector");
        let image = load_elf_bytes(&elf).unwrap();
        assert_eq!(image.entry_point, 0x1C0);
        assert_eq!(image.segments[0].start_addr, 0x100);
    }

    #[test]
    fn test_truncated_segment_is_rejected() {
        let mut elf = minimal_arm_elf(0x0, 0x0, &[1, 2, 3, 4]);
        elf.truncate(86); // Cut into the segment payload
        assert!(load_elf_bytes(&elf).is_err());
    }

    #[test]
    fn test_garbage_is_not_an_elf() {
        assert!(load_elf_bytes(b"not an elf").is_err());
    }
}
