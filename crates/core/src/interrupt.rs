// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::signals::InterruptLine;

/// Fixed-size vector of interrupt lines feeding the CPU's interrupt
/// controller.
///
/// Each peripheral owns exactly one line index, assigned at
/// composition time. Line count is a property of the SoC variant.
#[derive(Debug, Default)]
pub struct InterruptFabric {
    lines: Vec<InterruptLine>,
}

impl InterruptFabric {
    pub fn new(num_lines: u32) -> Self {
        Self {
            lines: (0..num_lines).map(|_| InterruptLine::new()).collect(),
        }
    }

    pub fn num_lines(&self) -> u32 {
        self.lines.len() as u32
    }

    /// Hand out the shared handle for line `n`. The caller becomes the
    /// sole driver of that line.
    pub fn line(&self, n: u32) -> anyhow::Result<InterruptLine> {
        self.lines.get(n as usize).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "interrupt line {} out of range (fabric has {})",
                n,
                self.lines.len()
            )
        })
    }

    /// Indices of all currently asserted lines, in line order.
    pub fn asserted(&self) -> Vec<u32> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.is_asserted())
            .map(|(n, _)| n as u32)
            .collect()
    }

    pub fn deassert_all(&self) {
        for line in &self.lines {
            line.deassert();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_handles_share_state() {
        let fabric = InterruptFabric::new(64);
        let line18 = fabric.line(18).unwrap();

        assert!(fabric.asserted().is_empty());
        line18.assert();
        assert_eq!(fabric.asserted(), vec![18]);

        fabric.deassert_all();
        assert!(!line18.is_asserted());
        assert!(fabric.asserted().is_empty());
    }

    #[test]
    fn test_line_out_of_range() {
        let fabric = InterruptFabric::new(64);
        assert!(fabric.line(63).is_ok());
        assert!(fabric.line(64).is_err());
    }

    #[test]
    fn test_asserted_is_ordered() {
        let fabric = InterruptFabric::new(64);
        fabric.line(56).unwrap().assert();
        fabric.line(18).unwrap().assert();
        assert_eq!(fabric.asserted(), vec![18, 56]);
    }
}
