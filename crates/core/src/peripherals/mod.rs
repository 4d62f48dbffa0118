// nrf52-sim - Instruction-accurate nRF52840 SoC emulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod uarte;
