// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Emulate the gameboy's internal RAM.

use super::Memory;
use super::consts::*;
use super::memory_range::*;

use crate::GameboyError;
use crate::config::Config;

/// Work-ram related constants.
#[allow(missing_docs)]
pub mod consts {
	/// 4KB per work-ram bank.
	pub const WRAM_BANK_SIZE: usize = 0x1000;
	/// The color gameboy has eight banks; the original has two.
	pub const WRAM_NUM_BANKS: usize = 8;

	/// The CGB work-ram bank-select register.
	pub const IO_SVBK: u16 = 0xFF70;
}

use consts::*;

/// Gameboy's internal memory: the work ram banks and the high ram.
///
/// Bank 0 is fixed at 0xC000-0xCFFF; the bank at 0xD000-0xDFFF is
/// selectable through SVBK on CGB hardware (a selector of 0 acts as 1).
pub struct InternalRam {
	data: [u8; WRAM_BANK_SIZE * WRAM_NUM_BANKS],
	high_data: [u8; range_size!(MMAP_RAM_HIGH)],
	svbk: u8,
	banked: bool,
}

impl InternalRam {
	/// Initialize the internal ram.
	pub fn new(config: &Config) -> Self {
		InternalRam {
			data: [0_u8; WRAM_BANK_SIZE * WRAM_NUM_BANKS],
			high_data: [0_u8; range_size!(MMAP_RAM_HIGH)],
			svbk: 0,
			banked: config.is_cgb_hardware(),
		}
	}

	/// The currently selected switchable bank.
	fn bank(&self) -> usize {
		if !self.banked {
			return 1;
		}

		match (self.svbk & 0x07) as usize {
			0 => 1,
			bank => bank,
		}
	}

	/// Returns the mapped offset within the ram for the given address.
	///
	/// The ram has two memory ranges mapped to it (MMAP_RAM_INTERNAL and
	/// MMAP_RAM_ECHO). This function resolves the current range and returns
	/// the physical offset within the bank array.
	fn offset(&self, address: u16) -> usize {
		let relative = match address {
			memory_range!(MMAP_RAM_INTERNAL) => {
				address as usize - range_start!(MMAP_RAM_INTERNAL)
			}
			memory_range!(MMAP_RAM_ECHO) => {
				address as usize - range_start!(MMAP_RAM_ECHO)
			}
			_ => {
				// The bus only routes the ranges above here.
				unreachable!();
			}
		};

		if relative < WRAM_BANK_SIZE {
			relative
		} else {
			self.bank() * WRAM_BANK_SIZE + (relative - WRAM_BANK_SIZE)
		}
	}

	/// Returns the mapped offset within the high ram for the given address.
	fn hram_offset(&self, address: u16) -> usize {
		(address as usize) - range_start!(MMAP_RAM_HIGH)
	}
}

impl Memory for InternalRam {
	/// Write to the internal ram.
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		match address {
			memory_range!(MMAP_RAM_INTERNAL) |
			memory_range!(MMAP_RAM_ECHO) => {
				let offset = self.offset(address);
				self.data[offset] = value;
				Ok(())
			}
			memory_range!(MMAP_RAM_HIGH) => {
				let offset = self.hram_offset(address);
				self.high_data[offset] = value;
				Ok(())
			}
			IO_SVBK => {
				self.svbk = value & 0x07;
				Ok(())
			}
			_ => {
				Err(GameboyError::Io("ram_write: Attempt to write out of bounds."))
			}
		}
	}

	/// Read from the internal ram.
	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		match address {
			memory_range!(MMAP_RAM_INTERNAL) |
			memory_range!(MMAP_RAM_ECHO) => {
				Ok(self.data[self.offset(address)])
			}
			memory_range!(MMAP_RAM_HIGH) => {
				Ok(self.high_data[self.hram_offset(address)])
			}
			IO_SVBK => {
				if self.banked {
					Ok(self.svbk | 0xF8)
				} else {
					Ok(0xFF)
				}
			}
			_ => {
				Err(GameboyError::Io("ram_read: Attempt to read out of bounds."))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::HardwareModel;

	#[test]
	fn test_echo_mapping() {
		let config = Config::default();
		let mut ram = InternalRam::new(&config);

		ram.write(0xC123, 0x42).unwrap();
		assert_eq!(0x42, ram.read(0xE123).unwrap());

		ram.write(0xFDFF, 0x24).unwrap();
		assert_eq!(0x24, ram.read(0xDDFF).unwrap());
	}

	#[test]
	fn test_cgb_banking() {
		let config = Config { model: HardwareModel::GBC, ..Config::default() };
		let mut ram = InternalRam::new(&config);

		ram.write(IO_SVBK, 0x02).unwrap();
		ram.write(0xD000, 0x22).unwrap();
		ram.write(IO_SVBK, 0x03).unwrap();
		ram.write(0xD000, 0x33).unwrap();

		ram.write(IO_SVBK, 0x02).unwrap();
		assert_eq!(0x22, ram.read(0xD000).unwrap());

		// Bank 0 at 0xD000 is treated as bank 1.
		ram.write(IO_SVBK, 0x01).unwrap();
		ram.write(0xD000, 0x11).unwrap();
		ram.write(IO_SVBK, 0x00).unwrap();
		assert_eq!(0x11, ram.read(0xD000).unwrap());

		// The fixed bank is unaffected.
		ram.write(0xC000, 0x55).unwrap();
		assert_eq!(0x55, ram.read(0xC000).unwrap());
	}

	#[test]
	fn test_dmg_ignores_banking() {
		let config = Config::default();
		let mut ram = InternalRam::new(&config);

		ram.write(0xD000, 0x77).unwrap();
		ram.write(IO_SVBK, 0x04).unwrap();
		assert_eq!(0x77, ram.read(0xD000).unwrap());
		assert_eq!(0xFF, ram.read(IO_SVBK).unwrap());
	}
}
