// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulate the gameboy's memory mapping and bus access.

#[macro_use]
pub mod memory_range;
pub mod cartridge;
pub mod joypad;
pub mod serial;
pub mod timer;
pub mod rtc;
pub mod ram;
pub mod palette;
pub mod ppu;
pub mod apu;
pub mod io;

use log::debug;

use io::*;
use ram::*;
use ppu::*;
use apu::*;
use timer::*;
use serial::*;
use joypad::*;
use cartridge::*;
use memory_range::*;
use ram::consts::IO_SVBK;
use timer::consts::MMAP_IO_TIMER;
use apu::consts::MMAP_IO_SOUND;
use ppu::consts::{MMAP_IO_DISPLAY, MMAP_IO_PALETTES, IO_VBK, IO_OPRI};

use crate::GameboyError;
use crate::config::Config;
use crate::cpu::interrupts::*;

/// Bus locations-related constants.
#[allow(missing_docs)]
pub mod consts {
	use super::*;

	pub const MMAP_ROM_BANK0: MemoryRange = make_range!(0x0000, 0x3FFF);
	/// Switchable ROM bank.
	pub const MMAP_ROM_BANK_SW: MemoryRange = make_range!(0x4000, 0x7FFF);
	pub const MMAP_VIDEO_RAM: MemoryRange = make_range!(0x8000, 0x9FFF);
	/// External (cartridge) RAM, gated by the bank controller.
	pub const MMAP_EXTERNAL_RAM: MemoryRange = make_range!(0xA000, 0xBFFF);
	pub const MMAP_RAM_INTERNAL: MemoryRange = make_range!(0xC000, 0xDFFF);
	/// Maps to the same physical memory as the internal ram.
	pub const MMAP_RAM_ECHO: MemoryRange = make_range!(0xE000, 0xFDFF);
	/// Sprite/Object attribute memory.
	pub const MMAP_SPRITE_OAM: MemoryRange = make_range!(0xFE00, 0xFE9F);
	/// Reads float, writes drop.
	pub const MMAP_UNUSABLE: MemoryRange = make_range!(0xFEA0, 0xFEFF);
	pub const MMAP_IO_PORTS: MemoryRange = make_range!(0xFF00, 0xFF7F);
	/// High RAM.
	pub const MMAP_RAM_HIGH: MemoryRange = make_range!(0xFF80, 0xFFFE);

	/// OAM DMA source-page register.
	pub const IO_DMA: u16 = 0xFF46;
	/// Pending-interrupts register.
	pub const IO_IF: u16 = 0xFF0F;
	/// Interrupt-enable register.
	pub const IO_IE: u16 = 0xFFFF;
	/// CGB speed-switch register.
	pub const IO_KEY1: u16 = 0xFF4D;
	/// Boot-rom release latch.
	pub const IO_BOOT: u16 = 0xFF50;

	/// CGB vram dma registers.
	pub const IO_HDMA1: u16 = 0xFF51;
	pub const IO_HDMA2: u16 = 0xFF52;
	pub const IO_HDMA3: u16 = 0xFF53;
	pub const IO_HDMA4: u16 = 0xFF54;
	pub const IO_HDMA5: u16 = 0xFF55;
	pub const MMAP_IO_HDMA: MemoryRange = make_range!(0xFF51, 0xFF55);
}

use consts::*;

/// A peripheral that can be written and read by the cpu.
pub trait Memory {
	/// Write a 8-bit value to the peripheral.
	///
	/// * `address` - The absolute memory address to write into.
	/// * `value` - The value to write.
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError>;

	/// Read a 8-bit value from this peripheral.
	///
	/// * `address` - The absolute memory address to read from.
	fn read(&self, address: u16) -> Result<u8, GameboyError>;
}

/// A virtual representation of Gameboy (Color) memory bus.
///
/// This implementation provides memory/peripheral abstraction.
pub struct SystemBus<'a> {
	pub(crate) cartridge: &'a mut Cartridge<'a>,
	pub(crate) ppu: Ppu,
	pub(crate) apu: Apu,
	pub(crate) io: IoPorts,
	pub(crate) timer: Timer,
	pub(crate) serial: Serial,
	pub(crate) joypad: Joypad,
	pub(crate) ram: InternalRam,

	/// The IF register.
	pub interrupt_flag: InterruptMask,
	/// The IE register.
	pub interrupt_enable: InterruptMask,

	/// The boot rom overlay, mapped over the cartridge until released
	/// through 0xFF50.
	boot_rom: Option<&'a [u8]>,
	boot_rom_mapped: bool,

	/// CGB double-speed state: the current speed and the armed switch.
	double_speed: bool,
	speed_switch_armed: bool,

	/// OAM DMA source page, as last written.
	dma_source: u8,

	/// CGB vram dma state.
	hdma_source: u16,
	hdma_dest: u16,
	hdma_blocks: u8,
	hdma_active: bool,

	/// Color-hardware features (KEY1, HDMA) are wired.
	cgb: bool,
}

/// An abstraction for fetching mutable and immutable regions.
macro_rules! get_region {
	($name:tt $(,$mut_:tt)*) => {
		/// Returns the region that contains the given address.
		fn $name(&$($mut_)* self, address: u16) -> Result<&$($mut_)* dyn Memory, GameboyError> {
			match address {
				// Cartridge-mapped offsets
				memory_range!(MMAP_ROM_BANK0) |
				memory_range!(MMAP_ROM_BANK_SW) |
				memory_range!(MMAP_EXTERNAL_RAM) => {
					Ok(&$($mut_)* (*self.cartridge))
				}

				// Internal RAM and its banking register
				memory_range!(MMAP_RAM_INTERNAL) |
				memory_range!(MMAP_RAM_ECHO) |
				memory_range!(MMAP_RAM_HIGH) |
				IO_SVBK => {
					Ok(&$($mut_)* self.ram)
				}

				// Timer
				memory_range!(MMAP_IO_TIMER) => {
					Ok(&$($mut_)* self.timer)
				}

				// DMA engines and internal registers
				IO_DMA |
				IO_IF |
				IO_IE |
				IO_KEY1 |
				IO_BOOT |
				memory_range!(MMAP_IO_HDMA) => {
					Ok(&$($mut_)* *self)
				}

				// Display
				memory_range!(MMAP_IO_DISPLAY) |
				memory_range!(MMAP_IO_PALETTES) |
				IO_VBK |
				IO_OPRI |
				memory_range!(MMAP_VIDEO_RAM) |
				memory_range!(MMAP_SPRITE_OAM) => {
					Ok(&$($mut_)* self.ppu)
				}

				// Audio
				memory_range!(MMAP_IO_SOUND) => {
					Ok(&$($mut_)* self.apu)
				}

				// Joypad
				joypad::consts::IO_P1 => {
					Ok(&$($mut_)* self.joypad)
				}

				// Serial transfer
				serial::consts::IO_SB |
				serial::consts::IO_SC => {
					Ok(&$($mut_)* self.serial)
				}

				// Everything unclaimed floats
				memory_range!(MMAP_UNUSABLE) |
				memory_range!(MMAP_IO_PORTS) => {
					Ok(&$($mut_)* self.io)
				}
				_ => {
					Err(GameboyError::Io("Accessed an unmapped region."))
				}
			}
		}
	}
}

impl<'a> SystemBus<'a> {
	/// Initialize a new address space.
	pub fn new(config: &'a Config, cartridge: &'a mut Cartridge<'a>) -> Self {
		let mut ppu = Ppu::new(config);

		// A DMG-only game on color hardware renders through the curated
		// compatibility shades; a color game unlocks the CGB pipeline.
		if config.is_cgb_hardware() {
			if cartridge.is_cgb() {
				ppu.set_color_mode(true);
			} else {
				ppu.set_compat_palette(
					palette::for_title_checksum(cartridge.title_checksum()));
			}
		}

		SystemBus {
			cartridge,
			ppu,
			apu: Apu::new(config),
			io: IoPorts::new(),
			timer: Timer::new(config),
			serial: Serial::new(config),
			joypad: Joypad::new(),
			ram: InternalRam::new(config),
			interrupt_flag: 0,
			interrupt_enable: 0,
			boot_rom: None,
			boot_rom_mapped: false,
			double_speed: false,
			speed_switch_armed: false,
			dma_source: 0,
			hdma_source: 0,
			hdma_dest: 0,
			hdma_blocks: 0,
			hdma_active: false,
			cgb: config.is_cgb_hardware(),
		}
	}

	/// Installs a boot rom to overlay the cartridge until released.
	pub fn load_boot_rom(&mut self, boot_rom: &'a [u8]) {
		self.boot_rom = Some(boot_rom);
		self.boot_rom_mapped = true;
	}

	/// The single place deciding whether a read is served by the boot rom.
	fn boot_rom_byte(&self, address: u16) -> Option<u8> {
		if !self.boot_rom_mapped {
			return None;
		}

		let rom = self.boot_rom?;
		let offset = address as usize;

		// The CGB boot image continues past the header gap.
		let overlaid = offset < 0x100
			|| (self.cgb && (0x200..0x900).contains(&offset));

		if overlaid && offset < rom.len() {
			Some(rom[offset])
		} else {
			None
		}
	}

	/// Update the system bus peripherals' state according to
	/// the elapsed time.
	pub fn process(&mut self, cycles: usize) {
		let elapsed = if cycles > 0 { cycles } else { 4 };

		// In double speed the cpu-side cycle stream runs twice as fast as
		// the real-time peripherals.
		let real = if self.double_speed { elapsed / 2 } else { elapsed };

		self.ppu.process(real);
		self.apu.process(real);
		self.cartridge.process(real);
		self.timer.process(elapsed);
		self.serial.process(elapsed);
		self.joypad.process(elapsed);

		// Update interrupts state
		self.interrupt_flag |= self.ppu.interrupts();
		self.interrupt_flag |= self.timer.interrupts();
		self.interrupt_flag |= self.serial.interrupts();
		self.interrupt_flag |= self.joypad.interrupts();

		self.ppu.clear();
		self.timer.clear();
		self.serial.clear();
		self.joypad.clear();

		// HBlank DMA moves one block per horizontal blank entered.
		let hblanks = self.ppu.take_hblank_entries();
		for _ in 0..hblanks {
			if !self.hdma_active {
				break;
			}
			self.hdma_copy_block();
		}
	}

	/// Handle writing to a memory region.
	/// The function calls the relevant peripheral's implementation.
	pub fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		let peripheral = self.region_mut(address)?;

		peripheral.write(address, value)
	}

	/// Handle reading from a memory region.
	/// The function calls the relevant peripheral's implementation.
	pub fn read(&self, address: u16) -> Result<u8, GameboyError> {
		if let Some(byte) = self.boot_rom_byte(address) {
			return Ok(byte);
		}

		let peripheral = self.region(address)?;

		peripheral.read(address)
	}

	/// The interrupts that are both raised and enabled.
	pub fn pending_interrupts(&self) -> InterruptMask {
		self.interrupt_enable & self.interrupt_flag & INT_MASK_ALL
	}

	/// Returns the highest-priority pending interrupt and acknowledges it
	/// by clearing its IF bit. IE is left untouched.
	pub fn fetch_interrupt(&mut self) -> Option<Interrupt> {
		let interrupt = InterruptIter::new(self.pending_interrupts()).next();

		if let Some(ref fetched) = interrupt {
			self.interrupt_flag &= !fetched.value();
		}

		interrupt
	}

	/// Whether the program armed a speed switch through KEY1.
	pub fn speed_switch_requested(&self) -> bool {
		self.cgb && self.speed_switch_armed
	}

	/// Flips between single and double speed (the stop instruction's CGB
	/// behavior).
	pub fn perform_speed_switch(&mut self) {
		self.double_speed = !self.double_speed;
		self.speed_switch_armed = false;
	}

	/// Whether the cpu currently runs at double speed.
	pub fn double_speed(&self) -> bool {
		self.double_speed
	}

	/// Copies one 0x10-byte vram dma block and retires the transfer when
	/// the last block is done.
	fn hdma_copy_block(&mut self) {
		for index in 0..0x10_u16 {
			let byte = self.read(self.hdma_source.wrapping_add(index)).unwrap_or(0xFF);
			let dest = 0x8000 | ((self.hdma_dest.wrapping_add(index)) & 0x1FFF);

			// Straight into vram; the ppu honors the selected bank.
			let _ = self.ppu.write(dest, byte);
		}

		self.hdma_source = self.hdma_source.wrapping_add(0x10);
		self.hdma_dest = self.hdma_dest.wrapping_add(0x10);
		self.hdma_blocks -= 1;

		if self.hdma_blocks == 0 {
			self.hdma_active = false;
		}
	}

	/// The HDMA5 status byte: remaining blocks minus one, bit 7 set while
	/// no transfer is active. 0xFF after completion.
	fn hdma5_status(&self) -> u8 {
		let remaining = self.hdma_blocks.wrapping_sub(1) & 0x7F;

		if self.hdma_active {
			remaining
		} else {
			0x80 | remaining
		}
	}

	/// An HDMA5 write: starts a general or hblank transfer, or cancels a
	/// running hblank transfer.
	fn hdma_control(&mut self, value: u8) {
		if self.hdma_active && value & 0x80 == 0 {
			// Cancel mid-transfer; the remaining count stays readable.
			self.hdma_active = false;
			return;
		}

		let blocks = (value & 0x7F) + 1;
		self.hdma_blocks = blocks;

		if value & 0x80 != 0 {
			// One block per hblank from here on.
			self.hdma_active = true;
		} else {
			// General purpose: everything is copied at once.
			self.hdma_active = true;
			for _ in 0..blocks {
				self.hdma_copy_block();
			}
		}
	}

	// Get an immutable region
	get_region!(region);

	// Get a mutable region
	get_region!(region_mut, mut);
}

/// Certain registers needs access to multiple peripherals.
/// These registers will be implemented here.
mod private {
	use super::*;

	// Implement read/write operations for internal registers.
	impl<'a> Memory for SystemBus<'a> {

		fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
			match address {
				IO_DMA => {
					// The whole OAM is copied from the written page at
					// once. Sub-cycle bus blocking isn't modelled.
					let source: u16 = (value as u16) << 8;

					for i in 0..0xa0 {
						let data = self.read(source + (i as u16))?;
						self.ppu.oam()[i] = data;
					}

					self.dma_source = value;

					Ok(())
				}
				IO_IF => {
					self.interrupt_flag = value & INT_MASK_ALL;

					Ok(())
				}
				IO_IE => {
					self.interrupt_enable = value;

					Ok(())
				}
				IO_KEY1 => {
					if self.cgb {
						self.speed_switch_armed = value & 0x01 != 0;
					}

					Ok(())
				}
				IO_BOOT => {
					// One-way release latch.
					if value != 0 {
						self.boot_rom_mapped = false;
					}

					Ok(())
				}
				IO_HDMA1 => {
					self.hdma_source = (self.hdma_source & 0x00FF) | ((value as u16) << 8);
					Ok(())
				}
				IO_HDMA2 => {
					self.hdma_source = (self.hdma_source & 0xFF00) | ((value & 0xF0) as u16);
					Ok(())
				}
				IO_HDMA3 => {
					self.hdma_dest = (self.hdma_dest & 0x00FF) | (((value & 0x1F) as u16) << 8);
					Ok(())
				}
				IO_HDMA4 => {
					self.hdma_dest = (self.hdma_dest & 0xFF00) | ((value & 0xF0) as u16);
					Ok(())
				}
				IO_HDMA5 => {
					if self.cgb {
						self.hdma_control(value);
					} else {
						debug!("Ignoring vram dma on non-color hardware");
					}

					Ok(())
				}
				_ => {
					Err(GameboyError::BadAddress(address))
				}
			}
		}

		fn read(&self, address: u16) -> Result<u8, GameboyError> {
			match address {
				IO_DMA => {
					Ok(self.dma_source)
				}
				IO_IF => {
					// The unwired upper bits read as ones.
					Ok(0xE0 | self.interrupt_flag)
				}
				IO_IE => {
					Ok(self.interrupt_enable)
				}
				IO_KEY1 => {
					if self.cgb {
						Ok(((self.double_speed as u8) << 7)
							| 0x7E
							| (self.speed_switch_armed as u8))
					} else {
						Ok(0xFF)
					}
				}
				IO_BOOT => {
					Ok(0xFF)
				}
				IO_HDMA5 => {
					if self.cgb {
						Ok(self.hdma5_status())
					} else {
						Ok(0xFF)
					}
				}
				IO_HDMA1 | IO_HDMA2 | IO_HDMA3 | IO_HDMA4 => {
					Ok(0xFF)
				}
				_ => {
					Err(GameboyError::BadAddress(address))
				}
			}
		}
	}
}

#[cfg(test)]
impl<'a> SystemBus<'a> {
	/// Writes the complete array's bytes to the relevant memory region.
	pub fn write_all(&mut self, address: u16, array: &[u8]) -> Result<(), GameboyError> {
		for (index, value) in array.iter().enumerate() {
			self.write(address + (index as u16), *value)?;
		}

		Ok(())
	}
}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
	use super::*;
	use crate::config::HardwareModel;
	use alloc::boxed::Box;
	use alloc::vec::Vec;

	fn with_bus<F>(config: Config, callback: F)
		where F: FnOnce(&mut SystemBus) {
		let rom: Vec<u8> = cartridge::tests::empty_rom(0x13);
		let mut ram: Box<[u8]> = Cartridge::make_ram(&rom).unwrap();
		let mut cartridge = Cartridge::new(&rom, &mut ram).unwrap();

		let mut bus = SystemBus::new(&config, &mut cartridge);
		callback(&mut bus);
	}

	#[test]
	fn test_memory_range() {
		let rom_ptr: u16 = 0x2000;
		let ram_ptr: u16 = 0xA100;

		match rom_ptr {
			memory_range!(MMAP_ROM_BANK0) => { }
			_ => { assert!(false); }
		}

		match ram_ptr {
			memory_range!(MMAP_EXTERNAL_RAM) => { }
			_ => { assert!(false); }
		}
	}

	#[test]
	fn test_echo_ram_through_bus() {
		with_bus(Config::default(), |bus| {
			bus.write(0xC100, 0x5A).unwrap();
			assert_eq!(0x5A, bus.read(0xE100).unwrap());
		});
	}

	#[test]
	fn test_unusable_region() {
		with_bus(Config::default(), |bus| {
			bus.write(0xFEA0, 0x12).unwrap();
			assert_eq!(0xFF, bus.read(0xFEA0).unwrap());
			assert_eq!(0xFF, bus.read(0xFEFF).unwrap());
		});
	}

	#[test]
	fn test_if_upper_bits() {
		with_bus(Config::default(), |bus| {
			bus.write(consts::IO_IF, 0x00).unwrap();
			assert_eq!(0xE0, bus.read(consts::IO_IF).unwrap());

			bus.write(consts::IO_IF, 0xFF).unwrap();
			assert_eq!(0xFF, bus.read(consts::IO_IF).unwrap());
			assert_eq!(0x1F, bus.interrupt_flag);
		});
	}

	#[test]
	fn test_oam_dma() {
		with_bus(Config::default(), |bus| {
			// A recognizable pattern in work ram.
			for i in 0..0xA0_u16 {
				bus.write(0xC000 + i, i as u8).unwrap();
			}

			bus.write(consts::IO_DMA, 0xC0).unwrap();

			for i in 0..0xA0_u16 {
				assert_eq!(i as u8, bus.read(0xFE00 + i).unwrap());
			}

			// The source byte reads back, and wram is untouched.
			assert_eq!(0xC0, bus.read(consts::IO_DMA).unwrap());
			assert_eq!(0x13, bus.read(0xC013).unwrap());
		});
	}

	#[test]
	fn test_general_purpose_vram_dma() {
		let config = Config { model: HardwareModel::GBC, ..Config::default() };

		with_bus(config, |bus| {
			for i in 0..0x20_u16 {
				bus.write(0xC000 + i, (0x40 + i) as u8).unwrap();
			}

			// Source 0xC000, destination vram 0x8100, two blocks.
			bus.write(consts::IO_HDMA1, 0xC0).unwrap();
			bus.write(consts::IO_HDMA2, 0x00).unwrap();
			bus.write(consts::IO_HDMA3, 0x01).unwrap();
			bus.write(consts::IO_HDMA4, 0x00).unwrap();
			bus.write(consts::IO_HDMA5, 0x01).unwrap();

			for i in 0..0x20_u16 {
				assert_eq!((0x40 + i) as u8, bus.read(0x8100 + i).unwrap());
			}

			// Complete: status reads 0xFF.
			assert_eq!(0xFF, bus.read(consts::IO_HDMA5).unwrap());
		});
	}

	#[test]
	fn test_hblank_vram_dma_paces_on_hblank() {
		let config = Config { model: HardwareModel::GBC, ..Config::default() };

		with_bus(config, |bus| {
			bus.write(0xC000, 0x99).unwrap();

			bus.write(consts::IO_HDMA1, 0xC0).unwrap();
			bus.write(consts::IO_HDMA2, 0x00).unwrap();
			bus.write(consts::IO_HDMA3, 0x00).unwrap();
			bus.write(consts::IO_HDMA4, 0x00).unwrap();
			// Two blocks, hblank paced.
			bus.write(consts::IO_HDMA5, 0x81).unwrap();

			// Nothing moves before the first hblank.
			assert_eq!(0x00, bus.read(0x8000).unwrap());
			assert_eq!(0x01, bus.read(consts::IO_HDMA5).unwrap());

			// Run into the first hblank.
			bus.process(80 + 172);
			assert_eq!(0x99, bus.read(0x8000).unwrap());
			assert_eq!(0x00, bus.read(consts::IO_HDMA5).unwrap());

			// The second block retires the transfer on the next line.
			bus.process(456);
			assert_eq!(0xFF, bus.read(consts::IO_HDMA5).unwrap());
		});
	}

	#[test]
	fn test_ram_round_trip() {
		with_bus(Config::default(), |bus| {
			bus.cartridge.set_ram_enabled(true);

			// Work ram, high ram, vram, oam and external ram all return
			// what was written.
			let regions = [
				0xC000_u16..=0xDFFF,
				0xFF80..=0xFFFE,
				0x8000..=0x9FFF,
				0xFE00..=0xFE9F,
				0xA000..=0xBFFF,
			];

			for region in regions.iter() {
				for address in region.clone() {
					bus.write(address, address as u8).unwrap();
				}
				for address in region.clone() {
					assert_eq!(address as u8, bus.read(address).unwrap());
				}
			}
		});
	}

	#[test]
	fn test_boot_rom_overlay() {
		let boot: [u8; 0x100] = [0xAA; 0x100];

		let rom: Vec<u8> = cartridge::tests::empty_rom(0x00);
		let mut ram: Box<[u8]> = Cartridge::make_ram(&rom).unwrap();
		let mut cartridge = Cartridge::new(&rom, &mut ram).unwrap();

		let config = Config::default();
		let mut bus = SystemBus::new(&config, &mut cartridge);
		bus.load_boot_rom(&boot);

		assert_eq!(0xAA, bus.read(0x0000).unwrap());
		// Past the overlay the cartridge shows through.
		assert_eq!(0x00, bus.read(0x0100).unwrap());

		// Release and observe the cartridge.
		bus.write(consts::IO_BOOT, 0x01).unwrap();
		assert_eq!(0x00, bus.read(0x0000).unwrap());
	}

	#[test]
	fn test_speed_switch() {
		let config = Config { model: HardwareModel::GBC, ..Config::default() };

		with_bus(config, |bus| {
			assert!(!bus.double_speed());

			bus.write(consts::IO_KEY1, 0x01).unwrap();
			assert!(bus.speed_switch_requested());

			bus.perform_speed_switch();
			assert!(bus.double_speed());
			assert!(!bus.speed_switch_requested());
			assert_eq!(0xFE, bus.read(consts::IO_KEY1).unwrap());
		});
	}
}
