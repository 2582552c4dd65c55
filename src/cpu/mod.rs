// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Gameboy's processor emulation.

pub mod alu;
pub mod state;
pub mod decode;
pub mod interrupts;
pub mod instructions;

use num::PrimInt;
use core::mem::size_of;
use core::ops::{AddAssign, Shl};

use state::*;
use state::registers::*;
use instructions::{Instruction, enter_interrupt};

use crate::GameboyError;
use crate::config::Config;
use crate::bus::joypad::Controller;

use crate::bus::*;
use crate::bus::cartridge::*;

/// The gameboy's processor.
pub struct Cpu<'a> {
	/// The cpu's registers.
	pub(crate) registers: CpuState<'a>,
	/// The devices' memory mapping
	pub mmap: SystemBus<'a>,
	/// The emulator's configuration
	pub config: &'a Config,

	/// Set while the cpu sleeps waiting for an interrupt.
	halting: bool,
	/// If halt is executed while interrupts are disabled and one is already
	/// pending, the original cpu fetches the byte after the halt twice.
	halt_bug: bool,
	/// The processor has a delay of a single instruction after EI before
	/// actually enabling interrupts.
	ime_delay: bool,
}

impl<'a> Cpu<'a> {
	/// Initializes a new virtual cpu
	#[inline(always)]
	pub fn new(config: &'a Config, cartridge: &'a mut Cartridge<'a>) -> Self {
		Cpu {
			registers: CpuState::new(config),
			mmap: SystemBus::new(config, cartridge),
			config,
			halting: false,
			halt_bug: false,
			ime_delay: false,
		}
	}

	/// Halt the cpu until the next interrupt.
	pub fn halt(&mut self) {
		if !self.registers.ime() && self.mmap.pending_interrupts() != 0 {
			// The halt is skipped entirely and the next opcode byte is
			// fetched twice.
			self.halt_bug = true;
		} else {
			self.halting = true;
		}
	}

	/// Returns whether the cpu is currently halted.
	pub fn is_halted(&self) -> bool {
		self.halting
	}

	/// Enable interrupts with a delay of a single instruction.
	pub fn toggle_ime_delayed(&mut self) {
		self.ime_delay = true;
	}

	/// Disable interrupts immediately, cancelling a pending delayed enable.
	pub fn disable_interrupts(&mut self) {
		self.ime_delay = false;
		self.registers.set_ime(false);
	}

	/// Apply the given closure to the game controller.
	pub fn with_controller<F>(&mut self, closure: F)
		where F: FnOnce(&mut dyn Controller) -> () {
			closure(&mut self.mmap.joypad);
	}

	/// Reads the next instruction bytes and increments the program counter appropriately.
	///
	/// The function works in little-endian, that is, when reading 2 bytes,
	/// the first byte will be the least-significant one.
	pub fn fetch<T: PrimInt + AddAssign + Shl<Output=T>>(&mut self) -> Result<T, GameboyError> {
		let mut result: T = num::cast(0).unwrap();

		for i in 0..size_of::<T>() {
			// Read the next byte.
			let pc: u16 = self.registers.get(Register::PC);
			let data: T = num::cast::<u8, T>(self.mmap.read(pc)?).unwrap();

			// We're using little-endianity.
			result += data << num::cast::<usize, T>(8 * i).unwrap();

			if self.halt_bug {
				// The halt bug prevents the program counter from being incremented once.
				self.halt_bug = false;
			} else {
				// Move the PC forward.
				self.registers.set(Register::PC, pc.wrapping_add(1));
			}
		}

		Ok(result)
	}

	/// Writes the display's data to the given frame buffer.
	pub fn flush(&mut self, frame_buffer: &mut [u32]) {
		self.mmap.ppu.flush(frame_buffer);
	}

	/// Emulates a single cpu step: one instruction, one interrupt dispatch,
	/// or one idle machine cycle while halted.
	///	This function also processes the peripherals by the elapsed time.
	///
	/// Returns the number of clock cycles the step has taken.
	pub fn execute(&mut self) -> Result<usize, GameboyError> {
		// An EI from the previous instruction takes effect now, before
		// interrupts are sampled.
		if self.ime_delay {
			self.ime_delay = false;
			self.registers.set_ime(true);
		}

		let num_cycles = self.step()?;

		// Progress the peripherals.
		self.mmap.process(num_cycles);

		Ok(num_cycles)
	}

	/// A single step without peripheral processing.
	fn step(&mut self) -> Result<usize, GameboyError> {
		let pending = self.mmap.pending_interrupts();

		if self.halting {
			if pending == 0 {
				// Keep sleeping: a halted cpu still burns machine cycles.
				return Ok(4);
			}

			// Wake up. Whether the ISR is entered depends on IME below.
			self.halting = false;
		}

		if self.registers.ime() && pending != 0 {
			if let Some(interrupt) = self.mmap.fetch_interrupt() {
				return enter_interrupt(self, interrupt.vector());
			}
		}

		self.execute_single()
	}

	/// Emulates the execution of a single instruction.
	///
	/// Returns the number of clock cycles the instruction has taken.
	pub fn execute_single(&mut self) -> Result<usize, GameboyError> {
		#[cfg(feature = "debug")]
		let _address: u16 = self.registers.get(Register::PC);

		// Fetch the opcode from the memory.
		let opcode: u8 = self.fetch()?;

		#[cfg(feature = "debug")]
		{
			println!("0x{:04x}: opcode {:02x}", _address, opcode);
		}

		// Decode the given opcode.
		let insn: Instruction = self.decode(opcode)?;

		// Execute and return the number of cycles taken.
		Ok(insn(self)?)
	}
}

#[cfg(test)]
#[cfg(feature = "alloc")]
pub(crate) mod tests {
	use super::*;
	use alloc::boxed::Box;
	use alloc::vec::Vec;

	/// With-closure for running logic with an initialized cpu instance.
	pub fn with_cpu<F>(callback: F) -> Result<(), GameboyError>
		where F: FnOnce(&mut Cpu) -> Result<(), GameboyError> {
		// Initialize the cpu
		let config = Config::default();
		let rom: Vec<u8> = cartridge::tests::empty_rom(0x13);
		let mut ram: Box<[u8]> = Cartridge::make_ram(&rom)?;
		let mut cartridge = Cartridge::new(&rom, &mut ram)?;

		let mut cpu = Cpu::new(&config, &mut cartridge);

		callback(&mut cpu)
	}

	#[test]
	fn test_fetch() -> Result<(), GameboyError> {
		with_cpu(|cpu| {
			// Move the program counter to the RAM bank.
			cpu.registers.set(Register::PC, 0xA000);

			// Write arbitrary data to the memory starting from the program counter.
			let data: &[u8] = &[1, 2, 3];
			cpu.mmap.cartridge.set_ram_enabled(true);
			cpu.mmap.write_all(cpu.registers.get(Register::PC), data)?;

			// Make sure that fetch works as expected.
			assert!(cpu.fetch::<u16>()? == 0x0201);
			assert!(cpu.fetch::<u8>()? == 0x03);

			Ok(())
		})
	}

	#[test]
	fn test_interrupt_dispatch() -> Result<(), GameboyError> {
		with_cpu(|cpu| {
			cpu.registers.set(Register::PC, 0xA000);
			cpu.registers.set(Register::SP, 0xB000);
			cpu.mmap.cartridge.set_ram_enabled(true);
			cpu.mmap.write_all(0xA000, &[/* NOP */ 0x00])?;

			// Enable and raise the timer interrupt.
			cpu.registers.set_ime(true);
			cpu.mmap.write(0xFFFF, 0x04)?;
			cpu.mmap.write(0xFF0F, 0x04)?;

			let cycles = cpu.execute()?;

			// The dispatch consumes 20 cycles and clears IME and the IF bit.
			assert!(cycles == 20);
			assert!(cpu.registers.get(Register::PC) == 0x0050);
			assert!(!cpu.registers.ime());
			assert!(cpu.mmap.read(0xFF0F)? & 0x04 == 0);

			// The old program counter was pushed.
			assert!(cpu.mmap.read(0xAFFF)? == 0xA0);
			assert!(cpu.mmap.read(0xAFFE)? == 0x00);

			Ok(())
		})
	}

	#[test]
	fn test_interrupt_priority() -> Result<(), GameboyError> {
		with_cpu(|cpu| {
			cpu.registers.set(Register::SP, 0xB000);
			cpu.registers.set_ime(true);
			cpu.mmap.cartridge.set_ram_enabled(true);

			// V-Blank and Joypad both pending: V-Blank wins.
			cpu.mmap.write(0xFFFF, 0x11)?;
			cpu.mmap.write(0xFF0F, 0x11)?;

			cpu.execute()?;

			assert!(cpu.registers.get(Register::PC) == 0x0040);
			// The joypad bit remains pending.
			assert!(cpu.mmap.read(0xFF0F)? & 0x10 != 0);

			Ok(())
		})
	}

	#[test]
	fn test_halt_wakes_without_ime() -> Result<(), GameboyError> {
		with_cpu(|cpu| {
			cpu.registers.set(Register::PC, 0xA000);
			cpu.mmap.cartridge.set_ram_enabled(true);
			cpu.mmap.write_all(0xA000, &[/* HALT */ 0x76, /* INC B */ 0x04])?;

			cpu.registers.set_ime(false);
			cpu.mmap.write(0xFFFF, 0x04)?;

			cpu.execute()?;
			assert!(cpu.is_halted());

			// Nothing pending: the cpu idles.
			assert!(cpu.execute()? == 4);
			assert!(cpu.is_halted());

			// Raise the (enabled) timer interrupt: the cpu resumes without
			// entering the ISR, since IME is clear.
			cpu.mmap.write(0xFF0F, 0x04)?;
			cpu.execute()?;
			assert!(!cpu.is_halted());
			assert!(cpu.registers.get(Register::B) == 0x01);

			Ok(())
		})
	}

	#[test]
	fn test_ei_delay() -> Result<(), GameboyError> {
		with_cpu(|cpu| {
			cpu.registers.set(Register::PC, 0xA000);
			cpu.registers.set(Register::SP, 0xB000);
			cpu.mmap.cartridge.set_ram_enabled(true);
			cpu.mmap.write_all(0xA000, &[/* EI */ 0xfb, /* NOP */ 0x00])?;

			// An enabled interrupt is already pending.
			cpu.mmap.write(0xFFFF, 0x01)?;
			cpu.mmap.write(0xFF0F, 0x01)?;

			// EI itself doesn't dispatch.
			cpu.execute()?;
			assert!(cpu.registers.get(Register::PC) == 0xA001);

			// The next step dispatches before running the nop.
			cpu.execute()?;
			assert!(cpu.registers.get(Register::PC) == 0x0040);

			Ok(())
		})
	}
}
