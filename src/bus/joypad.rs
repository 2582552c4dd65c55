// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
//! Gameboy's joypad controller.

use super::Memory;

use crate::GameboyError;
use crate::cpu::interrupts::*;

pub mod consts {
	pub const IO_P1: u16 = 0xFF00;

	/// Active-low select line for the direction keys.
	pub const P1_SELECT_DPAD: u8 = 0x10;
	/// Active-low select line for the face buttons.
	pub const P1_SELECT_BUTTONS: u8 = 0x20;
}

use consts::*;

/// The matrix layout for the P1 register, according to the Gameboy CPU manual.
/// The low nibble holds the direction keys, the high one the face buttons.
#[derive(Clone, Copy)]
pub enum Key {
	Right,
	Left,
	Up,
	Down,
	A,
	B,
	Select,
	Start,
}

impl Key {
	pub fn value(&self) -> u8 {
		match self {
			Key::Right => 1,
			Key::Left => 2,
			Key::Up => 4,
			Key::Down => 8,
			Key::A => 16,
			Key::B => 32,
			Key::Select => 64,
			Key::Start => 128,
		}
	}

	/// Whether this key sits on the direction-pad output line.
	fn is_dpad(&self) -> bool {
		self.value() & 0x0F != 0
	}
}

pub trait Controller {
	/// Mark the given key as currently pressed.
	fn down(&mut self, key: Key);

	/// Mark the given key as released.
	fn up(&mut self, key: Key);
}

pub struct Joypad {
	/// Pressed keys, 1 = down.
	pressed: u8,
	/// The select lines as last written (bits 4-5, active low).
	select: u8,
	interrupt_flag: InterruptMask,
}

impl Joypad {
	/// Initialize a new joypad instance.
	pub fn new() -> Self {
		Joypad {
			pressed: 0,
			select: P1_SELECT_DPAD | P1_SELECT_BUTTONS,
			interrupt_flag: 0,
		}
	}

	/// Update the joypad's state according to the elapsed time.
	pub fn process(&mut self, _cycles: usize) {}

	/// Whether the matrix line holding the given key is selected.
	fn line_selected(&self, key: &Key) -> bool {
		if key.is_dpad() {
			self.select & P1_SELECT_DPAD == 0
		} else {
			self.select & P1_SELECT_BUTTONS == 0
		}
	}
}

impl Controller for Joypad {
	fn down(&mut self, key: Key) {
		let newly_pressed = self.pressed & key.value() == 0;

		self.pressed |= key.value();

		// The interrupt fires on the press edge, and only if the key's
		// line is routed to the output bits at that moment.
		if newly_pressed && self.line_selected(&key) {
			self.interrupt_flag |= Interrupt::Joypad.value();
		}
	}

	fn up(&mut self, key: Key) {
		self.pressed &= !key.value();
	}
}

impl InterruptSource for Joypad {
	fn interrupts(&self) -> InterruptMask {
		self.interrupt_flag
	}

	fn clear(&mut self) {
		self.interrupt_flag = 0;
	}
}

impl Memory for Joypad {
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		if address != IO_P1 {
			return Err(GameboyError::BadAddress(address));
		}

		// Only the select lines are writable.
		self.select = value & (P1_SELECT_DPAD | P1_SELECT_BUTTONS);

		Ok(())
	}

	fn read(&self, address: u16) -> Result<u8, GameboyError> {
		if address != IO_P1 {
			return Err(GameboyError::BadAddress(address));
		}

		// Button states are active low; both lines may be selected at once.
		let mut nibble = 0x0F;

		if self.select & P1_SELECT_DPAD == 0 {
			nibble &= !(self.pressed & 0x0F);
		}
		if self.select & P1_SELECT_BUTTONS == 0 {
			nibble &= !((self.pressed >> 4) & 0x0F);
		}

		Ok(0xC0 | self.select | nibble)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_matrix_select() {
		let mut joypad = Joypad::new();

		joypad.down(Key::Right);
		joypad.down(Key::Start);

		// Direction line selected.
		joypad.write(IO_P1, !P1_SELECT_DPAD).unwrap();
		assert_eq!(0x0E, joypad.read(IO_P1).unwrap() & 0x0F);

		// Button line selected.
		joypad.write(IO_P1, !P1_SELECT_BUTTONS).unwrap();
		assert_eq!(0x07, joypad.read(IO_P1).unwrap() & 0x0F);

		// Nothing selected: the input bits read high.
		joypad.write(IO_P1, 0xFF).unwrap();
		assert_eq!(0x0F, joypad.read(IO_P1).unwrap() & 0x0F);
	}

	#[test]
	fn test_press_interrupt_edge() {
		let mut joypad = Joypad::new();

		// Select the button line, press A: one interrupt.
		joypad.write(IO_P1, !P1_SELECT_BUTTONS).unwrap();
		joypad.down(Key::A);
		assert!(joypad.interrupts() & Interrupt::Joypad.value() != 0);

		joypad.clear();

		// Holding the key raises nothing further.
		joypad.down(Key::A);
		assert_eq!(0, joypad.interrupts());

		// A key on the unselected line raises nothing.
		joypad.down(Key::Up);
		assert_eq!(0, joypad.interrupts());

		// Release and press again: a new edge.
		joypad.up(Key::A);
		joypad.down(Key::A);
		assert!(joypad.interrupts() != 0);
	}
}
