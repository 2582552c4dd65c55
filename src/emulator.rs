// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The emulation library's front-end API.
//!
//! The emulator owns the cpu (which in turn owns the bus and every
//! peripheral) and drives it a frame at a time. The host talks to three
//! surfaces only: the frame buffer copy-out, the audio sample ring and
//! the joypad controller.

use crate::cpu::*;
use crate::bus::cartridge::*;
use crate::bus::joypad::Controller;
use crate::config::Config;
use crate::GameboyError;

#[cfg(feature = "alloc")]
use alloc::sync::Arc;
#[cfg(feature = "alloc")]
use core::sync::atomic::{AtomicBool, Ordering};

/// Dots per frame at single speed.
pub const FRAME_CYCLES: usize = 70224;

/// The complete emulator's state.
pub struct Emulator<'a> {
	/// The gameboy's processor, bus and peripherals.
	pub cpu: Cpu<'a>,
	/// The emulator's configuration
	pub config: &'a Config,

	/// Cooperative cancellation, checked between cpu steps.
	#[cfg(feature = "alloc")]
	stop: Arc<AtomicBool>,
}

impl<'a> Emulator<'a> {
	/// Create a new emulator.
	#[inline(always)]
	pub fn new(config: &'a Config, cartridge: &'a mut Cartridge<'a>) -> Self {
		Emulator {
			cpu: Cpu::new(config, cartridge),
			config,
			#[cfg(feature = "alloc")]
			stop: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Installs a boot rom; execution then starts from address zero.
	pub fn load_boot_rom(&mut self, boot_rom: &'a [u8]) {
		self.cpu.mmap.load_boot_rom(boot_rom);
		self.cpu.registers.set(state::registers::Register::PC, 0);
	}

	/// A handle the host may set from another thread to interrupt
	/// `run_frame` between cpu steps.
	#[cfg(feature = "alloc")]
	pub fn stop_handle(&self) -> Arc<AtomicBool> {
		self.stop.clone()
	}

	#[cfg(feature = "alloc")]
	fn stop_requested(&self) -> bool {
		self.stop.load(Ordering::Relaxed)
	}

	#[cfg(not(feature = "alloc"))]
	fn stop_requested(&self) -> bool {
		false
	}

	/// Runs the machine until the display finishes the current frame.
	///
	/// Returns the number of cpu cycles consumed. With the LCD disabled
	/// (or when stopped through the handle) the call returns after one
	/// frame's worth of cycles instead of blocking until a frame edge.
	pub fn run_frame(&mut self) -> Result<usize, GameboyError> {
		let mut cycles: usize = 0;

		// At double speed a frame spans twice as many cpu cycles.
		let limit = if self.cpu.mmap.double_speed() {
			FRAME_CYCLES * 2
		} else {
			FRAME_CYCLES
		};

		while cycles < limit && !self.stop_requested() {
			cycles += self.cpu.execute()?;

			if self.cpu.mmap.ppu.take_frame() {
				break;
			}
		}

		Ok(cycles)
	}

	/// Writes the display's data to the given frame buffer
	/// (160x144, 0xRRGGBBAA).
	pub fn flush(&mut self, frame_buffer: &mut [u32]) {
		self.cpu.flush(frame_buffer);
	}

	/// Number of buffered stereo audio frames.
	pub fn samples_available(&self) -> usize {
		self.cpu.mmap.apu.samples.available()
	}

	/// Drains buffered audio into `out` (interleaved stereo f32),
	/// returning the number of frames written.
	pub fn drain_audio(&mut self, out: &mut [f32]) -> usize {
		self.cpu.mmap.apu.samples.drain(out)
	}

	/// Apply the given closure to the game controller.
	pub fn with_controller<F>(&mut self, closure: F)
		where F: FnOnce(&mut dyn Controller) -> () {
		self.cpu.with_controller(closure);
	}

	/// The cartridge's feature bits, for the host's persistence decisions.
	pub fn cartridge_features(&self) -> CartridgeFeatures {
		self.cpu.mmap.cartridge.features()
	}

	/// The battery-backed external ram, to be written to its sidecar.
	pub fn battery_ram(&self) -> &[u8] {
		self.cpu.mmap.cartridge.battery_ram()
	}

	/// The rtc counters, to be written to their sidecar.
	pub fn rtc_snapshot(&self) -> [u8; 5] {
		self.cpu.mmap.cartridge.rtc_snapshot()
	}
}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
	use super::*;
	use crate::bus::cartridge;
	use alloc::boxed::Box;
	use alloc::vec::Vec;

	#[test]
	fn test_frame_pacing() -> Result<(), GameboyError> {
		let config = Config::default();
		let rom: Vec<u8> = cartridge::tests::empty_rom(0x00);
		let mut ram: Box<[u8]> = Cartridge::make_ram(&rom)?;
		let mut cartridge = Cartridge::new(&rom, &mut ram)?;

		let mut emulator = Emulator::new(&config, &mut cartridge);

		// The first frame edge arrives on the vblank transition, 144
		// lines in; every following frame is a full 154 lines.
		let cycles = emulator.run_frame()?;
		assert_eq!(144 * 456, cycles);

		let cycles = emulator.run_frame()?;
		assert_eq!(FRAME_CYCLES, cycles);

		// Audio was produced alongside.
		assert!(emulator.samples_available() > 0);

		Ok(())
	}

	#[test]
	fn test_stop_handle() -> Result<(), GameboyError> {
		let config = Config::default();
		let rom: Vec<u8> = cartridge::tests::empty_rom(0x00);
		let mut ram: Box<[u8]> = Cartridge::make_ram(&rom)?;
		let mut cartridge = Cartridge::new(&rom, &mut ram)?;

		let mut emulator = Emulator::new(&config, &mut cartridge);

		let stop = emulator.stop_handle();
		stop.store(true, core::sync::atomic::Ordering::Relaxed);

		// A stopped emulator returns without running a full frame.
		let cycles = emulator.run_frame()?;
		assert_eq!(0, cycles);

		Ok(())
	}
}
