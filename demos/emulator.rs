// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! An example frontend built on the emulation library: a minifb window
//! for video and input, and a rodio sink for audio.

extern crate minifb;
extern crate rodio;

use std::env;
use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};

use minifb::{Key, Window, WindowOptions};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

use gbc_core::GameboyError;
use gbc_core::bus::cartridge::*;
use gbc_core::bus::joypad;
use gbc_core::config::{Config, HardwareModel};
use gbc_core::emulator::Emulator;
use gbc_core::loader;

const WIDTH: usize = 160;
const HEIGHT: usize = 144;

enum FrontendError {
	Gameboy(GameboyError),
	Window(minifb::Error),
	Usage,
}

impl From<GameboyError> for FrontendError {
	fn from(e: GameboyError) -> Self {
		FrontendError::Gameboy(e)
	}
}

impl From<minifb::Error> for FrontendError {
	fn from(e: minifb::Error) -> Self {
		FrontendError::Window(e)
	}
}

impl fmt::Debug for FrontendError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			FrontendError::Gameboy(ref err) => err.fmt(f),
			FrontendError::Window(ref err) => err.fmt(f),
			FrontendError::Usage => write!(f, "Usage: emulator <rom-file>"),
		}
	}
}

// Maps minifb keys to emulator keys.
fn map_input_key(key: &Key) -> joypad::Key {
	match key {
		Key::Right => joypad::Key::Right,
		Key::Left => joypad::Key::Left,
		Key::Down => joypad::Key::Down,
		Key::Up => joypad::Key::Up,
		Key::Z => joypad::Key::A,
		Key::X => joypad::Key::B,
		Key::Space => joypad::Key::Select,
		Key::Enter => joypad::Key::Start,
		_ => panic!("Received an unexpected key.")
	}
}

fn update_key_state(emulator: &mut Emulator, window: &Window) {
	for key in [Key::Right, Key::Left, Key::Down, Key::Up, Key::Z, Key::X, Key::Space, Key::Enter].iter() {
		let emulator_key = map_input_key(key);
		let key_down: bool = window.is_key_down(*key);

		if key_down {
			emulator.with_controller(|joypad| joypad.down(emulator_key))
		} else {
			emulator.with_controller(|joypad| joypad.up(emulator_key))
		}
	}
}

fn main() -> Result<(), FrontendError> {
	let args: Vec<String> = env::args().collect();
	let rom_path = args.get(1).ok_or(FrontendError::Usage)?.clone();

	// Load the cartridge and its battery-backed sidecars.
	let rom = loader::read_rom(&rom_path)?;
	let mut ram = Cartridge::make_ram(&rom)?;
	loader::load_battery_ram(&rom_path, &mut ram);

	let mut cartridge = Cartridge::new(&rom, &mut ram)?;
	if let Some((registers, elapsed)) = loader::load_rtc(&rom_path) {
		cartridge.rtc_restore(registers, elapsed);
	}

	// Color games run on color hardware.
	let config = Config {
		model: if cartridge.is_cgb() { HardwareModel::GBC } else { HardwareModel::GB },
		..Config::default()
	};

	let mut window = Window::new(
		"Gameboy",
		WIDTH,
		HEIGHT,
		WindowOptions::default(),
	)?;

	// The audio sink consumes whatever each frame produced.
	let audio = OutputStream::try_default().ok();
	let sink = audio.as_ref()
		.and_then(|(_, handle)| Sink::try_new(handle).ok());

	let mut emulator = Emulator::new(&config, &mut cartridge);

	let mut frame: Vec<u32> = vec![0; WIDTH * HEIGHT];
	let mut samples = vec![0.0_f32; 4096];
	let frame_duration = Duration::from_nanos(16_742_706);

	while window.is_open() && !window.is_key_down(Key::Escape) {
		let frame_start = Instant::now();

		emulator.run_frame()?;

		emulator.flush(&mut frame);
		// The core hands out RGBA; minifb wants 0RGB words.
		let pixels: Vec<u32> = frame.iter().map(|rgba| rgba >> 8).collect();
		window.update_with_buffer(&pixels, WIDTH, HEIGHT).unwrap();

		update_key_state(&mut emulator, &window);

		if let Some(ref sink) = sink {
			let frames = emulator.drain_audio(&mut samples);
			if frames > 0 {
				sink.append(SamplesBuffer::new(
					2,
					config.sample_rate,
					&samples[..frames * 2],
				));
			}
		}

		// Frame pacing: the core never sleeps, the host does.
		if let Some(remaining) = frame_duration.checked_sub(frame_start.elapsed()) {
			sleep(remaining);
		}
	}

	// Persist battery-backed state on the way out.
	let features = emulator.cartridge_features();

	if features.has_rtc {
		loader::store_rtc(&rom_path, emulator.rtc_snapshot())?;
	}

	if features.has_battery && !emulator.battery_ram().is_empty() {
		loader::store_battery_ram(&rom_path, emulator.battery_ram())?;
	}

	Ok(())
}
