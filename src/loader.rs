// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Loading rom images and persisting battery-backed state.
//!
//! Battery ram is stored as `<rom>.sav` (the raw concatenation of the
//! external ram banks) and the type-3 controller's clock as `<rom>.rtc`
//! (the five counters plus the wall-clock second they were written).
//! Sidecars are written through a temporary file and renamed into place
//! so an interrupted write never corrupts an existing save.

use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::vec::Vec;

use log::{info, warn};
use chrono::Utc;

use crate::GameboyError;

/// Serialized rtc sidecar: five counters and a 64-bit LE unix timestamp.
const RTC_SIDECAR_LEN: usize = 5 + 8;

/// Reads a rom image from disk.
pub fn read_rom<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, GameboyError> {
	match fs::read(&path) {
		Ok(data) => Ok(data),
		Err(error) => {
			warn!("Failed to read rom {}: {}", path.as_ref().display(), error);
			Err(GameboyError::Io("Failed to read the rom file."))
		}
	}
}

/// The path of a sidecar next to the given rom.
pub fn sidecar_path<P: AsRef<Path>>(rom_path: P, extension: &str) -> PathBuf {
	let mut path = rom_path.as_ref().to_path_buf();
	path.set_extension(extension);
	path
}

/// Fills `ram` from the rom's `.sav` sidecar, when one exists.
///
/// A missing or short sidecar is treated as "no save": the ram stays
/// zeroed and the emulation proceeds.
pub fn load_battery_ram<P: AsRef<Path>>(rom_path: P, ram: &mut [u8]) {
	let path = sidecar_path(rom_path, "sav");

	let data = match fs::read(&path) {
		Ok(data) => data,
		Err(_) => return,
	};

	if data.len() != ram.len() {
		warn!("Discarding corrupt save {} ({} bytes, wanted {})",
			  path.display(), data.len(), ram.len());
		return;
	}

	ram.copy_from_slice(&data);
	info!("Restored battery ram from {}", path.display());
}

/// Writes `ram` to the rom's `.sav` sidecar.
pub fn store_battery_ram<P: AsRef<Path>>(rom_path: P, ram: &[u8]) -> Result<(), GameboyError> {
	write_sidecar(sidecar_path(rom_path, "sav"), ram)
}

/// Reads the rom's `.rtc` sidecar. Returns the stored counters and the
/// wall-clock seconds that passed since they were written.
pub fn load_rtc<P: AsRef<Path>>(rom_path: P) -> Option<([u8; 5], u64)> {
	let path = sidecar_path(rom_path, "rtc");

	let data = fs::read(&path).ok()?;
	if data.len() != RTC_SIDECAR_LEN {
		warn!("Discarding corrupt rtc sidecar {}", path.display());
		return None;
	}

	let mut registers = [0_u8; 5];
	registers.copy_from_slice(&data[..5]);

	let mut stamp = [0_u8; 8];
	stamp.copy_from_slice(&data[5..]);
	let stored = i64::from_le_bytes(stamp);

	let elapsed = (Utc::now().timestamp() - stored).max(0) as u64;

	Some((registers, elapsed))
}

/// Writes the rtc counters to the rom's `.rtc` sidecar, stamped with the
/// current wall clock.
pub fn store_rtc<P: AsRef<Path>>(rom_path: P, registers: [u8; 5]) -> Result<(), GameboyError> {
	let mut data = [0_u8; RTC_SIDECAR_LEN];
	data[..5].copy_from_slice(&registers);
	data[5..].copy_from_slice(&Utc::now().timestamp().to_le_bytes());

	write_sidecar(sidecar_path(rom_path, "rtc"), &data)
}

/// Tempfile-then-rename write, so a crash mid-write leaves the previous
/// sidecar intact.
fn write_sidecar(path: PathBuf, data: &[u8]) -> Result<(), GameboyError> {
	let mut temp = path.clone();
	temp.set_extension("tmp");

	let result = fs::File::create(&temp)
		.and_then(|mut file| file.write_all(data))
		.and_then(|_| fs::rename(&temp, &path));

	match result {
		Ok(_) => Ok(()),
		Err(error) => {
			warn!("Failed to write sidecar {}: {}", path.display(), error);
			let _ = fs::remove_file(&temp);
			Err(GameboyError::Io("Failed to write the sidecar file."))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scratch_rom_path(name: &str) -> PathBuf {
		let mut path = std::env::temp_dir();
		path.push(format!("gbc-core-{}-{}.gb", name, std::process::id()));
		path
	}

	#[test]
	fn test_battery_ram_round_trip() {
		let rom_path = scratch_rom_path("sav");

		let saved: Vec<u8> = (0..=255).cycle().take(0x8000).collect();
		store_battery_ram(&rom_path, &saved).unwrap();

		let mut restored = vec![0_u8; 0x8000];
		load_battery_ram(&rom_path, &mut restored);
		assert!(saved == restored);

		let _ = fs::remove_file(sidecar_path(&rom_path, "sav"));
	}

	#[test]
	fn test_short_save_discarded() {
		let rom_path = scratch_rom_path("shortsav");

		store_battery_ram(&rom_path, &[1, 2, 3]).unwrap();

		// The mismatched sidecar leaves the buffer untouched.
		let mut ram = [0xEE_u8; 16];
		load_battery_ram(&rom_path, &mut ram);
		assert!(ram.iter().all(|byte| *byte == 0xEE));

		let _ = fs::remove_file(sidecar_path(&rom_path, "sav"));
	}

	#[test]
	fn test_rtc_round_trip() {
		let rom_path = scratch_rom_path("rtc");

		store_rtc(&rom_path, [1, 2, 3, 4, 0]).unwrap();

		let (registers, elapsed) = load_rtc(&rom_path).unwrap();
		assert_eq!([1, 2, 3, 4, 0], registers);
		// Written just now.
		assert!(elapsed < 5);

		let _ = fs::remove_file(sidecar_path(&rom_path, "rtc"));
	}

	#[test]
	fn test_missing_sidecars() {
		let rom_path = scratch_rom_path("missing");

		let mut ram = [0_u8; 4];
		load_battery_ram(&rom_path, &mut ram);
		assert!(load_rtc(&rom_path).is_none());
	}
}
