// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Catch-all for the unmapped corners of the IO space.
//!
//! Everything with defined behavior is claimed by a peripheral before the
//! bus falls through to here: what remains is the unusable 0xFEA0-0xFEFF
//! strip, holes in the register file and the undocumented CGB ports.
//! Reads float to 0xFF and writes are dropped after being logged.

use log::debug;

use super::Memory;
use crate::GameboyError;

/// Handles reads and writes nothing else claims.
pub struct IoPorts;

impl IoPorts {
	/// Initialize the stub port handler.
	pub fn new() -> Self {
		IoPorts
	}
}

impl Memory for IoPorts {
	fn write(&mut self, address: u16, value: u8) -> Result<(), GameboyError> {
		debug!("Dropping write of 0x{:02x} to unmapped port 0x{:04x}", value, address);

		Ok(())
	}

	fn read(&self, _address: u16) -> Result<u8, GameboyError> {
		// Open bus.
		Ok(0xFF)
	}
}
