// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Curated color palettes for original-gameboy games running on color
//! hardware.
//!
//! The color boot rom picks a palette triplet for known DMG titles by
//! hashing the cartridge title bytes; this table carries the well-known
//! assignments (see the "Manual Select Palette Configurations" notes on
//! the CGB bootstrap rom).

use super::ppu::Color;

/// A four-shade palette, brightest first, as 0xRRGGBBAA.
pub type Palette = [Color; 4];

const WHITE: Color = 0xFFFFFFFF;
const BLACK: Color = 0x000000FF;
const YELLOW: Color = 0xFFFF00FF;
const RED: Color = 0xFF0000FF;
const BLUE: Color = 0x0000FFFF;

/// The palettes assigned to one game: background, and the two sprite
/// palettes.
#[derive(Clone, Copy)]
pub struct RomPalette {
	/// Background and window shades.
	pub bg: Palette,
	/// Sprite palette 0 shades.
	pub obj0: Palette,
	/// Sprite palette 1 shades.
	pub obj1: Palette,
}

impl RomPalette {
	const fn uniform(colors: Palette) -> Self {
		RomPalette { bg: colors, obj0: colors, obj1: colors }
	}

	const fn split(bg: Palette, obj: Palette) -> Self {
		RomPalette { bg, obj0: obj, obj1: obj }
	}
}

/// The neutral grey ramp used when the title hash isn't recognized.
pub const DEFAULT: RomPalette =
	RomPalette::uniform([WHITE, 0xA5A5A5FF, 0x525252FF, BLACK]);

/// Returns the curated palette for the given title-byte checksum.
pub fn for_title_checksum(hash: u8) -> RomPalette {
	match hash {
		0x71 | 0xFF =>
			RomPalette::uniform([WHITE, 0xFF9C00FF, RED, BLACK]),

		0x15 | 0xDB =>
			RomPalette::uniform([WHITE, YELLOW, RED, BLACK]),

		0x88 =>
			RomPalette::uniform([0xA59CFFFF, YELLOW, 0x006300FF, BLACK]),

		0x0C | 0x16 | 0x35 | 0x67 | 0x75 | 0x92 | 0x99 | 0xB7 =>
			RomPalette::uniform([WHITE, 0xFFAD63FF, 0x843100FF, BLACK]),

		0x28 | 0x41 | 0xA5 | 0xE8 =>
			RomPalette::uniform([BLACK, 0x008484FF, 0xFFDE00FF, WHITE]),

		0x58 =>
			DEFAULT,

		0x6F =>
			RomPalette::uniform([WHITE, 0xFFCE00FF, 0x9C6300FF, BLACK]),

		0x8C =>
			RomPalette {
				bg: [WHITE, 0xADAD84FF, 0x42737BFF, BLACK],
				obj0: [WHITE, 0xFF7300FF, 0x944200FF, BLACK],
				obj1: [WHITE, 0xADAD84FF, 0x42737BFF, BLACK],
			},

		0x61 | 0x45 =>
			RomPalette {
				bg: [WHITE, 0x63A5FFFF, BLUE, BLACK],
				obj0: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
				obj1: [WHITE, 0x63A5FFFF, BLUE, BLACK],
			},

		0x14 =>
			RomPalette {
				bg: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
				obj0: [WHITE, 0x7BFF31FF, 0x008400FF, BLACK],
				obj1: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
			},

		0xAA =>
			RomPalette {
				bg: [WHITE, 0x7BFF31FF, 0x0063C5FF, BLACK],
				obj0: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
				obj1: [WHITE, 0x7BFF31FF, 0x0063C5FF, BLACK],
			},

		0x3C =>
			RomPalette {
				bg: [WHITE, 0x63A5FFFF, BLUE, BLACK],
				obj0: [WHITE, 0x63A5FFFF, BLUE, BLACK],
				obj1: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
			},

		0x9C =>
			RomPalette {
				bg: [WHITE, 0x8C8CDEFF, 0x52528CFF, BLACK],
				obj0: [WHITE, 0x8C8CDEFF, 0x52528CFF, BLACK],
				obj1: [0xFFC542FF, 0xFFD600FF, 0x943A00FF, BLACK],
			},

		0xB3 | 0x55 =>
			RomPalette::split(
				[WHITE, 0xADAD84FF, 0x42737BFF, BLACK],
				[WHITE, 0xFF7300FF, 0x944200FF, BLACK]),

		0x34 | 0x66 | 0xF4 | 0x20 =>
			RomPalette::split(
				[WHITE, 0x7BFF00FF, 0xB57300FF, BLACK],
				[WHITE, 0xFF8484FF, 0x943A3AFF, BLACK]),

		0x3D | 0x6A | 0x49 =>
			RomPalette::split(
				[WHITE, 0x52FF00FF, 0xFF4200FF, BLACK],
				[WHITE, 0xFF8484FF, 0x943A3AFF, BLACK]),

		0x19 =>
			RomPalette::split(
				[WHITE, 0xFF9C00FF, RED, BLACK],
				[WHITE, 0xFF8484FF, 0x943A3AFF, BLACK]),

		// Kirby's Pinball Land
		0x1D =>
			RomPalette::split(
				[0xA59CFFFF, YELLOW, 0x006300FF, BLACK],
				[0xFF6352FF, 0xD60000FF, 0x630000FF, BLACK]),

		// Super Mario Land
		0x46 =>
			RomPalette::split(
				[0xB5B5FFFF, 0xFFFF94FF, 0xAD5A42FF, BLACK],
				[BLACK, WHITE, 0xFF8484FF, 0x943A3AFF]),

		// Pocket Bomberman
		0x0D =>
			RomPalette::split(
				[WHITE, 0x8C8CDEFF, 0x52528CFF, BLACK],
				[0xFFC542FF, 0xFFD600FF, 0x943A00FF, 0x4A0000FF]),

		0xBF =>
			RomPalette::split(
				[WHITE, 0x8C8CDEFF, 0x52528CFF, BLACK],
				[WHITE, 0xFF8484FF, 0x943A3AFF, BLACK]),

		0x4B | 0x90 | 0x9A | 0xBD =>
			RomPalette::split(
				[WHITE, 0x7BFF31FF, 0x008400FF, BLACK],
				[WHITE, 0xFF8484FF, 0x943A3AFF, BLACK]),

		0x39 | 0x43 | 0x97 =>
			RomPalette::split(
				[WHITE, 0xFFAD63FF, 0x843100FF, BLACK],
				[WHITE, 0x63A5FFFF, BLUE, BLACK]),

		0x00 | 0x18 | 0x3F | 0xC6 =>
			RomPalette::split(
				[WHITE, 0x7BFF31FF, 0x0063C5FF, BLACK],
				[WHITE, 0xFF8484FF, 0x943A3AFF, BLACK]),

		0x95 =>
			RomPalette {
				bg: [WHITE, 0x52FF00FF, 0xFF4200FF, BLACK],
				obj0: [WHITE, 0x52FF00FF, 0xFF4200FF, BLACK],
				obj1: [WHITE, 0x5ABDFFFF, RED, BLUE],
			},

		0x3E | 0xE0 =>
			RomPalette {
				bg: [WHITE, 0xFF9C00FF, 0xFF4200FF, BLACK],
				obj0: [WHITE, 0xFF9C00FF, RED, BLACK],
				obj1: [WHITE, 0x5ABDFFFF, RED, BLUE],
			},

		0x69 | 0xF2 =>
			RomPalette {
				bg: [WHITE, YELLOW, 0xFF4200FF, BLACK],
				obj0: [WHITE, YELLOW, RED, BLACK],
				obj1: [WHITE, 0x5ABDFFFF, RED, BLUE],
			},

		0x59 =>
			RomPalette {
				bg: [WHITE, 0xADAD84FF, 0x42737BFF, BLACK],
				obj0: [WHITE, 0xFF7300FF, 0x944200FF, BLACK],
				obj1: [WHITE, 0x5ABDFFFF, RED, BLUE],
			},

		// Donkey Kong Land
		0x86 | 0xA8 =>
			RomPalette {
				bg: [0xFFFF9CFF, 0x94B5FFFF, 0x639473FF, 0x003A3AFF],
				obj0: [0xFFC542FF, 0xFFD600FF, 0x943A00FF, 0x4A0000FF],
				obj1: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
			},

		// Tennis
		0xCE | 0xD1 | 0xF0 =>
			RomPalette {
				bg: [0x6BFF00FF, WHITE, 0xFF524AFF, BLACK],
				obj0: [WHITE, WHITE, 0x63A5FFFF, BLUE],
				obj1: [WHITE, 0xFFAD63FF, 0x843100FF, BLACK],
			},

		// Baseball
		0x36 =>
			RomPalette {
				bg: [0x52DE00FF, 0xFF8400FF, YELLOW, WHITE],
				obj0: [WHITE, WHITE, 0x63A5FFFF, BLUE],
				obj1: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
			},

		// Kirby
		0x27 | 0x5C =>
			RomPalette {
				bg: [0xA59CFFFF, YELLOW, 0x006300FF, BLACK],
				obj0: [0xFF6352FF, 0xD60000FF, 0x630000FF, BLACK],
				obj1: [0x0000FFFF, WHITE, 0xFFFF7BFF, 0x0084FFFF],
			},

		// Super Mario Land 2
		0xC9 =>
			RomPalette {
				bg: [0xFFFFCEFF, 0x63EFEFFF, 0x9C8431FF, 0x5A5A5AFF],
				obj0: [WHITE, 0xFF7300FF, 0x944200FF, BLACK],
				obj1: [WHITE, 0x63A5FFFF, BLUE, 0x0084FFFF],
			},

		// Wave Race
		0x4E =>
			RomPalette {
				bg: [WHITE, 0x63A5FFFF, BLUE, BLACK],
				obj0: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
				obj1: [WHITE, 0xFFFF7BFF, 0x0084FFFF, RED],
			},

		0x6B =>
			RomPalette {
				bg: [WHITE, 0x8C8CDEFF, 0x52528CFF, BLACK],
				obj0: [0xFFC542FF, 0xFFD600FF, 0x943A00FF, 0x4A0000FF],
				obj1: [WHITE, 0x5ABDFFFF, RED, BLUE],
			},

		// Killer Instinct
		0x9D =>
			RomPalette {
				bg: [WHITE, 0x8C8CDEFF, 0x52528CFF, BLACK],
				obj0: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
				obj1: [WHITE, 0xFFAD63FF, 0x843100FF, BLACK],
			},

		// Mystic Quest
		0x17 | 0x8B =>
			RomPalette {
				bg: [WHITE, 0x7BFF31FF, 0x008400FF, BLACK],
				obj0: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
				obj1: [WHITE, 0x63A5FFFF, BLUE, BLACK],
			},

		// Mega Man
		0x01 | 0x10 | 0x29 | 0x52 | 0x5D | 0x68 | 0x6D | 0xF6 =>
			RomPalette {
				bg: [WHITE, 0xFFAD63FF, 0x843100FF, BLACK],
				obj0: [WHITE, 0x63A5FFFF, BLUE, BLACK],
				obj1: [WHITE, 0x7BFF31FF, 0x008400FF, BLACK],
			},

		// Link's Awakening
		0x70 =>
			RomPalette {
				bg: [WHITE, 0xFF8484FF, 0x943A3AFF, BLACK],
				obj0: [WHITE, 0x00FF00FF, 0x318400FF, 0x004A00FF],
				obj1: [WHITE, 0x63A5FFFF, BLUE, BLACK],
			},

		_ => DEFAULT,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_known_hashes() {
		// Link's Awakening gets its red-tinted background.
		let palette = for_title_checksum(0x70);
		assert_eq!(0xFF8484FF, palette.bg[1]);

		// An unknown hash falls back to greys.
		let palette = for_title_checksum(0xB0);
		assert_eq!(DEFAULT.bg[1], palette.bg[1]);
	}

	#[test]
	fn test_single_sided_sprite_palettes() {
		// Several titles recolor only one of the two sprite palettes; the
		// other follows the background shades.
		let palette = for_title_checksum(0x8C);
		assert_eq!(0xFF7300FF, palette.obj0[1]);
		assert_eq!(palette.bg, palette.obj1);

		let palette = for_title_checksum(0x14);
		assert_eq!(0x7BFF31FF, palette.obj0[1]);
		assert_eq!(palette.bg, palette.obj1);

		let palette = for_title_checksum(0xAA);
		assert_eq!(0xFF8484FF, palette.obj0[1]);
		assert_eq!(palette.bg, palette.obj1);

		// And the mirrored cases, where sprite palette 1 is the odd one out.
		let palette = for_title_checksum(0x3C);
		assert_eq!(palette.bg, palette.obj0);
		assert_eq!(0xFF8484FF, palette.obj1[1]);

		let palette = for_title_checksum(0x9C);
		assert_eq!(palette.bg, palette.obj0);
		assert_eq!(0xFFC542FF, palette.obj1[0]);
	}
}
