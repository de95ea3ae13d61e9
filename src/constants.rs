/// Addressable memory in bytes
pub const MEMORY_SIZE: usize = 4096;

/// Programs are loaded (and execution starts) here
pub const PROGRAM_START: u16 = 0x200;

/// Everything from `PROGRAM_START` to the end of memory is available to a program
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Depth of the call stack
pub const STACK_SIZE: usize = 16;

/// Keys 0..F of the hexadecimal keypad
pub const KEY_COUNT: usize = 16;

/// The delay timer counts down (and the sound timer is measured) at this rate
pub const TIMER_FREQUENCY: u32 = 60;

/// Default number of instructions executed per second
pub const CLOCK_SPEED: u32 = 500;

/// Where the sprite sheet lives in memory
pub const SPRITE_SHEET_START: u16 = 0x0;

/// Every glyph is 8x5; one byte per row
pub const SPRITE_HEIGHT: u16 = 5;

/// # Sprite sheet
/// Glyphs for the hexadecimal digits 0..F, one after another.
///
/// ```text
/// 0xF0  ####
/// 0x90  #  #
/// 0x90  #  #
/// 0x90  #  #
/// 0xF0  ####
/// ```
#[rustfmt::skip]
pub const SPRITE_SHEET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
