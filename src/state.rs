use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, MEMORY_SIZE, PROGRAM_START, SPRITE_SHEET, SPRITE_SHEET_START,
    STACK_SIZE,
};

/// A snapshot of the Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) doubles as the carry, borrow and collision flag
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter; always points at the next instruction to fetch
///
/// Pointer
/// - (sp) the number of return addresses currently on the stack
///
/// Timers
/// - an 8-bit delay timer, counted down at 60Hz
/// - the sound timer is not kept here; setting it hands a beep straight to the sound device
///
/// ## Memory
/// - 16 entry stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x050 holds the sprite sheet
///     - programs are loaded from 0x200
/// - 64x32 frame buffer
///     - plus a grid of pixels waiting to be cleared by the next draw
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct State {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub stack: [u16; STACK_SIZE],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub pending_clear: FrameBuffer,
    pub draw_flag: bool,
}

impl State {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        let font = SPRITE_SHEET_START as usize;
        memory[font..font + SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            stack: [0; STACK_SIZE],
            memory,
            frame_buffer: BLANK_FRAME,
            pending_clear: BLANK_FRAME,
            // present the blank screen on the first tick
            draw_flag: true,
        }
    }

    /// Reads the byte at `address`; addresses wrap around the end of memory
    pub fn read(&self, address: u16) -> u8 {
        self.memory[address as usize % MEMORY_SIZE]
    }

    /// Writes `value` to `address`; addresses wrap around the end of memory
    pub fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize % MEMORY_SIZE] = value;
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// The FrameBuffer is indexed as [y][x]; `true` is a lit pixel
pub type FrameBuffer = [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

pub const BLANK_FRAME: FrameBuffer = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
