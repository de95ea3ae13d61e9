//! A CHIP-8 interpreter core.
//!
//! [`Chip8`] owns the machine and is driven from outside: call
//! [`Chip8::step`] once per instruction and [`Chip8::tick_timers`] at 60Hz.
//! Frames reach the host through a [`Renderer`] and beeps through a [`Sound`].

pub use chip8::Chip8;
pub use error::Chip8Error;
pub use peripherals::{Mute, Renderer, Sound};
pub use state::FrameBuffer;

mod chip8;
pub mod constants;
mod error;
mod instruction;
mod opcode;
mod operations;
mod peripherals;
pub mod state;
