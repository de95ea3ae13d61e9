use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{KEY_COUNT, MAX_PROGRAM_SIZE, PROGRAM_START};
use crate::error::Chip8Error;
use crate::instruction;
use crate::operations::Context;
use crate::peripherals::{Renderer, Sound};
use crate::state::{FrameBuffer, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - `pressed_keys` with public interfaces for manipulating them
///  - the random source used by `CXNN`
///
/// Supplies interfaces for:
/// - resetting and loading programs
/// - pressing and releasing keys
/// - executing one instruction at a time
/// - ticking its timers at 60Hz, which is also when the `renderer` sees new frames
///
/// Nothing here is synchronized; one caller drives `step` and `tick_timers`
/// and must serialize any key events coming from elsewhere.
pub struct Chip8<R: Renderer, S: Sound> {
    state: State,
    pressed_keys: [bool; KEY_COUNT],
    rng: StdRng,
    renderer: R,
    sound: S,
}

impl<R: Renderer, S: Sound> Chip8<R, S> {
    pub fn new(renderer: R, sound: S) -> Self {
        Self::with_rng(renderer, sound, StdRng::from_entropy())
    }

    /// Same as `new` but `CXNN` produces the same sequence on every run
    pub fn seeded(renderer: R, sound: S, seed: u64) -> Self {
        Self::with_rng(renderer, sound, StdRng::seed_from_u64(seed))
    }

    fn with_rng(renderer: R, sound: S, rng: StdRng) -> Self {
        Chip8 {
            state: State::new(),
            pressed_keys: [false; KEY_COUNT],
            rng,
            renderer,
            sound,
        }
    }

    /// Puts the machine back to power-on: memory holds only the sprite sheet,
    /// registers, stack, timers and screen are zeroed and the pc is at 0x200.
    /// Keys that are held down stay held.
    pub fn reset(&mut self) {
        log::debug!("reset");
        self.state = State::new();
    }

    /// Resets the machine and copies a program image to 0x200
    ///
    /// # Arguments
    /// * `program` the raw program bytes, at most 3584 of them
    pub fn load(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::ProgramTooLarge {
                size: program.len(),
                max_size: MAX_PROGRAM_SIZE,
            });
        }
        self.reset();
        let start = PROGRAM_START as usize;
        self.state.memory[start..start + program.len()].copy_from_slice(program);
        log::debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the keypad code, 0x0..=0xF
    pub fn key_press(&mut self, key: u8) -> Result<(), Chip8Error> {
        *self.key_mut(key)? = true;
        Ok(())
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the keypad code, 0x0..=0xF
    pub fn key_release(&mut self, key: u8) -> Result<(), Chip8Error> {
        *self.key_mut(key)? = false;
        Ok(())
    }

    fn key_mut(&mut self, key: u8) -> Result<&mut bool, Chip8Error> {
        self.pressed_keys
            .get_mut(key as usize)
            .ok_or(Chip8Error::InvalidKey(key))
    }

    /// Executes a single instruction
    /// - fetches the opcode at the pc and moves the pc past it
    /// - decodes and executes it
    ///
    /// If the opcode is rejected, the pc stays past it and nothing else changes.
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        let address = self.state.pc;
        let op: u16 = self.get_op();
        self.state.pc = address.wrapping_add(2);
        log::trace!(
            "{:04X} pc{:04X} v{:02X?} i{:04X}",
            op,
            address,
            self.state.v,
            self.state.i
        );

        let operation = instruction::from_op(&op).ok_or_else(|| {
            log::warn!("rejected {:04X} at {:04X}", op, address);
            Chip8Error::InvalidInstruction {
                opcode: op,
                address,
            }
        })?;

        let mut ctx = Context {
            pressed_keys: &self.pressed_keys,
            rng: &mut self.rng,
            sound: &mut self.sound,
        };
        self.state = operation(&op, &self.state, &mut ctx)?;
        Ok(())
    }

    /// Advances the 60Hz clock
    /// - decrements the delay timer down to 0
    /// - hands the frame to the renderer if it changed since the last tick
    pub fn tick_timers(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);

        if self.state.draw_flag {
            self.renderer.present(&self.state.frame_buffer);
            self.state.draw_flag = false;
        }
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn get_op(&self) -> u16 {
        let left = u16::from(self.state.read(self.state.pc));
        let right = u16::from(self.state.read(self.state.pc.wrapping_add(1)));
        left << 8 | right
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn sound(&self) -> &S {
        &self.sound
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::constants::{MEMORY_SIZE, SPRITE_SHEET};
    use crate::peripherals::Mute;

    #[derive(Default)]
    struct Frames(Vec<FrameBuffer>);

    impl Renderer for Frames {
        fn present(&mut self, frame: &FrameBuffer) {
            self.0.push(*frame);
        }
    }

    #[derive(Default)]
    struct Beeps(Vec<Duration>);

    impl Sound for Beeps {
        fn beep(&mut self, duration: Duration) {
            self.0.push(duration);
        }
    }

    fn chip8_with(program: &[u8]) -> Chip8<Frames, Beeps> {
        let mut chip8 = Chip8::seeded(Frames::default(), Beeps::default(), 8);
        chip8.load(program).unwrap();
        chip8
    }

    #[test]
    fn test_chip8_gets_op() {
        let chip8 = chip8_with(&[0xAA, 0xBB]);
        assert_eq!(chip8.get_op(), 0xAABB);
    }

    #[test]
    fn test_step_advances_pc() {
        let mut chip8 = chip8_with(&[0x00, 0xE0]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let mut chip8 = chip8_with(&[0x60, 0x05, 0xA3, 0x00, 0x23, 0x00]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        chip8.step().unwrap();
        chip8.state.delay_timer = 9;
        chip8.state.frame_buffer[2][2] = true;
        chip8.reset();

        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.i, 0);
        assert_eq!(chip8.state.sp, 0);
        assert_eq!(chip8.state.v, [0; 16]);
        assert_eq!(chip8.state.stack, [0; 16]);
        assert_eq!(chip8.state.delay_timer, 0);
        assert!(!chip8.frame()[2][2]);
        assert_eq!(chip8.state.memory[..80], SPRITE_SHEET[..]);
        assert!(chip8.state.memory[80..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut chip8 = chip8_with(&[0x12, 0x34]);
        chip8.reset();
        let once = chip8.state.memory;
        chip8.reset();
        assert_eq!(chip8.state.memory[..], once[..]);
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_reset_keeps_held_keys() {
        let mut chip8 = chip8_with(&[]);
        chip8.key_press(0x4).unwrap();
        chip8.reset();
        assert!(chip8.pressed_keys[0x4]);
    }

    #[test]
    fn test_load_copies_program() {
        let chip8 = chip8_with(&[0x12, 0x34, 0x56]);
        assert_eq!(chip8.state.memory[0x200..0x204], [0x12, 0x34, 0x56, 0x00]);
    }

    #[test]
    fn test_load_resets() {
        let mut chip8 = chip8_with(&[0x61, 0x09]);
        chip8.step().unwrap();
        chip8.load(&[0x00, 0xE0]).unwrap();
        assert_eq!(chip8.state.v[0x1], 0);
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_load_fills_memory() {
        let program = vec![0xAB; MAX_PROGRAM_SIZE];
        let chip8 = chip8_with(&program);
        assert_eq!(chip8.state.memory[MEMORY_SIZE - 1], 0xAB);
    }

    #[test]
    fn test_load_rejects_oversized_program() {
        let mut chip8 = chip8_with(&[0x12, 0x34]);
        let program = vec![0xAB; MAX_PROGRAM_SIZE + 1];
        assert_eq!(
            chip8.load(&program),
            Err(Chip8Error::ProgramTooLarge {
                size: MAX_PROGRAM_SIZE + 1,
                max_size: MAX_PROGRAM_SIZE,
            })
        );
        // the previous program is untouched
        assert_eq!(chip8.state.memory[0x200..0x202], [0x12, 0x34]);
    }

    #[test]
    fn test_key_press_and_release() {
        let mut chip8 = chip8_with(&[]);
        chip8.key_press(0xE).unwrap();
        chip8.key_press(0xE).unwrap();
        assert!(chip8.pressed_keys[0xE]);
        chip8.key_release(0xE).unwrap();
        assert!(!chip8.pressed_keys[0xE]);
        chip8.key_release(0xE).unwrap();
        assert!(!chip8.pressed_keys[0xE]);
    }

    #[test]
    fn test_key_out_of_range_is_rejected() {
        let mut chip8 = chip8_with(&[]);
        assert_eq!(chip8.key_press(0x10), Err(Chip8Error::InvalidKey(0x10)));
        assert_eq!(chip8.key_release(0xFF), Err(Chip8Error::InvalidKey(0xFF)));
        assert!(chip8.pressed_keys.iter().all(|&pressed| !pressed));
    }

    #[test]
    fn test_set_then_add() {
        let mut chip8 = chip8_with(&[0x60, 0x05, 0x70, 0x03]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x0], 8);
        assert_eq!(chip8.state.pc, 516);
    }

    #[test]
    fn test_set_index() {
        let mut chip8 = chip8_with(&[0xA2, 0x00]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.i, 0x200);
    }

    #[test]
    fn test_skips_advance_by_four() {
        // V1 = 1, key 1 held; each pair is (skipping, not skipping)
        let cases: [(u16, u16); 5] = [
            (0x3101, 0x3102),
            (0x4102, 0x4101),
            (0x5110, 0x5120),
            (0x9120, 0x9110),
            (0xE19E, 0xE2A1),
        ];
        for &(skips, doesnt) in cases.iter() {
            for &(op, expected) in [(skips, 0x204), (doesnt, 0x202)].iter() {
                let mut chip8 = chip8_with(&op.to_be_bytes());
                chip8.state.v[0x1] = 1;
                chip8.state.v[0x2] = 2;
                chip8.key_press(0x1).unwrap();
                chip8.key_press(0x2).unwrap();
                chip8.step().unwrap();
                assert_eq!(chip8.state.pc, expected, "{:04X}", op);
            }
        }
    }

    #[test]
    fn test_wait_for_key_takes_pressed_key() {
        let mut chip8 = chip8_with(&[0xF0, 0x0A]);
        chip8.key_press(0x1).unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x0], 1);
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_wait_for_key_busy_waits() {
        let mut chip8 = chip8_with(&[0xF0, 0x0A]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x200);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x200);

        chip8.key_press(0x7).unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x0], 7);
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_invalid_instruction_only_advances_pc() {
        let mut chip8 = chip8_with(&[0x61, 0x09, 0x81, 0x28]);
        chip8.step().unwrap();
        let before = chip8.state;
        assert_eq!(
            chip8.step(),
            Err(Chip8Error::InvalidInstruction {
                opcode: 0x8128,
                address: 0x202,
            })
        );
        assert_eq!(chip8.state, State { pc: 0x204, ..before });
    }

    #[test]
    fn test_each_invalid_subgroup_is_reported() {
        for op in [0x0000u16, 0x8008, 0xE000, 0xF0FF] {
            let mut chip8 = chip8_with(&op.to_be_bytes());
            assert!(matches!(
                chip8.step(),
                Err(Chip8Error::InvalidInstruction { .. })
            ));
        }
    }

    #[test]
    fn test_stack_underflow_is_reported() {
        let mut chip8 = chip8_with(&[0x00, 0xEE]);
        assert_eq!(chip8.step(), Err(Chip8Error::StackUnderflow));
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.sp, 0);
    }

    #[test]
    fn test_stack_overflow_is_reported() {
        // calls itself forever
        let mut chip8 = chip8_with(&[0x22, 0x00]);
        for _ in 0..16 {
            chip8.step().unwrap();
        }
        assert_eq!(chip8.step(), Err(Chip8Error::StackOverflow));
        assert_eq!(chip8.state.sp, 16);
    }

    #[test]
    fn test_subroutine_round_trip() {
        // 0x200: call 0x206; 0x202: V0 = 1; 0x204: jump 0x204; 0x206: V1 = 2; 0x208: return
        let mut chip8 = chip8_with(&[0x22, 0x06, 0x60, 0x01, 0x12, 0x04, 0x61, 0x02, 0x00, 0xEE]);
        for _ in 0..4 {
            chip8.step().unwrap();
        }
        assert_eq!(chip8.state.v[0x0], 1);
        assert_eq!(chip8.state.v[0x1], 2);
        assert_eq!(chip8.state.pc, 0x204);
        assert_eq!(chip8.state.sp, 0);
    }

    #[test]
    fn test_random_is_deterministic_when_seeded() {
        let program = [0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0x0F];
        let mut first = Chip8::seeded(Frames::default(), Mute, 42);
        let mut second = Chip8::seeded(Frames::default(), Mute, 42);
        first.load(&program).unwrap();
        second.load(&program).unwrap();
        for _ in 0..3 {
            first.step().unwrap();
            second.step().unwrap();
        }
        assert_eq!(first.state.v, second.state.v);
        assert_eq!(first.state.v[0x2] & 0xF0, 0);
    }

    #[test]
    fn test_random_unseeded_is_masked() {
        let mut chip8 = Chip8::new(Frames::default(), Mute);
        chip8.load(&[0xC3, 0x81]).unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x3] & !0x81, 0);
    }

    #[test]
    fn test_register_dump_and_load_round_trip() {
        // V0..V3 = 1..4, I = 0x300, dump, zero V0..V3, load
        let program = [
            0x60, 0x01, 0x61, 0x02, 0x62, 0x03, 0x63, 0x04, 0xA3, 0x00, 0xF3, 0x55, 0x60, 0x00,
            0x61, 0x00, 0x62, 0x00, 0x63, 0x00, 0xF3, 0x65,
        ];
        let mut chip8 = chip8_with(&program);
        for _ in 0..11 {
            chip8.step().unwrap();
        }
        assert_eq!(chip8.state.v[0x0..0x4], [1, 2, 3, 4]);
        assert_eq!(chip8.state.memory[0x300..0x304], [1, 2, 3, 4]);
    }

    #[test]
    fn test_collision_flag() {
        // I = 0x300 holds 0x80; draw a 1x1 sprite at (0, 0) twice
        let mut chip8 = chip8_with(&[0xA3, 0x00, 0xD0, 0x01, 0xD0, 0x01]);
        chip8.state.memory[0x300] = 0x80;
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0xF], 0);
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0xF], 1);
    }

    #[test]
    fn test_tick_decrements_delay_timer() {
        let mut chip8 = chip8_with(&[0x60, 0x02, 0xF0, 0x15, 0xF1, 0x07]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        chip8.tick_timers();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 1);
        chip8.tick_timers();
        chip8.tick_timers();
        assert_eq!(chip8.state.delay_timer, 0);
    }

    #[test]
    fn test_tick_presents_only_changed_frames() {
        // draw the glyph for 0 at (0, 0)
        let mut chip8 = chip8_with(&[0xD0, 0x05]);
        chip8.tick_timers();
        assert_eq!(chip8.renderer().0.len(), 1);
        assert!(chip8.renderer().0[0].iter().flatten().all(|&lit| !lit));

        chip8.tick_timers();
        assert_eq!(chip8.renderer().0.len(), 1);

        chip8.step().unwrap();
        chip8.tick_timers();
        assert_eq!(chip8.renderer().0.len(), 2);
        assert!(chip8.renderer().0[1][0][0..4].iter().all(|&lit| lit));
        assert_eq!(chip8.renderer().0[1], *chip8.frame());
    }

    #[test]
    fn test_sound_timer_beeps() {
        let mut chip8 = chip8_with(&[0x63, 0x3C, 0xF3, 0x18, 0x64, 0x00, 0xF4, 0x18]);
        for _ in 0..4 {
            chip8.step().unwrap();
        }
        assert_eq!(
            chip8.sound().0,
            vec![Duration::from_millis(60), Duration::ZERO]
        );
    }

    #[test]
    fn test_closure_renderer_and_mute() {
        let mut presented = 0;
        {
            let mut chip8 = Chip8::seeded(|_: &FrameBuffer| presented += 1, Mute, 1);
            chip8.load(&[0x00, 0xE0]).unwrap();
            chip8.tick_timers();
            chip8.step().unwrap();
            chip8.tick_timers();
        }
        assert_eq!(presented, 2);
    }
}
