use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, KEY_COUNT, SPRITE_HEIGHT, SPRITE_SHEET_START, STACK_SIZE,
};
use crate::error::Chip8Error;
use crate::opcode::Opcode;
use crate::peripherals::Sound;
use crate::state::{State, BLANK_FRAME};

/// What an operation may touch besides the machine state it is handed
pub struct Context<'a> {
    pub pressed_keys: &'a [bool; KEY_COUNT],
    pub rng: &'a mut StdRng,
    pub sound: &'a mut dyn Sound,
}

impl Context<'_> {
    fn is_pressed(&self, key: u8) -> bool {
        self.pressed_keys
            .get(key as usize)
            .copied()
            .unwrap_or(false)
    }
}

// Every operation runs after the fetch has already moved the pc past it, so
// "skip" means one more instruction and a jump overwrites the pc outright.
// VF is always written after Vx so the flag survives when x is F.

/// clear
pub fn cls(_op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    Ok(State {
        frame_buffer: BLANK_FRAME,
        pending_clear: BLANK_FRAME,
        draw_flag: true,
        ..*state
    })
}

/// PC = STACK.pop()
pub fn rts(_op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let sp = state.sp.checked_sub(1).ok_or(Chip8Error::StackUnderflow)?;
    Ok(State {
        pc: state.stack[sp as usize],
        sp,
        ..*state
    })
}

/// PC = NNN
pub fn jump(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    Ok(State {
        pc: op.nnn(),
        ..*state
    })
}

/// STACK.push(PC); PC = NNN
pub fn call(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    if state.sp as usize >= STACK_SIZE {
        return Err(Chip8Error::StackOverflow);
    }
    let mut stack = state.stack;
    stack[state.sp as usize] = state.pc;
    Ok(State {
        pc: op.nnn(),
        sp: state.sp + 1,
        stack,
        ..*state
    })
}

fn skip_if(condition: bool, state: &State) -> Result<State, Chip8Error> {
    let pc = if condition {
        state.pc.wrapping_add(2)
    } else {
        state.pc
    };
    Ok(State { pc, ..*state })
}

/// if Vx == NN then skip
pub fn ske(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    skip_if(state.v[op.x() as usize] == op.nn(), state)
}

/// if Vx != NN then skip
pub fn skne(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    skip_if(state.v[op.x() as usize] != op.nn(), state)
}

/// if Vx == Vy then skip
pub fn skre(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    skip_if(state.v[op.x() as usize] == state.v[op.y() as usize], state)
}

/// Vx = NN
pub fn load(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = op.nn();
    Ok(State { v, ..*state })
}

/// Vx += NN
/// Wraps at 8 bits; VF is left alone
pub fn add(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = v[op.x() as usize].wrapping_add(op.nn());
    Ok(State { v, ..*state })
}

/// Vx = Vy
pub fn mv(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx |= Vy
pub fn or(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] |= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx &= Vy
pub fn and(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] &= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx ^= Vy
pub fn xor(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] ^= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx += Vy; VF = carry
pub fn addr(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let (res, carry) = state.v[op.x() as usize].overflowing_add(state.v[op.y() as usize]);
    let mut v = state.v;
    v[op.x() as usize] = res;
    v[0xF] = carry as u8;
    Ok(State { v, ..*state })
}

/// Vx -= Vy; VF = no borrow (Vx >= Vy)
pub fn sub(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let (res, borrow) = state.v[op.x() as usize].overflowing_sub(state.v[op.y() as usize]);
    let mut v = state.v;
    v[op.x() as usize] = res;
    v[0xF] = !borrow as u8;
    Ok(State { v, ..*state })
}

/// Vx >>= 1; VF = bit shifted out
pub fn shr(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    let lsb = v[op.x() as usize] & 0x1;
    v[op.x() as usize] >>= 1;
    v[0xF] = lsb;
    Ok(State { v, ..*state })
}

/// Vx = Vy - Vx; VF = no borrow (Vy >= Vx)
pub fn subn(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let (res, borrow) = state.v[op.y() as usize].overflowing_sub(state.v[op.x() as usize]);
    let mut v = state.v;
    v[op.x() as usize] = res;
    v[0xF] = !borrow as u8;
    Ok(State { v, ..*state })
}

/// Vx <<= 1; VF = bit shifted out
pub fn shl(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    let msb = v[op.x() as usize] >> 7;
    v[op.x() as usize] <<= 1;
    v[0xF] = msb;
    Ok(State { v, ..*state })
}

/// if Vx != Vy then skip
pub fn skrne(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    skip_if(state.v[op.x() as usize] != state.v[op.y() as usize], state)
}

/// I = NNN
pub fn loadi(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    Ok(State {
        i: op.nnn(),
        ..*state
    })
}

/// PC = V0 + NNN
pub fn jumpi(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    Ok(State {
        pc: u16::from(state.v[0x0]) + op.nnn(),
        ..*state
    })
}

/// Vx = rand_byte & NN
pub fn rand(op: &dyn Opcode, state: &State, ctx: &mut Context) -> Result<State, Chip8Error> {
    let rand_byte: u8 = ctx.rng.gen();
    let mut v = state.v;
    v[op.x() as usize] = rand_byte & op.nn();
    Ok(State { v, ..*state })
}

/// draw_sprite(x=Vx y=Vy size=N)
/// XORs a sprite from memory I..I+N at position x, y on the FrameBuffer with wrapping.
///
/// Pixels the sprite turns off are only marked in `pending_clear`; they stay lit
/// until the start of the next draw, which clears them before testing for
/// collisions. VF is set if any lit pixel is turned off.
pub fn draw(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    let mut frame_buffer = state.frame_buffer;
    let mut pending_clear = state.pending_clear;
    let mut draw_flag = state.draw_flag;

    for (row, pending_row) in frame_buffer.iter_mut().zip(pending_clear.iter_mut()) {
        for (pixel, pending) in row.iter_mut().zip(pending_row.iter_mut()) {
            if *pending {
                draw_flag |= *pixel;
                *pixel = false;
                *pending = false;
            }
        }
    }

    let start_x = state.v[op.x() as usize] as usize;
    let start_y = state.v[op.y() as usize] as usize;
    let mut collision = false;

    for byte in 0..op.n() as usize {
        let sprite_row = state.read(state.i.wrapping_add(byte as u16));
        let y = (start_y + byte) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            let x = (start_x + bit) % DISPLAY_WIDTH;
            let sprite_pixel = (sprite_row >> (7 - bit)) & 1 == 1;
            let old = frame_buffer[y][x];
            let new = old ^ sprite_pixel;

            if new != old {
                draw_flag = true;
            }
            if new {
                frame_buffer[y][x] = true;
            } else {
                pending_clear[y][x] = true;
            }
            if old && !new {
                collision = true;
            }
        }
    }

    v[0xF] = collision as u8;

    Ok(State {
        v,
        frame_buffer,
        pending_clear,
        draw_flag,
        ..*state
    })
}

/// if Vx.pressed then skip
pub fn skpr(op: &dyn Opcode, state: &State, ctx: &mut Context) -> Result<State, Chip8Error> {
    skip_if(ctx.is_pressed(state.v[op.x() as usize]), state)
}

/// if !Vx.pressed then skip
pub fn skup(op: &dyn Opcode, state: &State, ctx: &mut Context) -> Result<State, Chip8Error> {
    skip_if(!ctx.is_pressed(state.v[op.x() as usize]), state)
}

/// Vx = DT
pub fn moved(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = state.delay_timer;
    Ok(State { v, ..*state })
}

/// await keypress for Vx
/// Takes the lowest pressed key. With nothing pressed the pc is wound back
/// so the next step runs this instruction again.
pub fn keyd(op: &dyn Opcode, state: &State, ctx: &mut Context) -> Result<State, Chip8Error> {
    match ctx.pressed_keys.iter().position(|&pressed| pressed) {
        Some(key) => {
            let mut v = state.v;
            v[op.x() as usize] = key as u8;
            Ok(State { v, ..*state })
        }
        None => {
            log::trace!("waiting on a key press for V{:X}", op.x());
            Ok(State {
                pc: state.pc.wrapping_sub(2),
                ..*state
            })
        }
    }
}

/// DT = Vx
pub fn loads(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    Ok(State {
        delay_timer: state.v[op.x() as usize],
        ..*state
    })
}

/// ST = Vx
/// Beeps for Vx milliseconds; a zero-length beep is still handed to the sound device
pub fn ld(op: &dyn Opcode, state: &State, ctx: &mut Context) -> Result<State, Chip8Error> {
    let millis = u64::from(state.v[op.x() as usize]);
    ctx.sound.beep(Duration::from_millis(millis));
    Ok(*state)
}

/// I += Vx
pub fn addi(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    Ok(State {
        i: state.i.wrapping_add(u16::from(state.v[op.x() as usize])),
        ..*state
    })
}

/// I = Vx * 5
/// Set I to the memory address of the glyph for Vx
/// See constants::SPRITE_SHEET
pub fn ldspr(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    Ok(State {
        i: SPRITE_SHEET_START + u16::from(state.v[op.x() as usize]) * SPRITE_HEIGHT,
        ..*state
    })
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address I
pub fn bcd(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let value = state.v[op.x() as usize];
    let digits = [value / 100, value / 10 % 10, value % 10];
    let mut next = *state;
    for (offset, digit) in digits.iter().enumerate() {
        next.write(state.i.wrapping_add(offset as u16), *digit);
    }
    Ok(next)
}

/// mem[I..=I+x] = V0..=Vx
/// I itself is left unchanged
pub fn stor(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut next = *state;
    for register in 0..=op.x() {
        next.write(
            state.i.wrapping_add(u16::from(register)),
            state.v[register as usize],
        );
    }
    Ok(next)
}

/// V0..=Vx = mem[I..=I+x]
/// I itself is left unchanged
pub fn read(op: &dyn Opcode, state: &State, _ctx: &mut Context) -> Result<State, Chip8Error> {
    let mut v = state.v;
    for register in 0..=op.x() {
        v[register as usize] = state.read(state.i.wrapping_add(u16::from(register)));
    }
    Ok(State { v, ..*state })
}
