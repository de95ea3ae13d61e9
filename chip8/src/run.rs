use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use chip8vm::constants::TIMER_FREQUENCY;
use chip8vm::{Chip8, Mute};

use crate::display::Display;
use crate::keymap::keymap;

pub fn run(rom: &Path, clock: u32, scale: u32, seed: Option<u64>) -> anyhow::Result<()> {
    // Get SDL2 context
    let sdl = sdl2::init().map_err(anyhow::Error::msg)?;
    let display = Display::new(&sdl, scale)?;
    let mut events = sdl.event_pump().map_err(anyhow::Error::msg)?;

    let mut chip8 = match seed {
        Some(seed) => Chip8::seeded(display, Mute, seed),
        None => Chip8::new(display, Mute),
    };

    // Load ROM
    let program =
        std::fs::read(rom).with_context(|| format!("unable to read {}", rom.display()))?;
    chip8.load(&program)?;
    log::info!("loaded {} ({} bytes)", rom.display(), program.len());

    // Set initial timing; instructions and timers run on separate cadences
    let cycle_time = Duration::from_secs(1) / clock.max(1);
    let tick_time = Duration::from_secs(1) / TIMER_FREQUENCY;
    let mut last_tick = Instant::now();

    'event: loop {
        let cycle_start = Instant::now();

        // Handle input
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'event,
                Event::KeyDown {
                    keycode: Some(key), ..
                } => {
                    if let Some(code) = keymap(key) {
                        chip8.key_press(code)?;
                    }
                }
                Event::KeyUp {
                    keycode: Some(key), ..
                } => {
                    if let Some(code) = keymap(key) {
                        chip8.key_release(code)?;
                    }
                }
                _ => continue,
            };
        }

        // Update state
        if let Err(e) = chip8.step() {
            log::error!("halting: {}", e);
            return Err(e.into());
        }

        // Catch the timers up with the wall clock
        while last_tick.elapsed() >= tick_time {
            chip8.tick_timers();
            last_tick += tick_time;
        }

        // Handle timing
        let elapsed_cycle_time = cycle_start.elapsed();
        if cycle_time > elapsed_cycle_time {
            std::thread::sleep(cycle_time - elapsed_cycle_time);
        }
    }

    log::info!("exiting");
    Ok(())
}
