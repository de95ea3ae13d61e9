use std::path::PathBuf;

use clap::Parser;

use chip8vm::constants::CLOCK_SPEED;

mod display;
mod keymap;
mod run;

/// Runs a CHIP-8 program in an SDL2 window.
///
/// Keys 1-4, Q-R, A-F and Z-V stand in for the hexadecimal keypad; Escape quits.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the program image
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(short, long, default_value_t = CLOCK_SPEED)]
    clock: u32,

    /// Size of each CHIP-8 pixel on screen
    #[arg(short, long, default_value_t = 10)]
    scale: u32,

    /// Seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    run::run(&args.rom, args.clock, args.scale, args.seed)
}
