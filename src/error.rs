use thiserror::Error;

/// Everything the interpreter reports back to whoever is driving it.
///
/// None of these are recovered from internally; the caller decides whether
/// to halt, skip or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Chip8Error {
    /// The word matched no handler at any level of the decode table
    #[error("instruction {opcode:#06X} at {address:#05X} is not valid")]
    InvalidInstruction { opcode: u16, address: u16 },

    #[error("program is {size} bytes but only {max_size} bytes are available")]
    ProgramTooLarge { size: usize, max_size: usize },

    #[error("call stack overflow: subroutines nested too deeply")]
    StackOverflow,

    #[error("call stack underflow: return with no active subroutine")]
    StackUnderflow,

    #[error("key {0:#04X} is not on the keypad")]
    InvalidKey(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_instruction_message() {
        let e = Chip8Error::InvalidInstruction {
            opcode: 0x5121,
            address: 0x204,
        };
        assert_eq!(e.to_string(), "instruction 0x5121 at 0x204 is not valid");
    }

    #[test]
    fn test_program_too_large_message() {
        let e = Chip8Error::ProgramTooLarge {
            size: 4000,
            max_size: 3584,
        };
        assert_eq!(
            e.to_string(),
            "program is 4000 bytes but only 3584 bytes are available"
        );
    }

    #[test]
    fn test_invalid_key_message() {
        assert_eq!(
            Chip8Error::InvalidKey(0x10).to_string(),
            "key 0x10 is not on the keypad"
        );
    }
}
