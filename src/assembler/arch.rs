//! Facts about the target machine: registers, operand formats,
//! sprite geometry and the program load address.

/// CHIP-8 programs are loaded at 0x200; the interpreter occupies the
/// addresses below.
pub const CODE_BASE: u16 = 0x200;

/// Every emitted word is two bytes on a byte-addressed machine.
pub const WORD_SIZE: u16 = 2;

/// A sprite is at most 15 rows of 8 pixels.
pub const MAX_SPRITE_ROWS: usize = 15;

pub const FMT_IMM4: u16 = 0x000F;
pub const FMT_IMM8: u16 = 0x00FF;
pub const FMT_ADDR: u16 = 0x0FFF;

/// True if `value` fits the operand format described by `mask`.
pub fn imm_matches_format(value: u16, mask: u16) -> bool {
    value & !mask == 0
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Sprite {
    pub data: [u8; MAX_SPRITE_ROWS],
    pub row_count: usize,
}

impl Sprite {
    pub fn new() -> Self {
        Sprite {
            data: [0; MAX_SPRITE_ROWS],
            row_count: 0,
        }
    }

    pub fn rows(&self) -> &[u8] {
        &self.data[..self.row_count]
    }
}

/// The sixteen general-purpose data registers plus the special
/// registers: the address index `i` and the two timers.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Register {
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    Va,
    Vb,
    Vc,
    Vd,
    Ve,
    Vf,
    I,
    Dt,
    St,
}

impl Register {
    pub fn from_name(name: &str) -> Option<Register> {
        use Register::*;
        match name {
            "r0" => Some(V0),
            "r1" => Some(V1),
            "r2" => Some(V2),
            "r3" => Some(V3),
            "r4" => Some(V4),
            "r5" => Some(V5),
            "r6" => Some(V6),
            "r7" => Some(V7),
            "r8" => Some(V8),
            "r9" => Some(V9),
            "ra" => Some(Va),
            "rb" => Some(Vb),
            "rc" => Some(Vc),
            "rd" => Some(Vd),
            "re" => Some(Ve),
            "rf" => Some(Vf),
            "i" => Some(I),
            "dt" => Some(Dt),
            "st" => Some(St),
            _ => None,
        }
    }

    /// The 4-bit encoding of a general-purpose register, None for the
    /// special registers which never appear in an x/y slot.
    pub fn vx(&self) -> Option<u16> {
        use Register::*;
        match self {
            V0 => Some(0x0),
            V1 => Some(0x1),
            V2 => Some(0x2),
            V3 => Some(0x3),
            V4 => Some(0x4),
            V5 => Some(0x5),
            V6 => Some(0x6),
            V7 => Some(0x7),
            V8 => Some(0x8),
            V9 => Some(0x9),
            Va => Some(0xA),
            Vb => Some(0xB),
            Vc => Some(0xC),
            Vd => Some(0xD),
            Ve => Some(0xE),
            Vf => Some(0xF),
            I | Dt | St => None,
        }
    }
}

const MNEMONICS: [&str; 24] = [
    "cls", "ret", "jmp", "call", "se", "sne", "mov", "add", "or", "and", "xor", "sub", "shr",
    "subn", "shl", "rnd", "draw", "skp", "sknp", "wkey", "font", "bcd", "save", "load",
];

pub fn is_mnemonic(name: &str) -> bool {
    MNEMONICS.contains(&name)
}

pub fn is_register(name: &str) -> bool {
    Register::from_name(name).is_some()
}
