//! This AST describes a parsed CHIP-8 assembly file.
//!
//! A program is an ordered forest of statements. Declarations (`define`,
//! `config`, `sprite`) may appear anywhere in the source, including after
//! the instructions that use them; `generate` reorders the top level so
//! the generator always sees declarations first.
//!
//! Example source file:
//!
//! ```asm
//! define SPEED 3        ; numeric constant, any base
//! config quirk_shift = default
//!
//! sprite ball [0x60, 0xF0, 0xF0, 0x60]
//!
//! proc main
//!     mov i, #ball      ; point i at sprite data
//!     draw r0, r1, 4
//! .loop:
//!     add r0, SPEED
//!     jmp @loop
//! endp main
//!
//! call $main
//! raw(0x00FD)           ; exit on SCHIP interpreters
//! ```

use std::fmt;

use super::arch;
use super::error::AsmResult;
use super::generator::Generator;
use super::lexer::Token;
use super::sanitizer::SymbolSanitizer;

/// One operand of an instruction statement.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    Register(arch::Register),
    /// A numeric/byte literal or a define/config identifier.
    Immediate(Token),
    /// `@name`, resolved to the address of a label.
    LabelRef(Token),
    /// `$name`, resolved to the address of a procedure.
    ProcRef(Token),
    /// `#name`, resolved to the address of a sprite's first row.
    SpriteRef(Token),
    /// `[value]`, an address used with the indexed jump.
    Indirect(Token),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Statement {
    Define {
        name: Token,
        value: Token,
    },
    Config {
        name: Token,
        value: Token,
    },
    Sprite {
        name: Token,
        sprite: arch::Sprite,
    },
    Raw(Token),
    Label {
        name: Token,
        body: Vec<Statement>,
    },
    Procedure {
        name: Token,
        name_end: Token,
        body: Vec<Statement>,
    },
    Instruction {
        mnemonic: Token,
        operands: Vec<Operand>,
    },
}

impl Statement {
    /// Ordering weight for the pre-generation sort. Higher priorities are
    /// moved ahead; statements of equal priority keep their source order.
    pub fn priority(&self) -> u8 {
        match self {
            Statement::Define { .. } => 3,
            Statement::Config { .. } => 2,
            Statement::Sprite { .. } => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::Define { name, .. } => write!(f, "define {}", name),
            Statement::Config { name, .. } => write!(f, "config {}", name),
            Statement::Sprite { name, .. } => write!(f, "sprite {}", name),
            Statement::Raw(value) => write!(f, "raw({})", value),
            Statement::Label { name, .. } => write!(f, ".{}:", name),
            Statement::Procedure { name, .. } => write!(f, "proc {}", name),
            Statement::Instruction { mnemonic, .. } => write!(f, "{}", mnemonic),
        }
    }
}

/// The statement forest produced by the parser. The tree is mutable only
/// for the reordering step inside `generate`; collaborators get a read
/// view through `branches`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AbstractTree {
    statements: Vec<Statement>,
}

impl AbstractTree {
    pub fn new(statements: Vec<Statement>) -> Self {
        AbstractTree { statements }
    }

    pub fn branches(&self) -> &[Statement] {
        &self.statements
    }

    /// Lowers the tree to the final word sequence.
    ///
    /// Sanitizing runs first, before the sort, so duplicate-symbol
    /// diagnostics refer to original source order. The sort is stable:
    /// declarations move ahead of code but code keeps its execution order.
    pub fn generate(mut self) -> AsmResult<Vec<u16>> {
        let symbols = SymbolSanitizer::new().traverse(&self)?;

        self.statements.sort_by(|a, b| b.priority().cmp(&a.priority()));

        Generator::new(symbols).generate(&self)
    }
}
