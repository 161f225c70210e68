//! Error values raised by the assembler core.
//!
//! Every fatal condition in the pipeline maps to one variant here so the
//! calling layer can match on the kind of failure instead of scraping
//! message strings. Each variant carries the source location(s) involved.

use std::fmt;

use super::lexer::{SourceLocation, TokenType};

pub type AsmResult<T> = Result<T, AsmError>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AsmError {
    // Lexer errors.
    InvalidDigit {
        digit: char,
        base: u32,
        location: SourceLocation,
    },
    NumericOverflow {
        lexeme: String,
        location: SourceLocation,
    },
    UndefinedCharacter {
        chr: char,
        location: SourceLocation,
    },
    UnclosedByteLiteral {
        location: SourceLocation,
    },

    // Parser errors.
    UnexpectedToken {
        expected: Vec<TokenType>,
        found: TokenType,
        location: SourceLocation,
    },
    UnexpectedEof {
        context: &'static str,
    },
    MismatchedProcNames {
        beg_name: String,
        beg_location: SourceLocation,
        end_name: String,
        end_location: SourceLocation,
    },
    NestedProcedure {
        location: SourceLocation,
    },
    SpriteTooManyRows {
        name: String,
        location: SourceLocation,
    },
    SpriteRowTooLarge {
        name: String,
        value: u16,
        location: SourceLocation,
    },

    // Sanitizer errors.
    DuplicateSymbol {
        name: String,
        first: SourceLocation,
        second: SourceLocation,
    },

    // Generator errors.
    UndefinedSymbol {
        name: String,
        location: SourceLocation,
    },
    OperandRange {
        mnemonic: String,
        value: u16,
        max: u16,
        location: SourceLocation,
    },
    InvalidOperands {
        mnemonic: String,
        location: SourceLocation,
    },
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use AsmError::*;
        match self {
            InvalidDigit { digit, base, location } => {
                write!(f, "invalid digit '{}' for numeric base {} at {}", digit, base, location)
            }
            NumericOverflow { lexeme, location } => {
                write!(f, "numeric constant \"{}\" at {} is too large for a 16-bit value", lexeme, location)
            }
            UndefinedCharacter { chr, location } => {
                write!(f, "character '{}' cannot match any token at {}", chr, location)
            }
            UnclosedByteLiteral { location } => {
                write!(f, "byte literal starting at {} is missing its closing quote", location)
            }
            UnexpectedToken { expected, found, location } => {
                let list = expected
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "expected one of ({}) but found {} at {}", list, found, location)
            }
            UnexpectedEof { context } => {
                write!(f, "unexpected end of input {}", context)
            }
            MismatchedProcNames { beg_name, beg_location, end_name, end_location } => {
                write!(
                    f,
                    "procedure \"{}\" (opened at {}) is closed as \"{}\" at {}",
                    beg_name, beg_location, end_name, end_location
                )
            }
            NestedProcedure { location } => {
                write!(f, "cannot define a procedure inside another at {}", location)
            }
            SpriteTooManyRows { name, location } => {
                write!(
                    f,
                    "sprite \"{}\" at {} has more than {} rows",
                    name,
                    location,
                    super::arch::MAX_SPRITE_ROWS
                )
            }
            SpriteRowTooLarge { name, value, location } => {
                write!(
                    f,
                    "sprite \"{}\" row value {} at {} does not fit 8 bits",
                    name, value, location
                )
            }
            DuplicateSymbol { name, first, second } => {
                write!(
                    f,
                    "symbol \"{}\" declared at {} is redeclared at {}",
                    name, first, second
                )
            }
            UndefinedSymbol { name, location } => {
                write!(f, "reference to undeclared symbol \"{}\" at {}", name, location)
            }
            OperandRange { mnemonic, value, max, location } => {
                write!(
                    f,
                    "operand value {} of \"{}\" at {} exceeds its maximum of {}",
                    value, mnemonic, location, max
                )
            }
            InvalidOperands { mnemonic, location } => {
                write!(f, "instruction \"{}\" at {} got an invalid operand combination", mnemonic, location)
            }
        }
    }
}

impl std::error::Error for AsmError {}
