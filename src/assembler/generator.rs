//! Code generation.
//!
//! The generator lowers the sanitized, priority-ordered tree into the
//! final word sequence in two passes. The first pass walks the tree
//! assigning an address to every code- or data-producing statement and
//! recording every define/config binding; label, procedure and sprite
//! symbols get the address of their first word. The second pass encodes,
//! resolving every reference from the completed maps, so forward
//! references cost nothing extra.

use std::collections::HashMap;

use super::arch;
use super::ast::{AbstractTree, Operand, Statement};
use super::error::{AsmError, AsmResult};
use super::lexer::{Token, TokenType};
use super::sanitizer::{SymbolKind, SymbolTable};

/// An operand after reference and constant resolution, ready for the
/// encoding table.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Arg {
    Vx(u16),
    I,
    Dt,
    St,
    Imm(u16),
    Ind(u16),
}

pub struct Generator {
    symbols: SymbolTable,
    /// define/config name -> bound literal value
    constants: HashMap<String, u16>,
    /// label/procedure/sprite name -> assigned address
    addresses: HashMap<String, u16>,
}

impl Generator {
    pub fn new(symbols: SymbolTable) -> Self {
        Generator {
            symbols,
            constants: HashMap::new(),
            addresses: HashMap::new(),
        }
    }

    /// Lowers the tree into the program image, addressed from
    /// `arch::CODE_BASE`.
    pub fn generate(mut self, tree: &AbstractTree) -> AsmResult<Vec<u16>> {
        let mut address = arch::CODE_BASE;
        self.assign_addresses(tree.branches(), &mut address);

        debug!(
            "address assignment complete, image spans 0x{:03X}..0x{:03X}",
            arch::CODE_BASE,
            address
        );

        let mut words = Vec::new();
        self.encode_statements(tree.branches(), &mut words)?;

        Ok(words)
    }

    /// First pass. Statements that emit words advance the address
    /// counter; declarations record their binding or the address of
    /// their first contained word.
    fn assign_addresses(&mut self, statements: &[Statement], address: &mut u16) {
        for statement in statements {
            match statement {
                Statement::Define { name, value } | Statement::Config { name, value } => {
                    self.constants
                        .insert(name.text().to_string(), bound_value(value));
                }

                Statement::Sprite { name, sprite } => {
                    self.addresses.insert(name.text().to_string(), *address);
                    *address += sprite.row_count as u16 * arch::WORD_SIZE;
                }

                Statement::Raw(_) | Statement::Instruction { .. } => {
                    *address += arch::WORD_SIZE;
                }

                Statement::Label { name, body } | Statement::Procedure { name, body, .. } => {
                    self.addresses.insert(name.text().to_string(), *address);
                    self.assign_addresses(body, address);
                }
            }
        }
    }

    /// Second pass. Emits one word per instruction or raw statement and
    /// one word per sprite row, in tree order.
    fn encode_statements(&self, statements: &[Statement], words: &mut Vec<u16>) -> AsmResult<()> {
        for statement in statements {
            match statement {
                Statement::Define { .. } | Statement::Config { .. } => {}

                Statement::Sprite { sprite, .. } => {
                    for row in sprite.rows() {
                        words.push(*row as u16);
                    }
                }

                Statement::Raw(value) => {
                    words.push(self.resolve_value(value)?);
                }

                Statement::Instruction { mnemonic, operands } => {
                    words.push(self.encode_instruction(mnemonic, operands)?);
                }

                Statement::Label { body, .. } | Statement::Procedure { body, .. } => {
                    self.encode_statements(body, words)?;
                }
            }
        }

        Ok(())
    }

    /// Resolves a literal-or-identifier token: numeric and byte tokens
    /// give their payload, identifiers must be define/config bound.
    fn resolve_value(&self, token: &Token) -> AsmResult<u16> {
        match token.ttype {
            TokenType::Numerical | TokenType::ByteAscii => Ok(token.number()),
            _ => self
                .constants
                .get(token.text())
                .copied()
                .ok_or(AsmError::UndefinedSymbol {
                    name: token.text().to_string(),
                    location: token.location,
                }),
        }
    }

    /// Resolves a reference sigil operand to its assigned address,
    /// checking that the named symbol has the kind the sigil promises.
    fn resolve_reference(&self, token: &Token, kind: SymbolKind) -> AsmResult<u16> {
        let matches = self
            .symbols
            .get(token.text())
            .map(|s| s.kind == kind)
            .unwrap_or(false);

        if !matches {
            return Err(AsmError::UndefinedSymbol {
                name: token.text().to_string(),
                location: token.location,
            });
        }

        self.addresses
            .get(token.text())
            .copied()
            .ok_or(AsmError::UndefinedSymbol {
                name: token.text().to_string(),
                location: token.location,
            })
    }

    fn resolve_operand(&self, operand: &Operand) -> AsmResult<Arg> {
        match operand {
            Operand::Register(register) => Ok(match register.vx() {
                Some(x) => Arg::Vx(x),
                None => match register {
                    arch::Register::I => Arg::I,
                    arch::Register::Dt => Arg::Dt,
                    _ => Arg::St,
                },
            }),

            Operand::Immediate(token) => Ok(Arg::Imm(self.resolve_value(token)?)),

            Operand::LabelRef(token) => {
                Ok(Arg::Imm(self.resolve_reference(token, SymbolKind::Label)?))
            }
            Operand::ProcRef(token) => Ok(Arg::Imm(
                self.resolve_reference(token, SymbolKind::Procedure)?,
            )),
            Operand::SpriteRef(token) => {
                Ok(Arg::Imm(self.resolve_reference(token, SymbolKind::Sprite)?))
            }

            Operand::Indirect(token) => Ok(Arg::Ind(self.resolve_value(token)?)),
        }
    }

    /// Encodes one instruction against the architecture's encoding table.
    fn encode_instruction(&self, mnemonic: &Token, operands: &[Operand]) -> AsmResult<u16> {
        let mut args = Vec::with_capacity(operands.len());
        for operand in operands {
            args.push(self.resolve_operand(operand)?);
        }

        use Arg::*;

        let fitted = |value: u16, mask: u16| -> AsmResult<u16> {
            if arch::imm_matches_format(value, mask) {
                Ok(value)
            } else {
                Err(AsmError::OperandRange {
                    mnemonic: mnemonic.text().to_string(),
                    value,
                    max: mask,
                    location: mnemonic.location,
                })
            }
        };

        let word = match (mnemonic.text(), args.as_slice()) {
            ("cls", []) => 0x00E0,
            ("ret", []) => 0x00EE,

            ("jmp", [Imm(n)]) => 0x1000 | fitted(*n, arch::FMT_ADDR)?,
            ("jmp", [Ind(n)]) => 0xB000 | fitted(*n, arch::FMT_ADDR)?,
            ("call", [Imm(n)]) => 0x2000 | fitted(*n, arch::FMT_ADDR)?,

            ("se", [Vx(x), Imm(k)]) => 0x3000 | x << 8 | fitted(*k, arch::FMT_IMM8)?,
            ("se", [Vx(x), Vx(y)]) => 0x5000 | x << 8 | y << 4,
            ("sne", [Vx(x), Imm(k)]) => 0x4000 | x << 8 | fitted(*k, arch::FMT_IMM8)?,
            ("sne", [Vx(x), Vx(y)]) => 0x9000 | x << 8 | y << 4,

            ("mov", [Vx(x), Imm(k)]) => 0x6000 | x << 8 | fitted(*k, arch::FMT_IMM8)?,
            ("mov", [Vx(x), Vx(y)]) => 0x8000 | x << 8 | y << 4,
            ("mov", [I, Imm(n)]) => 0xA000 | fitted(*n, arch::FMT_ADDR)?,
            ("mov", [Vx(x), Dt]) => 0xF007 | x << 8,
            ("mov", [Dt, Vx(x)]) => 0xF015 | x << 8,
            ("mov", [St, Vx(x)]) => 0xF018 | x << 8,

            ("add", [Vx(x), Imm(k)]) => 0x7000 | x << 8 | fitted(*k, arch::FMT_IMM8)?,
            ("add", [Vx(x), Vx(y)]) => 0x8004 | x << 8 | y << 4,
            ("add", [I, Vx(x)]) => 0xF01E | x << 8,

            ("or", [Vx(x), Vx(y)]) => 0x8001 | x << 8 | y << 4,
            ("and", [Vx(x), Vx(y)]) => 0x8002 | x << 8 | y << 4,
            ("xor", [Vx(x), Vx(y)]) => 0x8003 | x << 8 | y << 4,
            ("sub", [Vx(x), Vx(y)]) => 0x8005 | x << 8 | y << 4,
            ("shr", [Vx(x), Vx(y)]) => 0x8006 | x << 8 | y << 4,
            ("subn", [Vx(x), Vx(y)]) => 0x8007 | x << 8 | y << 4,
            ("shl", [Vx(x), Vx(y)]) => 0x800E | x << 8 | y << 4,

            ("rnd", [Vx(x), Imm(k)]) => 0xC000 | x << 8 | fitted(*k, arch::FMT_IMM8)?,

            ("draw", [Vx(x), Vx(y), Imm(n)]) => {
                0xD000 | x << 8 | y << 4 | fitted(*n, arch::FMT_IMM4)?
            }

            ("skp", [Vx(x)]) => 0xE09E | x << 8,
            ("sknp", [Vx(x)]) => 0xE0A1 | x << 8,

            ("wkey", [Vx(x)]) => 0xF00A | x << 8,
            ("font", [Vx(x)]) => 0xF029 | x << 8,
            ("bcd", [Vx(x)]) => 0xF033 | x << 8,
            ("save", [Vx(x)]) => 0xF055 | x << 8,
            ("load", [Vx(x)]) => 0xF065 | x << 8,

            _ => {
                return Err(AsmError::InvalidOperands {
                    mnemonic: mnemonic.text().to_string(),
                    location: mnemonic.location,
                })
            }
        };

        Ok(word)
    }
}

/// The value bound by a define/config statement; the `default` sentinel
/// binds the architecture's neutral default of zero.
fn bound_value(value: &Token) -> u16 {
    match value.ttype {
        TokenType::KeywordDefault => 0,
        _ => value.number(),
    }
}
