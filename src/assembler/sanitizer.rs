//! Symbol validation pass.
//!
//! Walks every statement, including label and procedure bodies, exactly
//! once and builds the global symbol table. Symbol names are unique
//! across the whole program regardless of kind or nesting depth, and
//! this is checked here, before any reordering or address assignment.

use std::collections::HashMap;

use super::ast::{AbstractTree, Statement};
use super::error::{AsmError, AsmResult};
use super::lexer::{SourceLocation, Token};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SymbolKind {
    Constant,
    Config,
    Label,
    Procedure,
    Sprite,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub location: SourceLocation,
}

pub type SymbolTable = HashMap<String, Symbol>;

pub struct SymbolSanitizer {
    symbols: SymbolTable,
}

impl SymbolSanitizer {
    pub fn new() -> Self {
        SymbolSanitizer {
            symbols: SymbolTable::new(),
        }
    }

    /// Traverses the tree and returns the completed symbol table, or the
    /// first duplicate declaration found.
    pub fn traverse(mut self, tree: &AbstractTree) -> AsmResult<SymbolTable> {
        self.scan_statements(tree.branches())?;
        Ok(self.symbols)
    }

    fn scan_statements(&mut self, statements: &[Statement]) -> AsmResult<()> {
        for statement in statements {
            match statement {
                Statement::Define { name, .. } => self.declare(name, SymbolKind::Constant)?,
                Statement::Config { name, .. } => self.declare(name, SymbolKind::Config)?,
                Statement::Sprite { name, .. } => self.declare(name, SymbolKind::Sprite)?,

                Statement::Label { name, body } => {
                    self.declare(name, SymbolKind::Label)?;
                    self.scan_statements(body)?;
                }

                Statement::Procedure { name, body, .. } => {
                    self.declare(name, SymbolKind::Procedure)?;
                    self.scan_statements(body)?;
                }

                Statement::Raw(_) | Statement::Instruction { .. } => {}
            }
        }

        Ok(())
    }

    fn declare(&mut self, name: &Token, kind: SymbolKind) -> AsmResult<()> {
        let key = name.text().to_string();

        if let Some(existing) = self.symbols.get(&key) {
            return Err(AsmError::DuplicateSymbol {
                name: key,
                first: existing.location,
                second: name.location,
            });
        }

        debug!("declared {:?} symbol \"{}\" at {}", kind, key, name.location);

        self.symbols.insert(
            key,
            Symbol {
                kind,
                location: name.location,
            },
        );

        Ok(())
    }
}
