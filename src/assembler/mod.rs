//! The Assembler module is in charge of taking a CHIP-8 assembly
//! source buffer and producing the program image as a Vec<u16>.
//!
//! The pipeline runs each stage exactly once: the lexer consumes the
//! source into a token sequence, the parser consumes the tokens into an
//! AST, and the AST sanitizes, reorders and generates itself into
//! machine words. The first error at any stage aborts the whole run.

pub mod arch;
pub mod ast;
pub mod error;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod sanitizer;

use self::error::AsmResult;

/// Compiles a source buffer down to the machine word sequence.
pub fn assemble(source: String) -> AsmResult<Vec<u16>> {
    let tokens = lexer::Lexer::new(source).enumerate_tokens()?;
    let tree = parser::Parser::new(tokens).run()?;

    tree.generate()
}
