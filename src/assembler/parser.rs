//! The Parser module takes an owned token sequence from the lexer and
//! converts it into an AST by recursive descent with one token of
//! lookahead.
//!
//! Which statements are legal depends on the nesting level: label bodies
//! may hold defines, configs, raws and instructions; procedure bodies
//! additionally allow labels; only the top level allows sprites and
//! procedures.

use std::collections::VecDeque;

use super::arch;
use super::ast::{AbstractTree, Operand, Statement};
use super::error::{AsmError, AsmResult};
use super::lexer::{Token, TokenType};

pub struct Parser {
    tokens: VecDeque<Token>,
}

impl Parser {
    pub fn new(tokens: VecDeque<Token>) -> Self {
        Parser { tokens }
    }

    /// Run the parser, consuming itself and returning the statement tree.
    pub fn run(mut self) -> AsmResult<AbstractTree> {
        let mut branches = Vec::new();

        while let Some(statement) = self.parse_primary_statement()? {
            branches.push(statement);
        }

        Ok(AbstractTree::new(branches))
    }

    /// Pops the next token off the input stream; the stream being empty
    /// is an error at every call site.
    fn advance(&mut self) -> AsmResult<Token> {
        self.tokens.pop_front().ok_or(AsmError::UnexpectedEof {
            context: "while more tokens were expected",
        })
    }

    fn peek_type(&self) -> Option<TokenType> {
        self.tokens.front().map(|t| t.ttype)
    }

    /// Asserts the next token is one of `expected`, consuming and
    /// returning it. Used for every mandatory grammar element.
    fn expect(&mut self, expected: &[TokenType]) -> AsmResult<Token> {
        match self.tokens.front() {
            Some(token) if expected.contains(&token.ttype) => self.advance(),
            Some(token) => Err(AsmError::UnexpectedToken {
                expected: expected.to_vec(),
                found: token.ttype,
                location: token.location,
            }),
            None => Err(AsmError::UnexpectedEof {
                context: "while more tokens were expected",
            }),
        }
    }

    /// Consumes the next token only if it matches; used for optional
    /// separators.
    fn advance_if(&mut self, ttype: TokenType) -> bool {
        if self.peek_type() == Some(ttype) {
            self.tokens.pop_front();
            true
        } else {
            false
        }
    }

    fn parse_primary_statement(&mut self) -> AsmResult<Option<Statement>> {
        let ttype = match self.peek_type() {
            Some(t) => t,
            None => return Ok(None),
        };

        let statement = match ttype {
            TokenType::KeywordDefine => self.parse_define()?,
            TokenType::KeywordConfig => self.parse_config()?,
            TokenType::KeywordSprite => self.parse_sprite()?,
            TokenType::KeywordRaw => self.parse_raw()?,
            TokenType::DotLabel => self.parse_label()?,
            TokenType::KeywordProcStart => self.parse_procedure()?,
            TokenType::Instruction => self.parse_instruction()?,

            found => {
                return Err(AsmError::UnexpectedToken {
                    expected: vec![
                        TokenType::KeywordDefine,
                        TokenType::KeywordConfig,
                        TokenType::KeywordSprite,
                        TokenType::KeywordRaw,
                        TokenType::DotLabel,
                        TokenType::KeywordProcStart,
                        TokenType::Instruction,
                    ],
                    found,
                    location: self.tokens[0].location,
                })
            }
        };

        Ok(Some(statement))
    }

    /// `define IDENT value`
    fn parse_define(&mut self) -> AsmResult<Statement> {
        self.expect(&[TokenType::KeywordDefine])?;

        let name = self.expect(&[TokenType::Identifier])?;
        let value = self.expect(&[
            TokenType::Numerical,
            TokenType::ByteAscii,
            TokenType::KeywordDefault,
        ])?;

        Ok(Statement::Define { name, value })
    }

    /// `config IDENT = value`
    fn parse_config(&mut self) -> AsmResult<Statement> {
        self.expect(&[TokenType::KeywordConfig])?;

        let name = self.expect(&[TokenType::Identifier])?;

        self.expect(&[TokenType::Equal])?;

        let value = self.expect(&[
            TokenType::Numerical,
            TokenType::ByteAscii,
            TokenType::KeywordDefault,
        ])?;

        Ok(Statement::Config { name, value })
    }

    /// `sprite IDENT [ row, row, ... ]`
    ///
    /// Row count and row range are checked as each row is read, so the
    /// error points at the first offending row.
    fn parse_sprite(&mut self) -> AsmResult<Statement> {
        self.expect(&[TokenType::KeywordSprite])?;

        let name = self.expect(&[TokenType::Identifier])?;
        self.expect(&[TokenType::BracketOpen])?;

        let mut sprite = arch::Sprite::new();

        loop {
            let row = self.expect(&[TokenType::Numerical, TokenType::ByteAscii])?;
            let value = row.number();

            if sprite.row_count >= arch::MAX_SPRITE_ROWS {
                return Err(AsmError::SpriteTooManyRows {
                    name: name.text().to_string(),
                    location: row.location,
                });
            }

            if !arch::imm_matches_format(value, arch::FMT_IMM8) {
                return Err(AsmError::SpriteRowTooLarge {
                    name: name.text().to_string(),
                    value,
                    location: row.location,
                });
            }

            sprite.data[sprite.row_count] = value as u8;
            sprite.row_count += 1;

            if !self.advance_if(TokenType::Comma) {
                break;
            }
        }

        self.expect(&[TokenType::BracketClose])?;

        Ok(Statement::Sprite { name, sprite })
    }

    /// `raw( value )` where value is a literal or a define/config name.
    fn parse_raw(&mut self) -> AsmResult<Statement> {
        self.expect(&[TokenType::KeywordRaw])?;
        self.expect(&[TokenType::ParenOpen])?;

        let value = self.expect(&[
            TokenType::Numerical,
            TokenType::ByteAscii,
            TokenType::Identifier,
        ])?;

        self.expect(&[TokenType::ParenClose])?;

        Ok(Statement::Raw(value))
    }

    /// A mnemonic followed by a comma-separated operand list. The list
    /// ends when the lookahead cannot start an operand or when no comma
    /// follows the one just parsed.
    fn parse_instruction(&mut self) -> AsmResult<Statement> {
        let mnemonic = self.expect(&[TokenType::Instruction])?;
        let operands = self.parse_operands()?;

        Ok(Statement::Instruction { mnemonic, operands })
    }

    fn parse_operands(&mut self) -> AsmResult<Vec<Operand>> {
        const OPERAND_START: [TokenType; 7] = [
            TokenType::RegisterName,
            TokenType::Identifier,
            TokenType::Numerical,
            TokenType::ByteAscii,
            TokenType::AtLabel,
            TokenType::DollarProc,
            TokenType::HashSprite,
        ];

        let mut operands = Vec::new();

        loop {
            match self.peek_type() {
                Some(TokenType::BracketOpen) => {}
                Some(t) if OPERAND_START.contains(&t) => {}
                _ => break,
            }

            operands.push(self.parse_operand()?);

            if !self.advance_if(TokenType::Comma) {
                break;
            }
        }

        Ok(operands)
    }

    fn parse_operand(&mut self) -> AsmResult<Operand> {
        let token = self.expect(&[
            TokenType::RegisterName,
            TokenType::Identifier,
            TokenType::Numerical,
            TokenType::ByteAscii,
            TokenType::AtLabel,
            TokenType::DollarProc,
            TokenType::HashSprite,
            TokenType::BracketOpen,
        ])?;

        match token.ttype {
            TokenType::RegisterName => {
                // The lexer only emits RegisterName for names in the
                // register table, so the lookup cannot miss.
                let register = arch::Register::from_name(token.text()).ok_or(
                    AsmError::UnexpectedToken {
                        expected: vec![TokenType::RegisterName],
                        found: token.ttype,
                        location: token.location,
                    },
                )?;
                Ok(Operand::Register(register))
            }

            TokenType::AtLabel => {
                let label = self.expect(&[TokenType::Identifier])?;
                Ok(Operand::LabelRef(label))
            }

            TokenType::DollarProc => {
                let proc = self.expect(&[TokenType::Identifier])?;
                Ok(Operand::ProcRef(proc))
            }

            TokenType::HashSprite => {
                let sprite = self.expect(&[TokenType::Identifier])?;
                Ok(Operand::SpriteRef(sprite))
            }

            TokenType::BracketOpen => {
                let inner = self.expect(&[TokenType::Identifier, TokenType::Numerical])?;
                self.expect(&[TokenType::BracketClose])?;
                Ok(Operand::Indirect(inner))
            }

            _ => Ok(Operand::Immediate(token)),
        }
    }

    /// `.IDENT :` then a body of {define, config, raw, instruction}. A
    /// label body has no terminator; it ends at the next label, at the
    /// enclosing procedure's `endp`, or at end of input.
    fn parse_label(&mut self) -> AsmResult<Statement> {
        self.expect(&[TokenType::DotLabel])?;
        let name = self.expect(&[TokenType::Identifier])?;
        self.expect(&[TokenType::Colon])?;

        let mut body = Vec::new();

        loop {
            let statement = match self.peek_type() {
                None | Some(TokenType::DotLabel) | Some(TokenType::KeywordProcEnd) => break,

                Some(TokenType::KeywordDefine) => self.parse_define()?,
                Some(TokenType::KeywordConfig) => self.parse_config()?,
                Some(TokenType::KeywordRaw) => self.parse_raw()?,
                Some(TokenType::Instruction) => self.parse_instruction()?,

                Some(found) => {
                    return Err(AsmError::UnexpectedToken {
                        expected: vec![
                            TokenType::KeywordDefine,
                            TokenType::KeywordConfig,
                            TokenType::KeywordRaw,
                            TokenType::Instruction,
                        ],
                        found,
                        location: self.tokens[0].location,
                    })
                }
            };
            body.push(statement);
        }

        Ok(Statement::Label { name, body })
    }

    /// `proc IDENT ... endp IDENT` with matching names. Procedures cannot
    /// nest, and running out of tokens before `endp` is an error.
    fn parse_procedure(&mut self) -> AsmResult<Statement> {
        self.expect(&[TokenType::KeywordProcStart])?;
        let name = self.expect(&[TokenType::Identifier])?;

        let mut body = Vec::new();

        loop {
            let statement = match self.peek_type() {
                None => {
                    return Err(AsmError::UnexpectedEof {
                        context: "before \"endp\" while parsing a procedure",
                    })
                }

                Some(TokenType::KeywordProcEnd) => break,

                Some(TokenType::KeywordProcStart) => {
                    return Err(AsmError::NestedProcedure {
                        location: self.tokens[0].location,
                    })
                }

                Some(TokenType::KeywordDefine) => self.parse_define()?,
                Some(TokenType::KeywordConfig) => self.parse_config()?,
                Some(TokenType::KeywordRaw) => self.parse_raw()?,
                Some(TokenType::Instruction) => self.parse_instruction()?,
                Some(TokenType::DotLabel) => self.parse_label()?,

                Some(found) => {
                    return Err(AsmError::UnexpectedToken {
                        expected: vec![
                            TokenType::KeywordDefine,
                            TokenType::KeywordConfig,
                            TokenType::KeywordRaw,
                            TokenType::Instruction,
                            TokenType::DotLabel,
                            TokenType::KeywordProcEnd,
                        ],
                        found,
                        location: self.tokens[0].location,
                    })
                }
            };
            body.push(statement);
        }

        self.expect(&[TokenType::KeywordProcEnd])?;
        let name_end = self.expect(&[TokenType::Identifier])?;

        if name_end.text() != name.text() {
            return Err(AsmError::MismatchedProcNames {
                beg_name: name.text().to_string(),
                beg_location: name.location,
                end_name: name_end.text().to_string(),
                end_location: name_end.location,
            });
        }

        Ok(Statement::Procedure { name, name_end, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::lexer::Lexer;

    fn parse(src: &str) -> AsmResult<AbstractTree> {
        let tokens = Lexer::new(src.to_string()).enumerate_tokens()?;
        Parser::new(tokens).run()
    }

    fn parse_one(src: &str) -> Statement {
        let tree = parse(src).unwrap();
        assert_eq!(tree.branches().len(), 1);
        tree.branches()[0].clone()
    }

    #[test]
    fn test_empty_program() {
        assert!(parse("").unwrap().branches().is_empty());
    }

    #[test]
    fn test_parse_define() {
        match parse_one("define LIMIT 5") {
            Statement::Define { name, value } => {
                assert_eq!(name.text(), "LIMIT");
                assert_eq!(value.number(), 5);
            }
            other => panic!("expected define, got {:?}", other),
        }

        // The default sentinel is a legal value.
        assert!(matches!(parse_one("define LIMIT default"), Statement::Define { .. }));

        assert!(parse("define 5 5").is_err());
        assert!(parse("define LIMIT").is_err());
        assert!(parse("define LIMIT r0").is_err());
    }

    #[test]
    fn test_parse_config() {
        match parse_one("config quirk_shift = 1") {
            Statement::Config { name, value } => {
                assert_eq!(name.text(), "quirk_shift");
                assert_eq!(value.number(), 1);
            }
            other => panic!("expected config, got {:?}", other),
        }

        assert!(matches!(parse_one("config x = default"), Statement::Config { .. }));

        // The equals sign is mandatory for configs.
        assert!(parse("config x 1").is_err());
    }

    #[test]
    fn test_parse_sprite() {
        match parse_one("sprite ball [0x60, 0xF0, 0x60]") {
            Statement::Sprite { name, sprite } => {
                assert_eq!(name.text(), "ball");
                assert_eq!(sprite.rows(), &[0x60, 0xF0, 0x60]);
            }
            other => panic!("expected sprite, got {:?}", other),
        }
    }

    #[test]
    fn test_sprite_row_limits() {
        // 16 rows, one too many. Values are all legal.
        let too_many = "sprite s [1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1]";
        assert!(matches!(parse(too_many), Err(AsmError::SpriteTooManyRows { .. })));

        // 15 rows is the maximum and is fine.
        let max = "sprite s [1,1,1,1,1,1,1,1,1,1,1,1,1,1,1]";
        assert!(parse(max).is_ok());

        // A row over 255 fails regardless of row count.
        match parse("sprite s [1, 256]") {
            Err(AsmError::SpriteRowTooLarge { value, .. }) => assert_eq!(value, 256),
            other => panic!("expected row error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_raw() {
        assert!(matches!(parse_one("raw(0xFFFF)"), Statement::Raw(_)));
        assert!(matches!(parse_one("raw(SOME_CONST)"), Statement::Raw(_)));
        assert!(matches!(parse_one("raw('A')"), Statement::Raw(_)));

        assert!(parse("raw()").is_err());
        assert!(parse("raw(0").is_err());
        assert!(parse("raw 0").is_err());
    }

    #[test]
    fn test_parse_instruction_operands() {
        match parse_one("draw r0, r1, 4") {
            Statement::Instruction { mnemonic, operands } => {
                assert_eq!(mnemonic.text(), "draw");
                assert_eq!(operands.len(), 3);
                assert_eq!(operands[0], Operand::Register(arch::Register::V0));
                assert_eq!(operands[1], Operand::Register(arch::Register::V1));
                assert!(matches!(operands[2], Operand::Immediate(_)));
            }
            other => panic!("expected instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_reference_operands() {
        match parse_one("jmp @loop") {
            Statement::Instruction { operands, .. } => {
                assert!(matches!(&operands[0], Operand::LabelRef(t) if t.text() == "loop"));
            }
            other => panic!("expected instruction, got {:?}", other),
        }

        match parse_one("call $main") {
            Statement::Instruction { operands, .. } => {
                assert!(matches!(&operands[0], Operand::ProcRef(t) if t.text() == "main"));
            }
            other => panic!("expected instruction, got {:?}", other),
        }

        match parse_one("mov i, #ball") {
            Statement::Instruction { operands, .. } => {
                assert_eq!(operands[0], Operand::Register(arch::Register::I));
                assert!(matches!(&operands[1], Operand::SpriteRef(t) if t.text() == "ball"));
            }
            other => panic!("expected instruction, got {:?}", other),
        }

        // A sigil must be followed by an identifier.
        assert!(parse("jmp @5").is_err());
        assert!(parse("call $").is_err());
    }

    #[test]
    fn test_parse_indirect_operand() {
        match parse_one("jmp [0x300]") {
            Statement::Instruction { operands, .. } => {
                assert!(matches!(&operands[0], Operand::Indirect(t) if t.number() == 0x300));
            }
            other => panic!("expected instruction, got {:?}", other),
        }

        match parse_one("jmp [table]") {
            Statement::Instruction { operands, .. } => {
                assert!(matches!(&operands[0], Operand::Indirect(t) if t.text() == "table"));
            }
            other => panic!("expected instruction, got {:?}", other),
        }

        // The bracket must close, and registers cannot appear inside.
        assert!(parse("jmp [0x300").is_err());
        assert!(parse("jmp [r0]").is_err());
    }

    #[test]
    fn test_operand_list_termination() {
        // No operands at all.
        match parse_one("cls") {
            Statement::Instruction { operands, .. } => assert!(operands.is_empty()),
            other => panic!("expected instruction, got {:?}", other),
        }

        // A following statement keyword ends the list without a comma.
        let tree = parse("ret\nret").unwrap();
        assert_eq!(tree.branches().len(), 2);
    }

    #[test]
    fn test_parse_label() {
        let src = "
            .loop:
                add r0, 1
                jmp @loop
            .done:
                raw(0)
        ";
        let tree = parse(src).unwrap();
        assert_eq!(tree.branches().len(), 2);

        match &tree.branches()[0] {
            Statement::Label { name, body } => {
                assert_eq!(name.text(), "loop");
                assert_eq!(body.len(), 2);
            }
            other => panic!("expected label, got {:?}", other),
        }
        match &tree.branches()[1] {
            Statement::Label { name, body } => {
                assert_eq!(name.text(), "done");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected label, got {:?}", other),
        }
    }

    #[test]
    fn test_label_body_restrictions() {
        // A sprite may not appear inside a label body.
        assert!(parse(".l:\n sprite s [1]").is_err());
        // Missing colon.
        assert!(parse(".l jmp @l").is_err());
    }

    #[test]
    fn test_parse_procedure() {
        let src = "
            proc main
                mov r0, 0
            .loop:
                add r0, 1
                jmp @loop
            endp main
        ";
        match parse_one(src) {
            Statement::Procedure { name, name_end, body } => {
                assert_eq!(name.text(), "main");
                assert_eq!(name_end.text(), "main");
                // mov + label (the label swallows the rest of the body).
                assert_eq!(body.len(), 2);
                assert!(matches!(&body[1], Statement::Label { body, .. } if body.len() == 2));
            }
            other => panic!("expected procedure, got {:?}", other),
        }
    }

    #[test]
    fn test_procedure_name_mismatch() {
        match parse("proc foo\nret\nendp bar") {
            Err(AsmError::MismatchedProcNames { beg_name, end_name, .. }) => {
                assert_eq!(beg_name, "foo");
                assert_eq!(end_name, "bar");
            }
            other => panic!("expected name mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_procedure_cannot_nest() {
        let src = "proc outer\nproc inner\nret\nendp inner\nendp outer";
        assert!(matches!(parse(src), Err(AsmError::NestedProcedure { .. })));
    }

    #[test]
    fn test_procedure_requires_endp() {
        assert!(matches!(
            parse("proc main\nret"),
            Err(AsmError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_unexpected_top_level_token() {
        match parse(", cls") {
            Err(AsmError::UnexpectedToken { found, .. }) => {
                assert_eq!(found, TokenType::Comma);
            }
            other => panic!("expected unexpected-token, got {:?}", other),
        }
        assert!(parse("r0").is_err());
        assert!(parse("endp main").is_err());
    }
}
