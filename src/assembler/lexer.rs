//! This lexer tokenizes CHIP-8 assembly.
//!
//! The source buffer is consumed exactly once through a character cursor
//! that tracks line and column, so every token (and every diagnostic
//! raised later in the pipeline) carries the place it came from.

use std::collections::VecDeque;
use std::fmt;

use super::arch;
use super::error::{AsmError, AsmResult};

/// A place in the source buffer, 1-based.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SourceLocation {
    pub line: usize,
    pub col: usize,
}

impl SourceLocation {
    pub fn start() -> Self {
        SourceLocation { line: 1, col: 1 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenType {
    Eof,
    Numerical,
    ByteAscii,
    KeywordDefine,
    KeywordConfig,
    KeywordDefault,
    KeywordSprite,
    KeywordRaw,
    KeywordProcStart,
    KeywordProcEnd,
    Identifier,
    Instruction,
    RegisterName,
    BracketOpen,
    BracketClose,
    ParenOpen,
    ParenClose,
    Colon,
    DotLabel,
    AtLabel,
    DollarProc,
    HashSprite,
    Comma,
    Equal,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenType::*;
        let name = match self {
            Eof => "end of input",
            Numerical => "numeric literal",
            ByteAscii => "byte literal",
            KeywordDefine => "define",
            KeywordConfig => "config",
            KeywordDefault => "default",
            KeywordSprite => "sprite",
            KeywordRaw => "raw",
            KeywordProcStart => "proc",
            KeywordProcEnd => "endp",
            Identifier => "identifier",
            Instruction => "instruction",
            RegisterName => "register name",
            BracketOpen => "open bracket",
            BracketClose => "close bracket",
            ParenOpen => "open parenthesis",
            ParenClose => "close parenthesis",
            Colon => "colon",
            DotLabel => "dot",
            AtLabel => "@",
            DollarProc => "$",
            HashSprite => "#",
            Comma => "comma",
            Equal => "equals",
        };
        write!(f, "{}", name)
    }
}

/// The payload of a token: a 16-bit value for numeric and byte literals,
/// the lexeme text for everything else.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TokenData {
    Number(u16),
    Text(String),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub ttype: TokenType,
    pub location: SourceLocation,
    pub data: TokenData,
}

impl Token {
    pub fn text(&self) -> &str {
        match &self.data {
            TokenData::Text(s) => s,
            TokenData::Number(_) => "",
        }
    }

    pub fn number(&self) -> u16 {
        match &self.data {
            TokenData::Number(n) => *n,
            TokenData::Text(_) => 0,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.data {
            TokenData::Number(n) => write!(f, "{}", n),
            TokenData::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Character-level reader over the source buffer.
struct Cursor {
    chars: Vec<char>,
    pos: usize,
    location: SourceLocation,
}

impl Cursor {
    fn new(buffer: &str) -> Self {
        Cursor {
            chars: buffer.chars().collect(),
            pos: 0,
            location: SourceLocation::start(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.location.line += 1;
            self.location.col = 1;
        } else {
            self.location.col += 1;
        }
        Some(c)
    }
}

pub struct Lexer {
    cursor: Cursor,
}

impl Lexer {
    /// Builds a lexer over an already-read source buffer. The core never
    /// touches the filesystem; reading the file is the caller's job.
    pub fn new(buffer: String) -> Self {
        Lexer {
            cursor: Cursor::new(&buffer),
        }
    }

    /// Drives `next_token` to completion, returning every token up to but
    /// excluding the end-of-input marker.
    pub fn enumerate_tokens(mut self) -> AsmResult<VecDeque<Token>> {
        let mut tokens = VecDeque::with_capacity(256);

        loop {
            let token = self.next_token()?;
            if token.ttype == TokenType::Eof {
                break;
            }
            tokens.push_back(token);
        }

        Ok(tokens)
    }

    /// Produces exactly one token per call, terminating with `Eof`.
    pub fn next_token(&mut self) -> AsmResult<Token> {
        self.skip_blanks();

        let location = self.cursor.location;

        let c = match self.cursor.peek() {
            Some(c) => c,
            None => return Ok(make_token(TokenType::Eof, location, String::new())),
        };

        if c.is_ascii_digit() {
            return self.read_numeric_lexeme();
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.read_alpha_lexeme());
        }

        if c == '\'' {
            return self.read_byte_literal();
        }

        self.cursor.next();

        let ttype = match c {
            '[' => TokenType::BracketOpen,
            ']' => TokenType::BracketClose,
            '(' => TokenType::ParenOpen,
            ')' => TokenType::ParenClose,
            ':' => TokenType::Colon,
            '.' => TokenType::DotLabel,
            '@' => TokenType::AtLabel,
            '$' => TokenType::DollarProc,
            '#' => TokenType::HashSprite,
            ',' => TokenType::Comma,
            '=' => TokenType::Equal,
            _ => return Err(AsmError::UndefinedCharacter { chr: c, location }),
        };

        Ok(make_token(ttype, location, c.to_string()))
    }

    /// Skips whitespace and `;` comments, which run to end of line.
    fn skip_blanks(&mut self) {
        while let Some(c) = self.cursor.peek() {
            if c == ';' {
                while let Some(c) = self.cursor.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.cursor.next();
                }
            } else if c.is_whitespace() {
                self.cursor.next();
            } else {
                break;
            }
        }
    }

    /// Reads a numeric literal. Prefixes 0x, 0b and 0o select hexadecimal,
    /// binary and octal; everything else is decimal. Each digit is checked
    /// against the base and the accumulated value against 16 bits.
    fn read_numeric_lexeme(&mut self) -> AsmResult<Token> {
        let location = self.cursor.location;
        let mut lexeme = String::new();

        while let Some(c) = self.cursor.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                lexeme.push(c);
                self.cursor.next();
            } else {
                break;
            }
        }

        let (base, digits) = match lexeme.get(..2) {
            Some("0x") | Some("0X") => (16, &lexeme[2..]),
            Some("0b") | Some("0B") => (2, &lexeme[2..]),
            Some("0o") | Some("0O") => (8, &lexeme[2..]),
            _ => (10, &lexeme[..]),
        };

        if digits.is_empty() {
            // A bare prefix like "0x" has nothing to parse; the prefix
            // letter itself is the offending digit.
            return Err(AsmError::InvalidDigit {
                digit: lexeme.chars().last().unwrap_or('0'),
                base,
                location,
            });
        }

        let mut value: u32 = 0;
        for digit in digits.chars() {
            let d = match digit.to_digit(base) {
                Some(d) => d,
                None => return Err(AsmError::InvalidDigit { digit, base, location }),
            };
            value = value * base + d;
            if value > u16::MAX as u32 {
                return Err(AsmError::NumericOverflow {
                    lexeme: lexeme.clone(),
                    location,
                });
            }
        }

        Ok(Token {
            ttype: TokenType::Numerical,
            location,
            data: TokenData::Number(value as u16),
        })
    }

    /// Reads an identifier-shaped lexeme and classifies it against the
    /// keyword, mnemonic and register tables. Anything unmatched is a
    /// plain identifier. Classification is case-sensitive.
    fn read_alpha_lexeme(&mut self) -> Token {
        let location = self.cursor.location;
        let mut lexeme = String::new();

        while let Some(c) = self.cursor.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                lexeme.push(c);
                self.cursor.next();
            } else {
                break;
            }
        }

        let ttype = match lexeme.as_str() {
            "define" => TokenType::KeywordDefine,
            "config" => TokenType::KeywordConfig,
            "default" => TokenType::KeywordDefault,
            "sprite" => TokenType::KeywordSprite,
            "raw" => TokenType::KeywordRaw,
            "proc" => TokenType::KeywordProcStart,
            "endp" => TokenType::KeywordProcEnd,
            s if arch::is_mnemonic(s) => TokenType::Instruction,
            s if arch::is_register(s) => TokenType::RegisterName,
            _ => TokenType::Identifier,
        };

        make_token(ttype, location, lexeme)
    }

    /// Reads a quoted byte literal such as 'A'. The payload is the
    /// character's code point.
    fn read_byte_literal(&mut self) -> AsmResult<Token> {
        let location = self.cursor.location;
        self.cursor.next(); // opening quote

        let chr = match self.cursor.next() {
            Some(c) => c,
            None => return Err(AsmError::UnclosedByteLiteral { location }),
        };

        match self.cursor.next() {
            Some('\'') => {}
            _ => return Err(AsmError::UnclosedByteLiteral { location }),
        }

        Ok(Token {
            ttype: TokenType::ByteAscii,
            location,
            data: TokenData::Number(chr as u16),
        })
    }
}

fn make_token(ttype: TokenType, location: SourceLocation, lexeme: String) -> Token {
    Token {
        ttype,
        location,
        data: TokenData::Text(lexeme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> AsmResult<VecDeque<Token>> {
        Lexer::new(src.to_string()).enumerate_tokens()
    }

    fn types(src: &str) -> Vec<TokenType> {
        lex(src).unwrap().iter().map(|t| t.ttype).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(lex("").unwrap().is_empty());
        assert!(lex("   \n\t  ").unwrap().is_empty());
        assert!(lex("; just a comment").unwrap().is_empty());
    }

    #[test]
    fn test_numeric_bases() {
        let tokens = lex("42 0x2A 0b101010 0o52 0").unwrap();
        let values: Vec<u16> = tokens.iter().map(|t| t.number()).collect();
        assert_eq!(values, vec![42, 42, 42, 42, 0]);
        for t in &tokens {
            assert_eq!(t.ttype, TokenType::Numerical);
        }
    }

    #[test]
    fn test_numeric_upper_prefixes() {
        let tokens = lex("0XFF 0B11 0O17").unwrap();
        let values: Vec<u16> = tokens.iter().map(|t| t.number()).collect();
        assert_eq!(values, vec![255, 3, 15]);
    }

    #[test]
    fn test_numeric_limits() {
        assert_eq!(lex("0xFFFF").unwrap()[0].number(), 0xFFFF);
        assert_eq!(lex("65535").unwrap()[0].number(), 65535);

        match lex("65536") {
            Err(AsmError::NumericOverflow { lexeme, .. }) => assert_eq!(lexeme, "65536"),
            other => panic!("expected overflow, got {:?}", other),
        }
        assert!(matches!(lex("0x10000"), Err(AsmError::NumericOverflow { .. })));
    }

    #[test]
    fn test_invalid_digits() {
        match lex("0b102") {
            Err(AsmError::InvalidDigit { digit, base, .. }) => {
                assert_eq!(digit, '2');
                assert_eq!(base, 2);
            }
            other => panic!("expected invalid digit, got {:?}", other),
        }
        assert!(matches!(lex("0o98"), Err(AsmError::InvalidDigit { .. })));
        assert!(matches!(lex("12ab"), Err(AsmError::InvalidDigit { .. })));
        assert!(matches!(lex("0xG1"), Err(AsmError::InvalidDigit { .. })));
        assert!(matches!(lex("0x"), Err(AsmError::InvalidDigit { .. })));
    }

    #[test]
    fn test_byte_literal() {
        let tokens = lex("'A' '0'").unwrap();
        assert_eq!(tokens[0].ttype, TokenType::ByteAscii);
        assert_eq!(tokens[0].number(), 65);
        assert_eq!(tokens[1].number(), 48);

        assert!(matches!(lex("'A"), Err(AsmError::UnclosedByteLiteral { .. })));
        assert!(matches!(lex("'"), Err(AsmError::UnclosedByteLiteral { .. })));
    }

    #[test]
    fn test_punctuation_and_sigils() {
        use TokenType::*;
        assert_eq!(
            types("[ ] ( ) : , = . @ $ #"),
            vec![
                BracketOpen,
                BracketClose,
                ParenOpen,
                ParenClose,
                Colon,
                Comma,
                Equal,
                DotLabel,
                AtLabel,
                DollarProc,
                HashSprite,
            ]
        );
    }

    #[test]
    fn test_classification() {
        use TokenType::*;
        assert_eq!(
            types("define config default sprite raw proc endp"),
            vec![
                KeywordDefine,
                KeywordConfig,
                KeywordDefault,
                KeywordSprite,
                KeywordRaw,
                KeywordProcStart,
                KeywordProcEnd,
            ]
        );
        assert_eq!(types("jmp call draw"), vec![Instruction, Instruction, Instruction]);
        assert_eq!(types("r0 rf i dt st"), vec![RegisterName; 5]);
        // Unknown words, including case variants of reserved ones, fall
        // through to identifiers.
        assert_eq!(types("counter DEFINE Jmp R0 _tmp"), vec![Identifier; 5]);
    }

    #[test]
    fn test_undefined_character() {
        match lex("jmp !") {
            Err(AsmError::UndefinedCharacter { chr, location }) => {
                assert_eq!(chr, '!');
                assert_eq!(location, SourceLocation { line: 1, col: 5 });
            }
            other => panic!("expected undefined character, got {:?}", other),
        }
    }

    #[test]
    fn test_locations() {
        let tokens = lex("define x 1\n  jmp @start\n").unwrap();
        let locs: Vec<(usize, usize)> = tokens
            .iter()
            .map(|t| (t.location.line, t.location.col))
            .collect();
        assert_eq!(locs, vec![(1, 1), (1, 8), (1, 10), (2, 3), (2, 7), (2, 8)]);
    }

    #[test]
    fn test_comments_run_to_end_of_line() {
        let tokens = lex("mov r0, 1 ; set up counter\nret").unwrap();
        use TokenType::*;
        let t: Vec<TokenType> = tokens.iter().map(|t| t.ttype).collect();
        assert_eq!(t, vec![Instruction, RegisterName, Comma, Numerical, Instruction]);
    }

    #[test]
    fn test_next_token_terminates_with_eof() {
        let mut lexer = Lexer::new("ret".to_string());
        assert_eq!(lexer.next_token().unwrap().ttype, TokenType::Instruction);
        assert_eq!(lexer.next_token().unwrap().ttype, TokenType::Eof);
        assert_eq!(lexer.next_token().unwrap().ttype, TokenType::Eof);
    }

    #[test]
    fn test_full_statement() {
        let tokens = lex("sprite dot [0x80]").unwrap();
        use TokenType::*;
        let t: Vec<TokenType> = tokens.iter().map(|t| t.ttype).collect();
        assert_eq!(
            t,
            vec![KeywordSprite, Identifier, BracketOpen, Numerical, BracketClose]
        );
        assert_eq!(tokens[1].text(), "dot");
        assert_eq!(tokens[3].number(), 0x80);
    }
}
