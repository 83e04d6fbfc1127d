use crate::context::LoxContext;
use itertools::{Itertools, MultiPeek};
use std::collections::HashMap;
use std::fmt::Formatter;
use std::str::{Chars, FromStr};
use strum_macros::Display as StrumDisplay;

/// A 1-based source location. Formats as `line N`, matching the diagnostic
/// template in the external interface contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u64,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}", self.line)
    }
}

/// The closed enumeration of token kinds. Deliberately fieldless: the
/// payload for `String`/`Number` literals lives in [`Token::literal`]
/// instead, so this can double as the thing diagnostics print
/// (`at '<TokenKind>'`) and the thing the parser matches on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, StrumDisplay)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    Less,

    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    LessEqual,

    Identifier,
    String,
    InvalidString,
    Number,
    InvalidNumber,

    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    /// Whitespace, newlines, comments: present in the stream (so the
    /// scanner round-trip property holds for every character of input) but
    /// invisible to the parser.
    Trivia,
    /// A character the scanner could not classify at all.
    Other,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::String(s) => s.fmt(f),
            Literal::Number(n) => n.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub position: Position,
}

impl Token {
    pub fn eof(line: u64) -> Self {
        Self {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            literal: None,
            position: Position { line },
        }
    }

    pub fn line(&self) -> u64 {
        self.position.line
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let literal = self
            .literal
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_default();
        write!(f, "{} - {:?} {} {}", self.position, self.kind, self.lexeme, literal)
    }
}

pub struct Scanner<'a> {
    source: MultiPeek<Chars<'a>>,
    current_token_buffer: Vec<char>,
    current_line: u64,
    keywords: HashMap<&'static str, TokenKind>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        let keywords = HashMap::from_iter([
            ("and", TokenKind::And),
            ("class", TokenKind::Class),
            ("else", TokenKind::Else),
            ("false", TokenKind::False),
            ("for", TokenKind::For),
            ("fun", TokenKind::Fun),
            ("if", TokenKind::If),
            ("nil", TokenKind::Nil),
            ("or", TokenKind::Or),
            ("print", TokenKind::Print),
            ("return", TokenKind::Return),
            ("super", TokenKind::Super),
            ("this", TokenKind::This),
            ("true", TokenKind::True),
            ("var", TokenKind::Var),
            ("while", TokenKind::While),
        ]);
        Self {
            source: source.chars().multipeek(),
            current_token_buffer: Vec::new(),
            current_line: 1,
            keywords,
        }
    }

    /// Scans the entire source into a token stream terminated by `EOF`,
    /// reporting any lexical diagnostics through `ctx` as it goes. Scanning
    /// never aborts early: a malformed number or an unterminated string
    /// yields an `Invalid*` token and scanning continues, per the "surface
    /// as many errors as possible in one pass" error-handling design.
    pub fn scan_all(mut self, ctx: &mut LoxContext) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.scan_token(ctx) {
            tokens.push(token);
        }
        let line = self.current_line;
        tokens.push(Token::eof(line));
        ctx.trace(|| format!("scanner: produced {} tokens", tokens.len()));
        tokens
    }

    fn scan_token(&mut self, ctx: &mut LoxContext) -> Option<Token> {
        let c = self.advance()?;
        let token = match c {
            '(' => self.finalize_current_token(TokenKind::LeftParen),
            ')' => self.finalize_current_token(TokenKind::RightParen),
            '{' => self.finalize_current_token(TokenKind::LeftBrace),
            '}' => self.finalize_current_token(TokenKind::RightBrace),
            ',' => self.finalize_current_token(TokenKind::Comma),
            '.' => self.finalize_current_token(TokenKind::Dot),
            '-' => self.finalize_current_token(TokenKind::Minus),
            '+' => self.finalize_current_token(TokenKind::Plus),
            ';' => self.finalize_current_token(TokenKind::Semicolon),
            '*' => self.finalize_current_token(TokenKind::Star),
            '!' => {
                if self.advance_on_match('=') {
                    self.finalize_current_token(TokenKind::BangEqual)
                } else {
                    self.finalize_current_token(TokenKind::Bang)
                }
            }
            '=' => {
                if self.advance_on_match('=') {
                    self.finalize_current_token(TokenKind::EqualEqual)
                } else {
                    self.finalize_current_token(TokenKind::Equal)
                }
            }
            '<' => {
                if self.advance_on_match('=') {
                    self.finalize_current_token(TokenKind::LessEqual)
                } else {
                    self.finalize_current_token(TokenKind::Less)
                }
            }
            '>' => {
                if self.advance_on_match('=') {
                    self.finalize_current_token(TokenKind::GreaterEqual)
                } else {
                    self.finalize_current_token(TokenKind::Greater)
                }
            }
            '/' => {
                if self.advance_on_match('/') {
                    self.advance_until('\n');
                    self.current_token_buffer.clear();
                    return self.scan_token(ctx);
                } else {
                    self.finalize_current_token(TokenKind::Slash)
                }
            }
            '"' => self.scan_string(ctx),
            d if d.is_ascii_digit() => self.scan_number(ctx),
            c => {
                if Self::is_alpha(&c) {
                    self.advance_while_true(Self::is_alnum);
                    let lexeme = self.finalize_buffer_into_lexeme();
                    let line = self.current_line;
                    match self.keywords.get(lexeme.as_str()) {
                        None => Token {
                            kind: TokenKind::Identifier,
                            lexeme,
                            literal: None,
                            position: Position { line },
                        },
                        Some(TokenKind::True) => Token {
                            kind: TokenKind::True,
                            lexeme,
                            literal: Some(Literal::String("true".to_string())),
                            position: Position { line },
                        },
                        Some(TokenKind::False) => Token {
                            kind: TokenKind::False,
                            lexeme,
                            literal: Some(Literal::String("false".to_string())),
                            position: Position { line },
                        },
                        Some(TokenKind::Nil) => Token {
                            kind: TokenKind::Nil,
                            lexeme,
                            literal: None,
                            position: Position { line },
                        },
                        Some(kind) => Token {
                            kind: *kind,
                            lexeme,
                            literal: None,
                            position: Position { line },
                        },
                    }
                } else if Self::is_trivia(&c) {
                    self.advance_while_true(Self::is_trivia);
                    self.finalize_current_token(TokenKind::Trivia)
                } else {
                    let line = self.current_line;
                    ctx.report(line, "", "Unexpected character.");
                    self.finalize_current_token(TokenKind::Other)
                }
            }
        };
        Some(token)
    }

    fn scan_string(&mut self, ctx: &mut LoxContext) -> Token {
        let mut literal = String::new();
        let mut invalid = false;
        loop {
            match self.peek().copied() {
                None | Some('\n') => {
                    let line = self.current_line;
                    ctx.report(line, "", "Unterminated string literal.");
                    return self.finalize_current_token(TokenKind::InvalidString);
                }
                Some('"') => break,
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('"') => literal.push('"'),
                        Some('\\') => literal.push('\\'),
                        Some('a') => literal.push('\u{07}'),
                        Some('b') => literal.push('\u{08}'),
                        Some('f') => literal.push('\u{0C}'),
                        Some('n') => literal.push('\n'),
                        Some('r') => literal.push('\r'),
                        Some('t') => literal.push('\t'),
                        Some('v') => literal.push('\u{0B}'),
                        Some(other) => {
                            let line = self.current_line;
                            ctx.report(line, "", "Invalid escape sequence in string literal.");
                            literal.push(other);
                            invalid = true;
                        }
                        None => {
                            let line = self.current_line;
                            ctx.report(line, "", "Unterminated string literal.");
                            return self.finalize_current_token(TokenKind::InvalidString);
                        }
                    }
                }
                Some(c) => {
                    literal.push(c);
                    self.advance();
                }
            }
        }
        // Eat the closing quote.
        self.advance();
        let lexeme = self.finalize_buffer_into_lexeme();
        let line = self.current_line;
        Token {
            kind: if invalid {
                TokenKind::InvalidString
            } else {
                TokenKind::String
            },
            lexeme,
            literal: Some(Literal::String(literal)),
            position: Position { line },
        }
    }

    fn scan_number(&mut self, ctx: &mut LoxContext) -> Token {
        self.advance_while_true(|c| c.is_ascii_digit());
        if self.peek() == Some(&'.') {
            let fractional_digit = self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false);
            self.source.reset_peek();
            if fractional_digit {
                self.advance(); // consume '.'
                self.advance_while_true(|c| c.is_ascii_digit());
            }
        } else {
            self.source.reset_peek();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut next = self.peek().copied();
            if matches!(next, Some('+') | Some('-')) {
                next = self.peek().copied();
            }
            let has_exponent_digits = next.map(|c| c.is_ascii_digit()).unwrap_or(false);
            self.source.reset_peek();
            if has_exponent_digits {
                self.advance(); // 'e'/'E'
                if self.peek() == Some(&'+') || self.peek() == Some(&'-') {
                    self.advance();
                } else {
                    self.source.reset_peek();
                }
                self.advance_while_true(|c| c.is_ascii_digit());
            }
        } else {
            self.source.reset_peek();
        }
        let lexeme = String::from_iter(self.current_token_buffer.drain(..));
        let line = self.current_line;
        match f64::from_str(&lexeme) {
            Ok(f) => Token {
                kind: TokenKind::Number,
                lexeme,
                literal: Some(Literal::Number(f)),
                position: Position { line },
            },
            Err(_) => {
                ctx.report(line, "", "Invalid number literal.");
                Token {
                    kind: TokenKind::InvalidNumber,
                    lexeme,
                    literal: None,
                    position: Position { line },
                }
            }
        }
    }

    /// Alpha is `_` or any Unicode letter.
    fn is_alpha(c: &char) -> bool {
        *c == '_' || c.is_alphabetic()
    }

    /// Alnum is alpha plus any Unicode digit.
    fn is_alnum(c: &char) -> bool {
        Self::is_alpha(c) || c.is_numeric()
    }

    fn is_trivia(c: &char) -> bool {
        matches!(c, ' ' | '\r' | '\t' | '\n')
    }

    fn finalize_current_token(&mut self, kind: TokenKind) -> Token {
        let lexeme = self.finalize_buffer_into_lexeme();
        let line = self.current_line;
        Token {
            kind,
            lexeme,
            literal: None,
            position: Position { line },
        }
    }

    fn finalize_buffer_into_lexeme(&mut self) -> String {
        String::from_iter(self.current_token_buffer.drain(..))
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.source.next()?;
        if c == '\n' {
            self.current_line += 1;
        }
        self.current_token_buffer.push(c);
        Some(c)
    }

    fn advance_on_match(&mut self, c: char) -> bool {
        if self.peek() == Some(&c) {
            self.advance();
            true
        } else {
            self.source.reset_peek();
            false
        }
    }

    fn advance_until(&mut self, c: char) {
        self.advance_while_true(|ch| ch != &c)
    }

    fn advance_while_true<F>(&mut self, f: F)
    where
        F: Fn(&char) -> bool,
    {
        loop {
            let next = self.peek();
            if let Some(next) = next {
                if f(next) {
                    self.advance();
                    continue;
                }
            }
            break;
        }
        self.source.reset_peek();
    }

    fn peek(&mut self) -> Option<&char> {
        self.source.peek()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_debug_snapshot;

    fn scan(source: &str) -> Vec<Token> {
        let mut sink = Vec::new();
        let mut ctx = LoxContext::new(&mut sink, Default::default());
        Scanner::new(source)
            .scan_all(&mut ctx)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Trivia)
            .collect()
    }

    #[test]
    fn an_empty_source_translates_into_a_single_eof_token() {
        let tokens = scan("");
        assert_debug_snapshot!(tokens, @r###"
        [
            Token {
                kind: Eof,
                lexeme: "",
                literal: None,
                position: Position {
                    line: 1,
                },
            },
        ]
        "###)
    }

    #[test]
    fn numbers_stop_before_a_trailing_dot_with_no_digit() {
        let tokens = scan("123.foo");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Number,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn a_fractional_number_with_an_exponent_scans_as_one_token() {
        let tokens = scan("123.456e10;");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "123.456e10");
        match tokens[0].literal {
            Some(Literal::Number(n)) => assert_eq!(n, 123.456e10),
            _ => panic!("expected a number literal"),
        }
        assert_eq!(tokens[1].kind, TokenKind::Semicolon);
    }

    #[test]
    fn unterminated_string_does_not_consume_the_newline() {
        let tokens = scan("\"oops\nprint 1;");
        assert_eq!(tokens[0].kind, TokenKind::InvalidString);
        // The newline was left for the next token, so line tracking stays accurate.
        let print_token = tokens.iter().find(|t| t.kind == TokenKind::Print).unwrap();
        assert_eq!(print_token.line(), 2);
    }

    #[test]
    fn every_token_lexeme_matches_the_source_substring() {
        let source = "var greeting = \"hi\" + \"there\"; // trailing comment\nprint greeting;";
        let tokens = scan(source);
        let mut offset = 0;
        for token in &tokens {
            if token.kind == TokenKind::Eof {
                continue;
            }
            let found = source[offset..].find(&token.lexeme).map(|i| i + offset);
            assert!(found.is_some(), "lexeme {:?} not found", token.lexeme);
            offset = found.unwrap() + token.lexeme.len().max(1);
        }
    }
}
