//! Lexer
//!
//! Splits input into tokens. Both the unicode and the ASCII spelling of each
//! operator are accepted (`→`/`->`, `↔`/`<->`, `←`/`<-`, `λ`/`fun`).

use crate::surface::Span;
use crate::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, possibly dotted: `Nat.succ`
    Ident(String),
    NatLit(u64),
    StrLit(String),
    LParen,
    RParen,
    Colon,
    Comma,
    /// `=>`
    FatArrow,
    /// `→` / `->`
    Arrow,
    /// `↔` / `<->`
    Iff,
    /// `←` / `<-`
    LeftArrow,
    Eq,
    Plus,
    Star,
    /// `∀` / `forall`
    Forall,
    /// `fun` / `λ`
    Fun,
    Underscore,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenize the whole input. The result always ends with `Eof`.
    ///
    /// # Errors
    ///
    /// Returns an error on characters outside the token language and on
    /// unterminated string literals.
    pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                // Line comment
                Some('-') if self.rest().starts_with("--") => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(self.token(TokenKind::Eof, start));
        };

        for (text, kind) in [
            ("<->", TokenKind::Iff),
            ("->", TokenKind::Arrow),
            ("<-", TokenKind::LeftArrow),
            ("=>", TokenKind::FatArrow),
        ] {
            if self.rest().starts_with(text) {
                self.pos += text.len();
                return Ok(self.token(kind, start));
            }
        }

        let simple = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ':' => Some(TokenKind::Colon),
            ',' => Some(TokenKind::Comma),
            '→' => Some(TokenKind::Arrow),
            '↔' => Some(TokenKind::Iff),
            '←' => Some(TokenKind::LeftArrow),
            '=' => Some(TokenKind::Eq),
            '+' => Some(TokenKind::Plus),
            '*' => Some(TokenKind::Star),
            '∀' => Some(TokenKind::Forall),
            'λ' => Some(TokenKind::Fun),
            _ => None,
        };
        if let Some(kind) = simple {
            self.bump();
            return Ok(self.token(kind, start));
        }

        if c.is_ascii_digit() {
            return self.number(start);
        }
        if c == '"' {
            return self.string(start);
        }
        if is_ident_start(c) {
            return Ok(self.ident(start));
        }
        Err(ParseError::UnexpectedChar { pos: start, ch: c })
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: Span::new(start, self.pos),
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, ParseError> {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let value = self.input[start..self.pos]
            .parse::<u64>()
            .map_err(|_| ParseError::NumericOverflow { pos: start })?;
        Ok(self.token(TokenKind::NatLit(value), start))
    }

    fn string(&mut self, start: usize) -> Result<Token, ParseError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(self.token(TokenKind::StrLit(value), start)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some(c) => value.push(c),
                    None => return Err(ParseError::UnterminatedString { pos: start }),
                },
                Some(c) => value.push(c),
                None => return Err(ParseError::UnterminatedString { pos: start }),
            }
        }
    }

    fn ident(&mut self, start: usize) -> Token {
        loop {
            while matches!(self.peek(), Some(c) if is_ident_rest(c)) {
                self.bump();
            }
            // A dot continues the name only when another identifier follows
            let continues = self.rest().starts_with('.')
                && self.rest()[1..].chars().next().is_some_and(is_ident_start);
            if !continues {
                break;
            }
            self.bump();
        }
        let text = &self.input[start..self.pos];
        let kind = match text {
            "_" => TokenKind::Underscore,
            "fun" => TokenKind::Fun,
            "forall" => TokenKind::Forall,
            _ => TokenKind::Ident(text.to_string()),
        };
        self.token(kind, start)
    }
}

fn is_ident_start(c: char) -> bool {
    (c.is_alphabetic() && c != 'λ') || c == '_'
}

fn is_ident_rest(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '\'' || c == '!' || c == '?' || is_subscript(c)
}

fn is_subscript(c: char) -> bool {
    ('₀'..='₉').contains(&c)
}
