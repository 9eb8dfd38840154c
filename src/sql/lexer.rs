//! SQL Lexer (Tokenizer)
//!
//! This module converts SQL strings into a stream of tokens, each tagged
//! with the character position it starts at.

use super::token::{SpannedToken, Token};
use crate::error::{Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// SQL Lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;
            let position = self.position;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(SpannedToken { token, position });
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Tokenize and drop positions
    pub fn tokens(&mut self) -> Result<Vec<Token>> {
        Ok(self.tokenize()?.into_iter().map(|t| t.token).collect())
    }

    /// Get the next token from the input
    fn next_token(&mut self) -> Result<Token> {
        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();

        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Asterisk),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '=' => Some(Token::Eq),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            '.' => {
                if self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    return self.read_number();
                }
                self.advance();
                Ok(Token::Dot)
            }
            '<' => {
                self.advance();
                match self.peek_current() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::Lte)
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::Neq)
                    }
                    _ => Ok(Token::Lt),
                }
            }
            '>' => {
                self.advance();
                if self.peek_current() == Some('=') {
                    self.advance();
                    return Ok(Token::Gte);
                }
                Ok(Token::Gt)
            }
            '!' => {
                self.advance();
                if self.peek_current() == Some('=') {
                    self.advance();
                    return Ok(Token::Neq);
                }
                Err(Error::UnexpectedCharacter('!', self.position - 1))
            }
            '|' => {
                self.advance();
                if self.peek_current() == Some('|') {
                    self.advance();
                    return Ok(Token::Concat);
                }
                Err(Error::UnexpectedCharacter('|', self.position - 1))
            }
            '\'' => self.read_string().map(Token::StringLiteral),
            '"' => self.read_delimited('"', '"').map(Token::Identifier),
            '[' => self.read_delimited('[', ']').map(Token::Identifier),
            '@' => self.read_variable(),
            'x' | 'X' if self.peek_char() == Some('\'') => self.read_hex(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier()),
            c => Err(Error::UnexpectedCharacter(c, self.position)),
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Current character, if any
    fn peek_current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek at the next character
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Skip whitespace and SQL comments (-- and /* */)
    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            while !self.is_at_end() && self.current_char().is_whitespace() {
                self.advance();
            }
            if self.is_at_end() {
                return Ok(());
            }

            if self.current_char() == '-' && self.peek_char() == Some('-') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
                continue;
            }

            if self.current_char() == '/' && self.peek_char() == Some('*') {
                let start_pos = self.position;
                self.advance();
                self.advance();
                loop {
                    if self.is_at_end() {
                        return Err(Error::UnterminatedComment(start_pos));
                    }
                    if self.current_char() == '*' && self.peek_char() == Some('/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Read a string literal (single-quoted, '' escapes a quote)
    fn read_string(&mut self) -> Result<String> {
        self.read_delimited('\'', '\'')
    }

    /// Read text between `open` and `close`; a doubled `close` is an escape
    fn read_delimited(&mut self, open: char, close: char) -> Result<String> {
        let start_pos = self.position;
        debug_assert_eq!(self.current_char(), open);
        self.advance();

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == close {
                if self.peek_char() == Some(close) {
                    value.push(close);
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    return Ok(value);
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::UnterminatedString(start_pos))
    }

    /// Read a binary literal X'0AFF'
    fn read_hex(&mut self) -> Result<Token> {
        let start_pos = self.position;
        self.advance(); // skip X
        let digits = self.read_string()?;
        hex::decode(digits.trim())
            .map(Token::HexLiteral)
            .map_err(|_| Error::InvalidNumber(start_pos))
    }

    /// Read a variable reference @name
    fn read_variable(&mut self) -> Result<Token> {
        let start_pos = self.position;
        self.advance(); // skip @
        match self.peek_current() {
            Some(c) if c.is_alphanumeric() || c == '_' => {}
            _ => return Err(Error::UnexpectedCharacter('@', start_pos)),
        }
        let mut name = String::new();
        while let Some(c) = self.peek_current() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(Token::Variable(name))
    }

    /// Read a number: integer, exact decimal or float (with exponent)
    fn read_number(&mut self) -> Result<Token> {
        let start_pos = self.position;
        let mut value = String::new();
        let mut has_fraction = false;
        let mut has_exponent = false;

        while let Some(ch) = self.peek_current() {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !has_fraction && !has_exponent {
                has_fraction = true;
                value.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && !has_exponent && !value.is_empty() {
                has_exponent = true;
                value.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek_current() {
                    value.push(sign);
                    self.advance();
                }
                if !self.peek_current().map_or(false, |c| c.is_ascii_digit()) {
                    return Err(Error::InvalidNumber(start_pos));
                }
            } else {
                break;
            }
        }

        if has_exponent {
            return value
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Token::FloatLiteral)
                .ok_or(Error::InvalidNumber(start_pos));
        }
        if !has_fraction {
            if let Ok(n) = value.parse::<i64>() {
                return Ok(Token::IntegerLiteral(n));
            }
        }
        Decimal::from_str(&value)
            .map(Token::DecimalLiteral)
            .map_err(|_| Error::InvalidNumber(start_pos))
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut value = String::new();

        while let Some(ch) = self.peek_current() {
            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::from_keyword(&value).unwrap_or(Token::Identifier(value))
    }
}
