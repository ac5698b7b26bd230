//! Escape-aware tokenizer
//!
//! Converts the character stream of one interchange into a stream of
//! [`Token`]s, honoring the release (escape) character: a delimiter is only
//! recognized as such when it is not escaped. The tokenizer is single-pass
//! and not restartable.

use crate::characters::ControlCharacters;
use crate::token::{Token, TokenKind};
use crate::{Error, Result};
use std::str::Chars;

/// Tokenizer over one message string.
///
/// Yields `Result<Token>`; iteration ends cleanly when the input is
/// exhausted between tokens. Running out of input in the middle of a
/// content run (an unterminated segment) yields [`Error::UnexpectedEof`].
pub struct Tokenizer<'a> {
    input: Chars<'a>,
    characters: ControlCharacters,
    /// The character currently under the cursor, if any.
    current: Option<char>,
    /// Whether `current` was preceded by the release character.
    escaped: bool,
    buffer: String,
}

impl<'a> Tokenizer<'a> {
    pub fn new(message: &'a str, characters: ControlCharacters) -> Self {
        let mut tokenizer = Self {
            input: message.chars(),
            characters,
            current: None,
            escaped: false,
            buffer: String::new(),
        };
        tokenizer.read_next();
        tokenizer
    }

    /// Advance the cursor by one character. A release character is consumed
    /// here and flags the character after it as escaped.
    fn read_next(&mut self) {
        self.current = self.input.next();
        // A character following an escaped one starts out unescaped.
        self.escaped = false;
        if self.current == Some(self.characters.escape_character) {
            self.escaped = true;
            self.current = self.input.next();
        }
    }

    /// Classify the current character as a delimiter, unless it is escaped.
    fn delimiter_kind(&self) -> Option<TokenKind> {
        if self.escaped {
            return None;
        }
        let c = self.current?;
        if c == self.characters.component_separator {
            Some(TokenKind::ComponentSeparator)
        } else if c == self.characters.data_separator {
            Some(TokenKind::DataSeparator)
        } else if c == self.characters.segment_terminator {
            Some(TokenKind::Terminator)
        } else {
            None
        }
    }

    /// Store the current character and move on.
    fn store_and_read_next(&mut self) {
        if let Some(c) = self.current {
            self.buffer.push(c);
        }
        self.read_next();
    }

    fn next_token(&mut self) -> Result<Token> {
        if let Some(kind) = self.delimiter_kind() {
            self.store_and_read_next();
            let token = Token::new(kind, std::mem::take(&mut self.buffer));
            if kind == TokenKind::Terminator {
                // Segments may be broken across display lines; the break is
                // insignificant whitespace.
                while self
                    .current
                    .is_some_and(|c| self.characters.is_line_terminator(c))
                {
                    self.read_next();
                }
            }
            return Ok(token);
        }

        while self.delimiter_kind().is_none() {
            if self.current.is_none() {
                return Err(Error::UnexpectedEof);
            }
            self.store_and_read_next();
        }
        Ok(Token::new(TokenKind::Content, std::mem::take(&mut self.buffer)))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        Some(self.next_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(message: &str) -> Vec<Token> {
        Tokenizer::new(message, ControlCharacters::default())
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_basic_segment() {
        assert_eq!(
            tokens("RFF+PD:50515'"),
            vec![
                Token::new(TokenKind::Content, "RFF"),
                Token::new(TokenKind::DataSeparator, "+"),
                Token::new(TokenKind::Content, "PD"),
                Token::new(TokenKind::ComponentSeparator, ":"),
                Token::new(TokenKind::Content, "50515"),
                Token::new(TokenKind::Terminator, "'"),
            ]
        );
    }

    #[test]
    fn test_escaped_data_separator() {
        assert_eq!(
            tokens("RFF+AA?+BB'"),
            vec![
                Token::new(TokenKind::Content, "RFF"),
                Token::new(TokenKind::DataSeparator, "+"),
                Token::new(TokenKind::Content, "AA+BB"),
                Token::new(TokenKind::Terminator, "'"),
            ]
        );
    }

    #[test]
    fn test_double_escape_is_literal_escape_character() {
        assert_eq!(
            tokens("RFF+AA??BB'"),
            vec![
                Token::new(TokenKind::Content, "RFF"),
                Token::new(TokenKind::DataSeparator, "+"),
                Token::new(TokenKind::Content, "AA?BB"),
                Token::new(TokenKind::Terminator, "'"),
            ]
        );
    }

    #[test]
    fn test_triple_escape() {
        // "???+" reads as literal '?' followed by literal '+'.
        assert_eq!(
            tokens("RFF+AA???+BB'"),
            vec![
                Token::new(TokenKind::Content, "RFF"),
                Token::new(TokenKind::DataSeparator, "+"),
                Token::new(TokenKind::Content, "AA?+BB"),
                Token::new(TokenKind::Terminator, "'"),
            ]
        );
    }

    #[test]
    fn test_quadruple_escape() {
        assert_eq!(
            tokens("RFF+AA????BB'"),
            vec![
                Token::new(TokenKind::Content, "RFF"),
                Token::new(TokenKind::DataSeparator, "+"),
                Token::new(TokenKind::Content, "AA??BB"),
                Token::new(TokenKind::Terminator, "'"),
            ]
        );
    }

    #[test]
    fn test_escaped_terminator() {
        assert_eq!(
            tokens("RFF+AA?'BB'"),
            vec![
                Token::new(TokenKind::Content, "RFF"),
                Token::new(TokenKind::DataSeparator, "+"),
                Token::new(TokenKind::Content, "AA'BB"),
                Token::new(TokenKind::Terminator, "'"),
            ]
        );
    }

    #[test]
    fn test_line_terminators_after_segment_are_consumed() {
        for message in ["RFF+PD'\nDTM+1'", "RFF+PD'\r\nDTM+1'", "RFF+PD'   \r\nDTM+1'"] {
            let got = tokens(message);
            assert_eq!(got.len(), 8, "{message}");
            assert_eq!(got[4], Token::new(TokenKind::Content, "DTM"));
        }
    }

    #[test]
    fn test_unterminated_segment_is_an_error() {
        let mut tokenizer = Tokenizer::new("RFF+PD", ControlCharacters::default());
        assert!(matches!(
            tokenizer.nth(2),
            Some(Err(Error::UnexpectedEof))
        ));
    }

    #[test]
    fn test_clean_end_between_segments() {
        let mut tokenizer = Tokenizer::new("RFF'", ControlCharacters::default());
        assert!(tokenizer.next().unwrap().is_ok());
        assert!(tokenizer.next().unwrap().is_ok());
        assert!(tokenizer.next().is_none());
    }

    #[test]
    fn test_custom_characters() {
        let chars: ControlCharacters = "*=_# ~".parse().unwrap();
        let got: Vec<Token> = Tokenizer::new("RFF=PD*50515~", chars)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(
            got,
            vec![
                Token::new(TokenKind::Content, "RFF"),
                Token::new(TokenKind::DataSeparator, "="),
                Token::new(TokenKind::Content, "PD"),
                Token::new(TokenKind::ComponentSeparator, "*"),
                Token::new(TokenKind::Content, "50515"),
                Token::new(TokenKind::Terminator, "~"),
            ]
        );
    }
}
