//! Control characters and the service string advice
//!
//! An interchange is delimited by six configurable characters, declared up
//! front by an optional `UNA` segment ("service string advice"). This module
//! holds that character set and its textual form.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag of the service string advice pseudo-segment.
pub const SERVICE_STRING_ADVICE_TAG: &str = "UNA";

/// The set of control characters in effect for one interchange.
///
/// Values are immutable: the `with_*` mutators consume a copy and return a
/// new instance, the original is untouched. A fresh default set is produced
/// per parse unless one is supplied explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCharacters {
    /// Separates components inside a composite data element (default `:`).
    pub component_separator: char,
    /// Separates data elements inside a segment (default `+`).
    pub data_separator: char,
    /// Decimal notation mark (default `,`).
    pub decimal_point: char,
    /// Release character making the following delimiter literal (default `?`).
    pub escape_character: char,
    /// Reserved for future use (default space).
    pub reserved_character: char,
    /// Terminates a segment (default `'`).
    pub segment_terminator: char,
    /// Characters ignored when they follow a segment terminator, so
    /// segments may be split across display lines.
    pub line_terminators: [char; 3],
}

impl Default for ControlCharacters {
    fn default() -> Self {
        Self {
            component_separator: ':',
            data_separator: '+',
            decimal_point: ',',
            escape_character: '?',
            reserved_character: ' ',
            segment_terminator: '\'',
            line_terminators: [' ', '\r', '\n'],
        }
    }
}

impl ControlCharacters {
    /// Render the full service string advice (`UNA` + the six characters).
    pub fn service_string_advice(&self) -> String {
        format!("{SERVICE_STRING_ADVICE_TAG}{self}")
    }

    /// Check whether a character closes a display line after a terminator.
    pub fn is_line_terminator(&self, c: char) -> bool {
        self.line_terminators.contains(&c)
    }

    /// Return a copy with a different component separator.
    #[must_use]
    pub fn with_component_separator(mut self, c: char) -> Self {
        self.component_separator = c;
        self
    }

    /// Return a copy with a different data separator.
    #[must_use]
    pub fn with_data_separator(mut self, c: char) -> Self {
        self.data_separator = c;
        self
    }

    /// Return a copy with a different decimal point.
    #[must_use]
    pub fn with_decimal_point(mut self, c: char) -> Self {
        self.decimal_point = c;
        self
    }

    /// Return a copy with a different escape character.
    #[must_use]
    pub fn with_escape_character(mut self, c: char) -> Self {
        self.escape_character = c;
        self
    }

    /// Return a copy with a different reserved character.
    #[must_use]
    pub fn with_reserved_character(mut self, c: char) -> Self {
        self.reserved_character = c;
        self
    }

    /// Return a copy with a different segment terminator.
    #[must_use]
    pub fn with_segment_terminator(mut self, c: char) -> Self {
        self.segment_terminator = c;
        self
    }
}

impl fmt::Display for ControlCharacters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}",
            self.component_separator,
            self.data_separator,
            self.decimal_point,
            self.escape_character,
            self.reserved_character,
            self.segment_terminator
        )
    }
}

impl FromStr for ControlCharacters {
    type Err = Error;

    /// Read a character set from either the bare six characters or the full
    /// `UNA`-prefixed advice.
    fn from_str(s: &str) -> Result<Self> {
        let rest = s.strip_prefix(SERVICE_STRING_ADVICE_TAG).unwrap_or(s);
        let mut chars = rest.chars();
        let mut take = |name: &str| {
            chars
                .next()
                .ok_or_else(|| Error::syntax(format!("service string advice too short, missing {name}")))
        };
        Ok(Self {
            component_separator: take("component separator")?,
            data_separator: take("data separator")?,
            decimal_point: take("decimal point")?,
            escape_character: take("escape character")?,
            reserved_character: take("reserved character")?,
            segment_terminator: take("segment terminator")?,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let chars = ControlCharacters::default();
        assert_eq!(chars.component_separator, ':');
        assert_eq!(chars.data_separator, '+');
        assert_eq!(chars.decimal_point, ',');
        assert_eq!(chars.escape_character, '?');
        assert_eq!(chars.reserved_character, ' ');
        assert_eq!(chars.segment_terminator, '\'');
    }

    #[test]
    fn test_display_and_advice() {
        let chars = ControlCharacters::default();
        assert_eq!(chars.to_string(), ":+,? '");
        assert_eq!(chars.service_string_advice(), "UNA:+,? '");
    }

    #[test]
    fn test_from_str_bare() {
        let chars: ControlCharacters = "*=_# ~".parse().unwrap();
        assert_eq!(chars.component_separator, '*');
        assert_eq!(chars.data_separator, '=');
        assert_eq!(chars.decimal_point, '_');
        assert_eq!(chars.escape_character, '#');
        assert_eq!(chars.reserved_character, ' ');
        assert_eq!(chars.segment_terminator, '~');
    }

    #[test]
    fn test_from_str_with_una_prefix() {
        let chars: ControlCharacters = "UNA:+.? '".parse().unwrap();
        assert_eq!(chars.decimal_point, '.');
        assert_eq!(chars.segment_terminator, '\'');
    }

    #[test]
    fn test_from_str_too_short() {
        assert!("UNA:+".parse::<ControlCharacters>().is_err());
        assert!(":+,?".parse::<ControlCharacters>().is_err());
    }

    #[test]
    fn test_with_mutators_leave_original_untouched() {
        let original = ControlCharacters::default();
        let changed = original.with_segment_terminator('~').with_data_separator('=');
        assert_eq!(original.segment_terminator, '\'');
        assert_eq!(original.data_separator, '+');
        assert_eq!(changed.segment_terminator, '~');
        assert_eq!(changed.data_separator, '=');
    }

    #[test]
    fn test_line_terminators() {
        let chars = ControlCharacters::default();
        assert!(chars.is_line_terminator('\n'));
        assert!(chars.is_line_terminator('\r'));
        assert!(chars.is_line_terminator(' '));
        assert!(!chars.is_line_terminator('x'));
    }
}
