//! EDIFACT serializer
//!
//! The inverse of parsing: escapes element values and joins segments back
//! into interchange text, optionally preceded by the service string advice.

use crate::characters::{ControlCharacters, SERVICE_STRING_ADVICE_TAG};
use crate::segments::{Element, Segment};

/// Serializer for a fixed set of control characters.
pub struct Serializer {
    characters: ControlCharacters,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(ControlCharacters::default())
    }
}

impl Serializer {
    pub fn new(characters: ControlCharacters) -> Self {
        Self { characters }
    }

    /// Serialize segments into interchange text.
    ///
    /// With `with_advice`, the service string advice is emitted first; a
    /// literal `UNA` segment in the input is skipped, since the advice is
    /// produced from the active characters, not from segment data. With
    /// `break_lines`, a newline follows each segment terminator (forbidden
    /// by the letter of the standard, ubiquitous in practice).
    pub fn serialize(&self, segments: &[Segment], with_advice: bool, break_lines: bool) -> String {
        let mut out = String::new();

        if with_advice {
            if segments.is_empty() {
                return self.characters.service_string_advice();
            }
            out.push_str(&self.characters.service_string_advice());
            if break_lines {
                out.push('\n');
            }
        } else if segments.is_empty() {
            return out;
        }

        for segment in segments {
            if segment.tag == SERVICE_STRING_ADVICE_TAG {
                continue;
            }
            out.push_str(&segment.tag);
            for element in &segment.elements {
                out.push(self.characters.data_separator);
                match element {
                    Element::Value(value) => self.escape_into(&mut out, value),
                    Element::Composite(components) => {
                        for (i, component) in components.iter().enumerate() {
                            if i > 0 {
                                out.push(self.characters.component_separator);
                            }
                            self.escape_into(&mut out, component);
                        }
                    }
                }
            }
            out.push(self.characters.segment_terminator);
            if break_lines {
                out.push('\n');
            }
        }
        out
    }

    /// Escape a value: each of the four meaningful delimiters is prefixed
    /// with the escape character. The single pass over the characters means
    /// an escape character in the data is never escaped twice.
    pub fn escape(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        self.escape_into(&mut out, value);
        out
    }

    fn escape_into(&self, out: &mut String, value: &str) {
        let c = &self.characters;
        for ch in value.chars() {
            if ch == c.escape_character
                || ch == c.component_separator
                || ch == c.data_separator
                || ch == c.segment_terminator
            {
                out.push(c.escape_character);
            }
            out.push(ch);
        }
    }
}
