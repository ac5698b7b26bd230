//! EDIFACT parser
//!
//! Detects and strips an optional leading service string advice, tokenizes
//! the remainder, and reduces the token stream into [`Segment`]s, resolving
//! each tag through the [`SegmentRegistry`].

use crate::characters::{ControlCharacters, SERVICE_STRING_ADVICE_TAG};
use crate::segments::{Element, Segment, SegmentRegistry, INTERCHANGE_HEADER_TAG};
use crate::token::TokenKind;
use crate::tokenizer::Tokenizer;
use crate::{Error, Result};
use tracing::debug;

/// Parser for interchange text.
///
/// The parser itself holds only configuration (registry, default control
/// characters, validation switch); every `parse` call constructs an
/// independent result and the defaults are never mutated.
pub struct Parser {
    registry: SegmentRegistry,
    characters: ControlCharacters,
    validate: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            registry: SegmentRegistry::standard(),
            characters: ControlCharacters::default(),
            validate: false,
        }
    }

    /// Replace the default control characters used when the input carries
    /// no service string advice.
    #[must_use]
    pub fn with_characters(mut self, characters: ControlCharacters) -> Self {
        self.characters = characters;
        self
    }

    /// Replace the segment registry.
    #[must_use]
    pub fn with_registry(mut self, registry: SegmentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Enable shape validation of service segments during parsing.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// The parser's default control characters.
    pub fn characters(&self) -> ControlCharacters {
        self.characters
    }

    /// Parse interchange text into a segment sequence.
    pub fn parse(&self, message: &str) -> Result<Vec<Segment>> {
        self.parse_with_characters(message, self.characters)
    }

    /// Parse interchange text, using `fallback` as the control characters
    /// when the input carries no service string advice. An advice found in
    /// the input always takes precedence.
    pub fn parse_with_characters(
        &self,
        message: &str,
        fallback: ControlCharacters,
    ) -> Result<Vec<Segment>> {
        match Self::detect_service_advice(message)? {
            Some((characters, rest)) => {
                debug!(characters = %characters, "service string advice found");
                self.reduce(rest, characters, true)
            }
            None => self.reduce(message, fallback, false),
        }
    }

    /// Locate a service string advice: either the text starts with the
    /// marker, or the marker preceded by the default segment terminator
    /// occurs later. Everything before the marker is discarded; the six
    /// characters after it become the active set, and line breaks directly
    /// after them are stripped.
    fn detect_service_advice(message: &str) -> Result<Option<(ControlCharacters, &str)>> {
        let marker_at = if message.starts_with(SERVICE_STRING_ADVICE_TAG) {
            Some(0)
        } else {
            message.find("'UNA").map(|i| i + 1)
        };
        let Some(marker_at) = marker_at else {
            return Ok(None);
        };

        let after = &message[marker_at + SERVICE_STRING_ADVICE_TAG.len()..];
        let mut advice_len = 0;
        let mut seen = 0;
        for c in after.chars().take(6) {
            advice_len += c.len_utf8();
            seen += 1;
        }
        if seen < 6 {
            return Err(Error::syntax("service string advice too short"));
        }
        let characters: ControlCharacters = after[..advice_len].parse()?;
        let rest = after[advice_len..].trim_start_matches(['\r', '\n']);
        Ok(Some((characters, rest)))
    }

    /// Tokenize and reduce the message body into segments.
    fn reduce(
        &self,
        message: &str,
        characters: ControlCharacters,
        with_advice: bool,
    ) -> Result<Vec<Segment>> {
        let mut raw_segments: Vec<Vec<Element>> = Vec::new();
        let mut current: Vec<Element> = Vec::new();
        let mut data_element: Vec<String> = Vec::new();
        let mut in_segment = false;
        // Component separators seen since the last content token; used to
        // backfill skipped components ("23:::56") at their position.
        let mut empty_components = 0usize;

        for token in Tokenizer::new(message, characters) {
            let token = token?;
            if in_segment {
                if token.kind == TokenKind::Terminator {
                    current.push(collapse(std::mem::take(&mut data_element)));
                    raw_segments.push(std::mem::take(&mut current));
                    in_segment = false;
                    continue;
                }
            } else {
                if token.kind == TokenKind::Terminator {
                    return Err(Error::syntax("segment terminator without segment content"));
                }
                current.clear();
                data_element.clear();
                empty_components = 0;
                in_segment = true;
            }

            match token.kind {
                TokenKind::DataSeparator => {
                    current.push(collapse(std::mem::take(&mut data_element)));
                    empty_components = 0;
                }
                TokenKind::ComponentSeparator => {
                    empty_components += 1;
                }
                _ => {
                    let backfill = if data_element.is_empty() {
                        empty_components
                    } else {
                        empty_components.saturating_sub(1)
                    };
                    for _ in 0..backfill {
                        data_element.push(String::new());
                    }
                    data_element.push(token.value);
                    empty_components = 0;
                }
            }
        }
        if in_segment {
            return Err(Error::UnexpectedEof);
        }

        let mut segments = Vec::with_capacity(raw_segments.len() + usize::from(with_advice));
        let mut version: Option<u8> = None;
        if with_advice {
            segments.push(self.registry.resolve(
                SERVICE_STRING_ADVICE_TAG,
                vec![Element::Value(characters.to_string())],
                version,
                false,
            )?);
        }
        for mut raw in raw_segments {
            if raw.is_empty() {
                return Err(Error::syntax("malformed segment tag"));
            }
            let tag = match raw.remove(0) {
                Element::Value(tag) => tag,
                Element::Composite(_) => return Err(Error::syntax("malformed segment tag")),
            };
            if with_advice && tag == SERVICE_STRING_ADVICE_TAG {
                return Err(Error::syntax("multiple UNA segments are not allowed"));
            }
            if tag == INTERCHANGE_HEADER_TAG {
                if let Some(v) = syntax_version(raw.first()) {
                    debug!(version = v, "syntax version from interchange header");
                    version = Some(v);
                }
            }
            segments.push(self.registry.resolve(&tag, raw, version, self.validate)?);
        }
        Ok(segments)
    }
}

/// Collapse component-separated parts into an element: zero parts become an
/// empty value, one part a plain value, several a composite.
fn collapse(mut parts: Vec<String>) -> Element {
    match parts.len() {
        0 => Element::Value(String::new()),
        1 => Element::Value(parts.pop().unwrap_or_default()),
        _ => Element::Composite(parts),
    }
}

/// Syntax version from an interchange header's syntax identifier composite.
fn syntax_version(element: Option<&Element>) -> Option<u8> {
    match element {
        Some(Element::Composite(components)) => components.get(1)?.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(message: &str) -> Vec<Segment> {
        Parser::new().parse(message).unwrap()
    }

    #[test]
    fn test_single_segment_with_composite() {
        let segments = parse("RFF+PD:50515'");
        assert_eq!(
            segments,
            vec![Segment::new("RFF", vec![vec!["PD", "50515"].into()])]
        );
    }

    #[test]
    fn test_escaped_data_separator_stays_content() {
        let segments = parse("DTM+735:?+0000:406'");
        assert_eq!(
            segments,
            vec![Segment::new("DTM", vec![vec!["735", "+0000", "406"].into()])]
        );
    }

    #[test]
    fn test_composite_backfill() {
        assert_eq!(
            parse("TAG+A::B'"),
            vec![Segment::new("TAG", vec![vec!["A", "", "B"].into()])]
        );
        assert_eq!(
            parse("TAG+A:::B'"),
            vec![Segment::new("TAG", vec![vec!["A", "", "", "B"].into()])]
        );
        assert_eq!(
            parse("TAG+::B'"),
            vec![Segment::new("TAG", vec![vec!["", "", "B"].into()])]
        );
    }

    #[test]
    fn test_empty_elements() {
        assert_eq!(
            parse("TAG+VAL1++VAL3'"),
            vec![Segment::new(
                "TAG",
                vec!["VAL1".into(), "".into(), "VAL3".into()]
            )]
        );
        assert_eq!(parse("TAG+'"), vec![Segment::new("TAG", vec!["".into()])]);
        assert_eq!(parse("TAG'"), vec![Segment::new("TAG", vec![])]);
    }

    #[test]
    fn test_multiple_segments_and_line_breaks() {
        let segments = parse("RFF+PD'\r\nDTM+735'\n");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tag, "RFF");
        assert_eq!(segments[1].tag, "DTM");
    }

    #[test]
    fn test_advice_extraction() {
        // The decimal point differs from the default set; everything else
        // matches. The advice governs the remainder of the parse.
        let segments = parse("UNA:+.? 'RFF+PD:50515'");
        assert_eq!(segments.len(), 2);
        assert_eq!(
            segments[0],
            Segment::new("UNA", vec![":+.? '".into()])
        );
        assert_eq!(
            segments[1],
            Segment::new("RFF", vec![vec!["PD", "50515"].into()])
        );
    }

    #[test]
    fn test_advice_with_custom_delimiters() {
        let segments = parse("UNA*=_# ~RFF=PD*50515~");
        assert_eq!(
            segments,
            vec![
                Segment::new("UNA", vec!["*=_# ~".into()]),
                Segment::new("RFF", vec![vec!["PD", "50515"].into()]),
            ]
        );
    }

    #[test]
    fn test_advice_overrides_fallback_characters() {
        let fallback = ControlCharacters::default().with_data_separator('=');
        let segments = Parser::new()
            .parse_with_characters("UNA:+,? 'RFF+PD'", fallback)
            .unwrap();
        assert_eq!(segments[1], Segment::new("RFF", vec!["PD".into()]));
    }

    #[test]
    fn test_fallback_characters_used_without_advice() {
        let fallback = ControlCharacters::default().with_data_separator('=');
        let segments = Parser::new()
            .parse_with_characters("RFF=PD'", fallback)
            .unwrap();
        assert_eq!(segments, vec![Segment::new("RFF", vec!["PD".into()])]);
    }

    #[test]
    fn test_advice_found_later_discards_preceding_text() {
        let segments = parse("ignored prefix'UNA:+,? 'RFF+PD'");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tag, "UNA");
        assert_eq!(segments[1].tag, "RFF");
    }

    #[test]
    fn test_duplicate_advice_is_an_error() {
        let err = Parser::new().parse("UNA:+,? 'RFF+PD'UNA:+,? '").unwrap_err();
        assert!(matches!(err, Error::Syntax(message) if message.contains("UNA")));
    }

    #[test]
    fn test_truncated_advice_is_an_error() {
        assert!(Parser::new().parse("UNA:+,").is_err());
    }

    #[test]
    fn test_unterminated_segment_is_an_error() {
        assert!(matches!(
            Parser::new().parse("RFF+PD").unwrap_err(),
            Error::UnexpectedEof
        ));
        // A trailing separator leaves the segment open as well.
        assert!(matches!(
            Parser::new().parse("RFF+PD+").unwrap_err(),
            Error::UnexpectedEof
        ));
    }

    #[test]
    fn test_bare_terminator_is_an_error() {
        assert!(Parser::new().parse("RFF+PD''").is_err());
    }

    #[test]
    fn test_interchange_header_switches_syntax_version() {
        // An 8-digit preparation date is only valid under syntax version 4;
        // with validation on, the version from the header must be in effect.
        let parser = Parser::new().with_validation(true);
        let segments = parser
            .parse("UNB+UNOC:4+SENDER+RECIPIENT+20200101:1200+REF01'")
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert!(parser
            .parse("UNB+UNOA:3+SENDER+RECIPIENT+20200101:1200+REF01'")
            .is_err());
    }

    #[test]
    fn test_validation_reports_position() {
        let parser = Parser::new().with_validation(true);
        let err = parser
            .parse("UNB+UNOA:X+SENDER+RECIPIENT+200101:1200+REF01'")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation { position, .. } if position == "1.2"
        ));
    }
}
