//! Segment containers: raw collections, messages, and interchanges
//!
//! A container owns an ordered sequence of body segments, excluding its own
//! envelope (header/footer) segments: those are synthesized on demand from
//! the container's fields, never stored. The interchange additionally keeps
//! the control characters in effect and whether a service string advice was
//! present in the source.

use crate::characters::{ControlCharacters, SERVICE_STRING_ADVICE_TAG};
use crate::parser::Parser;
use crate::segments::{
    Element, Segment, INTERCHANGE_FOOTER_TAG, INTERCHANGE_HEADER_TAG, MESSAGE_FOOTER_TAG,
    MESSAGE_HEADER_TAG,
};
use crate::serializer::Serializer;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Common behavior of segment containers.
pub trait SegmentContainer {
    /// Tag of the synthesized header segment, if any.
    const HEADER_TAG: Option<&'static str> = None;
    /// Tag of the synthesized footer segment, if any.
    const FOOTER_TAG: Option<&'static str> = None;

    /// The body segments, excluding envelope segments.
    fn body(&self) -> &[Segment];
    fn body_mut(&mut self) -> &mut Vec<Segment>;
    /// The control characters in effect for this container.
    fn characters(&self) -> ControlCharacters;
    /// Whether a service string advice was present in the source text (and
    /// is emitted again on serialization).
    fn has_una(&self) -> bool {
        false
    }

    /// Synthesize the header segment from the container's fields.
    fn header_segment(&self) -> Option<Segment> {
        None
    }

    /// Synthesize the footer segment from the container's fields.
    fn footer_segment(&self) -> Option<Segment> {
        None
    }

    /// Append a segment to the body. Segments carrying this container's own
    /// header or footer tag are dropped: they are re-derived on demand.
    fn add_segment(&mut self, segment: Segment) {
        let tag = segment.tag.as_str();
        if Self::HEADER_TAG == Some(tag) || Self::FOOTER_TAG == Some(tag) {
            return;
        }
        self.body_mut().push(segment);
    }

    /// Append several segments.
    fn add_segments<I: IntoIterator<Item = Segment>>(&mut self, segments: I)
    where
        Self: Sized,
    {
        for segment in segments {
            self.add_segment(segment);
        }
    }

    /// All body segments with the given tag, lazily.
    fn get_segments<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Segment>
    where
        Self: Sized,
    {
        self.body().iter().filter(move |segment| segment.tag == tag)
    }

    /// All body segments with the given tag for which `predicate` holds.
    fn get_segments_when<'a, P>(
        &'a self,
        tag: &'a str,
        predicate: P,
    ) -> impl Iterator<Item = &'a Segment>
    where
        Self: Sized,
        P: Fn(&Segment) -> bool + 'a,
    {
        self.body()
            .iter()
            .filter(move |segment| segment.tag == tag && predicate(segment))
    }

    /// First body segment with the given tag.
    fn get_segment(&self, tag: &str) -> Option<&Segment> {
        self.body().iter().find(|segment| segment.tag == tag)
    }

    /// First body segment with the given tag for which `predicate` holds.
    fn get_segment_when<P>(&self, tag: &str, predicate: P) -> Option<&Segment>
    where
        P: Fn(&Segment) -> bool,
    {
        self.body()
            .iter()
            .find(|segment| segment.tag == tag && predicate(segment))
    }

    /// Partition the body into consecutive groups, each beginning at an
    /// occurrence of `start_tag`. Content before the first start segment is
    /// discarded. When `end_tag` is given, a group also closes on that tag
    /// (only when its first element equals `end_qualifier`, if one is
    /// given), and segments up to the next start segment are ignored. A
    /// trailing open group is yielded.
    fn split_by(
        &self,
        start_tag: &str,
        end_tag: Option<&str>,
        end_qualifier: Option<&str>,
    ) -> Vec<RawSegmentCollection>
    where
        Self: Sized,
    {
        let mut groups = Vec::new();
        let mut current: Option<RawSegmentCollection> = None;

        for segment in self.body() {
            if segment.tag == start_tag {
                if let Some(open) = current.take() {
                    groups.push(open);
                }
                let mut group = RawSegmentCollection::new(self.characters());
                group.add_segment(segment.clone());
                current = Some(group);
            } else if let Some(open) = current.as_mut() {
                open.add_segment(segment.clone());
            } else {
                // Not inside a group yet.
                continue;
            }

            if end_tag == Some(segment.tag.as_str()) {
                let closes = match end_qualifier {
                    None => true,
                    Some(qualifier) => {
                        segment.elements.first().and_then(Element::as_value) == Some(qualifier)
                    }
                };
                if closes {
                    if let Some(open) = current.take() {
                        groups.push(open);
                    }
                }
            }
        }
        if let Some(open) = current {
            groups.push(open);
        }
        groups
    }

    /// Serialize the container, envelope segments included.
    fn serialize(&self, break_lines: bool) -> String {
        let mut segments = Vec::with_capacity(self.body().len() + 2);
        if let Some(header) = self.header_segment() {
            segments.push(header);
        }
        segments.extend(self.body().iter().cloned());
        if let Some(footer) = self.footer_segment() {
            segments.push(footer);
        }
        Serializer::new(self.characters()).serialize(&segments, self.has_una(), break_lines)
    }
}

/// A plain collection of segments with no envelope.
///
/// Useful for analyzing arbitrary segment runs; prefer [`Interchange`] or
/// [`Message`] when handling enveloped content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSegmentCollection {
    pub segments: Vec<Segment>,
    pub characters: ControlCharacters,
    pub has_una: bool,
}

impl RawSegmentCollection {
    pub fn new(characters: ControlCharacters) -> Self {
        Self {
            segments: Vec::new(),
            characters,
            has_una: false,
        }
    }

    pub fn from_segments<I: IntoIterator<Item = Segment>>(segments: I) -> Self {
        let mut collection = Self::default();
        collection.add_segments(segments);
        collection
    }
}

impl SegmentContainer for RawSegmentCollection {
    fn body(&self) -> &[Segment] {
        &self.segments
    }

    fn body_mut(&mut self) -> &mut Vec<Segment> {
        &mut self.segments
    }

    fn characters(&self) -> ControlCharacters {
        self.characters
    }

    fn has_una(&self) -> bool {
        self.has_una
    }
}

impl FromStr for RawSegmentCollection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parser = Parser::new();
        let segments = parser.parse(s)?;
        let mut collection = Self::new(parser.characters());
        collection.add_segments(segments);
        Ok(collection)
    }
}

/// A message: the segments between a UNH header and a UNT trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message reference number (first UNH element, repeated in UNT).
    pub reference_number: String,
    /// Message identifier components (type, version, release, agency, …).
    pub identifier: Vec<String>,
    /// Elements appended verbatim after the identifier on the header.
    pub extra_header_elements: Vec<Element>,
    pub segments: Vec<Segment>,
    pub characters: ControlCharacters,
    pub has_una: bool,
}

impl Message {
    pub fn new(
        reference_number: impl Into<String>,
        identifier: Vec<String>,
        characters: ControlCharacters,
    ) -> Self {
        Self {
            reference_number: reference_number.into(),
            identifier,
            extra_header_elements: Vec::new(),
            segments: Vec::new(),
            characters,
            has_una: false,
        }
    }

    pub fn from_segments<I: IntoIterator<Item = Segment>>(
        reference_number: impl Into<String>,
        identifier: Vec<String>,
        segments: I,
    ) -> Self {
        let mut message = Self::new(reference_number, identifier, ControlCharacters::default());
        message.add_segments(segments);
        message
    }

    /// The message type (first identifier component).
    pub fn message_type(&self) -> &str {
        self.identifier.first().map_or("", String::as_str)
    }

    /// Version and release number, joined (`"D.96A"`).
    pub fn version(&self) -> String {
        format!(
            "{}.{}",
            self.identifier.get(1).map_or("", String::as_str),
            self.identifier.get(2).map_or("", String::as_str),
        )
    }
}

impl SegmentContainer for Message {
    const HEADER_TAG: Option<&'static str> = Some(MESSAGE_HEADER_TAG);
    const FOOTER_TAG: Option<&'static str> = Some(MESSAGE_FOOTER_TAG);

    fn body(&self) -> &[Segment] {
        &self.segments
    }

    fn body_mut(&mut self) -> &mut Vec<Segment> {
        &mut self.segments
    }

    fn characters(&self) -> ControlCharacters {
        self.characters
    }

    fn has_una(&self) -> bool {
        self.has_una
    }

    fn header_segment(&self) -> Option<Segment> {
        let mut elements = vec![
            Element::Value(self.reference_number.clone()),
            Element::Composite(self.identifier.clone()),
        ];
        elements.extend(self.extra_header_elements.iter().cloned());
        Some(Segment::new(MESSAGE_HEADER_TAG, elements))
    }

    fn footer_segment(&self) -> Option<Segment> {
        // The count includes the header and footer themselves.
        Some(Segment::new(
            MESSAGE_FOOTER_TAG,
            vec![
                Element::Value((self.segments.len() + 2).to_string()),
                Element::Value(self.reference_number.clone()),
            ],
        ))
    }
}

/// An interchange: the outermost envelope, bounded by UNB and UNZ.
///
/// Functional groups (UNG/UNE) are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interchange {
    pub sender: Element,
    pub recipient: Element,
    pub control_reference: Element,
    /// Syntax identifier name and version (`("UNOA", 3)`).
    pub syntax_identifier: (String, u8),
    /// Date and time of preparation.
    pub timestamp: NaiveDateTime,
    /// Elements appended verbatim after the control reference on the header.
    pub extra_header_elements: Vec<Element>,
    pub segments: Vec<Segment>,
    pub characters: ControlCharacters,
    pub has_una: bool,
}

impl Interchange {
    /// Create an empty interchange, timestamped now.
    pub fn new(
        sender: impl Into<Element>,
        recipient: impl Into<Element>,
        control_reference: impl Into<Element>,
        syntax_identifier: (String, u8),
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            control_reference: control_reference.into(),
            syntax_identifier,
            timestamp: chrono::Local::now().naive_local(),
            extra_header_elements: Vec::new(),
            segments: Vec::new(),
            characters: ControlCharacters::default(),
            has_una: false,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_characters(mut self, characters: ControlCharacters) -> Self {
        self.characters = characters;
        self
    }

    #[must_use]
    pub fn with_extra_header_elements(mut self, elements: Vec<Element>) -> Self {
        self.extra_header_elements = elements;
        self
    }

    /// Build an interchange from a parsed segment sequence. The sequence
    /// must open with the service string advice and/or the interchange
    /// header; trailing UNZ segments are dropped (the footer is re-derived).
    pub fn from_segments<I: IntoIterator<Item = Segment>>(
        segments: I,
        characters: ControlCharacters,
    ) -> Result<Self> {
        let mut segments = segments.into_iter();
        let missing_header = || Error::syntax("an interchange must start with UNB or UNA and UNB");

        let first = segments.next().ok_or_else(missing_header)?;
        let (advice, header) = if first.tag == SERVICE_STRING_ADVICE_TAG {
            let header = segments.next().ok_or_else(missing_header)?;
            (Some(first), header)
        } else {
            (None, first)
        };
        if header.tag != INTERCHANGE_HEADER_TAG {
            return Err(missing_header());
        }
        if header.elements.len() < 4 {
            return Err(Error::syntax("missing elements in interchange header"));
        }

        let syntax_identifier = match header.elements.first() {
            Some(Element::Composite(components)) if components.len() == 2 => {
                let version = components[1]
                    .parse::<u8>()
                    .map_err(|_| Error::syntax("syntax identifier malformed"))?;
                (components[0].clone(), version)
            }
            _ => return Err(Error::syntax("syntax identifier malformed")),
        };

        let timestamp = parse_preparation_timestamp(header.element(3))?;

        let control_reference = header
            .element(4)
            .cloned()
            .ok_or_else(|| Error::syntax("missing elements in interchange header"))?;

        let mut interchange = Self {
            sender: header.elements[1].clone(),
            recipient: header.elements[2].clone(),
            control_reference,
            syntax_identifier,
            timestamp,
            extra_header_elements: header.elements[5..].to_vec(),
            segments: Vec::new(),
            characters,
            has_una: false,
        };

        if let Some(advice) = advice {
            interchange.has_una = true;
            if let Some(Element::Value(value)) = advice.elements.first() {
                interchange.characters = value.parse()?;
            }
        }

        for segment in segments {
            interchange.add_segment(segment);
        }
        Ok(interchange)
    }

    /// Read an interchange from a file in the given text encoding. The
    /// encoding label is resolved before any I/O; an unknown label fails
    /// immediately.
    pub fn from_file(path: impl AsRef<Path>, encoding: &str) -> Result<Self> {
        let codec = encoding_rs::Encoding::for_label(encoding.as_bytes())
            .ok_or_else(|| Error::UnknownEncoding(encoding.to_string()))?;
        let bytes = std::fs::read(path)?;
        let (text, _, had_errors) = codec.decode(&bytes);
        if had_errors {
            return Err(Error::Decode {
                encoding: codec.name().to_string(),
            });
        }
        text.parse()
    }

    /// Extract the messages contained in the interchange.
    ///
    /// This is a strict single-pass validator: unbalanced or nested message
    /// envelopes are errors, not recovered from. Segments outside any
    /// message are skipped.
    pub fn get_messages(&self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        let mut open: Option<Message> = None;

        for segment in &self.segments {
            match segment.tag.as_str() {
                MESSAGE_HEADER_TAG => {
                    if open.is_some() {
                        return Err(Error::syntax(format!(
                            "missing UNT segment before new UNH: {segment}"
                        )));
                    }
                    let reference_number = segment
                        .elements
                        .first()
                        .and_then(Element::as_value)
                        .ok_or_else(|| {
                            Error::syntax("message header is missing its reference number")
                        })?;
                    let identifier = segment
                        .element(1)
                        .and_then(Element::as_composite)
                        .ok_or_else(|| {
                            Error::syntax("message header is missing its identifier")
                        })?;
                    let mut message =
                        Message::new(reference_number, identifier.to_vec(), self.characters);
                    message.extra_header_elements = segment.elements.get(2..).unwrap_or(&[]).to_vec();
                    open = Some(message);
                }
                MESSAGE_FOOTER_TAG => match open.take() {
                    Some(message) => messages.push(message),
                    None => {
                        return Err(Error::syntax(format!(
                            "UNT segment without matching UNH: {segment}"
                        )));
                    }
                },
                _ => {
                    if let Some(message) = open.as_mut() {
                        message.add_segment(segment.clone());
                    }
                }
            }
        }
        if open.is_some() {
            return Err(Error::syntax(
                "UNH segment was not closed with a UNT segment",
            ));
        }
        debug!(count = messages.len(), "extracted messages from interchange");
        Ok(messages)
    }

    /// Append a message, envelope segments included, to the body.
    pub fn add_message(&mut self, message: Message) {
        let header = message.header_segment();
        let footer = message.footer_segment();
        if let Some(header) = header {
            self.add_segment(header);
        }
        self.add_segments(message.segments);
        if let Some(footer) = footer {
            self.add_segment(footer);
        }
    }
}

impl SegmentContainer for Interchange {
    const HEADER_TAG: Option<&'static str> = Some(INTERCHANGE_HEADER_TAG);
    const FOOTER_TAG: Option<&'static str> = Some(INTERCHANGE_FOOTER_TAG);

    fn body(&self) -> &[Segment] {
        &self.segments
    }

    fn body_mut(&mut self) -> &mut Vec<Segment> {
        &mut self.segments
    }

    fn characters(&self) -> ControlCharacters {
        self.characters
    }

    fn has_una(&self) -> bool {
        self.has_una
    }

    /// A UNA body segment sets the active control characters (and turns the
    /// advice on for serialization) instead of being appended.
    fn add_segment(&mut self, segment: Segment) {
        if segment.tag == SERVICE_STRING_ADVICE_TAG {
            self.has_una = true;
            match segment.elements.first().and_then(Element::as_value) {
                Some(value) => match value.parse() {
                    Ok(characters) => self.characters = characters,
                    Err(_) => warn!(advice = %value, "ignoring malformed service string advice"),
                },
                None => warn!("ignoring service string advice without characters"),
            }
            return;
        }
        let tag = segment.tag.as_str();
        if tag == INTERCHANGE_HEADER_TAG || tag == INTERCHANGE_FOOTER_TAG {
            return;
        }
        self.segments.push(segment);
    }

    fn header_segment(&self) -> Option<Segment> {
        let mut elements = vec![
            Element::Composite(vec![
                self.syntax_identifier.0.clone(),
                self.syntax_identifier.1.to_string(),
            ]),
            self.sender.clone(),
            self.recipient.clone(),
            Element::Composite(vec![
                self.timestamp.format("%y%m%d").to_string(),
                self.timestamp.format("%H%M").to_string(),
            ]),
            self.control_reference.clone(),
        ];
        elements.extend(self.extra_header_elements.iter().cloned());
        Some(Segment::new(INTERCHANGE_HEADER_TAG, elements))
    }

    fn footer_segment(&self) -> Option<Segment> {
        // Count of contained messages; an interchange carrying loose
        // segments with no message envelopes reports the body-segment count
        // instead. Legacy rule, kept for wire compatibility; functional
        // groups are not counted.
        let mut count = self
            .segments
            .iter()
            .filter(|segment| segment.tag == MESSAGE_HEADER_TAG)
            .count();
        if count == 0 {
            count = self.segments.len();
        }
        Some(Segment::new(
            INTERCHANGE_FOOTER_TAG,
            vec![
                Element::Value(count.to_string()),
                self.control_reference.clone(),
            ],
        ))
    }
}

impl FromStr for Interchange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parser = Parser::new();
        let segments = parser.parse(s)?;
        Self::from_segments(segments, parser.characters())
    }
}

/// Parse the UNB preparation timestamp. The date width selects between
/// 2-digit and 4-digit year interpretation.
fn parse_preparation_timestamp(element: Option<&Element>) -> Result<NaiveDateTime> {
    let malformed = || Error::syntax("timestamp of interchange preparation malformed");
    let components = match element {
        Some(Element::Composite(components)) if !components.is_empty() => components,
        _ => return Err(malformed()),
    };
    let format = match components[0].chars().count() {
        6 => "%y%m%d-%H%M",
        8 => "%Y%m%d-%H%M",
        _ => return Err(malformed()),
    };
    NaiveDateTime::parse_from_str(&components.join("-"), format).map_err(|_| malformed())
}
