//! Segment and element model, plus the tag registry
//!
//! A segment is one line of the protocol: a short alphanumeric tag followed
//! by data elements. Elements are either plain values or composites of
//! several component values. Service segments (UNA, UNB, UNH, UNT, UNZ) are
//! described by per-tag specs in the [`SegmentRegistry`].

use crate::validate::SegmentSpec;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Interchange header tag.
pub const INTERCHANGE_HEADER_TAG: &str = "UNB";
/// Interchange trailer tag.
pub const INTERCHANGE_FOOTER_TAG: &str = "UNZ";
/// Message header tag.
pub const MESSAGE_HEADER_TAG: &str = "UNH";
/// Message trailer tag.
pub const MESSAGE_FOOTER_TAG: &str = "UNT";

/// A data element of a segment.
///
/// Collapsing rule: zero component-separated parts produce `Value("")`, a
/// single part produces `Value(part)`, and two or more parts produce a
/// `Composite` with skipped (empty) components backfilled at their original
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Element {
    /// A plain value.
    Value(String),
    /// A composite of component values.
    Composite(Vec<String>),
}

impl Element {
    /// The plain value, if this element is not a composite.
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Element::Value(v) => Some(v),
            Element::Composite(_) => None,
        }
    }

    /// The component values, if this element is a composite.
    pub fn as_composite(&self) -> Option<&[String]> {
        match self {
            Element::Value(_) => None,
            Element::Composite(c) => Some(c),
        }
    }

    /// The first component of a composite, or the plain value itself.
    pub fn first_component(&self) -> &str {
        match self {
            Element::Value(v) => v,
            Element::Composite(c) => c.first().map_or("", String::as_str),
        }
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::Value(value.to_string())
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Value(value)
    }
}

impl From<Vec<String>> for Element {
    fn from(components: Vec<String>) -> Self {
        Element::Composite(components)
    }
}

impl From<Vec<&str>> for Element {
    fn from(components: Vec<&str>) -> Self {
        Element::Composite(components.into_iter().map(str::to_string).collect())
    }
}

/// One segment of an interchange: a tag and its ordered data elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub tag: String,
    pub elements: Vec<Element>,
}

impl Segment {
    pub fn new(tag: impl Into<String>, elements: Vec<Element>) -> Self {
        Self {
            tag: tag.into(),
            elements,
        }
    }

    /// The element at `index`, if present.
    pub fn element(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    /// Check the tag rules: non-empty and strictly alphanumeric.
    pub fn check_tag(tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Err(Error::syntax("the tag of a segment must not be empty"));
        }
        if !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::syntax(format!(
                "tag '{tag}': a tag must only contain alphanumeric characters"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' segment: {:?}", self.tag, self.elements)
    }
}

/// Static table resolving a tag (optionally qualified by syntax version) to
/// the spec of a known service segment.
///
/// The table is assembled once, explicitly, at construction; there is no
/// implicit registration. Lookup order: `(tag, version)` first, then
/// `(tag, None)`; a tag with no entry resolves to a generic, unvalidated
/// segment.
pub struct SegmentRegistry {
    specs: HashMap<(String, Option<u8>), SegmentSpec>,
}

impl SegmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            specs: HashMap::new(),
        }
    }

    /// The registry of standard service segments.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for spec in crate::validate::service_segment_specs() {
            registry.register(spec);
        }
        registry
    }

    /// Register a spec. A later registration for the same key replaces the
    /// earlier one.
    pub fn register(&mut self, spec: SegmentSpec) {
        self.specs.insert((spec.tag.clone(), spec.version), spec);
    }

    /// Look up the spec for a tag, preferring a version-qualified entry.
    pub fn get(&self, tag: &str, version: Option<u8>) -> Option<&SegmentSpec> {
        version
            .and_then(|v| self.specs.get(&(tag.to_string(), Some(v))))
            .or_else(|| self.specs.get(&(tag.to_string(), None)))
    }

    /// Build a segment from a raw `(tag, elements)` pair.
    ///
    /// The tag rules are always enforced. Shape validation against the
    /// resolved spec runs only when `validate` is set; unknown tags fall
    /// back to the generic segment and are never an error.
    pub fn resolve(
        &self,
        tag: &str,
        elements: Vec<Element>,
        version: Option<u8>,
        validate: bool,
    ) -> Result<Segment> {
        Segment::check_tag(tag)?;
        let segment = Segment::new(tag, elements);
        if validate {
            self.validate(&segment, version)?;
        }
        Ok(segment)
    }

    /// Validate a segment against its registered spec, if any.
    pub fn validate(&self, segment: &Segment, version: Option<u8>) -> Result<()> {
        match self.get(&segment.tag, version) {
            Some(spec) => spec.check(segment),
            None => Ok(()),
        }
    }
}

impl Default for SegmentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
