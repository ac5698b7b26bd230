//! Shape validation for service segments
//!
//! Element shapes are declared with representation codes such as `a4`
//! (alphabetic, exactly 4), `n..6` (numeric, up to 6), or `an..35`
//! (alphanumeric, up to 35). A closed code list produces a warning for
//! unrecognized codes, never an error: unknown codes are common as the
//! directories evolve.

use crate::segments::{Element, Segment};
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Character class of a representation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// `a` — alphabetic characters only.
    Alphabetic,
    /// `n` — decimal digits only.
    Numeric,
    /// `an` — any characters.
    Alphanumeric,
}

/// A parsed representation code: character class plus fixed or maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementShape {
    pub class: ValueClass,
    pub length: usize,
    /// `true` for fixed length (`a4`), `false` for maximum (`an..35`).
    pub exact: bool,
}

impl ElementShape {
    /// Parse a representation code of the form `(a|n|an)(length|..maxlength)`.
    pub fn parse(code: &str) -> Result<Self> {
        static REPR: OnceLock<Regex> = OnceLock::new();
        let re = REPR.get_or_init(|| {
            Regex::new(r"^(an|a|n)(\.\.)?([0-9]+)$").expect("representation-code pattern")
        });
        let captures = re
            .captures(code)
            .ok_or_else(|| Error::syntax(format!("malformed representation code '{code}'")))?;
        let class = match &captures[1] {
            "a" => ValueClass::Alphabetic,
            "n" => ValueClass::Numeric,
            _ => ValueClass::Alphanumeric,
        };
        let length = captures[3]
            .parse()
            .map_err(|_| Error::syntax(format!("malformed representation code '{code}'")))?;
        Ok(Self {
            class,
            length,
            exact: captures.get(2).is_none(),
        })
    }

    /// Check a value against this shape.
    pub fn matches(&self, value: &str) -> bool {
        let len = value.chars().count();
        let length_ok = if self.exact {
            len == self.length
        } else {
            len <= self.length
        };
        let class_ok = match self.class {
            ValueClass::Alphabetic => value.chars().all(char::is_alphabetic),
            ValueClass::Numeric => value.chars().all(|c| c.is_ascii_digit()),
            ValueClass::Alphanumeric => true,
        };
        length_ok && class_ok
    }
}

impl fmt::Display for ElementShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            ValueClass::Alphabetic => "a",
            ValueClass::Numeric => "n",
            ValueClass::Alphanumeric => "an",
        };
        let dots = if self.exact { "" } else { ".." };
        write!(f, "{class}{dots}{}", self.length)
    }
}

/// A closed list of allowed code values.
#[derive(Debug, Clone)]
pub struct CodeList {
    pub name: String,
    codes: HashSet<String>,
}

impl CodeList {
    pub fn with_codes(name: impl Into<String>, codes: &[&str]) -> Self {
        Self {
            name: name.into(),
            codes: codes.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Whether a code is part of the list.
    pub fn is_known(&self, code: &str) -> bool {
        self.codes.contains(code)
    }
}

/// Shape of one component (or plain value) position.
#[derive(Debug, Clone)]
pub struct ComponentShape {
    pub shape: ElementShape,
    pub required: bool,
    pub codes: Option<CodeList>,
}

impl ComponentShape {
    pub fn new(code: &str) -> Result<Self> {
        Ok(Self {
            shape: ElementShape::parse(code)?,
            required: false,
            codes: None,
        })
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_codes(mut self, codes: CodeList) -> Self {
        self.codes = Some(codes);
        self
    }
}

/// Shape of one element position: a plain value or a composite.
#[derive(Debug, Clone)]
pub enum ElementSchema {
    Value(ComponentShape),
    Composite(Vec<ComponentShape>),
}

impl ElementSchema {
    fn is_required(&self) -> bool {
        match self {
            ElementSchema::Value(c) => c.required,
            ElementSchema::Composite(components) => components.iter().any(|c| c.required),
        }
    }
}

/// Per-position shape schema of a service segment, optionally qualified by
/// syntax version.
#[derive(Debug, Clone)]
pub struct SegmentSpec {
    pub tag: String,
    pub version: Option<u8>,
    schema: Vec<ElementSchema>,
}

impl SegmentSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            version: None,
            schema: Vec::new(),
        }
    }

    #[must_use]
    pub fn for_version(mut self, version: u8) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn value(mut self, component: ComponentShape) -> Self {
        self.schema.push(ElementSchema::Value(component));
        self
    }

    #[must_use]
    pub fn composite(mut self, components: Vec<ComponentShape>) -> Self {
        self.schema.push(ElementSchema::Composite(components));
        self
    }

    /// Validate a segment against this schema.
    ///
    /// Positions beyond the schema are not checked. A missing or empty value
    /// fails only when the position is required. An unrecognized code from a
    /// closed code list is reported as a warning, not an error.
    pub fn check(&self, segment: &Segment) -> Result<()> {
        for (index, schema) in self.schema.iter().enumerate() {
            match segment.elements.get(index) {
                None => {
                    if schema.is_required() {
                        return Err(self.violation(index, None, schema_shape(schema), ""));
                    }
                }
                Some(element) => self.check_element(index, element, schema)?,
            }
        }
        Ok(())
    }

    fn check_element(&self, index: usize, element: &Element, schema: &ElementSchema) -> Result<()> {
        match schema {
            ElementSchema::Value(component) => {
                // A composite where a plain value is expected is judged by
                // its first component.
                self.check_component(index, None, element.first_component(), component)
            }
            ElementSchema::Composite(components) => {
                for (sub, component) in components.iter().enumerate() {
                    let value = match element {
                        Element::Composite(parts) => parts.get(sub).map(String::as_str),
                        // A plain value fills the first component slot.
                        Element::Value(v) if sub == 0 => Some(v.as_str()),
                        Element::Value(_) => None,
                    };
                    match value {
                        None | Some("") => {
                            if component.required {
                                return Err(self.violation(
                                    index,
                                    Some(sub),
                                    component.shape,
                                    value.unwrap_or(""),
                                ));
                            }
                        }
                        Some(value) => {
                            self.check_component(index, Some(sub), value, component)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn check_component(
        &self,
        index: usize,
        sub: Option<usize>,
        value: &str,
        component: &ComponentShape,
    ) -> Result<()> {
        if value.is_empty() {
            if component.required {
                return Err(self.violation(index, sub, component.shape, value));
            }
            return Ok(());
        }
        if !component.shape.matches(value) {
            return Err(self.violation(index, sub, component.shape, value));
        }
        if let Some(codes) = &component.codes {
            if !codes.is_known(value) {
                warn!(
                    tag = %self.tag,
                    list = %codes.name,
                    code = %value,
                    "code not found in closed code list"
                );
            }
        }
        Ok(())
    }

    fn violation(
        &self,
        index: usize,
        sub: Option<usize>,
        expected: ElementShape,
        found: &str,
    ) -> Error {
        let position = match sub {
            Some(sub) => format!("{}.{}", index + 1, sub + 1),
            None => format!("{}", index + 1),
        };
        Error::Validation {
            tag: self.tag.clone(),
            position,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

fn schema_shape(schema: &ElementSchema) -> ElementShape {
    match schema {
        ElementSchema::Value(c) => c.shape,
        ElementSchema::Composite(components) => components
            .first()
            .map_or(ElementShape { class: ValueClass::Alphanumeric, length: 0, exact: false }, |c| c.shape),
    }
}

fn shape(code: &str) -> ComponentShape {
    ComponentShape::new(code).expect("service-segment representation code")
}

/// Syntax identifier codes (UN/ECE character repertoire levels).
fn syntax_identifier_codes() -> CodeList {
    CodeList::with_codes("0001", &["UNOA", "UNOB", "UNOC", "UNOD", "UNOE", "UNOF"])
}

/// Specs for the standard service segments.
///
/// `UNB` is registered twice: the unqualified entry uses the 6-digit date of
/// the older syntax versions, the version-4 entry the 8-digit date.
pub fn service_segment_specs() -> Vec<SegmentSpec> {
    let unb = |date: &str| {
        SegmentSpec::new("UNB")
            .composite(vec![
                shape("a4").required().with_codes(syntax_identifier_codes()),
                shape("n1").required(),
            ])
            .composite(vec![shape("an..35").required(), shape("an..4"), shape("an..14")])
            .composite(vec![shape("an..35").required(), shape("an..4"), shape("an..14")])
            .composite(vec![shape(date).required(), shape("n4").required()])
            .value(shape("an..14").required())
            .value(shape("an..14"))
            .value(shape("a1"))
            .value(shape("n1"))
            .value(shape("an..35"))
            .value(shape("n1"))
    };
    vec![
        SegmentSpec::new("UNA").value(shape("an6").required()),
        unb("n6"),
        unb("n8").for_version(4),
        SegmentSpec::new("UNH").value(shape("an..14").required()).composite(vec![
            shape("an..6").required(),
            shape("an..3").required(),
            shape("an..3").required(),
            shape("an..3").required(),
            shape("an..6"),
        ]),
        SegmentSpec::new("UNT")
            .value(shape("n..6").required())
            .value(shape("an..14").required()),
        SegmentSpec::new("UNZ")
            .value(shape("n..6").required())
            .value(shape("an..14").required()),
    ]
}
