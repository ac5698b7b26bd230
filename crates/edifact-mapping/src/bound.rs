//! Matching engine and bound results
//!
//! Matching walks the schema components in declared order over a
//! [`SegmentCursor`]. Each decision looks at most one segment ahead; a
//! non-matching segment is pushed back so it stays available to the next
//! component. Failures are immediate and carry the component name plus the
//! expected and found tags.

use crate::cursor::SegmentCursor;
use crate::schema::{Component, GroupRule, LoopRule, SegmentRule};
use crate::{Error, Result};
use edifact_core::{Message, Segment};

/// What a segment rule matched: the segment, or an absent marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSegment {
    pub name: String,
    pub segment: Option<Segment>,
}

impl BoundSegment {
    pub fn is_present(&self) -> bool {
        self.segment.is_some()
    }
}

/// A matched group instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundGroup {
    pub name: String,
    pub components: Vec<BoundComponent>,
}

/// The matched repetitions of a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundLoop {
    pub name: String,
    pub instances: Vec<BoundGroup>,
}

impl BoundLoop {
    pub fn is_present(&self) -> bool {
        self.instances.iter().any(BoundGroup::is_present)
    }
}

/// One matched schema component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundComponent {
    Segment(BoundSegment),
    Group(BoundGroup),
    Loop(BoundLoop),
}

impl BoundComponent {
    pub fn name(&self) -> &str {
        match self {
            BoundComponent::Segment(bound) => &bound.name,
            BoundComponent::Group(bound) => &bound.name,
            BoundComponent::Loop(bound) => &bound.name,
        }
    }

    pub fn is_present(&self) -> bool {
        match self {
            BoundComponent::Segment(bound) => bound.is_present(),
            BoundComponent::Group(bound) => bound.is_present(),
            BoundComponent::Loop(bound) => bound.is_present(),
        }
    }

    fn collect_into(&self, out: &mut Vec<Segment>) {
        match self {
            BoundComponent::Segment(bound) => {
                if let Some(segment) = &bound.segment {
                    out.push(segment.clone());
                }
            }
            BoundComponent::Group(bound) => bound.collect_into(out),
            BoundComponent::Loop(bound) => {
                for instance in &bound.instances {
                    instance.collect_into(out);
                }
            }
        }
    }
}

impl BoundGroup {
    /// The bound component with the given name.
    pub fn get(&self, name: &str) -> Option<&BoundComponent> {
        self.components
            .iter()
            .find(|component| component.name() == name)
    }

    /// The segment matched by the named segment component, if present.
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        match self.get(name)? {
            BoundComponent::Segment(bound) => bound.segment.as_ref(),
            _ => None,
        }
    }

    /// The instances matched by the named loop component.
    pub fn instances(&self, name: &str) -> Option<&[BoundGroup]> {
        match self.get(name)? {
            BoundComponent::Loop(bound) => Some(&bound.instances),
            _ => None,
        }
    }

    /// Whether any component of the group matched.
    pub fn is_present(&self) -> bool {
        self.components.iter().any(BoundComponent::is_present)
    }

    /// Flatten the bound tree back into a segment sequence.
    pub fn to_segments(&self) -> Vec<Segment> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    /// Build a message from the bound segments.
    pub fn to_message(
        &self,
        reference_number: impl Into<String>,
        identifier: Vec<String>,
    ) -> Message {
        Message::from_segments(reference_number, identifier, self.to_segments())
    }

    fn collect_into(&self, out: &mut Vec<Segment>) {
        for component in &self.components {
            component.collect_into(out);
        }
    }
}

/// Match one segment rule. A non-matching segment is pushed back, so the
/// enclosing context still sees it; end of input counts as a mismatch.
fn bind_segment(rule: &SegmentRule, cursor: &mut SegmentCursor<'_>) -> Result<BoundSegment> {
    let absent = |rule: &SegmentRule| BoundSegment {
        name: rule.name.clone(),
        segment: None,
    };
    match cursor.advance() {
        None => {
            if rule.presence.is_mandatory() {
                return Err(Error::MissingSegment {
                    component: rule.name.clone(),
                    expected: rule.tag.clone(),
                    found: "end of message".to_string(),
                });
            }
            Ok(absent(rule))
        }
        Some(segment) if segment.tag == rule.tag => Ok(BoundSegment {
            name: rule.name.clone(),
            segment: Some(segment.clone()),
        }),
        Some(segment) => {
            cursor.push_back();
            if rule.presence.is_mandatory() {
                return Err(Error::MissingSegment {
                    component: rule.name.clone(),
                    expected: rule.tag.clone(),
                    found: segment.tag.clone(),
                });
            }
            Ok(absent(rule))
        }
    }
}

/// Match each component of a group, in declared order, against the same
/// cursor. Absence of optional components does not stop the group; only a
/// failing component does.
pub(crate) fn bind_group(rule: &GroupRule, cursor: &mut SegmentCursor<'_>) -> Result<BoundGroup> {
    let mut components = Vec::with_capacity(rule.components.len());
    for component in &rule.components {
        components.push(match component {
            Component::Segment(rule) => BoundComponent::Segment(bind_segment(rule, cursor)?),
            Component::Group(rule) => BoundComponent::Group(bind_group(rule, cursor)?),
            Component::Loop(rule) => BoundComponent::Loop(bind_loop(rule, cursor)?),
        });
    }
    Ok(BoundGroup {
        name: rule.name.clone(),
        components,
    })
}

/// Match up to `max` instances of the loop's group. The first failing
/// attempt stops the loop with the cursor restored to before the segment
/// that failed; a shortfall against `min` is a cardinality error.
fn bind_loop(rule: &LoopRule, cursor: &mut SegmentCursor<'_>) -> Result<BoundLoop> {
    let mut instances = Vec::new();
    while instances.len() < rule.max {
        match bind_group(&rule.group, cursor) {
            Ok(instance) => instances.push(instance),
            Err(_) => break,
        }
    }
    if instances.len() < rule.min {
        return Err(Error::TooFewRepetitions {
            component: rule.name.clone(),
            min: rule.min,
            found: instances.len(),
        });
    }
    Ok(BoundLoop {
        name: rule.name.clone(),
        instances,
    })
}
