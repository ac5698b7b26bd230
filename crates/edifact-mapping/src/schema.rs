//! Schema component descriptors
//!
//! A schema is built explicitly, as an ordered list of named components:
//! single segment rules, nested groups, and bounded loops. Ordering is a
//! first-class property of the schema — components are matched strictly in
//! the order they were added.

use crate::bound::{bind_group, BoundGroup};
use crate::cursor::SegmentCursor;
use crate::Result;
use edifact_core::collection::SegmentContainer;
use edifact_core::{Message, Segment};

/// Whether a component must be present in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Mandatory,
    Optional,
}

impl Presence {
    pub fn is_mandatory(self) -> bool {
        matches!(self, Presence::Mandatory)
    }
}

/// Expectation of a single segment with a fixed tag.
#[derive(Debug, Clone)]
pub struct SegmentRule {
    pub name: String,
    pub tag: String,
    pub presence: Presence,
}

impl SegmentRule {
    pub fn new(name: impl Into<String>, tag: impl Into<String>, presence: Presence) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            presence,
        }
    }
}

/// An ordered group of named components.
#[derive(Debug, Clone)]
pub struct GroupRule {
    pub name: String,
    pub components: Vec<Component>,
}

impl GroupRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Append a segment component.
    #[must_use]
    pub fn segment(
        mut self,
        name: impl Into<String>,
        tag: impl Into<String>,
        presence: Presence,
    ) -> Self {
        self.components
            .push(Component::Segment(SegmentRule::new(name, tag, presence)));
        self
    }

    /// Append a nested group, matched inline against the same cursor.
    #[must_use]
    pub fn group(mut self, group: GroupRule) -> Self {
        self.components.push(Component::Group(group));
        self
    }

    /// Append a bounded repetition of a group.
    #[must_use]
    pub fn repeat(mut self, loop_rule: LoopRule) -> Self {
        self.components.push(Component::Loop(loop_rule));
        self
    }

    /// Match this schema against a cursor.
    pub fn bind(&self, cursor: &mut SegmentCursor<'_>) -> Result<BoundGroup> {
        bind_group(self, cursor)
    }

    /// Match this schema against a segment sequence.
    pub fn from_segments(&self, segments: &[Segment]) -> Result<BoundGroup> {
        let mut cursor = SegmentCursor::new(segments);
        let bound = self.bind(&mut cursor)?;
        tracing::debug!(
            schema = %self.name,
            consumed = cursor.position(),
            total = segments.len(),
            "matched schema"
        );
        Ok(bound)
    }

    /// Match this schema against a message's body segments.
    pub fn from_message(&self, message: &Message) -> Result<BoundGroup> {
        self.from_segments(message.body())
    }
}

/// A bounded repetition of a group.
///
/// `min` of zero makes the loop optional; a mandatory loop has `min` of at
/// least one. `max` is never below `min` and bounds matching against
/// endlessly repeating input.
#[derive(Debug, Clone)]
pub struct LoopRule {
    pub name: String,
    pub group: GroupRule,
    pub min: usize,
    pub max: usize,
}

impl LoopRule {
    pub fn new(name: impl Into<String>, group: GroupRule, min: usize, max: usize) -> Self {
        Self {
            name: name.into(),
            group,
            min,
            max: max.max(min),
        }
    }

    /// Mark the loop mandatory (at least one repetition).
    #[must_use]
    pub fn mandatory(mut self) -> Self {
        if self.min < 1 {
            self.min = 1;
            self.max = self.max.max(1);
        }
        self
    }
}

/// One schema component.
#[derive(Debug, Clone)]
pub enum Component {
    Segment(SegmentRule),
    Group(GroupRule),
    Loop(LoopRule),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Component::Segment(rule) => &rule.name,
            Component::Group(rule) => &rule.name,
            Component::Loop(rule) => &rule.name,
        }
    }
}
