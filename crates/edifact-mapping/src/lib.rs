#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # edifact-mapping
//!
//! Declarative schemas for EDIFACT message structures.
//!
//! A schema is an explicit, ordered list of named components — single
//! segments, nested groups, and bounded loops — matched against a message's
//! body segments with one-segment lookahead and a single level of
//! push-back. Matching produces bound instances that hold the matched
//! segments (or an absent marker) and can be turned back into a message.

/// Bound match results and the matching engine.
pub mod bound;
/// Cursor over a segment sequence with single-step push-back.
pub mod cursor;
/// Schema component descriptors and builders.
pub mod schema;

pub use bound::{BoundComponent, BoundGroup, BoundLoop, BoundSegment};
pub use cursor::SegmentCursor;
pub use schema::{Component, GroupRule, LoopRule, Presence, SegmentRule};

use thiserror::Error;

/// Errors raised while matching a schema against a message
#[derive(Error, Debug)]
pub enum Error {
    /// A mandatory segment component did not match.
    #[error("missing mandatory segment {expected} for component '{component}', found {found}")]
    MissingSegment {
        component: String,
        expected: String,
        found: String,
    },

    /// A loop matched fewer repetitions than its declared minimum.
    #[error("component '{component}' matched {found} repetitions, at least {min} required")]
    TooFewRepetitions {
        component: String,
        min: usize,
        found: usize,
    },
}

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, Error>;
