#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # edifact-core
//!
//! Parsing, validation, and serialization of EDIFACT interchanges.
//!
//! This crate turns raw interchange text into a navigable tree of segments
//! and back again, byte-for-byte, while enforcing the envelope and escaping
//! rules of the syntax. The pipeline is:
//!
//! text → [`Parser`] (using [`Tokenizer`] + [`ControlCharacters`]) →
//! [`Segment`] sequence → [`Interchange`]/[`Message`] containers →
//! [`Serializer`] → text.

/// Control character set (delimiters) and the service string advice.
pub mod characters;
/// Segment containers: raw collections, messages, and interchanges.
pub mod collection;
/// Parser turning interchange text into segments.
pub mod parser;
/// Segment and element model plus the tag registry.
pub mod segments;
/// Serializer turning segments back into interchange text.
pub mod serializer;
/// Token model produced by the tokenizer.
pub mod token;
/// Escape-aware tokenizer for the character stream.
pub mod tokenizer;
/// Representation-code shapes and code-list validation.
pub mod validate;

pub use characters::ControlCharacters;
pub use collection::{Interchange, Message, RawSegmentCollection, SegmentContainer};
pub use parser::Parser;
pub use segments::{Element, Segment, SegmentRegistry};
pub use serializer::Serializer;
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
pub use validate::{CodeList, ElementShape, SegmentSpec};

use thiserror::Error;

/// Errors raised while parsing, validating, or serializing interchanges
#[derive(Error, Debug)]
pub enum Error {
    /// The input violates the EDIFACT syntax rules.
    #[error("EDIFACT syntax error: {0}")]
    Syntax(String),

    /// End of input was reached inside an unterminated segment. This is
    /// distinct from a clean end-of-stream between segments.
    #[error("unexpected end of input inside a segment")]
    UnexpectedEof,

    /// An element value does not match its declared representation code.
    #[error("invalid {tag} segment: element {position} does not match {expected}: '{found}'")]
    Validation {
        tag: String,
        /// 1-based element position, `"n"` or `"n.m"` for a composite component.
        position: String,
        expected: String,
        found: String,
    },

    /// The requested text encoding is not known to the runtime.
    #[error("unknown text encoding: {0}")]
    UnknownEncoding(String),

    /// The file contents could not be decoded with the requested encoding.
    #[error("input is not valid {encoding}")]
    Decode { encoding: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a syntax error from any displayable message.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }
}

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, Error>;
