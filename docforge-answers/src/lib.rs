//! Answer-set data model for document assembly clients.
//!
//! This crate provides the in-memory model a host application fills in and
//! exchanges with a document-generation service:
//! - `Value` - a typed datum with an answered/unanswered state
//! - `Answer` - a named variable holding one value or a nested repeat tree
//! - `AnswerCollection` - an insertion-ordered, case-insensitive set of
//!   answers with XML round-trip and overlay/merge
//!
//! The XML dialect is the `AnswerSet` document format; documents that are
//! broken at the top level surface as [`ReadError`], while individual
//! malformed answers are skipped with a warning.

mod answer;
pub use answer::{Answer, IndexedValues};

mod collection;
pub use collection::AnswerCollection;

mod error;
pub use error::AnswerError;

mod value;
pub use value::{SELECTION_SEPARATOR, Value, ValueKind, normalize_line_breaks};

mod xml;
pub use xml::ReadError;
