use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::{Answer, AnswerError, ValueKind, xml};

/// An insertion-ordered set of named answers.
///
/// Names are matched case-insensitively (Unicode lowercasing, diacritics
/// preserved); the original casing is kept on each [`Answer`] for
/// serialization.
#[derive(Debug, Clone, Default)]
pub struct AnswerCollection {
    /// Keyed by the normalized form of each answer name.
    answers: IndexMap<String, Answer>,

    /// Title carried on the answer-set document, if any.
    pub title: Option<String>,
}

impl AnswerCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an answer-set XML document into a new collection.
    pub fn read_xml(xml: &str) -> Result<Self, xml::ReadError> {
        let mut collection = Self::new();
        xml::append_answer_set(&mut collection, xml)?;
        Ok(collection)
    }

    /// Parse an answer-set XML document into this collection, on top of
    /// whatever it already holds.
    pub fn append_xml(&mut self, xml: &str) -> Result<(), xml::ReadError> {
        xml::append_answer_set(self, xml)
    }

    /// Serialize this collection as an answer-set XML document.
    pub fn xml_answers(&self) -> String {
        xml::write_answer_set(self)
    }

    /// Number of distinct answer names.
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    /// Check if the collection holds no answers.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Check if an answer with this name exists, regardless of kind.
    pub fn contains(&self, name: &str) -> bool {
        self.answers.contains_key(&normalize(name))
    }

    /// Get or create the answer with this name and kind.
    ///
    /// Returns the existing answer when the name is already present with
    /// the same kind; [`AnswerError::KindConflict`] when it is present with
    /// a different one.
    pub fn create_answer(
        &mut self,
        kind: ValueKind,
        name: &str,
    ) -> Result<&mut Answer, AnswerError> {
        match self.answers.entry(normalize(name)) {
            Entry::Occupied(entry) => {
                let answer = entry.into_mut();
                if answer.kind() == kind {
                    Ok(answer)
                } else {
                    Err(AnswerError::KindConflict {
                        name: name.to_string(),
                        existing: answer.kind(),
                        requested: kind,
                    })
                }
            }
            Entry::Vacant(entry) => Ok(entry.insert(Answer::new(name, kind))),
        }
    }

    /// Look up an answer by name and kind.
    ///
    /// The name is matched case-insensitively. A name present under a
    /// different kind is a miss, not an error.
    pub fn try_get_answer(&self, name: &str, kind: ValueKind) -> Option<&Answer> {
        self.answers
            .get(&normalize(name))
            .filter(|answer| answer.kind() == kind)
    }

    /// Mutable variant of [`AnswerCollection::try_get_answer`].
    pub fn try_get_answer_mut(&mut self, name: &str, kind: ValueKind) -> Option<&mut Answer> {
        self.answers
            .get_mut(&normalize(name))
            .filter(|answer| answer.kind() == kind)
    }

    /// Remove an answer by name. Returns whether one was removed.
    pub fn remove_answer(&mut self, name: &str) -> bool {
        self.answers.shift_remove(&normalize(name)).is_some()
    }

    /// Remove all answers.
    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Iterate over the answers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Answer> {
        self.answers.values()
    }

    /// Overlay another collection onto this one.
    ///
    /// Every *answered* leaf of `other` is written at the same name and
    /// index path here, creating answers as needed. Unanswered leaves in
    /// `other` never erase values already present. An answer whose name
    /// exists here under a different kind is skipped.
    pub fn overlay(&mut self, other: &AnswerCollection) {
        for answer in other.iter() {
            let target = match self.create_answer(answer.kind(), answer.name()) {
                Ok(target) => target,
                Err(error) => {
                    tracing::warn!(name = answer.name(), %error, "overlay skipped answer");
                    continue;
                }
            };
            for (path, value) in answer.indexed_values() {
                if !value.is_answered() {
                    continue;
                }
                if let Err(error) = target.set_value(value.clone(), &path) {
                    tracing::warn!(name = answer.name(), %error, "overlay skipped value");
                }
            }
        }
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}
