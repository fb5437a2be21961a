use chrono::NaiveDate;

use crate::AnswerError;

/// Separator between selections in the encoded multiple-choice form.
pub const SELECTION_SEPARATOR: char = '|';

/// The kind of a [`Value`] or of an answer's leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Free text.
    Text,

    /// A floating-point number.
    Number,

    /// A calendar date (day precision).
    Date,

    /// A yes/no value.
    TrueFalse,

    /// An ordered list of selected choice names.
    MultipleChoice,

    /// A structural marker for one level of repetition; carries no data.
    Repeat,
}

impl ValueKind {
    /// Get the name of this kind for error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::TrueFalse => "TrueFalse",
            Self::MultipleChoice => "MultipleChoice",
            Self::Repeat => "Repeat",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Payload {
    Text(Option<String>),
    Number(Option<f64>),
    Date(Option<NaiveDate>),
    TrueFalse(Option<bool>),
    MultipleChoice(Option<Vec<String>>),
    Repeat,
}

impl Payload {
    fn empty(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Text => Self::Text(None),
            ValueKind::Number => Self::Number(None),
            ValueKind::Date => Self::Date(None),
            ValueKind::TrueFalse => Self::TrueFalse(None),
            ValueKind::MultipleChoice => Self::MultipleChoice(None),
            ValueKind::Repeat => Self::Repeat,
        }
    }
}

/// A single typed datum with an answered/unanswered state.
///
/// Every kind has an unanswered form. An unanswered value still knows its
/// kind and whether interview users may modify it (an unanswered value can
/// be locked).
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    payload: Payload,
    user_modifiable: bool,
}

impl Value {
    /// Create an answered text value. Line breaks are normalized to `\r\n`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            payload: Payload::Text(Some(normalize_line_breaks(&text.into()))),
            user_modifiable: true,
        }
    }

    /// Create an answered number value.
    pub fn number(number: f64) -> Self {
        Self {
            payload: Payload::Number(Some(number)),
            user_modifiable: true,
        }
    }

    /// Create an answered date value.
    pub fn date(date: NaiveDate) -> Self {
        Self {
            payload: Payload::Date(Some(date)),
            user_modifiable: true,
        }
    }

    /// Create an answered true/false value.
    pub fn true_false(state: bool) -> Self {
        Self {
            payload: Payload::TrueFalse(Some(state)),
            user_modifiable: true,
        }
    }

    /// Create a multiple-choice value from an ordered selection list.
    ///
    /// An empty list yields an *unanswered* value. To represent an answered
    /// value with zero selections, use [`Value::multiple_choice_encoded`]
    /// with an empty string.
    pub fn multiple_choice<I, S>(selections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selections: Vec<String> = selections.into_iter().map(Into::into).collect();
        let payload = if selections.is_empty() {
            Payload::MultipleChoice(None)
        } else {
            Payload::MultipleChoice(Some(selections))
        };
        Self {
            payload,
            user_modifiable: true,
        }
    }

    /// Create a multiple-choice value from its `|`-separated encoded form.
    ///
    /// An empty string yields an *answered* value with zero selections,
    /// while an empty selection list passed to [`Value::multiple_choice`]
    /// yields an unanswered one.
    pub fn multiple_choice_encoded(encoded: &str) -> Self {
        let selections = if encoded.is_empty() {
            Vec::new()
        } else {
            encoded
                .split(SELECTION_SEPARATOR)
                .map(str::to_string)
                .collect()
        };
        Self {
            payload: Payload::MultipleChoice(Some(selections)),
            user_modifiable: true,
        }
    }

    /// Create an unanswered value of the given kind.
    pub fn unanswered(kind: ValueKind) -> Self {
        Self {
            payload: Payload::empty(kind),
            user_modifiable: true,
        }
    }

    /// Create an unanswered value that interview users may not modify.
    pub fn unanswered_locked(kind: ValueKind) -> Self {
        Self {
            payload: Payload::empty(kind),
            user_modifiable: false,
        }
    }

    /// Set whether interview users may modify this value.
    pub fn with_user_modifiable(mut self, user_modifiable: bool) -> Self {
        self.user_modifiable = user_modifiable;
        self
    }

    /// Get the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self.payload {
            Payload::Text(_) => ValueKind::Text,
            Payload::Number(_) => ValueKind::Number,
            Payload::Date(_) => ValueKind::Date,
            Payload::TrueFalse(_) => ValueKind::TrueFalse,
            Payload::MultipleChoice(_) => ValueKind::MultipleChoice,
            Payload::Repeat => ValueKind::Repeat,
        }
    }

    /// Whether this value carries an answer. Repeat markers never do.
    pub fn is_answered(&self) -> bool {
        match &self.payload {
            Payload::Text(text) => text.is_some(),
            Payload::Number(number) => number.is_some(),
            Payload::Date(date) => date.is_some(),
            Payload::TrueFalse(state) => state.is_some(),
            Payload::MultipleChoice(selections) => selections.is_some(),
            Payload::Repeat => false,
        }
    }

    /// Whether interview users may modify this value.
    pub fn user_modifiable(&self) -> bool {
        self.user_modifiable
    }

    /// Try to get this value as text.
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => text.as_deref(),
            _ => None,
        }
    }

    /// Try to get this value as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self.payload {
            Payload::Number(number) => number,
            _ => None,
        }
    }

    /// Try to get this value as a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self.payload {
            Payload::Date(date) => date,
            _ => None,
        }
    }

    /// Try to get this value as a true/false state.
    pub fn as_true_false(&self) -> Option<bool> {
        match self.payload {
            Payload::TrueFalse(state) => state,
            _ => None,
        }
    }

    /// Try to get the ordered selections of a multiple-choice value.
    pub fn selections(&self) -> Option<&[String]> {
        match &self.payload {
            Payload::MultipleChoice(selections) => selections.as_deref(),
            _ => None,
        }
    }

    /// Get the `|`-separated encoded form of a multiple-choice value.
    pub fn selections_encoded(&self) -> Option<String> {
        self.selections()
            .map(|selections| selections.join(&SELECTION_SEPARATOR.to_string()))
    }

    /// Compare two values.
    ///
    /// Comparison is only defined when *both* operands are answered;
    /// comparing any unanswered value, including to itself, is
    /// [`AnswerError::Unanswered`]. Mismatched kinds compare unequal, except
    /// for the text/multiple-choice pairing described on
    /// [`Value::multiple_choice`].
    pub fn try_eq(&self, other: &Value) -> Result<bool, AnswerError> {
        if !self.is_answered() || !other.is_answered() {
            return Err(AnswerError::Unanswered);
        }
        let equal = match (&self.payload, &other.payload) {
            (Payload::Text(Some(a)), Payload::Text(Some(b))) => eq_ignore_case(a, b),
            (Payload::Number(Some(a)), Payload::Number(Some(b))) => a == b,
            (Payload::Date(Some(a)), Payload::Date(Some(b))) => a == b,
            (Payload::TrueFalse(Some(a)), Payload::TrueFalse(Some(b))) => a == b,
            (Payload::MultipleChoice(Some(a)), Payload::MultipleChoice(Some(b))) => {
                selection_sets_equal(a, b)
            }
            (Payload::MultipleChoice(Some(selections)), Payload::Text(Some(text)))
            | (Payload::Text(Some(text)), Payload::MultipleChoice(Some(selections))) => {
                selections.len() == 1 && eq_ignore_case(&selections[0], text)
            }
            _ => false,
        };
        Ok(equal)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Self::number(number)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Self::number(f64::from(number))
    }
}

impl From<bool> for Value {
    fn from(state: bool) -> Self {
        Self::true_false(state)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Self::date(date)
    }
}

impl From<Vec<String>> for Value {
    fn from(selections: Vec<String>) -> Self {
        Self::multiple_choice(selections)
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Order-insensitive set comparison; duplicates within either side are ignored.
fn selection_sets_equal(a: &[String], b: &[String]) -> bool {
    a.iter().all(|selection| b.contains(selection))
        && b.iter().all(|selection| a.contains(selection))
}

/// Normalize every line break in `input` to `\r\n`.
///
/// Bare `\n`, bare `\r`, and `\r\n` all become `\r\n`. Applied to text
/// values on construction so equality and serialization never see mixed
/// line endings.
pub fn normalize_line_breaks(input: &str) -> String {
    let mut normalized = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                normalized.push_str("\r\n");
            }
            '\n' => normalized.push_str("\r\n"),
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_breaks_normalize_to_crlf() {
        assert_eq!(
            normalize_line_breaks("\r\nline 1\nline 2\rline 3\r\nline 4\n\rline 5\r"),
            "\r\nline 1\r\nline 2\r\nline 3\r\nline 4\r\n\r\nline 5\r\n"
        );
    }

    #[test]
    fn text_construction_normalizes() {
        let value = Value::text("one\ntwo\rthree");
        assert_eq!(value.as_text(), Some("one\r\ntwo\r\nthree"));
    }

    #[test]
    fn comparing_unanswered_fails() {
        let unanswered = Value::unanswered(ValueKind::Text);
        let answered = Value::text("a");

        assert!(unanswered.try_eq(&answered).is_err());
        assert!(answered.try_eq(&unanswered).is_err());
        assert!(unanswered.try_eq(&unanswered).is_err());
        assert!(
            Value::unanswered(ValueKind::Number)
                .try_eq(&Value::unanswered(ValueKind::Number))
                .is_err()
        );
    }

    #[test]
    fn text_equality_is_case_insensitive() {
        let a = Value::text("Hello World");
        let b = Value::text("hello world");
        assert!(a.try_eq(&b).unwrap());
    }

    #[test]
    fn empty_selection_list_is_unanswered() {
        let value = Value::multiple_choice(Vec::<String>::new());
        assert!(!value.is_answered());
        assert_eq!(value.kind(), ValueKind::MultipleChoice);
    }

    #[test]
    fn empty_encoded_string_is_answered_with_zero_selections() {
        let value = Value::multiple_choice_encoded("");
        assert!(value.is_answered());
        assert_eq!(value.selections(), Some(&[] as &[String]));
    }

    #[test]
    fn encoded_form_splits_on_separator_preserving_order() {
        let value = Value::multiple_choice_encoded("Red|Green|Blue");
        assert_eq!(
            value.selections().unwrap(),
            ["Red".to_string(), "Green".into(), "Blue".into()]
        );
        assert_eq!(value.selections_encoded().unwrap(), "Red|Green|Blue");
    }

    #[test]
    fn selection_equality_ignores_order_and_duplicates() {
        let a = Value::multiple_choice(["Red", "Blue"]);
        let b = Value::multiple_choice(["Blue", "Red", "Blue"]);
        assert!(a.try_eq(&b).unwrap());

        let c = Value::multiple_choice(["Red"]);
        assert!(!a.try_eq(&c).unwrap());
    }

    #[test]
    fn single_selection_matches_text_case_insensitively() {
        let choice = Value::multiple_choice(["Blue"]);
        let text = Value::text("blue");
        assert!(choice.try_eq(&text).unwrap());
        assert!(text.try_eq(&choice).unwrap());

        let two = Value::multiple_choice(["Blue", "Red"]);
        assert!(!two.try_eq(&text).unwrap());
    }

    #[test]
    fn mismatched_kinds_compare_unequal() {
        let number = Value::number(1.0);
        let state = Value::true_false(true);
        assert!(!number.try_eq(&state).unwrap());
    }

    #[test]
    fn unanswered_can_be_locked() {
        assert!(Value::unanswered(ValueKind::Date).user_modifiable());
        assert!(!Value::unanswered_locked(ValueKind::Date).user_modifiable());
    }
}
