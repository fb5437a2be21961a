//! Reader and writer for the XML answer-set dialect.
//!
//! The dialect is small: an `AnswerSet` root, `Answer` children keyed by
//! `name`, and nested `TextValue | NumValue | DateValue | TFValue | MCValue |
//! RptValue` elements with an optional boolean `unans` attribute. The reader
//! is deliberately tolerant: self-closing and explicit-empty elements are
//! identical, `unans="true"` wins over any element text, and a malformed
//! answer is skipped without aborting the rest of the document.

use chrono::NaiveDate;

use crate::answer::Node;
use crate::{Answer, AnswerCollection, Value, ValueKind};

const DATE_READ_FORMAT: &str = "%d/%m/%Y";
const DATE_WRITE_FORMAT: &str = "%-d/%-m/%Y";

/// Error for an answer-set document that cannot be read at all.
///
/// Individual malformed answers are skipped with a warning, not surfaced
/// here.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The document is not well-formed at the top level.
    #[error("malformed answer set XML at byte {offset}: {message}")]
    Malformed { offset: usize, message: String },

    /// The root element is not an `AnswerSet`.
    #[error("expected AnswerSet root element, found {found}")]
    UnexpectedRoot { found: String },
}

// ---------------------------------------------------------------------------
// Element tree

#[derive(Debug, Clone, PartialEq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value.as_str())
    }

    fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated text content of this element and its descendants.
    fn text_content(&self) -> String {
        let mut content = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(text) => content.push_str(text),
                XmlNode::Element(element) => content.push_str(&element.text_content()),
            }
        }
        content
    }
}

// ---------------------------------------------------------------------------
// Tokenizer

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> ReadError {
        ReadError::Malformed {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ReadError> {
        if self.bump() == Some(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{expected}'")))
        }
    }

    /// Skip everything up to and including `terminator`.
    fn skip_until(&mut self, terminator: &str) -> Result<(), ReadError> {
        match self.rest().find(terminator) {
            Some(offset) => {
                self.pos += offset + terminator.len();
                Ok(())
            }
            None => Err(self.error(format!("unterminated section, expected {terminator}"))),
        }
    }

    /// Parse the document prolog and the single root element.
    fn parse_document(&mut self) -> Result<XmlElement, ReadError> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.starts_with("<!") {
                self.skip_until(">")?;
            } else {
                break;
            }
        }
        if self.peek() != Some('<') {
            return Err(self.error("expected root element"));
        }
        self.parse_element()
    }

    fn parse_element(&mut self) -> Result<XmlElement, ReadError> {
        self.expect('<')?;
        let name = self.parse_name()?;
        let attributes = self.parse_attributes()?;
        self.skip_whitespace();
        if self.eat("/>") {
            return Ok(XmlElement {
                name,
                attributes,
                children: Vec::new(),
            });
        }
        self.expect('>')?;
        let mut children = Vec::new();
        loop {
            if self.eat("</") {
                let closing = self.parse_name()?;
                if closing != name {
                    return Err(self.error(format!(
                        "mismatched closing tag: expected </{name}>, found </{closing}>"
                    )));
                }
                self.skip_whitespace();
                self.expect('>')?;
                return Ok(XmlElement {
                    name,
                    attributes,
                    children,
                });
            }
            if self.starts_with("<!--") {
                self.skip_until("-->")?;
                continue;
            }
            if self.starts_with("<?") {
                self.skip_until("?>")?;
                continue;
            }
            match self.peek() {
                Some('<') => children.push(XmlNode::Element(self.parse_element()?)),
                Some(_) => children.push(XmlNode::Text(self.parse_text())),
                None => {
                    return Err(self.error(format!("unexpected end of input inside <{name}>")));
                }
            }
        }
    }

    fn parse_name(&mut self) -> Result<String, ReadError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.') {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_attributes(&mut self) -> Result<Vec<(String, String)>, ReadError> {
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            if matches!(self.peek(), Some('/' | '>') | None) {
                return Ok(attributes);
            }
            let name = self.parse_name()?;
            self.skip_whitespace();
            self.expect('=')?;
            self.skip_whitespace();
            let quote = match self.bump() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(self.error(format!("attribute {name} is missing a quoted value"))),
            };
            let start = self.pos;
            while self.peek().is_some_and(|c| c != quote) {
                self.bump();
            }
            let raw = &self.input[start..self.pos];
            if self.bump() != Some(quote) {
                return Err(self.error(format!("unterminated value for attribute {name}")));
            }
            attributes.push((name, decode_entities(raw)));
        }
    }

    fn parse_text(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '<') {
            self.bump();
        }
        decode_entities(&self.input[start..self.pos])
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            decoded.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        match entity {
            "amp" => decoded.push('&'),
            "lt" => decoded.push('<'),
            "gt" => decoded.push('>'),
            "quot" => decoded.push('"'),
            "apos" => decoded.push('\''),
            _ => {
                let code = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse));
                match code.and_then(Result::ok).and_then(char::from_u32) {
                    Some(c) => decoded.push(c),
                    // Unknown entity: keep it literally rather than fail.
                    None => {
                        decoded.push('&');
                        decoded.push_str(entity);
                        decoded.push(';');
                    }
                }
            }
        }
        rest = &rest[semi + 1..];
    }
    decoded.push_str(rest);
    decoded
}

// ---------------------------------------------------------------------------
// Reading answers

pub(crate) fn append_answer_set(
    collection: &mut AnswerCollection,
    xml: &str,
) -> Result<(), ReadError> {
    let root = Reader::new(xml).parse_document()?;
    if root.name != "AnswerSet" {
        return Err(ReadError::UnexpectedRoot { found: root.name });
    }
    if collection.title.is_none() {
        collection.title = root
            .attribute("title")
            .filter(|title| !title.is_empty())
            .map(str::to_string);
    }
    for element in root.child_elements() {
        if element.name != "Answer" {
            tracing::warn!(element = %element.name, "skipping unrecognized answer set element");
            continue;
        }
        match read_answer(element) {
            Ok(answer) => absorb(collection, answer),
            Err(reason) => {
                tracing::warn!(%reason, "skipping malformed answer");
            }
        }
    }
    Ok(())
}

/// Merge a freshly read answer into the collection. Each answer parses
/// independently, so a duplicate or conflicting name only affects itself.
fn absorb(collection: &mut AnswerCollection, answer: Answer) {
    let target = match collection.create_answer(answer.kind(), answer.name()) {
        Ok(target) => target,
        Err(error) => {
            tracing::warn!(name = answer.name(), %error, "skipping conflicting answer");
            return;
        }
    };
    target.save = answer.save;
    target.user_extendible = answer.user_extendible;
    for (path, value) in answer.indexed_values() {
        if !value.is_answered() {
            continue;
        }
        if let Err(error) = target.set_value(value.clone(), &path) {
            tracing::warn!(name = answer.name(), %error, "skipping value");
        }
    }
}

fn read_answer(element: &XmlElement) -> Result<Answer, String> {
    let Some(name) = element.attribute("name") else {
        return Err("Answer element without a name attribute".to_string());
    };
    let Some(value_element) = element.child_elements().next() else {
        return Err(format!("answer '{name}' has no value element"));
    };
    let Some(kind) = leaf_kind(value_element) else {
        return Err(format!("answer '{name}' has no recognizable value kind"));
    };
    let mut answer = Answer::new(name, kind);
    answer.save = element.attribute("save") != Some("false");
    answer.user_extendible = element.attribute("userExtendible") != Some("false");
    let mut path = Vec::new();
    read_node(&mut answer, value_element, &mut path)?;
    Ok(answer)
}

/// The leaf kind an element tree bottoms out in, descending through repeat
/// levels. `None` when no recognizable leaf exists.
fn leaf_kind(element: &XmlElement) -> Option<ValueKind> {
    match element.name.as_str() {
        "TextValue" => Some(ValueKind::Text),
        "NumValue" => Some(ValueKind::Number),
        "DateValue" => Some(ValueKind::Date),
        "TFValue" => Some(ValueKind::TrueFalse),
        "MCValue" => Some(ValueKind::MultipleChoice),
        "RptValue" => element.child_elements().find_map(leaf_kind),
        _ => None,
    }
}

fn read_node(answer: &mut Answer, element: &XmlElement, path: &mut Vec<usize>) -> Result<(), String> {
    if element.name == "RptValue" {
        // An unanswered repeat carries no iterations, whatever it contains.
        if is_unanswered(element) {
            return Ok(());
        }
        for (i, child) in element.child_elements().enumerate() {
            path.push(i);
            read_node(answer, child, path)?;
            path.pop();
        }
        return Ok(());
    }
    let value = read_scalar(element)?;
    if value.is_answered() {
        answer
            .set_value(value, path)
            .map_err(|error| error.to_string())?;
    }
    Ok(())
}

fn read_scalar(element: &XmlElement) -> Result<Value, String> {
    let kind = match element.name.as_str() {
        "TextValue" => ValueKind::Text,
        "NumValue" => ValueKind::Number,
        "DateValue" => ValueKind::Date,
        "TFValue" => ValueKind::TrueFalse,
        "MCValue" => ValueKind::MultipleChoice,
        other => return Err(format!("unrecognized value element <{other}>")),
    };
    let user_modifiable = element.attribute("userModifiable") != Some("false");

    // `unans="true"` forces the value unanswered; any text content is
    // discarded, never used.
    if is_unanswered(element) {
        let value = if user_modifiable {
            Value::unanswered(kind)
        } else {
            Value::unanswered_locked(kind)
        };
        return Ok(value);
    }

    let value = match kind {
        ValueKind::Text => Value::text(element.text_content()),
        ValueKind::Number => {
            let content = element.text_content();
            let content = content.trim();
            if content.is_empty() {
                Value::unanswered(ValueKind::Number)
            } else {
                let number: f64 = content
                    .parse()
                    .map_err(|_| format!("unreadable number '{content}'"))?;
                Value::number(number)
            }
        }
        ValueKind::Date => {
            let content = element.text_content();
            let content = content.trim();
            if content.is_empty() {
                Value::unanswered(ValueKind::Date)
            } else {
                let date = NaiveDate::parse_from_str(content, DATE_READ_FORMAT)
                    .map_err(|_| format!("unreadable date '{content}'"))?;
                Value::date(date)
            }
        }
        ValueKind::TrueFalse => {
            let content = element.text_content();
            match content.trim().to_ascii_lowercase().as_str() {
                "true" => Value::true_false(true),
                "false" => Value::true_false(false),
                "" => Value::unanswered(ValueKind::TrueFalse),
                other => return Err(format!("unreadable true/false value '{other}'")),
            }
        }
        ValueKind::MultipleChoice => {
            let selections: Vec<String> = element
                .child_elements()
                .filter(|child| child.name == "SelValue" && !is_unanswered(child))
                .map(|child| child.text_content())
                .collect();
            // No selections still means answered: the element itself was
            // present without an unans flag.
            if selections.is_empty() {
                Value::multiple_choice_encoded("")
            } else {
                Value::multiple_choice(selections)
            }
        }
        ValueKind::Repeat => unreachable!("repeat handled by read_node"),
    };
    Ok(value.with_user_modifiable(user_modifiable))
}

fn is_unanswered(element: &XmlElement) -> bool {
    element
        .attribute("unans")
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

// ---------------------------------------------------------------------------
// Writing answers

pub(crate) fn write_answer_set(collection: &AnswerCollection) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    let title = collection.title.as_deref().unwrap_or("");
    out.push_str(&format!(
        "<AnswerSet title=\"{}\" version=\"1.1\">",
        escape_attribute(title)
    ));
    for answer in collection.iter() {
        write_answer(&mut out, answer);
    }
    out.push_str("</AnswerSet>");
    out
}

fn write_answer(out: &mut String, answer: &Answer) {
    out.push_str(&format!(
        "<Answer name=\"{}\"",
        escape_attribute(answer.name())
    ));
    if !answer.save {
        out.push_str(" save=\"false\"");
    }
    if !answer.user_extendible {
        out.push_str(" userExtendible=\"false\"");
    }
    out.push('>');
    match answer.root() {
        Some(node) => write_node(out, node),
        None => write_value(out, &Value::unanswered(answer.kind())),
    }
    out.push_str("</Answer>");
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Leaf(value) => write_value(out, value),
        Node::Repeat(children) => {
            out.push_str("<RptValue>");
            for child in children {
                write_node(out, child);
            }
            out.push_str("</RptValue>");
        }
    }
}

fn write_value(out: &mut String, value: &Value) {
    let tag = element_name(value.kind());
    let lock = if value.user_modifiable() {
        ""
    } else {
        " userModifiable=\"false\""
    };
    if !value.is_answered() {
        out.push_str(&format!("<{tag} unans=\"true\"{lock}/>"));
        return;
    }
    match value.kind() {
        ValueKind::Text => {
            let text = value.as_text().unwrap_or_default();
            out.push_str(&format!("<{tag}{lock}>{}</{tag}>", escape_text(text)));
        }
        ValueKind::Number => {
            let number = value.as_number().unwrap_or_default();
            out.push_str(&format!("<{tag}{lock}>{number}</{tag}>"));
        }
        ValueKind::Date => {
            let date = value.as_date().unwrap_or_default();
            out.push_str(&format!(
                "<{tag}{lock}>{}</{tag}>",
                date.format(DATE_WRITE_FORMAT)
            ));
        }
        ValueKind::TrueFalse => {
            let state = value.as_true_false().unwrap_or_default();
            out.push_str(&format!("<{tag}{lock}>{state}</{tag}>"));
        }
        ValueKind::MultipleChoice => {
            out.push_str(&format!("<{tag}{lock}>"));
            for selection in value.selections().unwrap_or_default() {
                out.push_str(&format!("<SelValue>{}</SelValue>", escape_text(selection)));
            }
            out.push_str(&format!("</{tag}>"));
        }
        ValueKind::Repeat => {}
    }
}

fn element_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Text => "TextValue",
        ValueKind::Number => "NumValue",
        ValueKind::Date => "DateValue",
        ValueKind::TrueFalse => "TFValue",
        ValueKind::MultipleChoice => "MCValue",
        ValueKind::Repeat => "RptValue",
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;")
}

fn escape_attribute(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer_set(body: &str) -> String {
        format!("<?xml version=\"1.0\" encoding=\"utf-8\"?><AnswerSet title=\"\" version=\"1.1\">{body}</AnswerSet>")
    }

    #[test]
    fn unans_discards_text_content() {
        let collection = AnswerCollection::read_xml(&answer_set(
            "<Answer name=\"Married\"><TFValue unans=\"true\">Ignored</TFValue></Answer>",
        ))
        .unwrap();

        let answer = collection
            .try_get_answer("Married", ValueKind::TrueFalse)
            .unwrap();
        assert!(!answer.value_at(&[]).is_answered());
    }

    #[test]
    fn self_closing_equals_explicit_empty() {
        let short = AnswerCollection::read_xml(&answer_set(
            "<Answer name=\"Notes\"><TextValue/></Answer>",
        ))
        .unwrap();
        let long = AnswerCollection::read_xml(&answer_set(
            "<Answer name=\"Notes\"><TextValue></TextValue></Answer>",
        ))
        .unwrap();

        let short_value = short
            .try_get_answer("Notes", ValueKind::Text)
            .unwrap()
            .value_at(&[]);
        let long_value = long
            .try_get_answer("Notes", ValueKind::Text)
            .unwrap()
            .value_at(&[]);
        assert_eq!(short_value, long_value);
        assert_eq!(short_value.as_text(), Some(""));
    }

    #[test]
    fn empty_repeat_iterations_stay_unpopulated() {
        let collection = AnswerCollection::read_xml(&answer_set(
            "<Answer name=\"Author Full Name\"><RptValue><RptValue>\
             <TextValue>A</TextValue><TextValue unans=\"true\"/></RptValue>\
             <RptValue></RptValue></RptValue></Answer>",
        ))
        .unwrap();

        let answer = collection
            .try_get_answer("Author Full Name", ValueKind::Text)
            .unwrap();
        assert_eq!(answer.child_count(), 1);
        assert_eq!(answer.child_count_at(&[0]), 1);
        assert_eq!(answer.child_count_at(&[1]), 0);
        assert_eq!(answer.value_at(&[0, 0]).as_text(), Some("A"));
        assert!(!answer.value_at(&[0, 1]).is_answered());
        assert!(!answer.value_at(&[1]).is_answered());
        assert_eq!(answer.value_at(&[]).as_text(), Some("A"));
    }

    #[test]
    fn malformed_answer_does_not_abort_document() {
        let collection = AnswerCollection::read_xml(&answer_set(
            "<Answer name=\"Age\"><NumValue>not a number</NumValue></Answer>\
             <Answer><TextValue>orphan</TextValue></Answer>\
             <Answer name=\"City\"><TextValue>Springfield</TextValue></Answer>",
        ))
        .unwrap();

        assert_eq!(collection.answer_count(), 1);
        assert!(collection.try_get_answer("City", ValueKind::Text).is_some());
    }

    #[test]
    fn unexpected_root_is_an_error() {
        let result = AnswerCollection::read_xml("<Answers></Answers>");
        assert!(matches!(result, Err(ReadError::UnexpectedRoot { .. })));
    }

    #[test]
    fn entities_round_trip() {
        let mut collection = AnswerCollection::new();
        collection
            .create_answer(ValueKind::Text, "Firm & Partners <LLP>")
            .unwrap()
            .set_value(Value::text("Smith & Jones <office>"), &[])
            .unwrap();

        let xml = collection.xml_answers();
        assert!(xml.contains("Smith &amp; Jones &lt;office>"));

        let reread = AnswerCollection::read_xml(&xml).unwrap();
        let answer = reread
            .try_get_answer("Firm & Partners <LLP>", ValueKind::Text)
            .unwrap();
        assert_eq!(answer.value_at(&[]).as_text(), Some("Smith & Jones <office>"));
    }

    #[test]
    fn selections_round_trip() {
        let mut collection = AnswerCollection::new();
        collection
            .create_answer(ValueKind::MultipleChoice, "Benefits")
            .unwrap()
            .set_value(Value::multiple_choice(["Dental", "Vision"]), &[])
            .unwrap();

        let reread = AnswerCollection::read_xml(&collection.xml_answers()).unwrap();
        let answer = reread
            .try_get_answer("Benefits", ValueKind::MultipleChoice)
            .unwrap();
        assert_eq!(
            answer.value_at(&[]).selections_encoded().unwrap(),
            "Dental|Vision"
        );
    }

    #[test]
    fn dates_round_trip_in_day_month_year_form() {
        let date = NaiveDate::from_ymd_opt(2013, 2, 14).unwrap();
        let mut collection = AnswerCollection::new();
        collection
            .create_answer(ValueKind::Date, "Effective Date")
            .unwrap()
            .set_value(Value::date(date), &[])
            .unwrap();

        let xml = collection.xml_answers();
        assert!(xml.contains("<DateValue>14/2/2013</DateValue>"));

        let reread = AnswerCollection::read_xml(&xml).unwrap();
        let answer = reread
            .try_get_answer("Effective Date", ValueKind::Date)
            .unwrap();
        assert_eq!(answer.value_at(&[]).as_date(), Some(date));
    }

    #[test]
    fn fully_unanswered_answer_round_trips() {
        let mut collection = AnswerCollection::new();
        collection
            .create_answer(ValueKind::Number, "Salary")
            .unwrap();

        let xml = collection.xml_answers();
        assert!(xml.contains("<NumValue unans=\"true\"/>"));

        let reread = AnswerCollection::read_xml(&xml).unwrap();
        assert_eq!(reread.answer_count(), 1);
        let answer = reread.try_get_answer("Salary", ValueKind::Number).unwrap();
        assert!(!answer.value_at(&[]).is_answered());
    }
}
