use docforge_answers::AnswerCollection;

use crate::ServiceError;

/// Overlay several serialized answer sets into one document, left to right.
///
/// Later sets win for answered values; an unanswered entry in a later set
/// never erases a value an earlier set answered. This is the in-process
/// counterpart of [`crate::AssemblyService::combine_answers`], for callers
/// that hold the answer XML locally.
pub fn combine_answer_xml(answer_xmls: &[String]) -> Result<String, ServiceError> {
    let mut combined = AnswerCollection::new();
    for xml in answer_xmls {
        let overlaying = AnswerCollection::read_xml(xml)?;
        tracing::debug!(answers = overlaying.answer_count(), "overlaying answer set");
        if combined.title.is_none() {
            combined.title = overlaying.title.clone();
        }
        combined.overlay(&overlaying);
    }
    Ok(combined.xml_answers())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_answers::ValueKind;

    fn answer_set(body: &str) -> String {
        format!("<AnswerSet title=\"\" version=\"1.1\">{body}</AnswerSet>")
    }

    #[test]
    fn later_answered_values_win() {
        let first = answer_set(
            "<Answer name=\"City\"><TextValue>Springfield</TextValue></Answer>\
             <Answer name=\"State\"><TextValue>Oregon</TextValue></Answer>",
        );
        let second = answer_set("<Answer name=\"City\"><TextValue>Shelbyville</TextValue></Answer>");

        let combined = combine_answer_xml(&[first, second]).unwrap();
        let collection = AnswerCollection::read_xml(&combined).unwrap();

        assert_eq!(collection.answer_count(), 2);
        let city = collection.try_get_answer("City", ValueKind::Text).unwrap();
        assert_eq!(city.value_at(&[]).as_text(), Some("Shelbyville"));
        let state = collection.try_get_answer("State", ValueKind::Text).unwrap();
        assert_eq!(state.value_at(&[]).as_text(), Some("Oregon"));
    }

    #[test]
    fn later_unanswered_does_not_erase() {
        let first = answer_set("<Answer name=\"City\"><TextValue>Springfield</TextValue></Answer>");
        let second = answer_set("<Answer name=\"City\"><TextValue unans=\"true\"/></Answer>");

        let combined = combine_answer_xml(&[first, second]).unwrap();
        let collection = AnswerCollection::read_xml(&combined).unwrap();

        let city = collection.try_get_answer("City", ValueKind::Text).unwrap();
        assert_eq!(city.value_at(&[]).as_text(), Some("Springfield"));
    }

    #[test]
    fn unreadable_document_is_an_error() {
        let result = combine_answer_xml(&["<NotAnAnswerSet/>".to_string()]);
        assert!(matches!(result, Err(ServiceError::Answers(_))));
    }
}
