use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A job's declared set of application questions.
///
/// Stored as JSONB on the job row. Answers are validated for required-presence
/// only; answer values stay opaque and are never type-checked against `kind`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirementsSchema {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_required: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl RequirementsSchema {
    /// Checks that every required question is answered. Returns the text of
    /// the first missing required question. Unknown keys in `responses` and
    /// unanswered optional questions pass silently.
    pub fn check_responses(&self, responses: &Map<String, Value>) -> Result<(), String> {
        for q in &self.questions {
            if q.required && !responses.contains_key(&q.id) {
                return Err(format!(
                    "Missing answer for required question: {}",
                    q.text
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_with(questions: Vec<Question>) -> RequirementsSchema {
        RequirementsSchema {
            questions,
            attachment_required: None,
        }
    }

    fn question(id: &str, text: &str, required: bool) -> Question {
        Question {
            id: id.into(),
            text: text.into(),
            required,
            kind: None,
        }
    }

    fn responses(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn missing_required_answer_names_question_text() {
        let schema = schema_with(vec![question("q1", "Why?", true)]);
        let err = schema.check_responses(&responses(json!({}))).unwrap_err();
        assert_eq!(err, "Missing answer for required question: Why?");
    }

    #[test]
    fn present_required_answer_passes_regardless_of_value() {
        let schema = schema_with(vec![question("q1", "Why?", true)]);
        assert!(schema.check_responses(&responses(json!({"q1": "Because"}))).is_ok());
        assert!(schema.check_responses(&responses(json!({"q1": null}))).is_ok());
        assert!(schema.check_responses(&responses(json!({"q1": 42}))).is_ok());
        assert!(schema.check_responses(&responses(json!({"q1": [1, 2]}))).is_ok());
    }

    #[test]
    fn optional_questions_may_be_skipped() {
        let schema = schema_with(vec![
            question("q1", "Why?", true),
            question("q2", "Anything else?", false),
        ]);
        assert!(schema.check_responses(&responses(json!({"q1": "x"}))).is_ok());
    }

    #[test]
    fn extra_response_keys_are_accepted_silently() {
        let schema = schema_with(vec![question("q1", "Why?", true)]);
        assert!(schema
            .check_responses(&responses(json!({"q1": "x", "unknown": "y"})))
            .is_ok());
    }

    #[test]
    fn empty_schema_accepts_anything() {
        let schema = RequirementsSchema::default();
        assert!(schema.check_responses(&responses(json!({}))).is_ok());
        assert!(schema.check_responses(&responses(json!({"a": 1}))).is_ok());
    }

    #[test]
    fn first_missing_question_is_reported() {
        let schema = schema_with(vec![
            question("q1", "First?", true),
            question("q2", "Second?", true),
        ]);
        let err = schema.check_responses(&responses(json!({}))).unwrap_err();
        assert!(err.contains("First?"));
    }

    #[test]
    fn deserializes_from_job_json() {
        let schema: RequirementsSchema = serde_json::from_value(json!({
            "questions": [
                {"id": "q1", "text": "Why apply?", "type": "text", "required": true},
                {"id": "q2", "text": "Portfolio?"}
            ],
            "attachment_required": true
        }))
        .unwrap();
        assert_eq!(schema.questions.len(), 2);
        assert!(schema.questions[0].required);
        assert_eq!(schema.questions[0].kind.as_deref(), Some("text"));
        assert!(!schema.questions[1].required);
        assert_eq!(schema.attachment_required, Some(true));
    }

    #[test]
    fn empty_object_deserializes_to_default() {
        let schema: RequirementsSchema = serde_json::from_value(json!({})).unwrap();
        assert!(schema.questions.is_empty());
        assert!(schema.attachment_required.is_none());
    }
}
