use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{AnswerValue, StepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEncoding {
    #[default]
    Json,
    Multipart,
}

/// Request field that carries the requesting user's email.
pub const EMAIL_FIELD: &str = "email";

/// Field names a range answer is sent under.
pub fn range_field_names(step_id: &StepId) -> [String; 2] {
    [format!("{}_start", step_id.0), format!("{}_end", step_id.0)]
}

/// Flat field set sent to a generation endpoint: the accumulated answers plus
/// the requesting user's email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationRequest {
    pub fields: Map<String, Value>,
}

impl GenerationRequest {
    pub fn from_answers(answers: &BTreeMap<StepId, AnswerValue>, email: &str) -> Self {
        let mut fields = Map::new();
        for (step_id, answer) in answers {
            match answer {
                // blank text is an unanswered optional step
                AnswerValue::Text(value) if value.trim().is_empty() => {}
                AnswerValue::Text(value) | AnswerValue::Choice(value) => {
                    fields.insert(step_id.0.clone(), Value::String(value.clone()));
                }
                AnswerValue::Range { start, end } => {
                    let [start_field, end_field] = range_field_names(step_id);
                    fields.insert(start_field, Value::from(*start));
                    fields.insert(end_field, Value::from(*end));
                }
            }
        }
        fields.insert(EMAIL_FIELD.to_string(), Value::String(email.to_string()));
        Self { fields }
    }

    /// Field pairs as multipart text parts, in key order.
    pub fn form_parts(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (name.clone(), text)
            })
            .collect()
    }

    pub fn email(&self) -> Option<&str> {
        self.fields.get(EMAIL_FIELD).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Media or redirect URL produced by the backend.
    pub url: String,
    /// Full response body as returned by the backend.
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub trial_claimed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub referrals: u32,
}

impl UserRecord {
    pub fn shows_trial_banner(&self) -> bool {
        !self.trial_claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_answers_expand_into_start_and_end_fields() {
        let mut answers = BTreeMap::new();
        answers.insert(StepId::from("clip"), AnswerValue::Range { start: 5, end: 42 });
        answers.insert(StepId::from("persona"), AnswerValue::choice("elon"));

        let request = GenerationRequest::from_answers(&answers, "a@b.co");

        assert_eq!(request.fields["clip_start"], Value::from(5));
        assert_eq!(request.fields["clip_end"], Value::from(42));
        assert_eq!(request.fields["persona"], Value::from("elon"));
        assert_eq!(request.email(), Some("a@b.co"));
        assert!(request
            .form_parts()
            .contains(&("clip_end".to_string(), "42".to_string())));
    }

    #[test]
    fn blank_text_answers_are_not_sent() {
        let mut answers = BTreeMap::new();
        answers.insert(StepId::from("prompt"), AnswerValue::text("   "));
        answers.insert(StepId::from("style"), AnswerValue::text("bold"));

        let request = GenerationRequest::from_answers(&answers, "a@b.co");

        assert!(!request.fields.contains_key("prompt"));
        assert_eq!(request.fields["style"], Value::from("bold"));
        assert!(!request.form_parts().iter().any(|(name, _)| name == "prompt"));
    }

    #[test]
    fn user_record_ignores_unknown_fields() {
        let record: UserRecord = serde_json::from_value(serde_json::json!({
            "email": "a@b.co",
            "credits": 12,
            "account": "pro",
            "trial_claimed": true,
            "achievements": ["first_clip"]
        }))
        .expect("decode");

        assert_eq!(record.credits, 12);
        assert!(!record.shows_trial_banner());
        assert_eq!(record.referrals, 0);
    }
}
