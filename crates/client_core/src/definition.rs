//! Static wizard definitions: ordered steps, their input kinds and the
//! validation rule each step applies to its own answer.

use std::collections::{BTreeMap, HashSet};

use shared::{
    domain::{AnswerValue, StepId},
    protocol::{range_field_names, RequestEncoding, EMAIL_FIELD},
};
use url::Url;

use crate::error::WizardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requiredness {
    Required,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    NonEmpty,
    HttpUrl,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Text { rule: TextRule },
    Choice { options: Vec<ChoiceOption> },
    Range { min: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: String,
    pub requiredness: Requiredness,
    pub input_kind: InputKind,
}

impl StepDefinition {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        requiredness: Requiredness,
        input_kind: InputKind,
    ) -> Self {
        Self {
            id: StepId::new(id),
            title: title.into(),
            requiredness,
            input_kind,
        }
    }

    pub fn text(id: &str, title: &str, requiredness: Requiredness, rule: TextRule) -> Self {
        Self::new(id, title, requiredness, InputKind::Text { rule })
    }

    pub fn choice(id: &str, title: &str, options: Vec<ChoiceOption>) -> Self {
        Self::new(id, title, Requiredness::Required, InputKind::Choice { options })
    }

    pub fn range(id: &str, title: &str, min: u32, max: u32) -> Self {
        Self::new(id, title, Requiredness::Required, InputKind::Range { min, max })
    }

    /// Request fields this step's answer is sent under.
    fn wire_fields(&self) -> Vec<String> {
        match self.input_kind {
            InputKind::Range { .. } => range_field_names(&self.id).to_vec(),
            _ => vec![self.id.0.clone()],
        }
    }

    pub fn is_required(&self) -> bool {
        self.requiredness == Requiredness::Required
    }

    /// Checks this step's answer. Blank text counts as absent.
    pub fn validate(&self, value: Option<&AnswerValue>) -> Result<(), WizardError> {
        let value = match value {
            Some(AnswerValue::Text(text)) if text.trim().is_empty() => None,
            other => other,
        };

        let Some(value) = value else {
            if self.is_required() {
                return Err(WizardError::validation(&self.id, "an answer is required"));
            }
            return Ok(());
        };

        match (&self.input_kind, value) {
            (InputKind::Text { rule }, AnswerValue::Text(text)) => {
                check_text_rule(&self.id, *rule, text.trim())
            }
            (InputKind::Choice { options }, AnswerValue::Choice(selected)) => {
                if options.iter().any(|option| &option.id == selected) {
                    Ok(())
                } else {
                    Err(WizardError::validation(
                        &self.id,
                        format!("'{selected}' is not one of the available options"),
                    ))
                }
            }
            (InputKind::Range { min, max }, AnswerValue::Range { start, end }) => {
                if start >= end {
                    Err(WizardError::validation(
                        &self.id,
                        "range start must be before its end",
                    ))
                } else if start < min || end > max {
                    Err(WizardError::validation(
                        &self.id,
                        format!("range must stay within {min}..{max}"),
                    ))
                } else {
                    Ok(())
                }
            }
            (_, other) => Err(WizardError::validation(
                &self.id,
                format!("unexpected {} answer", other.kind_name()),
            )),
        }
    }

    /// Parses user-typed input into the answer shape this step expects.
    /// Ranges accept `start..end` or `start-end`.
    pub fn parse_answer(&self, raw: &str) -> Result<AnswerValue, WizardError> {
        let raw = raw.trim();
        match &self.input_kind {
            InputKind::Text { .. } => Ok(AnswerValue::text(raw)),
            InputKind::Choice { .. } => Ok(AnswerValue::choice(raw)),
            InputKind::Range { .. } => {
                let (start, end) = raw
                    .split_once("..")
                    .or_else(|| raw.split_once('-'))
                    .ok_or_else(|| WizardError::validation(&self.id, "expected start..end"))?;
                let parse = |part: &str| {
                    part.trim().parse::<u32>().map_err(|_| {
                        WizardError::validation(&self.id, format!("'{part}' is not a number"))
                    })
                };
                Ok(AnswerValue::Range {
                    start: parse(start)?,
                    end: parse(end)?,
                })
            }
        }
    }
}

fn check_text_rule(step: &StepId, rule: TextRule, text: &str) -> Result<(), WizardError> {
    match rule {
        TextRule::NonEmpty => Ok(()),
        TextRule::HttpUrl => {
            let valid = Url::parse(text)
                .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
                .unwrap_or(false);
            if valid {
                Ok(())
            } else {
                Err(WizardError::validation(step, "enter a valid http(s) link"))
            }
        }
        TextRule::Email => {
            let valid = text.split_once('@').is_some_and(|(local, domain)| {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            });
            if valid {
                Ok(())
            } else {
                Err(WizardError::validation(step, "enter a valid email address"))
            }
        }
    }
}

/// Where and how a wizard's accumulated answers are submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub path: String,
    pub encoding: RequestEncoding,
    /// Response field holding the generated media or redirect URL.
    pub result_field: String,
}

impl EndpointSpec {
    pub fn json(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            encoding: RequestEncoding::Json,
            result_field: "url".to_string(),
        }
    }

    pub fn multipart(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            encoding: RequestEncoding::Multipart,
            result_field: "url".to_string(),
        }
    }

    pub fn with_result_field(mut self, field: impl Into<String>) -> Self {
        self.result_field = field.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardDefinition {
    name: String,
    steps: Vec<StepDefinition>,
    endpoint: EndpointSpec,
}

impl WizardDefinition {
    pub fn new(
        name: impl Into<String>,
        steps: Vec<StepDefinition>,
        endpoint: EndpointSpec,
    ) -> Result<Self, WizardError> {
        let name = name.into();
        if steps.is_empty() {
            return Err(WizardError::InvalidDefinition(format!(
                "wizard '{name}' has no steps"
            )));
        }

        let mut seen = HashSet::new();
        let mut wire_fields = HashSet::from([EMAIL_FIELD.to_string()]);
        for step in &steps {
            if !seen.insert(step.id.clone()) {
                return Err(WizardError::InvalidDefinition(format!(
                    "duplicate step id '{}'",
                    step.id
                )));
            }
            for field in step.wire_fields() {
                if !wire_fields.insert(field.clone()) {
                    return Err(WizardError::InvalidDefinition(format!(
                        "step '{}' would send field '{field}' which is already taken",
                        step.id
                    )));
                }
            }
            match &step.input_kind {
                InputKind::Choice { options } if options.is_empty() => {
                    return Err(WizardError::InvalidDefinition(format!(
                        "step '{}' has no options",
                        step.id
                    )));
                }
                InputKind::Range { min, max } if min >= max => {
                    return Err(WizardError::InvalidDefinition(format!(
                        "step '{}' has an empty range",
                        step.id
                    )));
                }
                _ => {}
            }
        }

        Ok(Self {
            name,
            steps,
            endpoint,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn endpoint(&self) -> &EndpointSpec {
        &self.endpoint
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn step_at(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn step(&self, id: &StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| &step.id == id)
    }

    /// Validates every step against the accumulated answers, in step order.
    pub fn validate_answers(
        &self,
        answers: &BTreeMap<StepId, AnswerValue>,
    ) -> Result<(), WizardError> {
        self.steps
            .iter()
            .try_for_each(|step| step.validate(answers.get(&step.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts() -> StepDefinition {
        StepDefinition::choice(
            "font",
            "Font",
            vec![
                ChoiceOption::new("bebas", "Bebas Neue"),
                ChoiceOption::new("komika", "Komika Axis"),
            ],
        )
    }

    #[test]
    fn url_rule_rejects_non_http_links() {
        let step = StepDefinition::text(
            "youtube_url",
            "Link",
            Requiredness::Required,
            TextRule::HttpUrl,
        );

        assert!(step
            .validate(Some(&AnswerValue::text("https://youtu.be/abc")))
            .is_ok());
        assert!(step
            .validate(Some(&AnswerValue::text("ftp://example.com/x")))
            .is_err());
        assert!(step.validate(Some(&AnswerValue::text("not a url"))).is_err());
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let required =
            StepDefinition::text("prompt", "Prompt", Requiredness::Required, TextRule::NonEmpty);
        let optional =
            StepDefinition::text("prompt", "Prompt", Requiredness::Optional, TextRule::NonEmpty);

        let err = required
            .validate(Some(&AnswerValue::text("   ")))
            .expect_err("blank must fail");
        assert!(matches!(err, WizardError::Validation { .. }));
        assert!(optional.validate(Some(&AnswerValue::text("  "))).is_ok());
        assert!(optional.validate(None).is_ok());
    }

    #[test]
    fn choice_must_match_a_known_option() {
        let step = fonts();

        assert!(step.validate(Some(&AnswerValue::choice("bebas"))).is_ok());
        assert!(step.validate(Some(&AnswerValue::choice("comic-sans"))).is_err());
        assert!(step.validate(Some(&AnswerValue::text("bebas"))).is_err());
    }

    #[test]
    fn range_bounds_are_enforced() {
        let step = StepDefinition::range("clip", "Clip", 0, 60);

        assert!(step
            .validate(Some(&AnswerValue::Range { start: 0, end: 60 }))
            .is_ok());
        assert!(step
            .validate(Some(&AnswerValue::Range { start: 30, end: 30 }))
            .is_err());
        assert!(step
            .validate(Some(&AnswerValue::Range { start: 10, end: 61 }))
            .is_err());
    }

    #[test]
    fn email_rule_requires_domain_with_dot() {
        let step =
            StepDefinition::text("contact", "Email", Requiredness::Required, TextRule::Email);

        assert!(step.validate(Some(&AnswerValue::text("a@b.co"))).is_ok());
        assert!(step.validate(Some(&AnswerValue::text("a@localhost"))).is_err());
        assert!(step.validate(Some(&AnswerValue::text("@b.co"))).is_err());
    }

    #[test]
    fn parses_range_input_in_both_forms() {
        let step = StepDefinition::range("clip", "Clip", 0, 600);

        assert_eq!(
            step.parse_answer("12..48").expect("dots"),
            AnswerValue::Range { start: 12, end: 48 }
        );
        assert_eq!(
            step.parse_answer(" 3 - 9 ").expect("dash"),
            AnswerValue::Range { start: 3, end: 9 }
        );
        assert!(step.parse_answer("soon").is_err());
    }

    #[test]
    fn definition_rejects_duplicate_ids_and_empty_steps() {
        let endpoint = EndpointSpec::json("/thumbnail");

        let err = WizardDefinition::new("empty", Vec::new(), endpoint.clone())
            .expect_err("no steps");
        assert!(matches!(err, WizardError::InvalidDefinition(_)));

        let err = WizardDefinition::new("dup", vec![fonts(), fonts()], endpoint)
            .expect_err("duplicate ids");
        assert!(err.to_string().contains("duplicate step id"));
    }

    #[test]
    fn definition_rejects_steps_that_shadow_request_fields() {
        let endpoint = EndpointSpec::json("/clip");
        let email_step =
            StepDefinition::text("email", "Email", Requiredness::Required, TextRule::Email);

        let err = WizardDefinition::new("reserved", vec![email_step], endpoint.clone())
            .expect_err("email is reserved");
        assert!(matches!(err, WizardError::InvalidDefinition(_)));

        let steps = vec![
            StepDefinition::range("clip", "Clip", 0, 60),
            StepDefinition::text(
                "clip_end",
                "End note",
                Requiredness::Optional,
                TextRule::NonEmpty,
            ),
        ];
        let err = WizardDefinition::new("collide", steps, endpoint.clone())
            .expect_err("range fields collide");
        assert!(err.to_string().contains("clip_end"));

        let steps = vec![
            StepDefinition::text("clip", "Clip", Requiredness::Required, TextRule::NonEmpty),
            StepDefinition::range("segment", "Segment", 0, 60),
        ];
        assert!(WizardDefinition::new("distinct", steps, endpoint).is_ok());
    }
}
