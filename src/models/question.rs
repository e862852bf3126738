// src/models/question.rs

use rand::seq::SliceRandom;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Canonical answer option. The backend is inconsistent about field names
/// (`id` vs `option_id`, `correct` vs `is_correct`, numeric vs string ids);
/// everything is normalized into this shape at the ingestion boundary and
/// nothing downstream ever branches on field presence again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

/// A quiz question with its options in presentation order.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: i64,

    /// The question text. Serialized as `question`, the backend's name.
    #[serde(rename = "question")]
    pub text: String,

    /// Difficulty level, 1 (easiest) to 5.
    pub level: i64,

    /// Owning module label, e.g. "Redes".
    #[serde(rename = "module")]
    pub module_label: String,

    pub options: Vec<QuestionOption>,

    /// Static explanation shipped with the question, when the bank has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// The option flagged correct. The bank guarantees exactly one; a
    /// malformed question yields `None` and is treated as unanswerable.
    pub fn correct_option(&self) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.is_correct)
    }

    pub fn option_text(&self, option_id: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.id == option_id)
            .map(|o| o.text.as_str())
    }
}

/// Shuffles only the options of each question, keeping question order.
/// Used by the placement quiz, which presents questions easiest-first.
pub fn shuffle_options(questions: &mut [Question]) {
    let mut rng = rand::rng();
    for question in questions.iter_mut() {
        question.options.shuffle(&mut rng);
    }
}

/// Shuffles question order and each question's options.
pub fn shuffle_questions_and_options(questions: &mut Vec<Question>) {
    let mut rng = rand::rng();
    questions.shuffle(&mut rng);
    for question in questions.iter_mut() {
        question.options.shuffle(&mut rng);
    }
}

#[derive(Deserialize)]
struct RawOption {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    option_id: Option<Value>,
    text: String,
    #[serde(default)]
    correct: Option<bool>,
    #[serde(default)]
    is_correct: Option<bool>,
}

#[derive(Deserialize)]
struct RawQuestion {
    id: i64,
    #[serde(alias = "text")]
    question: String,
    #[serde(default = "default_level")]
    level: i64,
    #[serde(default, alias = "module_label")]
    module: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    explanation: Option<String>,
}

fn default_level() -> i64 {
    1
}

/// Renders a JSON id value as a string, since the backend emits option ids
/// both as numbers and as strings.
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Question {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawQuestion::deserialize(deserializer)?;

        let mut options = Vec::with_capacity(raw.options.len());
        for opt in raw.options {
            let id = opt
                .id
                .as_ref()
                .and_then(id_to_string)
                .or_else(|| opt.option_id.as_ref().and_then(id_to_string))
                .ok_or_else(|| D::Error::custom("option without id or option_id"))?;
            options.push(QuestionOption {
                id,
                text: opt.text,
                is_correct: opt.correct.or(opt.is_correct).unwrap_or(false),
            });
        }

        Ok(Question {
            id: raw.id,
            text: raw.question,
            level: raw.level,
            module_label: raw.module.unwrap_or_default(),
            options,
            explanation: raw.explanation,
        })
    }
}

/// One answered question, in presentation order. Wire names match the
/// submit-quiz contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(rename = "questionId")]
    pub question_id: i64,
    #[serde(rename = "selectedOption")]
    pub selected_option_id: String,
}

/// One correctly answered question, as the placement submission expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectAnswer {
    pub question_id: i64,
    pub level: i64,
}

/// Classification produced by the placement backend. `placement_level` is
/// canonically a string; older revisions sent a number, which is accepted
/// and rendered as its decimal form.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacementResult {
    #[serde(deserialize_with = "level_as_string")]
    pub placement_level: String,
    #[serde(rename = "nivel_texto")]
    pub level_label: String,
}

/// Accepts a level sent either as a string or as a number and keeps its
/// decimal form. Shared with the profile payload, which has the same
/// historical inconsistency.
pub(crate) fn level_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_to_string(&value).ok_or_else(|| D::Error::custom("level must be string or number"))
}

/// Authoritative score returned by the submit-quiz endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizScore {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
}

/// Best-effort AI enrichment attached to a wrong answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub vocabulary: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

/// Detail record for a question answered incorrectly. Always computed
/// locally; `review` is filled in later if enrichment succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrongAnswer {
    pub question: String,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    #[serde(rename = "userAnswer")]
    pub user_answer: String,
    pub level: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
}
