//! Protocol messages for client-server communication.
//!
//! All messages are serialized as JSON over WebSocket. Every request carries
//! an id that the matching response echoes back, so one connection can have
//! several calls in flight.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{OPTION_ID_SENTINEL, Question, QuizOption};

/// Default server port.
pub const DEFAULT_PORT: u16 = 8712;

/// A call envelope sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub call: Call,
}

/// A reply envelope sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    pub reply: Reply,
}

/// Calls the client can make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Call {
    /// Localized texts and tunables.
    GetConfigParams,

    /// Trade a PIN for a fresh attempt token.
    ValidatePin { pin: String },

    /// Whether a survey with this id exists.
    SurveyExists { survey_id: i64 },

    /// Whether the token authorizes play for the survey.
    ValidateToken {
        survey_id: i64,
        access_token: String,
    },

    /// The ordered questions of a survey.
    GetSurveyData {
        survey_id: i64,
        access_token: String,
    },

    /// Submit one answer for grading.
    SubmitAnswer {
        survey_id: i64,
        question_id: i64,
        answer_id: i64,
        access_token: String,
    },
}

/// Replies the server sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Reply {
    ConfigParams { params: BTreeMap<String, String> },

    PinAccepted {
        survey_id: i64,
        access_token: String,
    },

    PinRejected { reason: String },

    SurveyStatus { exists: bool },

    TokenStatus { valid: bool },

    SurveyData {
        success: bool,
        #[serde(default)]
        questions: Vec<QuestionPayload>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    SubmitResult {
        success: bool,
        #[serde(default)]
        correct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// The request frame could not be understood.
    Error { message: String },
}

impl Reply {
    /// Variant name, for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::ConfigParams { .. } => "ConfigParams",
            Reply::PinAccepted { .. } => "PinAccepted",
            Reply::PinRejected { .. } => "PinRejected",
            Reply::SurveyStatus { .. } => "SurveyStatus",
            Reply::TokenStatus { .. } => "TokenStatus",
            Reply::SurveyData { .. } => "SurveyData",
            Reply::SubmitResult { .. } => "SubmitResult",
            Reply::Error { .. } => "Error",
        }
    }
}

/// A question as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub options: Vec<OptionPayload>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// An option as it travels on the wire. The id is decoded leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPayload {
    #[serde(default = "sentinel_id", deserialize_with = "lenient_option_id")]
    pub id: i64,
    #[serde(default)]
    pub text: String,
}

fn sentinel_id() -> i64 {
    OPTION_ID_SENTINEL
}

/// Accept numbers and numeric strings; anything else becomes the sentinel.
fn lenient_option_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let id = match &raw {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(id.unwrap_or_else(|| {
        log::warn!("Invalid option id {raw}, using sentinel {OPTION_ID_SENTINEL}");
        OPTION_ID_SENTINEL
    }))
}

impl From<&Question> for QuestionPayload {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            title: question.title.clone(),
            options: question
                .options
                .iter()
                .map(|o| OptionPayload {
                    id: o.id,
                    text: o.text.clone(),
                })
                .collect(),
            explanation: question.explanation.clone(),
        }
    }
}

impl From<QuestionPayload> for Question {
    fn from(payload: QuestionPayload) -> Self {
        let options = payload
            .options
            .into_iter()
            .map(|o| QuizOption {
                id: o.id,
                text: o.text,
            })
            .collect();
        let question = Question::new(payload.id, payload.title, options);
        match payload.explanation {
            Some(explanation) => question.with_explanation(explanation),
            None => question,
        }
    }
}
