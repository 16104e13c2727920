//! WebSocket RPC client for the question bank.
//!
//! One connection carries every call. A writer task drains an outgoing
//! channel into the socket; a reader task hands each reply to whichever call
//! is waiting on its id. Replies nobody waits for any more are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ConfigParams;
use crate::error::ApiError;
use crate::models::{OPTION_ID_SENTINEL, Question};
use crate::protocol::{Call, QuestionPayload, Reply, RpcRequest, RpcResponse};

use super::api::{AnswerGrader, ConfigProvider, QuestionBankClient, SubmitReply};

/// How long a call waits for its reply.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct Inflight {
    waiters: HashMap<u64, oneshot::Sender<Reply>>,
    closed: bool,
}

type SharedInflight = Arc<Mutex<Inflight>>;

/// Id-correlated calls over a single WebSocket.
pub struct RpcClient {
    outgoing: mpsc::UnboundedSender<String>,
    inflight: SharedInflight,
    next_id: AtomicU64,
    timeout: Duration,
    reader: JoinHandle<()>,
}

impl RpcClient {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let (ws_stream, _) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|source| ApiError::Connect {
                    url: url.to_string(),
                    source,
                })?;
        log::info!("Connected to question bank at {}", url);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(json) = rx.recv().await {
                if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                    log::warn!("Failed to send request: {}", e);
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let inflight = SharedInflight::default();
        let reader_inflight = Arc::clone(&inflight);
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        log::warn!("Connection error: {}", e);
                        break;
                    }
                    _ => continue,
                };

                let response: RpcResponse = match serde_json::from_str(&text) {
                    Ok(response) => response,
                    Err(e) => {
                        log::warn!("Ignoring malformed reply: {}", e);
                        continue;
                    }
                };

                let waiter = reader_inflight.lock().await.waiters.remove(&response.id);
                match waiter {
                    Some(waiter) => {
                        if waiter.send(response.reply).is_err() {
                            log::debug!("Caller for reply {} went away", response.id);
                        }
                    }
                    None => log::debug!("Discarding reply {} with no waiter", response.id),
                }
            }

            log::info!("Question bank connection closed");
            let mut inflight = reader_inflight.lock().await;
            inflight.closed = true;
            // dropping the senders fails every waiting call
            inflight.waiters.clear();
        });

        Ok(Self {
            outgoing: tx,
            inflight,
            next_id: AtomicU64::new(1),
            timeout,
            reader,
        })
    }

    /// Send `call` and wait for its reply.
    pub async fn call(&self, call: Call) -> Result<Reply, ApiError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let json = serde_json::to_string(&RpcRequest { id, call })?;

        let (tx, rx) = oneshot::channel();
        {
            let mut inflight = self.inflight.lock().await;
            if inflight.closed {
                return Err(ApiError::Disconnected);
            }
            inflight.waiters.insert(id, tx);
        }

        if self.outgoing.send(json).is_err() {
            self.inflight.lock().await.waiters.remove(&id);
            return Err(ApiError::Disconnected);
        }

        match time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ApiError::Disconnected),
            Err(_) => {
                self.inflight.lock().await.waiters.remove(&id);
                Err(ApiError::Timeout(self.timeout))
            }
        }
    }

    pub async fn fetch_config(&self) -> Result<ConfigParams, ApiError> {
        match self.call(Call::GetConfigParams).await? {
            Reply::ConfigParams { params } => Ok(ConfigParams::new(params)),
            other => Err(unexpected(other, "ConfigParams")),
        }
    }

    /// Trade a PIN for `(survey_id, access_token)`.
    pub async fn validate_pin(&self, pin: &str) -> Result<(i64, String), ApiError> {
        let call = Call::ValidatePin {
            pin: pin.to_string(),
        };
        match self.call(call).await? {
            Reply::PinAccepted {
                survey_id,
                access_token,
            } => Ok((survey_id, access_token)),
            Reply::PinRejected { reason } => Err(ApiError::Rejected(reason)),
            other => Err(unexpected(other, "PinAccepted")),
        }
    }

    pub async fn survey_exists(&self, survey_id: i64) -> Result<bool, ApiError> {
        match self.call(Call::SurveyExists { survey_id }).await? {
            Reply::SurveyStatus { exists } => Ok(exists),
            other => Err(unexpected(other, "SurveyStatus")),
        }
    }

    pub async fn validate_token(&self, survey_id: i64, access_token: &str) -> Result<bool, ApiError> {
        let call = Call::ValidateToken {
            survey_id,
            access_token: access_token.to_string(),
        };
        match self.call(call).await? {
            Reply::TokenStatus { valid } => Ok(valid),
            other => Err(unexpected(other, "TokenStatus")),
        }
    }

    pub async fn survey_data(
        &self,
        survey_id: i64,
        access_token: &str,
    ) -> Result<Vec<QuestionPayload>, ApiError> {
        let call = Call::GetSurveyData {
            survey_id,
            access_token: access_token.to_string(),
        };
        match self.call(call).await? {
            Reply::SurveyData {
                success: true,
                questions,
                ..
            } => Ok(questions),
            Reply::SurveyData { error, .. } => Err(ApiError::Rejected(
                error.unwrap_or_else(|| "survey data unavailable".to_string()),
            )),
            other => Err(unexpected(other, "SurveyData")),
        }
    }

    pub async fn submit_answer(
        &self,
        survey_id: i64,
        question_id: i64,
        answer_id: i64,
        access_token: &str,
    ) -> Result<SubmitReply, ApiError> {
        let call = Call::SubmitAnswer {
            survey_id,
            question_id,
            answer_id,
            access_token: access_token.to_string(),
        };
        match self.call(call).await? {
            Reply::SubmitResult {
                success,
                correct,
                error,
            } => {
                if let Some(error) = error {
                    log::warn!("Submission for question {} refused: {}", question_id, error);
                }
                Ok(SubmitReply { success, correct })
            }
            other => Err(unexpected(other, "SubmitResult")),
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn unexpected(reply: Reply, expected: &'static str) -> ApiError {
    match reply {
        Reply::Error { message } => ApiError::Rejected(message),
        other => {
            log::warn!("Expected {} reply, got {}", expected, other.kind());
            ApiError::UnexpectedReply { expected }
        }
    }
}

/// The question bank as seen by a quiz session.
pub struct RemoteSurvey {
    rpc: RpcClient,
}

impl RemoteSurvey {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            rpc: RpcClient::connect(url, timeout).await?,
        })
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}

#[async_trait]
impl ConfigProvider for RemoteSurvey {
    async fn fetch_config(&self) -> Result<ConfigParams, ApiError> {
        self.rpc.fetch_config().await
    }
}

#[async_trait]
impl QuestionBankClient for RemoteSurvey {
    async fn validate_token(&self, survey_id: i64, access_token: &str) -> bool {
        match self.rpc.validate_token(survey_id, access_token).await {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!("Token validation failed: {}", e);
                false
            }
        }
    }

    async fn load_questions(
        &self,
        survey_id: i64,
        access_token: &str,
    ) -> Result<Vec<Question>, ApiError> {
        let payloads = self.rpc.survey_data(survey_id, access_token).await?;
        let questions: Vec<Question> = payloads.into_iter().map(Question::from).collect();
        warn_on_integrity_defects(&questions);
        Ok(questions)
    }
}

#[async_trait]
impl AnswerGrader for RemoteSurvey {
    async fn submit_answer(
        &self,
        survey_id: i64,
        question_id: i64,
        option_id: i64,
        access_token: &str,
    ) -> Result<SubmitReply, ApiError> {
        self.rpc
            .submit_answer(survey_id, question_id, option_id, access_token)
            .await
    }
}

/// Log data defects the session tolerates. Returns how many were found.
pub fn warn_on_integrity_defects(questions: &[Question]) -> usize {
    let mut defects = 0;
    for question in questions {
        if question.options.is_empty() {
            log::warn!("Question {} has no options", question.id);
            defects += 1;
        }
        for option in &question.options {
            if option.id == OPTION_ID_SENTINEL {
                log::warn!(
                    "Question {} has an option without a valid id: {:?}",
                    question.id,
                    option.text
                );
                defects += 1;
            }
        }
    }
    defects
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tokio::net::TcpListener;

    use super::*;
    use crate::models::QuizOption;

    /// Accept one connection and answer each request with `respond`.
    /// Returning `None` leaves the request unanswered.
    async fn spawn_bank<F>(respond: F) -> String
    where
        F: Fn(Call) -> Option<Reply> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let (mut sender, mut receiver) = ws.split();
            while let Some(Ok(Message::Text(text))) = receiver.next().await {
                let request: RpcRequest = serde_json::from_str(&text).unwrap();
                if let Some(reply) = respond(request.call) {
                    let response = RpcResponse {
                        id: request.id,
                        reply,
                    };
                    let json = serde_json::to_string(&response).unwrap();
                    sender.send(Message::Text(json.into())).await.unwrap();
                }
            }
        });

        format!("ws://{}", addr)
    }

    #[tokio::test]
    async fn test_calls_are_correlated_by_id() {
        let url = spawn_bank(|call| match call {
            Call::SurveyExists { survey_id } => Some(Reply::SurveyStatus {
                exists: survey_id == 1,
            }),
            Call::GetConfigParams => Some(Reply::ConfigParams {
                params: BTreeMap::from([("timer_duration".to_string(), "20".to_string())]),
            }),
            _ => None,
        })
        .await;
        let client = RpcClient::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap();

        let (one, two, config) = tokio::join!(
            client.survey_exists(1),
            client.survey_exists(2),
            client.fetch_config()
        );
        assert!(one.unwrap());
        assert!(!two.unwrap());
        assert_eq!(config.unwrap().get("timer_duration"), Some("20"));
    }

    #[tokio::test]
    async fn test_unanswered_call_times_out() {
        let url = spawn_bank(|_| None).await;
        let client = RpcClient::connect(&url, Duration::from_millis(100))
            .await
            .unwrap();

        let result = client.survey_exists(1).await;
        assert!(matches!(result, Err(ApiError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_pin_rejection_and_error_replies() {
        let url = spawn_bank(|call| match call {
            Call::ValidatePin { .. } => Some(Reply::PinRejected {
                reason: "Unknown PIN".into(),
            }),
            _ => Some(Reply::Error {
                message: "bad frame".into(),
            }),
        })
        .await;
        let client = RpcClient::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap();

        match client.validate_pin("0000").await {
            Err(ApiError::Rejected(reason)) => assert_eq!(reason, "Unknown PIN"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            client.validate_token(1, "t").await,
            Err(ApiError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_token_collapses_errors_to_false() {
        let url = spawn_bank(|_| Some(Reply::SurveyStatus { exists: true })).await;
        let survey = RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap();

        assert!(!QuestionBankClient::validate_token(&survey, 1, "t").await);
    }

    #[tokio::test]
    async fn test_failed_survey_data_is_an_error() {
        let url = spawn_bank(|_| {
            Some(Reply::SurveyData {
                success: false,
                questions: Vec::new(),
                error: Some("Invalid token".into()),
            })
        })
        .await;
        let survey = RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap();

        let result = survey.load_questions(1, "t").await;
        assert!(matches!(result, Err(ApiError::Rejected(msg)) if msg == "Invalid token"));
    }

    #[tokio::test]
    async fn test_closed_connection_fails_calls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.close(None).await;
        });

        let client = RpcClient::connect(&format!("ws://{}", addr), DEFAULT_RPC_TIMEOUT)
            .await
            .unwrap();
        let result = client.survey_exists(1).await;
        assert!(matches!(result, Err(ApiError::Disconnected)));
    }

    #[test]
    fn test_integrity_defects_are_counted() {
        let questions = vec![
            Question::new(
                1,
                "ok",
                vec![QuizOption {
                    id: 3,
                    text: "a".into(),
                }],
            ),
            Question::new(
                2,
                "bad id",
                vec![QuizOption {
                    id: OPTION_ID_SENTINEL,
                    text: "b".into(),
                }],
            ),
            Question::new(3, "no options", Vec::new()),
        ];
        assert_eq!(warn_on_integrity_defects(&questions), 2);
    }
}
