use std::future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};
use tokio::time;

use quiz_runner::client::api::Collaborators;
use quiz_runner::client::rpc::{DEFAULT_RPC_TIMEOUT, RemoteSurvey};
use quiz_runner::client::{self, Phase, PlayOptions, SessionLaunch, SessionState};
use quiz_runner::config::{ConfigParams, SessionTuning};
use quiz_runner::data::load_bank_from_json;
use quiz_runner::protocol::Call;
use quiz_runner::server::{self, AttemptStatus, BankState, SharedState};

const DEMO_BANK: &str = "demos/quiz_bank.json";

async fn start_server() -> (String, SharedState) {
    let bank = load_bank_from_json(Path::new(env!("CARGO_MANIFEST_DIR")).join(DEMO_BANK)).unwrap();

    let tuning = SessionTuning {
        timer_duration_secs: 1,
        answer_advance_delay: Duration::from_millis(100),
        timeout_advance_delay: Duration::from_millis(100),
    };
    let mut params = ConfigParams::defaults();
    tuning.write_into(&mut params);

    let state = Arc::new(Mutex::new(BankState::new(bank, params)));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Arc::clone(&state), future::pending()));

    (format!("ws://{}", addr), state)
}

fn play_options(url: &str, pin: &str) -> PlayOptions {
    let port = url.rsplit(':').next().unwrap().parse().unwrap();
    PlayOptions {
        host: "127.0.0.1".to_string(),
        port,
        pin: Some(pin.to_string()),
        survey_id: None,
        access_token: None,
        rpc_timeout: DEFAULT_RPC_TIMEOUT,
    }
}

async fn wait_until(
    rx: &mut watch::Receiver<SessionState>,
    predicate: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    let state = time::timeout(Duration::from_secs(10), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session")
        .expect("session ended early")
        .clone();
    state
}

fn on_question(index: usize) -> impl FnMut(&SessionState) -> bool {
    move |s| s.phase == Phase::InQuestion && s.current_index == index
}

fn settled(index: usize) -> impl FnMut(&SessionState) -> bool {
    move |s| s.phase == Phase::AwaitingAdvance && s.current_index == index
}

#[tokio::test]
async fn test_full_quiz_over_websocket() {
    let (url, bank) = start_server().await;
    let options = play_options(&url, "4321");
    let remote = Arc::new(RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap());
    let launch = client::resolve_launch(remote.rpc(), &options).await.unwrap();
    assert_eq!(launch.survey_id, 1);
    assert!(launch.survey_exists);
    let token = launch.access_token.clone().unwrap();

    let handle = client::mount(launch, Collaborators::from_backend(remote));
    let mut rx = handle.subscribe();

    let state = wait_until(&mut rx, on_question(0)).await;
    assert_eq!(state.total_questions(), 4);
    assert_eq!(state.timer_duration_secs, 1);
    handle.select_option(7);
    let state = wait_until(&mut rx, settled(0)).await;
    assert_eq!(state.questions[0].correct, Some(true));
    assert_eq!(
        state.visible_explanation(),
        Some("Bindings made with let are immutable unless marked mut.")
    );

    wait_until(&mut rx, on_question(1)).await;
    handle.select_option(10);
    let state = wait_until(&mut rx, settled(1)).await;
    assert_eq!(state.questions[1].correct, Some(false));

    // let the third question run out
    wait_until(&mut rx, on_question(2)).await;
    let state = wait_until(&mut rx, settled(2)).await;
    assert!(state.questions[2].skipped);
    assert_eq!(state.time_left, 0);

    wait_until(&mut rx, on_question(3)).await;
    handle.select_option(18);

    let state = time::timeout(Duration::from_secs(10), handle.join())
        .await
        .unwrap();
    assert_eq!(state.phase, Phase::Finished);
    assert_eq!(state.answered_count(), 3);
    assert!(state.timers.is_idle());

    let bank = bank.lock().await;
    let attempt = bank.attempt(&token).unwrap();
    assert_eq!(attempt.answers.len(), 3);
    assert_eq!(attempt.correct, 2);
    assert_eq!(attempt.status, AttemptStatus::InProgress);
}

#[tokio::test]
async fn test_unknown_token_ends_in_token_invalid() {
    let (url, _bank) = start_server().await;
    let remote = Arc::new(RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap());

    let handle = client::mount(
        SessionLaunch {
            survey_id: 1,
            access_token: Some("not-a-token".to_string()),
            survey_exists: true,
        },
        Collaborators::from_backend(remote),
    );
    let state = time::timeout(Duration::from_secs(10), handle.join())
        .await
        .unwrap();

    assert_eq!(state.phase, Phase::TokenInvalid);
    assert!(state.questions.is_empty());
}

#[tokio::test]
async fn test_empty_survey_has_no_questions() {
    let (url, _bank) = start_server().await;
    let remote = Arc::new(RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap());
    let launch = client::resolve_launch(remote.rpc(), &play_options(&url, "0000"))
        .await
        .unwrap();

    let handle = client::mount(launch, Collaborators::from_backend(remote));
    let state = time::timeout(Duration::from_secs(10), handle.join())
        .await
        .unwrap();
    assert_eq!(state.phase, Phase::NoQuestions);
}

#[tokio::test]
async fn test_missing_survey_and_bad_pin() {
    let (url, _bank) = start_server().await;
    let remote = Arc::new(RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap());

    assert!(client::resolve_launch(remote.rpc(), &play_options(&url, "9999"))
        .await
        .is_err());

    let mut options = play_options(&url, "");
    options.pin = None;
    options.survey_id = Some(99);
    let launch = client::resolve_launch(remote.rpc(), &options).await.unwrap();
    assert!(!launch.survey_exists);

    let handle = client::mount(launch, Collaborators::from_backend(remote));
    let state = time::timeout(Duration::from_secs(10), handle.join())
        .await
        .unwrap();
    assert_eq!(state.phase, Phase::SurveyMissing);
    assert_eq!(
        state.last_feedback.map(|f| f.text),
        Some("Oops! The quiz with ID 99 does not exist.".to_string())
    );
}

#[tokio::test]
async fn test_second_answer_repeats_the_first_grade() {
    let (url, bank) = start_server().await;
    let remote = RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap();
    let rpc = remote.rpc();
    let (survey_id, token) = rpc.validate_pin("4321").await.unwrap();

    let first = rpc.submit_answer(survey_id, 102, 11, &token).await.unwrap();
    assert!(first.success && first.correct);

    let second = rpc.submit_answer(survey_id, 102, 10, &token).await.unwrap();
    assert!(second.success && second.correct);

    let unknown = rpc.submit_answer(survey_id, 102, 999, &token).await.unwrap();
    assert!(!unknown.success);

    let bank = bank.lock().await;
    let attempt = bank.attempt(&token).unwrap();
    assert_eq!(attempt.answers[&102].option_id, 11);
    assert_eq!(attempt.correct, 1);
}

#[tokio::test]
async fn test_session_advances_when_first_reply_was_lost() {
    let (url, bank) = start_server().await;
    let remote = Arc::new(RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap());
    let (survey_id, token) = remote.rpc().validate_pin("4321").await.unwrap();

    // recorded by the server, but the session never saw the reply
    let recorded = remote
        .rpc()
        .submit_answer(survey_id, 101, 8, &token)
        .await
        .unwrap();
    assert!(recorded.success && !recorded.correct);

    let handle = client::mount(
        SessionLaunch {
            survey_id,
            access_token: Some(token.clone()),
            survey_exists: true,
        },
        Collaborators::from_backend(remote),
    );
    let mut rx = handle.subscribe();

    wait_until(&mut rx, on_question(0)).await;
    handle.select_option(7);
    let state = wait_until(&mut rx, settled(0)).await;
    assert!(state.questions[0].answered);
    assert_eq!(state.questions[0].correct, Some(false));

    wait_until(&mut rx, on_question(1)).await;
    handle.unmount().await;

    let bank = bank.lock().await;
    let attempt = bank.attempt(&token).unwrap();
    assert_eq!(attempt.answers.len(), 1);
    assert_eq!(attempt.answers[&101].option_id, 8);
}

#[tokio::test]
async fn test_config_params_carry_tunables() {
    let (url, _bank) = start_server().await;
    let remote = RemoteSurvey::connect(&url, DEFAULT_RPC_TIMEOUT).await.unwrap();

    let params = remote.rpc().fetch_config().await.unwrap();
    assert_eq!(SessionTuning::from_params(&params).timer_duration_secs, 1);
    assert_eq!(params.text("quiz_finished"), "End of the quiz");

    let reply = remote.rpc().call(Call::SurveyExists { survey_id: 2 }).await.unwrap();
    assert_eq!(
        reply,
        quiz_runner::protocol::Reply::SurveyStatus { exists: true }
    );
}
