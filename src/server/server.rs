//! WebSocket server implementation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt, future};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;

use crate::config::{ConfigParams, SessionTuning};
use crate::data::load_bank_from_json;
use crate::error::QuizError;
use crate::protocol::{Reply, RpcRequest, RpcResponse};

use super::state::BankState;

/// Shared bank state wrapped in Arc<Mutex> for async access.
pub type SharedState = Arc<Mutex<BankState>>;

/// What the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: u16,
    pub bank_path: PathBuf,
    pub tuning: SessionTuning,
}

impl ServerSettings {
    /// Config served to players: every text default plus the tunables.
    pub fn params(&self) -> ConfigParams {
        let mut params = ConfigParams::defaults();
        self.tuning.write_into(&mut params);
        params
    }
}

/// Run the question-bank server until Ctrl-C.
pub async fn run(settings: ServerSettings) -> Result<(), QuizError> {
    let bank = load_bank_from_json(&settings.bank_path)?;
    let state = Arc::new(Mutex::new(BankState::new(bank, settings.params())));

    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    log::info!("Server listening on {}", listener.local_addr()?);

    serve(listener, state, shutdown_signal()).await;
    Ok(())
}

/// Accept connections on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(stream, addr, Arc::clone(&state)));
                }
                Err(e) => log::warn!("Failed to accept connection: {}", e),
            },
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        future::pending::<()>().await;
    }
}

/// Serve calls from one WebSocket connection.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: SharedState) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            log::warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    log::info!("Player connected from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<RpcResponse>();

    let send_task = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            let json = match serde_json::to_string(&response) {
                Ok(json) => json,
                Err(e) => {
                    log::error!("Failed to encode reply {}: {}", response.id, e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                log::debug!("Connection error from {}: {}", addr, e);
                break;
            }
            _ => continue,
        };

        let Some(response) = respond(&text, &state).await else {
            continue;
        };
        if tx.send(response).is_err() {
            break;
        }
    }

    log::info!("Player {} disconnected", addr);
    drop(tx);
    let _ = send_task.await;
}

/// Reply to one frame. Frames without a usable id get no reply.
async fn respond(text: &str, state: &SharedState) -> Option<RpcResponse> {
    match serde_json::from_str::<RpcRequest>(text) {
        Ok(request) => {
            log::debug!("Call {}: {:?}", request.id, request.call);
            let reply = state.lock().await.handle(request.call);
            Some(RpcResponse {
                id: request.id,
                reply,
            })
        }
        Err(e) => {
            let id = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|value| value.get("id")?.as_u64());
            match id {
                Some(id) => {
                    log::warn!("Unknown call {}: {}", id, e);
                    Some(RpcResponse {
                        id,
                        reply: Reply::Error {
                            message: e.to_string(),
                        },
                    })
                }
                None => {
                    log::warn!("Ignoring malformed frame: {}", e);
                    None
                }
            }
        }
    }
}
