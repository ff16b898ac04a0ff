//! WebSocket Handler
//!
//! Each text frame from the client is a synthesis request with the same
//! body as `POST /api/tts`. The reply is a sequence of stream messages
//! ending in `complete` or an error. Requests on one connection run one
//! at a time: frames that arrive while a stream is running are held and
//! served after its terminal message. Closing the socket mid-stream stops
//! synthesis before the next chunk.

use std::collections::VecDeque;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};

use tts_gateway_core::AudioEncoding;

use crate::messages::StreamMessage;
use crate::metrics;
use crate::request::JobInput;
use crate::state::AppState;

/// Frames held while a stream is running. Past this the client is
/// flooding and the connection is dropped.
const MAX_QUEUED_FRAMES: usize = 16;

/// WebSocket handler
pub struct WebSocketHandler;

impl WebSocketHandler {
    /// Handle WebSocket upgrade
    pub async fn handle(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
        ws.on_upgrade(move |socket| Self::handle_socket(socket, state))
    }

    async fn handle_socket(socket: WebSocket, state: AppState) {
        let (mut sender, mut receiver) = socket.split();
        tracing::debug!("WebSocket connected");

        serve_connection(&state, &mut sender, &mut receiver).await;

        tracing::debug!("WebSocket disconnected");
    }
}

/// Serve requests from one connection until it closes
pub(crate) async fn serve_connection<S, R>(state: &AppState, sender: &mut S, receiver: &mut R)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let mut queued: VecDeque<Message> = VecDeque::new();

    loop {
        let msg = match queued.pop_front() {
            Some(msg) => msg,
            None => match receiver.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
                None => break,
            },
        };

        let keep_open = match msg {
            Message::Text(text) => run_request(state, &text, sender, receiver, &mut queued).await,
            Message::Binary(_) => {
                send(sender, &StreamMessage::error("Binary frames are not supported")).await
            }
            Message::Close(_) => false,
            _ => true,
        };
        if !keep_open {
            break;
        }
    }
}

/// Serve one request. Returns `false` once the connection is gone.
async fn run_request<S, R>(
    state: &AppState,
    text: &str,
    sender: &mut S,
    receiver: &mut R,
    queued: &mut VecDeque<Message>,
) -> bool
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    metrics::record_request("ws");
    let start = Instant::now();

    let input: JobInput = match serde_json::from_str(text) {
        Ok(input) => input,
        Err(e) => {
            metrics::record_error("validation");
            let msg = StreamMessage::error(format!("Invalid request: {}", e));
            return send(sender, &msg).await;
        }
    };

    let job = match input.into_job(&state.config, &state.voice_prompts) {
        Ok(job) => job,
        Err(e) => {
            metrics::record_error(e.error_type());
            return send(sender, &StreamMessage::error(e.to_string())).await;
        }
    };

    let encoding = job.output_format.parse().unwrap_or(AudioEncoding::Pcm16);
    let session_id = job.session_id.clone();
    let mut events = state
        .orchestrator
        .stream(job.text, job.params, &job.output_format);

    loop {
        tokio::select! {
            event = events.next_event() => {
                let Some(event) = event else { return true };
                let msg = StreamMessage::from_event(event, encoding);
                let terminal = msg.is_terminal();

                if let StreamMessage::Error(_) = &msg {
                    metrics::record_error("synthesis");
                }
                if !send(sender, &msg).await {
                    tracing::info!(session_id = %session_id, "Client went away mid-stream");
                    return false;
                }
                if terminal {
                    metrics::record_request_latency("ws", start.elapsed().as_secs_f64());
                    return true;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        // Dropping `events` stops the producer
                        tracing::info!(session_id = %session_id, "Client closed mid-stream");
                        return false;
                    }
                    Some(Ok(msg @ (Message::Text(_) | Message::Binary(_)))) => {
                        if queued.len() >= MAX_QUEUED_FRAMES {
                            tracing::warn!(session_id = %session_id, "Too many queued requests; closing");
                            return false;
                        }
                        queued.push_back(msg);
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

async fn send<S>(sender: &mut S, msg: &StreamMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    sender.send(Message::Text(msg.to_json())).await.is_ok()
}
