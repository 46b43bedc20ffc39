use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use hide_tag_server::constants::TICK_MS;
use hide_tag_server::protocol::{parse_client_message, ParsedClientMessage};
use hide_tag_server::session::{GameSession, Outbound, Recipient};
use rand::Rng as _;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Maze seed; drawn at random when omitted.
    #[arg(long)]
    seed: Option<u32>,
    /// Static asset directory served to browsers.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    session: GameSession,
}

impl ServerState {
    fn new(seed: u32) -> Self {
        Self {
            clients: HashMap::new(),
            session: GameSession::new(seed),
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());
    log::info!("maze seed: {seed}");

    let state = Arc::new(Mutex::new(ServerState::new(seed)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir(cli.static_dir) {
        log::info!("static file root: {}", static_dir.to_string_lossy());
        let index_file = static_dir.join("index.html");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        log::warn!("static file root not found; serving the websocket endpoint only");
        app
    };

    let bind_addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    log::info!("listening on :{}", cli.port);
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir(requested: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = requested {
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("public"), PathBuf::from("../public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("player");

    let (tx, mut rx) = mpsc::channel::<String>(256);
    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(client_id.clone(), ClientContext { tx: tx.clone() });
    }
    log::debug!("{client_id} connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(&state, &client_id, text).await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        drop_client(&mut guard, &client_id);
    }
    log::debug!("{client_id} disconnected");
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        log::debug!("dropping unparseable frame from {client_id}");
        return;
    };

    let mut guard = state.lock().await;
    let (events, broadcast_policy) = match message {
        ParsedClientMessage::Join { avatar } => (
            guard.session.join(client_id, avatar.as_deref()),
            QueuePolicy::DisconnectOnFull,
        ),
        ParsedClientMessage::Move { dir } => (
            guard.session.handle_move(client_id, dir),
            QueuePolicy::DropOnFull,
        ),
    };
    dispatch(&mut guard, events, broadcast_policy);
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            let events = guard.session.step(TICK_MS);
            dispatch(&mut guard, events, QueuePolicy::DropOnFull);
        }
    });
}

/// Delivers addressed session events. Targeted events always disconnect a
/// client whose queue is full; the policy only varies for broadcasts.
fn dispatch(state: &mut ServerState, events: Vec<Outbound>, broadcast_policy: QueuePolicy) {
    for outbound in events {
        let Ok(payload) = serde_json::to_string(&outbound.event) else {
            continue;
        };
        match outbound.to {
            Recipient::Player(id) => {
                send_to_client(state, &id, &payload, QueuePolicy::DisconnectOnFull);
            }
            Recipient::Broadcast { except } => {
                let client_ids: Vec<String> = state
                    .clients
                    .keys()
                    .filter(|id| !except.iter().any(|skip| skip == *id))
                    .cloned()
                    .collect();
                for id in client_ids {
                    send_to_client(state, &id, &payload, broadcast_policy);
                }
            }
        }
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, payload: &str, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client.tx.try_send(payload.to_string()).is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        log::warn!("{client_id} outbound queue full, dropping connection");
        drop_client(state, client_id);
    }
}

fn drop_client(state: &mut ServerState, client_id: &str) {
    if state.clients.remove(client_id).is_none() {
        return;
    }
    let events = state.session.leave(client_id);
    dispatch(state, events, QueuePolicy::DropOnFull);
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
