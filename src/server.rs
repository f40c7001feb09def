//! Live-sync server: a request/response channel serving full document
//! snapshots, and a push channel broadcasting incremental diffs to any
//! number of connected viewers.
//!
//! The workbook is shared mutable state behind one mutex: caller edits, the
//! snapshot channel's reads, and the update cycle's dirty scan-and-clear all
//! take the same lock, so diffs are never lost or duplicated and every
//! serialization sees one fully-resolved grid state. Broadcasts fan out over
//! a bounded bus; a slow or dead viewer is dropped without affecting the
//! others.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::error::{EvalError, ServerError};
use crate::proto::{CellPatch, PatchStyle, PushMessage, ReloadHandle};
use crate::workbook::Workbook;

/// A viewer that cannot accept a frame within this window is dropped so the
/// broadcast never stalls behind one dead connection.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Broadcast bus depth. A viewer that falls further behind than this is
/// told to reload instead of replaying the backlog.
const BUS_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Snapshot channel port; the push channel binds this plus one.
    pub port: u16,
    /// Optional file whose contents are appended to served documents,
    /// re-read on every request.
    pub include_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 7000,
            include_file: None,
        }
    }
}

/// Exposes a workbook to browser viewers and keeps them synchronized.
///
/// Created detached; [`SyncServer::start`] binds both channels. The server
/// observes the workbook, it does not own it: the caller keeps its own
/// `Arc` and drives updates by invoking [`SyncServer::update`] after
/// mutations.
pub struct SyncServer {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

struct Shared {
    workbook: Arc<Mutex<Workbook>>,
    scroll: Mutex<(i64, i64)>,
    include_file: Mutex<Option<PathBuf>>,
    bus: broadcast::Sender<PushMessage>,
    bind_addr: String,
    port: u16,
    shutdown_rx: watch::Receiver<bool>,
}

impl SyncServer {
    /// Wrap a workbook. The workbook is bound to this server's reload
    /// notifier immediately, so structural changes broadcast even before
    /// the listeners are up.
    pub fn new(workbook: Arc<Mutex<Workbook>>, config: ServerConfig) -> Self {
        let (bus, _) = broadcast::channel(BUS_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            workbook,
            scroll: Mutex::new((0, 0)),
            include_file: Mutex::new(config.include_file),
            bus,
            bind_addr: config.bind_addr,
            port: config.port,
            shutdown_rx,
        });
        shared
            .workbook
            .lock()
            .unwrap()
            .attach(ReloadHandle::new(shared.bus.clone()));
        SyncServer {
            shared,
            tasks: Mutex::new(Vec::new()),
            shutdown,
        }
    }

    /// Bind and serve both channels. Binds happen before anything is
    /// spawned: a port conflict aborts startup reporting which channel
    /// failed.
    pub async fn start(&self) -> Result<(), ServerError> {
        let http_addr = format!("{}:{}", self.shared.bind_addr, self.shared.port);
        let push_addr = format!("{}:{}", self.shared.bind_addr, self.shared.port + 1);

        let http_listener = TcpListener::bind(&http_addr)
            .await
            .map_err(|source| ServerError::Bind {
                channel: "http",
                source,
            })?;
        let push_listener = TcpListener::bind(&push_addr)
            .await
            .map_err(|source| ServerError::Bind {
                channel: "push",
                source,
            })?;

        log::info!(
            "serving snapshots on http://{} and diffs on ws://{}",
            http_addr,
            push_addr
        );

        let http_app = http_router(self.shared.clone());
        let push_app = push_router(self.shared.clone());

        let http_task = tokio::spawn(async move {
            if let Err(err) = axum::serve(http_listener, http_app).await {
                log::error!("http channel failed: {}", err);
            }
        });
        let push_task = tokio::spawn(async move {
            if let Err(err) = axum::serve(push_listener, push_app).await {
                log::error!("push channel failed: {}", err);
            }
        });

        self.tasks
            .lock()
            .unwrap()
            .extend([http_task, push_task]);
        Ok(())
    }

    /// Scan the primary sheet for dirty cells, clear their flags, and
    /// broadcast one `update` batch if any qualified. Computed cells are
    /// always dirty, so they appear in every cycle. Returns the number of
    /// cells broadcast.
    ///
    /// Caller-driven: nothing schedules this; liveness depends on the
    /// application invoking it after mutations.
    pub fn update(&self) -> Result<usize, EvalError> {
        let mut cells = Vec::new();
        {
            let mut workbook = self.shared.workbook.lock().unwrap();
            let grid = match workbook.sheets_mut().first_mut() {
                Some(sheet) => &mut sheet.grid,
                None => return Ok(0),
            };
            for x in 0..grid.width() {
                for y in 0..grid.height() {
                    if !grid.cell(x, y).is_dirty() {
                        continue;
                    }
                    let value = grid.value_at(x, y)?;
                    let style = &grid.cell(x, y).style;
                    cells.push(CellPatch {
                        x,
                        y,
                        value,
                        style: PatchStyle {
                            bg: style.background.clone(),
                            color: style.color.clone(),
                        },
                    });
                }
            }
            // clear only after the whole batch was captured, so an eval
            // error cannot eat half a diff
            for patch in &cells {
                grid.cell_mut(patch.x, patch.y).clear_dirty();
            }
        }

        let count = cells.len();
        if count > 0 {
            log::debug!("broadcasting update batch of {} cells", count);
            let _ = self.shared.bus.send(PushMessage::Update { cells });
        }
        Ok(count)
    }

    /// Record the scroll cursor and align every viewer to it.
    pub fn set_client_scroll(&self, x: i64, y: i64) {
        *self.shared.scroll.lock().unwrap() = (x, y);
        let _ = self.shared.bus.send(PushMessage::Scroll { x, y });
    }

    /// Tell every viewer to discard local state and re-fetch the document.
    pub fn reload(&self) {
        let _ = self.shared.bus.send(PushMessage::Reload);
    }

    /// Configure (or replace) the include file appended to served documents.
    pub fn set_include_file(&self, path: impl Into<PathBuf>) {
        *self.shared.include_file.lock().unwrap() = Some(path.into());
    }

    /// Observe the push stream in-process, exactly as a connected viewer
    /// would after its full snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.shared.bus.subscribe()
    }

    /// The message a viewer connecting right now would receive first: the
    /// freshly serialized document plus the current scroll cursor.
    pub fn snapshot(&self) -> Result<PushMessage, EvalError> {
        full_message(&self.shared)
    }

    pub fn viewer_count(&self) -> usize {
        self.shared.bus.receiver_count()
    }

    /// Terminate listeners and all viewer connections. Idempotent, and runs
    /// automatically when the server is dropped.
    pub fn stop(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        log::info!("sync server stopping");
        let mut tasks = self.tasks.lock().unwrap();
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SyncServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn http_router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/", get(fetch_document))
        .route("/index.html", get(fetch_document))
        .with_state(shared)
}

fn push_router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/", get(viewer_connect))
        .with_state(shared)
}

/// Serve a freshly serialized document. Never cached: every request sees
/// current grid state.
async fn fetch_document(State(shared): State<Arc<Shared>>) -> Response {
    match build_document(&shared) {
        Ok(doc) => Html(doc).into_response(),
        Err(err) => {
            log::error!("document serialization failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "serialization failed").into_response()
        }
    }
}

fn build_document(shared: &Shared) -> Result<String, EvalError> {
    let mut doc = {
        let workbook = shared.workbook.lock().unwrap();
        workbook.serialize()?
    };
    let include = shared.include_file.lock().unwrap().clone();
    if let Some(path) = include {
        match std::fs::read_to_string(&path) {
            Ok(extra) => doc.push_str(&extra),
            // a missing include file means "no supplemental content"
            Err(_) => log::debug!("include file {} not readable, skipping", path.display()),
        }
    }
    doc.push_str(&client_script(shared.port + 1));
    Ok(doc)
}

fn full_message(shared: &Shared) -> Result<PushMessage, EvalError> {
    let html = shared.workbook.lock().unwrap().serialize()?;
    let scroll = *shared.scroll.lock().unwrap();
    Ok(PushMessage::Full { html, scroll })
}

async fn viewer_connect(ws: WebSocketUpgrade, State(shared): State<Arc<Shared>>) -> Response {
    ws.on_upgrade(move |socket| viewer_session(socket, shared))
}

/// One connected viewer: full snapshot on entry, then broadcast forwarding
/// until the viewer dies, lags out, or the server stops. Dropping out of
/// this function unsubscribes the viewer; nothing here can fail the server.
async fn viewer_session(mut socket: WebSocket, shared: Arc<Shared>) {
    let mut bus = shared.bus.subscribe();
    let mut shutdown = shared.shutdown_rx.clone();
    if *shutdown.borrow() {
        return;
    }

    // the guaranteed baseline: a late-joining viewer never needs diffs it
    // was not connected for
    let full = match full_message(&shared) {
        Ok(msg) => msg,
        Err(err) => {
            log::error!("dropping viewer, full snapshot failed: {}", err);
            return;
        }
    };
    if send_to_viewer(&mut socket, &full).await.is_err() {
        return;
    }
    log::info!("viewer subscribed ({} receivers)", shared.bus.receiver_count());

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            received = bus.recv() => match received {
                Ok(msg) => {
                    if send_to_viewer(&mut socket, &msg).await.is_err() {
                        log::warn!("dropping unresponsive viewer");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("viewer lagged {} messages, forcing reload", skipped);
                    if send_to_viewer(&mut socket, &PushMessage::Reload).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    log::info!("viewer disconnected");
}

async fn send_to_viewer(socket: &mut WebSocket, msg: &PushMessage) -> Result<(), ()> {
    let text = serde_json::to_string(msg).map_err(|_| ())?;
    match tokio::time::timeout(SEND_TIMEOUT, socket.send(Message::Text(text))).await {
        Ok(Ok(())) => Ok(()),
        _ => Err(()),
    }
}

/// The browser side of the push channel, appended to every served document.
/// `__PUSH_PORT__` is interpolated at request time.
const WS_CLIENT_SCRIPT: &str = r#"
<script>
let ws = new WebSocket(`ws://${location.hostname}:__PUSH_PORT__`);
ws.onmessage = msg => {
    let data = JSON.parse(msg.data);
    if (data.type === "update") {
        data.cells.forEach(cell => {
            let el = document.querySelector(`td[x="${cell.x}"][y="${cell.y}"]`);
            if (el) {
                el.textContent = cell.value === null ? "" : cell.value;
                el.style.background = cell.style.bg;
                el.style.color = cell.style.color;
            }
        });
    } else if (data.type === "reload") {
        location.reload();
    } else if (data.type === "scroll") {
        document.querySelectorAll(".TBC").forEach(e => {
            e.scrollLeft = data.x;
            e.scrollTop = data.y;
        });
    }
};
</script>
"#;

fn client_script(push_port: u16) -> String {
    WS_CLIENT_SCRIPT.replace("__PUSH_PORT__", &push_port.to_string())
}
