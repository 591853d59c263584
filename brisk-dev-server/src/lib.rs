use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Request, State},
    http::{StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

const LIVERELOAD_PATH: &str = "/__livereload";
const RELOAD_MESSAGE: &str = "reload";

/// Configuration for the development server
#[derive(Debug, Clone)]
pub struct LiveServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to serve on
    pub port: u16,
    /// Build output directory to serve
    pub root: PathBuf,
    /// Auto-open browser
    pub open: bool,
    /// Inject the reload script into HTML and accept reload sockets
    pub live_reload: bool,
}

impl Default for LiveServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            root: PathBuf::from("build"),
            open: false,
            live_reload: false,
        }
    }
}

/// Tells connected browsers to reload.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: broadcast::Sender<String>,
}

impl ReloadHandle {
    /// Returns how many browsers were notified.
    pub fn reload(&self) -> usize {
        self.tx.send(RELOAD_MESSAGE.to_string()).unwrap_or(0)
    }
}

/// Static file server for a build directory.
///
/// `/` serves `index.html` and `/about` falls back to `about.html`. With
/// live reload on, every HTML response carries a small script that reloads
/// the page when [`ReloadHandle::reload`] is called.
pub struct LiveServer {
    config: LiveServerConfig,
    reload_tx: broadcast::Sender<String>,
}

impl LiveServer {
    pub fn new(config: LiveServerConfig) -> Self {
        let (reload_tx, _) = broadcast::channel::<String>(16);
        Self { config, reload_tx }
    }

    pub fn reload_handle(&self) -> ReloadHandle {
        ReloadHandle {
            tx: self.reload_tx.clone(),
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            root: Arc::new(self.config.root.clone()),
            reload_tx: self.reload_tx.clone(),
        };

        let mut app = Router::new();
        if self.config.live_reload {
            app = app.route(LIVERELOAD_PATH, get(websocket_handler));
        }
        let mut app = app.fallback_service(ServeDir::new(&self.config.root));
        if self.config.live_reload {
            app = app.layer(middleware::from_fn(inject_reload));
        }

        app.layer(middleware::from_fn_with_state(state.clone(), clean_urls))
            .with_state(state)
    }

    pub async fn run(self) -> Result<()> {
        if !self.config.root.exists() {
            return Err(anyhow::anyhow!(
                "Root directory does not exist: {}",
                self.config.root.display()
            ));
        }

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let app = self.router();

        println!("Serving {} at http://{}", self.config.root.display(), addr);
        if self.config.live_reload {
            println!("Live reload enabled at ws://{}{}", addr, LIVERELOAD_PATH);
        }

        if self.config.open {
            if let Err(e) = open::that(format!("http://{}", addr)) {
                warn!(error = %e, "failed to open browser");
            }
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    root: Arc<PathBuf>,
    reload_tx: broadcast::Sender<String>,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket_connection(socket, state.reload_tx))
}

async fn websocket_connection(mut socket: WebSocket, reload_tx: broadcast::Sender<String>) {
    let mut rx = reload_tx.subscribe();

    if socket
        .send(Message::Text("connected".into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Ok(reload_msg) => {
                        if socket.send(Message::Text(reload_msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            msg = socket.recv() => {
                if msg.is_none() {
                    break;
                }
            }
        }
    }
}

/// Serve `<path>.html` for an extension-less request when that file exists.
async fn clean_urls(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(target) = html_fallback(&state.root, req.uri().path()) {
        let rewritten = match req.uri().query() {
            Some(query) => format!("{target}?{query}"),
            None => target,
        };
        if let Ok(uri) = rewritten.parse::<Uri>() {
            debug!(from = %req.uri(), to = %uri, "rewrote clean url");
            *req.uri_mut() = uri;
        }
    }

    next.run(req).await
}

fn html_fallback(root: &Path, path: &str) -> Option<String> {
    if path.ends_with('/') || path.contains("..") {
        return None;
    }
    let last = path.rsplit('/').next()?;
    if last.is_empty() || last.contains('.') {
        return None;
    }

    let candidate = root.join(format!("{}.html", path.trim_start_matches('/')));
    candidate.is_file().then(|| format!("{path}.html"))
}

async fn inject_reload(req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let Ok(bytes) = to_bytes(body, usize::MAX).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let html = inject_livereload_script(&String::from_utf8_lossy(&bytes));

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Inject live reload script into HTML content
pub fn inject_livereload_script(html: &str) -> String {
    let script = format!(
        r#"
<script>
(function() {{
    const socket = new WebSocket('ws://' + location.host + '{LIVERELOAD_PATH}');
    socket.onmessage = function(event) {{
        if (event.data === '{RELOAD_MESSAGE}') {{
            location.reload();
        }}
    }};
    socket.onclose = function() {{
        console.log('Live reload disconnected');
    }};
}})();
</script>
"#
    );

    // Try to inject before closing body tag, or at the end if not found
    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script.len());
        result.push_str(&html[..pos]);
        result.push_str(&script);
        result.push_str(&html[pos..]);
        result
    } else {
        format!("{}{}", html, script)
    }
}
