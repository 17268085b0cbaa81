//! Test servers for the integration suites.
//!
//! [`spawn_mock`] starts a real axum server on a random port that records
//! every request and answers through a caller-supplied responder.
//! [`spawn_event_stream`] serves Server-Sent Events and reports when the
//! response body is released. [`spawn_flaky`] speaks raw TCP so tests can
//! drop connections before any HTTP response is written.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

type Responder = Arc<dyn Fn(&Recorded) -> (StatusCode, String) + Send + Sync>;

#[derive(Clone)]
struct MockState {
    log: Arc<Mutex<Vec<Recorded>>>,
    respond: Responder,
}

/// Handle to a running mock server.
pub struct MockServer {
    pub base: String,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers,
        body,
    };
    let (status, body) = (state.respond)(&recorded);
    state.log.lock().unwrap().push(recorded);
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Start a recording server on port 0 that answers with `respond`.
pub async fn spawn_mock(
    respond: impl Fn(&Recorded) -> (StatusCode, String) + Send + Sync + 'static,
) -> MockServer {
    let log = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        log: log.clone(),
        respond: Arc::new(respond),
    };
    let app = Router::new().fallback(handle).with_state(state);
    let base = serve(app).await;
    MockServer { base, log }
}

/// Start a server that always answers `200` with `body`.
pub async fn spawn_ok(body: &'static str) -> MockServer {
    spawn_mock(move |_| (StatusCode::OK, body.to_string())).await
}

/// Serve an arbitrary router on port 0 and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Sets its flag when dropped, i.e. when the server lets go of a body.
struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Handle to a running event-stream server.
pub struct EventServer {
    pub base: String,
    paths: Arc<Mutex<Vec<String>>>,
    released: Arc<AtomicBool>,
}

impl EventServer {
    /// Request paths seen so far.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    /// Wait up to `limit` for the server to drop the last response body.
    pub async fn wait_released(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if self.released.load(Ordering::SeqCst) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.released.load(Ordering::SeqCst)
    }
}

/// Serve `chunks` as an event stream; with `hold_open` the body never ends.
pub async fn spawn_event_stream(chunks: &[&str], hold_open: bool) -> EventServer {
    let chunks: Vec<String> = chunks.iter().map(|c| c.to_string()).collect();
    let paths = Arc::new(Mutex::new(Vec::new()));
    let released = Arc::new(AtomicBool::new(false));
    let (seen, flag) = (paths.clone(), released.clone());

    let app = Router::new().fallback(move |uri: Uri| {
        let chunks = chunks.clone();
        let seen = seen.clone();
        let flag = flag.clone();
        async move {
            seen.lock().unwrap().push(uri.path().to_string());
            let body = stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
            let body: BoxStream<'static, Result<String, Infallible>> = if hold_open {
                body.chain(stream::pending()).boxed()
            } else {
                body.boxed()
            };
            let guard = ReleaseFlag(flag);
            let body = body.map(move |chunk| {
                let _held = &guard;
                chunk
            });
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(body),
            )
        }
    });
    let base = serve(app).await;
    EventServer {
        base,
        paths,
        released,
    }
}

/// A base URL nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Raw TCP server that drops the first `drop_first` connections without a
/// response, then answers every request with `200` and `body`.
pub async fn spawn_flaky(drop_first: usize, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < drop_first {
                drop(socket);
                continue;
            }
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (format!("http://{addr}"), accepted)
}

/// Consume one HTTP/1.1 request (headers plus `content-length` body).
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut buf).await else {
            return;
        };
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                return;
            }
        }
    }
}
