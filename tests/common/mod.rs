// Shared test helpers: an in-memory ModerationApi and a loopback HTTP server
// that serves canned responses and records what it was sent.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use sfwbot::lists::KnownLists;
use sfwbot::reddit::models::Submission;
use sfwbot::reddit::traits::ModerationApi;

/// Smallest byte string `infer` recognizes as a PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

pub const HTML_BYTES: &[u8] = b"<!doctype html><html><body>Removed</body></html>";

pub fn submission(fullname: &str, url: &str) -> Submission {
    Submission {
        name: fullname.to_string(),
        url: url.to_string(),
        permalink: format!(
            "/r/pics/comments/{}/a_title/",
            fullname.trim_start_matches("t3_")
        ),
        approved_by: None,
    }
}

pub fn approved(fullname: &str, moderator: &str) -> Submission {
    let mut s = submission(fullname, "");
    s.approved_by = Some(moderator.to_string());
    s
}

/// Lists backed by files inside `dir`.
pub fn lists_in(dir: &Path) -> KnownLists {
    KnownLists::load(&dir.join("quarantine.json"), &dir.join("safe.json")).unwrap()
}

/// Records every call; answers listings and lookups from fixed data.
#[derive(Default)]
pub struct FakeApi {
    /// Returned by `new_submissions`.
    pub newest: Vec<Submission>,
    /// Pool `submissions_by_fullname` answers from.
    pub known: Vec<Submission>,
    /// `mark_nsfw` fails for this full-name.
    pub fail_nsfw: Option<String>,
    pub calls: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<(String, String, String)>>,
}

impl FakeApi {
    pub fn with_newest(newest: Vec<Submission>) -> Self {
        Self {
            newest,
            ..Default::default()
        }
    }

    pub fn with_known(known: Vec<Submission>) -> Self {
        Self {
            known,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ModerationApi for FakeApi {
    async fn new_submissions(&self, subreddit: &str, limit: u32) -> Result<Vec<Submission>> {
        self.record(format!("new r/{subreddit} {limit}"));
        Ok(self.newest.iter().take(limit as usize).cloned().collect())
    }

    async fn submissions_by_fullname(&self, fullnames: &[String]) -> Result<Vec<Submission>> {
        self.record(format!("info {}", fullnames.join(",")));
        Ok(self
            .known
            .iter()
            .filter(|s| fullnames.iter().any(|f| f == &s.name))
            .cloned()
            .collect())
    }

    async fn mark_nsfw(&self, fullname: &str) -> Result<()> {
        self.record(format!("nsfw {fullname}"));
        if self.fail_nsfw.as_deref() == Some(fullname) {
            anyhow::bail!("marknsfw returned 500 Internal Server Error");
        }
        Ok(())
    }

    async fn remove(&self, fullname: &str) -> Result<()> {
        self.record(format!("remove {fullname}"));
        Ok(())
    }

    async fn message_moderators(&self, subreddit: &str, subject: &str, body: &str) -> Result<()> {
        self.record(format!("message r/{subreddit}"));
        self.messages.lock().unwrap().push((
            subreddit.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

/// A request as the loopback server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path plus query string.
    pub target: String,
    /// Header block, lowercased.
    pub headers: String,
    pub body: String,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query(&self) -> &str {
        self.target.split_once('?').map(|(_, q)| q).unwrap_or_default()
    }
}

/// A loopback HTTP/1.1 server answering each path with canned responses.
pub struct TestServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose path (query ignored) equals `path`.
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path() == path)
            .collect()
    }
}

/// Start a server with one fixed response per path; unknown paths get a 404.
pub async fn serve(routes: Vec<(&str, u16, &'static [u8])>) -> TestServer {
    serve_queued(
        routes
            .into_iter()
            .map(|(path, status, body)| (path, status, body.to_vec()))
            .collect(),
    )
    .await
}

/// Start a server where repeated entries for a path are answered in order.
/// The last response for a path keeps being served once the others are used.
/// Routes match on the path alone; the query string is ignored.
pub async fn serve_queued(routes: Vec<(&str, u16, Vec<u8>)>) -> TestServer {
    let mut queues: HashMap<String, VecDeque<(u16, Vec<u8>)>> = HashMap::new();
    for (path, status, body) in routes {
        queues
            .entry(path.to_string())
            .or_default()
            .push_back((status, body));
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let Some(request) = read_request(&mut socket).await else {
                continue;
            };

            let (status, body) = match queues.get_mut(request.path()) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap(),
                None => (404, b"not found".to_vec()),
            };
            log.lock().unwrap().push(request);

            let header = format!(
                "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(header.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    });

    TestServer {
        base_url: format!("http://{addr}"),
        requests,
    }
}

/// Read one request: the header block, then a `Content-Length` body if any.
async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut raw: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let mut first = head.lines().next().unwrap_or_default().split_whitespace();
    let method = first.next().unwrap_or_default().to_string();
    let target = first.next().unwrap_or("/").to_string();
    let headers = head.to_lowercase();

    let content_length: usize = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    while raw.len() < head_end + content_length {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    }
    let body = String::from_utf8_lossy(&raw[head_end..]).to_string();

    Some(Recorded {
        method,
        target,
        headers,
        body,
    })
}
