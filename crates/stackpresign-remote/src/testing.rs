//! A local HTTP endpoint that serves objects the way S3 does, for tests.
//!
//! Objects are addressed path-style (`/<bucket>/<key>`). A request counts as
//! signed when it carries an `X-Amz-Signature` query parameter (presigned URL)
//! or a SigV4 `Authorization` header (SDK call). Unsigned requests get 403, and
//! so do missing keys, which is what S3 answers when the caller lacks
//! `s3:ListBucket`. Errors carry the XML body S3 sends.

use crate::S3Config;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

type Objects = Arc<Mutex<HashMap<String, Vec<u8>>>>;
type Statuses = Arc<Mutex<HashMap<String, u16>>>;

pub struct MockS3 {
    /// Base URL to use as the S3 endpoint, e.g. `http://127.0.0.1:41234`.
    pub endpoint: String,
    objects: Objects,
    statuses: Statuses,
    requests: Arc<Mutex<Vec<String>>>,
    authorized: Arc<AtomicUsize>,
    server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl MockS3 {
    /// Start a server on `127.0.0.1:0` in a background thread.
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("failed to bind mock S3"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let endpoint = format!("http://127.0.0.1:{port}");

        let objects: Objects = Arc::default();
        let statuses: Statuses = Arc::default();
        let requests: Arc<Mutex<Vec<String>>> = Arc::default();
        let authorized: Arc<AtomicUsize> = Arc::default();

        let srv = Arc::clone(&server);
        let (objs, stats, reqs, auth) = (
            Arc::clone(&objects),
            Arc::clone(&statuses),
            Arc::clone(&requests),
            Arc::clone(&authorized),
        );
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                let url = request.url().to_owned();
                reqs.lock().expect("requests lock poisoned").push(url.clone());

                let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
                let object_id = percent_decode(path.trim_start_matches('/'));

                let has_auth_header = has_sigv4_header(&request);
                if has_auth_header {
                    auth.fetch_add(1, Ordering::SeqCst);
                }

                let response = if *request.method() != Method::Get {
                    error_response(405, "MethodNotAllowed")
                } else if !has_auth_header && !query.contains("X-Amz-Signature=") {
                    error_response(403, "AccessDenied")
                } else if let Some(&code) =
                    stats.lock().expect("statuses lock poisoned").get(&object_id)
                {
                    error_response(code, "InternalError")
                } else if let Some(data) = objs.lock().expect("objects lock poisoned").get(&object_id) {
                    Response::from_data(data.clone())
                } else {
                    error_response(403, "AccessDenied")
                };
                let _ = request.respond(response);
            }
        });

        Self {
            endpoint,
            objects,
            statuses,
            requests,
            authorized,
            server,
            _handle: handle,
        }
    }

    /// An `S3Config` pointing at this server.
    pub fn config(&self) -> S3Config {
        S3Config::default().with_endpoint(&self.endpoint)
    }

    pub fn put_object(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .expect("objects lock poisoned")
            .insert(format!("{bucket}/{key}"), data.to_vec());
    }

    /// Answer every GET for `bucket/key` with `code`.
    pub fn respond_with(&self, bucket: &str, key: &str, code: u16) {
        self.statuses
            .lock()
            .expect("statuses lock poisoned")
            .insert(format!("{bucket}/{key}"), code);
    }

    /// Request targets (path and query) received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }

    /// Requests that carried a SigV4 `Authorization` header.
    pub fn authorized_requests(&self) -> usize {
        self.authorized.load(Ordering::SeqCst)
    }
}

impl Drop for MockS3 {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

fn has_sigv4_header(request: &Request) -> bool {
    request.headers().iter().any(|h| {
        h.field.equiv("Authorization") && h.value.as_str().starts_with("AWS4-HMAC-SHA256 ")
    })
}

fn error_response(code: u16, error: &str) -> Response<Cursor<Vec<u8>>> {
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{error}</Code><Message>{error}</Message></Error>"
    );
    let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/xml"[..])
        .expect("static header is valid");
    Response::from_string(body)
        .with_status_code(StatusCode(code))
        .with_header(content_type)
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
            if let Ok(b) = u8::from_str_radix(hex, 16) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
