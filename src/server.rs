//! HTTP boundary on `tiny_http`.
//!
//! | Method | Path                 | Operation                         |
//! |--------|----------------------|-----------------------------------|
//! | POST   | `/upload`            | [`NotesService::upload`]          |
//! | POST   | `/generate_notes`    | [`NotesService::generate_notes`]  |
//! | GET    | `/pages/{id}/{n}`    | [`NotesService::get_page`]        |
//! | GET    | `/health`            | liveness probe                    |
//!
//! Requests are handled one at a time on the accept loop; the async
//! pipeline is driven with `block_on` on a runtime owned by the server.
//! Errors are answered as `{"error": message}` with the status from
//! [`ScribbleError::status_code`].

use crate::error::ScribbleError;
use crate::pipeline::intake::Declared;
use crate::service::NotesService;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::net::SocketAddr;
use tiny_http::{Header, Method, Request, Response};
use tracing::{debug, info, warn};

/// Header carrying the original file name of an upload.
pub const FILENAME_HEADER: &str = "X-Filename";

/// A parsed request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Upload,
    GenerateNotes,
    Page { id: String, index: usize },
    Health,
    MethodNotAllowed,
    NotFound,
}

/// Map method and URL (query string ignored) to a [`Route`].
pub fn route(method: &Method, url: &str) -> Route {
    let path = url.split('?').next().unwrap_or("");
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (expected, route) = match segments.as_slice() {
        ["upload"] => (Method::Post, Route::Upload),
        ["generate_notes"] => (Method::Post, Route::GenerateNotes),
        ["health"] => (Method::Get, Route::Health),
        ["pages", id, n] => match n.parse::<usize>() {
            Ok(index) => (
                Method::Get,
                Route::Page {
                    id: (*id).to_string(),
                    index,
                },
            ),
            Err(_) => return Route::NotFound,
        },
        _ => return Route::NotFound,
    };
    if *method == expected {
        route
    } else {
        Route::MethodNotAllowed
    }
}

#[derive(Debug, Deserialize)]
struct GenerateNotesBody {
    id: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// An answer before it is turned into a `tiny_http::Response`.
#[derive(Debug)]
struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::error(500, &format!("serialisation failed: {e}")),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        let body = serde_json::to_vec(&ErrorBody { error: message })
            .unwrap_or_else(|_| br#"{"error":"internal error"}"#.to_vec());
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn from_error(e: &ScribbleError) -> Self {
        let status = e.status_code();
        if status >= 500 {
            warn!("Request failed: {}", e);
        } else {
            debug!("Rejected request: {}", e);
        }
        Self::error(status, &e.to_string())
    }

    fn png(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "image/png",
            body,
        }
    }
}

/// The HTTP server: a listener, the service and the runtime driving it.
pub struct Server {
    http: tiny_http::Server,
    service: NotesService,
    runtime: tokio::runtime::Runtime,
}

impl Server {
    /// Listen on `addr` (e.g. `127.0.0.1:5000`; port 0 picks a free port).
    pub fn bind(addr: &str, service: NotesService) -> Result<Self, ScribbleError> {
        let http = tiny_http::Server::http(addr)
            .map_err(|e| ScribbleError::Internal(format!("cannot listen on {addr}: {e}")))?;
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ScribbleError::Internal(format!("Failed to create tokio runtime: {e}")))?;
        Ok(Self {
            http,
            service,
            runtime,
        })
    }

    /// Bound address, useful when binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.http.server_addr().to_ip()
    }

    /// Serve requests until the listener is closed.
    pub fn run(&self) {
        info!("Listening on http://{}", self.http.server_addr());
        for request in self.http.incoming_requests() {
            self.handle(request);
        }
    }

    fn handle(&self, mut request: Request) {
        let method = request.method().clone();
        let url = request.url().to_string();
        let reply = match route(&method, &url) {
            Route::Health => Reply::json(200, &serde_json::json!({ "status": "ok" })),
            Route::Upload => self.upload(&mut request),
            Route::GenerateNotes => self.generate_notes(&mut request),
            Route::Page { id, index } => match self.runtime.block_on(self.service.get_page(&id, index)) {
                Ok(bytes) => Reply::png(bytes),
                Err(e) => Reply::from_error(&e),
            },
            Route::MethodNotAllowed => Reply::error(405, &format!("{method} not allowed on {url}")),
            Route::NotFound => Reply::error(404, &format!("no route for {url}")),
        };
        debug!("{} {} → {}", method, url, reply.status);

        let mut response = Response::from_data(reply.body).with_status_code(reply.status);
        if let Ok(h) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            response = response.with_header(h);
        }
        if let Err(e) = request.respond(response) {
            warn!("Failed to send response for {}: {}", url, e);
        }
    }

    fn upload(&self, request: &mut Request) -> Reply {
        let content_type = header_value(request, "Content-Type");
        let filename = header_value(request, FILENAME_HEADER);
        let limit = self.service.config().max_upload_bytes;

        let body = match read_body(request, limit) {
            Ok(body) => body,
            Err(e) => return Reply::from_error(&e),
        };
        let declared = Declared {
            content_type: content_type.as_deref(),
            filename: filename.as_deref(),
        };
        match self.runtime.block_on(self.service.upload(&body, declared)) {
            Ok(receipt) => Reply::json(200, &receipt),
            Err(e) => Reply::from_error(&e),
        }
    }

    fn generate_notes(&self, request: &mut Request) -> Reply {
        let body = match read_body(request, 64 * 1024) {
            Ok(body) => body,
            Err(e) => return Reply::from_error(&e),
        };
        let parsed: GenerateNotesBody = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) => return Reply::error(400, &format!("expected {{\"id\": \"...\"}}: {e}")),
        };
        match self.runtime.block_on(self.service.generate_notes(&parsed.id)) {
            Ok(manifest) => Reply::json(200, &manifest),
            Err(e) => Reply::from_error(&e),
        }
    }
}

/// Build the service from `config` and serve on `addr` until killed.
pub fn serve(addr: &str, config: crate::config::ScribbleConfig) -> Result<(), ScribbleError> {
    let server = Server::bind(addr, NotesService::new(config)?)?;
    server.run();
    Ok(())
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str().to_string())
}

/// Read at most `limit` bytes; one byte more is an oversize upload.
fn read_body(request: &mut Request, limit: usize) -> Result<Vec<u8>, ScribbleError> {
    if let Some(len) = request.body_length() {
        if len > limit {
            return Err(ScribbleError::UploadTooLarge { size: len, limit });
        }
    }
    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| ScribbleError::Internal(format!("reading request body: {e}")))?;
    if body.len() > limit {
        return Err(ScribbleError::UploadTooLarge {
            size: body.len(),
            limit,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_known_paths() {
        assert_eq!(route(&Method::Post, "/upload"), Route::Upload);
        assert_eq!(route(&Method::Post, "/generate_notes"), Route::GenerateNotes);
        assert_eq!(route(&Method::Get, "/health?probe=1"), Route::Health);
        assert_eq!(
            route(&Method::Get, "/pages/abc/3"),
            Route::Page {
                id: "abc".into(),
                index: 3
            }
        );
    }

    #[test]
    fn wrong_method_and_unknown_paths() {
        assert_eq!(route(&Method::Get, "/upload"), Route::MethodNotAllowed);
        assert_eq!(route(&Method::Post, "/pages/abc/0"), Route::MethodNotAllowed);
        assert_eq!(route(&Method::Get, "/pages/abc/first"), Route::NotFound);
        assert_eq!(route(&Method::Get, "/pages/abc"), Route::NotFound);
        assert_eq!(route(&Method::Get, "/"), Route::NotFound);
    }

    #[test]
    fn error_reply_is_json() {
        let r = Reply::from_error(&ScribbleError::UnknownUpload { id: "x".into() });
        assert_eq!(r.status, 404);
        let v: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
        assert!(v["error"].as_str().unwrap().contains("Unknown upload"));
    }
}
