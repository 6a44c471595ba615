//! Per-request tracing span and access log.
//!
//! ```text
//! INFO request{method=GET path=/do/3}: access remote=10.0.0.7 method=GET path=/do/3
//!     version=HTTP/1.1 host=todo.local status=200 bytes=212 user_agent="curl/8.5.0" latency_ms=1
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use http::{HeaderMap, Version};
use tracing::{Span, info, info_span};

use crate::response::Response;

/// Request facts captured before the handler consumes the request.
pub struct AccessLog {
    remote: String,
    method: String,
    path: String,
    version: Version,
    host: String,
    user_agent: String,
    started: Instant,
}

impl AccessLog {
    pub fn start<B>(req: &http::Request<B>, peer: SocketAddr) -> Self {
        let headers = req.headers();
        Self {
            remote: remote_addr(headers, peer),
            method: req.method().to_string(),
            path: req.uri().path().to_owned(),
            version: req.version(),
            host: header(headers, "host")
                .or_else(|| req.uri().host())
                .unwrap_or_default()
                .to_owned(),
            user_agent: header(headers, "user-agent").unwrap_or_default().to_owned(),
            started: Instant::now(),
        }
    }

    /// Span the handler runs inside, so its own log events carry the route.
    pub fn span(&self) -> Span {
        info_span!("request", method = %self.method, path = %self.path)
    }

    pub fn finish(self, res: &Response) {
        info!(
            remote = %self.remote,
            method = %self.method,
            path = %self.path,
            version = ?self.version,
            host = %self.host,
            status = res.status_code(),
            bytes = res.body().len(),
            user_agent = %self.user_agent,
            latency_ms = self.started.elapsed().as_millis() as u64,
            "access"
        );
    }
}

/// The client address as reported by a fronting proxy, else the TCP peer.
fn remote_addr(headers: &HeaderMap, peer: SocketAddr) -> String {
    header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| peer.to_string(), str::to_owned)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "192.0.2.1:5000".parse().unwrap()
    }

    #[test]
    fn prefers_first_forwarded_for_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(remote_addr(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_peer_address() {
        assert_eq!(remote_addr(&HeaderMap::new(), peer()), "192.0.2.1:5000");
    }

    #[test]
    fn captures_request_line_and_headers() {
        let req = http::Request::builder()
            .method("DELETE")
            .uri("/delete/4?x=1")
            .header("host", "todo.local")
            .header("user-agent", "curl/8.5.0")
            .body(())
            .unwrap();
        let log = AccessLog::start(&req, peer());
        assert_eq!(log.method, "DELETE");
        assert_eq!(log.path, "/delete/4");
        assert_eq!(log.host, "todo.local");
        assert_eq!(log.user_agent, "curl/8.5.0");
        log.finish(&Response::text("done"));
    }
}
