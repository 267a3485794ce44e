use log::info;
use std::fmt;
use std::time::{Duration, Instant};

use super::handler::Handler;
use super::request::Request;
use super::response::Response;
use crate::address;

/// Log target of the per-request access lines.
pub const ACCESS_TARGET: &str = "access";

/// One access-log event.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRecord {
    pub method: String,
    pub uri: String,
    pub ip: String,
    pub referer: String,
    pub user_agent: String,
    pub elapsed: Duration,
}

impl AccessRecord {
    pub fn new(req: &Request, elapsed: Duration) -> Self {
        Self {
            method: req.method.clone(),
            uri: req.uri.clone(),
            ip: address::resolve(&req.headers, &req.peer_addr),
            referer: req.headers.get("Referer").to_string(),
            user_agent: req.headers.get("User-Agent").to_string(),
            elapsed,
        }
    }
}

impl fmt::Display for AccessRecord {
    /// `"GET /a?b" ip="192.0.2.1" referer="" user-agent="curl/8.0": 1.2ms`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{} {}\" ip={:?} referer={:?} user-agent={:?}: {:?}",
            self.method, self.uri, self.ip, self.referer, self.user_agent, self.elapsed
        )
    }
}

/// Times the wrapped handler and writes one access line per request. The
/// inner response is passed through untouched.
pub struct LoggingMiddleware<H> {
    inner: H,
}

impl<H: Handler> LoggingMiddleware<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: Handler> Handler for LoggingMiddleware<H> {
    fn handle(&self, req: &Request) -> Response {
        let start = Instant::now();
        let response = self.inner.handle(req);
        let record = AccessRecord::new(req, start.elapsed());

        info!(target: ACCESS_TARGET, "{}", record);
        response
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::file_server::FileServer;
    use crate::server::http_status::HttpStatus;
    use std::fs;

    struct NotFoundStub;

    impl Handler for NotFoundStub {
        fn handle(&self, _req: &Request) -> Response {
            Response::error(HttpStatus::NotFound).with_header("X-Inner", "stub")
        }
    }

    #[test]
    fn formats_access_line() {
        let record = AccessRecord {
            method: "GET".into(),
            uri: "/a?b=1".into(),
            ip: "203.0.113.7".into(),
            referer: "http://example.com/".into(),
            user_agent: "curl/8.0".into(),
            elapsed: Duration::from_micros(1200),
        };

        assert_eq!(
            record.to_string(),
            r#""GET /a?b=1" ip="203.0.113.7" referer="http://example.com/" user-agent="curl/8.0": 1.2ms"#
        );
    }

    #[test]
    fn quotes_are_escaped() {
        let req =
            Request::new("GET", "/q", "192.0.2.1:4000").with_header("User-Agent", "say \"hi\"");
        let record = AccessRecord::new(&req, Duration::ZERO);
        assert!(record.to_string().contains(r#"user-agent="say \"hi\"""#));
    }

    #[test]
    fn record_uses_forwarding_headers() {
        let req = Request::new("HEAD", "/x", "10.0.0.1:443")
            .with_header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .with_header("referer", "http://example.com/");
        let record = AccessRecord::new(&req, Duration::ZERO);

        assert_eq!(record.ip, "203.0.113.7");
        assert_eq!(record.referer, "http://example.com/");
        assert_eq!(record.user_agent, "");
    }

    #[test]
    fn passes_inner_response_through() {
        capture::install();
        let handler = LoggingMiddleware::new(NotFoundStub);
        let resp = handler.handle(&Request::new("DELETE", "/passthrough-check", "192.0.2.9:1"));

        assert_eq!(resp.status, HttpStatus::NotFound);
        assert_eq!(resp.header("X-Inner"), Some("stub"));

        let lines = capture::lines_containing("\"DELETE /passthrough-check\"");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(r#"ip="192.0.2.9""#));
    }

    #[test]
    fn logs_one_line_per_request() {
        capture::install();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        let handler = LoggingMiddleware::new(FileServer::new(dir.path(), 1024));

        let start = Instant::now();
        let resp = handler.handle(&Request::new("GET", "/index.html", "192.0.2.1:4000"));
        assert_eq!(resp.status, HttpStatus::Ok);
        assert!(start.elapsed() < Duration::from_secs(5));

        let lines = capture::lines_containing("\"GET /index.html\"");
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.contains(r#"ip="192.0.2.1""#));
        assert!(line.contains(r#"referer="""#));
        assert!(line.contains(r#"user-agent="""#));
    }
}
