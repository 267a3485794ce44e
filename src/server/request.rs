use log::debug;
use std::io::{BufRead, BufReader, Read};

use super::http_status::HttpStatus;

pub const MAX_HEAD_SIZE: usize = 8192;

/// Request header fields in arrival order. Names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// First value for `name`, or `""` when the header is absent.
    pub fn get(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Request target exactly as received: path plus query string.
    pub uri: String,
    pub version: String,
    pub headers: Headers,
    /// Transport peer in `host:port` or `[ipv6]:port` form.
    pub peer_addr: String,
}

impl Request {
    pub fn new(method: &str, uri: &str, peer_addr: &str) -> Self {
        Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: "HTTP/1.1".to_string(),
            headers: Headers::new(),
            peer_addr: peer_addr.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Path component of the target, without the query string.
    pub fn path(&self) -> &str {
        match self.uri.split_once('?') {
            Some((path, _)) => path,
            None => &self.uri,
        }
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    /// Reads the request line and header block from `stream`. The body, if any,
    /// is left unread.
    pub fn read_from<R: Read>(stream: R, peer_addr: &str) -> Result<Self, HttpStatus> {
        let mut reader = BufReader::new(stream.take(MAX_HEAD_SIZE as u64 + 1));
        let mut head_len = 0;
        let mut lines = Vec::new();

        loop {
            let mut raw = Vec::new();
            let n = match reader.read_until(b'\n', &mut raw) {
                Ok(n) => n,
                Err(e) => {
                    debug!("Failed to read request head from {}: {}", peer_addr, e);
                    return Err(HttpStatus::BadRequest);
                }
            };

            head_len += n;
            if head_len > MAX_HEAD_SIZE {
                return Err(HttpStatus::HeaderFieldsTooLarge);
            }
            if n == 0 {
                // Peer closed before the blank line.
                return Err(HttpStatus::BadRequest);
            }

            let raw = raw.trim_ascii_end();
            if raw.is_empty() {
                if lines.is_empty() {
                    // Tolerate leading blank lines before the request line.
                    continue;
                }
                break;
            }
            // Header values may carry obs-text; only the request line must be ASCII.
            if lines.is_empty() && !raw.is_ascii() {
                debug!("Non-ASCII request line from {}", peer_addr);
                return Err(HttpStatus::BadRequest);
            }
            lines.push(String::from_utf8_lossy(raw).into_owned());
        }

        Self::parse_head(&lines, peer_addr)
    }

    fn parse_head(lines: &[String], peer_addr: &str) -> Result<Self, HttpStatus> {
        let (request_line, header_lines) = lines.split_first().ok_or(HttpStatus::BadRequest)?;

        let first_line: Vec<&str> = request_line.split_whitespace().collect();
        if first_line.len() < 2 || first_line.len() > 3 {
            debug!("Malformed request line from {}: {}", peer_addr, request_line);
            return Err(HttpStatus::BadRequest);
        }

        let version = first_line.get(2).copied().unwrap_or("HTTP/1.0");
        if !version.starts_with("HTTP/") {
            return Err(HttpStatus::BadRequest);
        }

        let mut headers = Headers::new();
        for line in header_lines {
            let Some((name, value)) = line.split_once(':') else {
                debug!("Malformed header line from {}: {}", peer_addr, line);
                return Err(HttpStatus::BadRequest);
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(HttpStatus::BadRequest);
            }
            headers.append(name, value.trim());
        }

        Ok(Self {
            method: first_line[0].to_string(),
            uri: first_line[1].to_string(),
            version: version.to_string(),
            headers,
            peer_addr: peer_addr.to_string(),
        })
    }
}
