use std::fs::File;
use std::io::{self, Read, Write};

use super::http_status::HttpStatus;

const CHUNK_SIZE: usize = 65536;

#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    File { file: File, len: u64 },
}

#[derive(Debug)]
pub struct Response {
    pub status: HttpStatus,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    /// Advertised body length. Differs from the body for HEAD responses.
    pub content_length: u64,
}

impl Response {
    pub fn new(status: HttpStatus) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
            content_length: 0,
        }
    }

    pub fn error(status: HttpStatus) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/html")
            .with_bytes(status.error_page().into_bytes())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.content_length = bytes.len() as u64;
        self.body = Body::Bytes(bytes);
        self
    }

    pub fn with_file(mut self, file: File, len: u64) -> Self {
        self.content_length = len;
        self.body = Body::File { file, len };
        self
    }

    /// Advertises a length without attaching a body, as for HEAD.
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = len;
        self
    }

    /// Drops the body but keeps the advertised length.
    pub fn without_body(mut self) -> Self {
        self.body = Body::Empty;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = self.status.as_response_line();
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.content_length
        ));
        head.into_bytes()
    }

    /// Writes the status line, headers and body. Returns the number of body
    /// bytes sent.
    pub fn write_to<W: Write>(self, mut out: W) -> io::Result<u64> {
        out.write_all(&self.head_bytes())?;

        let sent = match self.body {
            Body::Empty => 0,
            Body::Bytes(bytes) => {
                out.write_all(&bytes)?;
                bytes.len() as u64
            }
            Body::File { file, len } => {
                let mut file = file.take(len);
                let mut buffer = vec![0u8; CHUNK_SIZE];
                let mut sent = 0u64;
                loop {
                    let n = file.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    out.write_all(&buffer[..n])?;
                    sent += n as u64;
                }
                sent
            }
        };

        out.flush()?;
        Ok(sent)
    }
}
