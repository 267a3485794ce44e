use log::{debug, error, info, warn};
use percent_encoding::percent_decode_str;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};

use super::handler::Handler;
use super::http_status::HttpStatus;
use super::request::Request;
use super::response::Response;

const INDEX_FILE: &str = "index.html";

/// Serves files below a document root. Every request path maps onto the
/// root; there is no routing.
#[derive(Debug, Clone)]
pub struct FileServer {
    root: PathBuf,
    max_file_size: u64,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn serve(&self, req: &Request) -> Result<Response, HttpStatus> {
        if req.method != "GET" && req.method != "HEAD" {
            return Err(HttpStatus::MethodNotAllowed);
        }

        let relative = normalize_path(req.path())?;
        let file_path = self.root.join(relative);
        let metadata = fs::metadata(&file_path).map_err(|e| status_for_io(&file_path, e))?;

        if metadata.is_dir() && !req.path().ends_with('/') {
            return Ok(redirect_to_directory(req));
        }
        let (file_path, metadata) = self.locate(file_path, metadata)?;

        let file_size = metadata.len();
        if file_size > self.max_file_size {
            warn!(
                "File too large: {:?} ({} > {})",
                file_path, file_size, self.max_file_size
            );
            return Err(HttpStatus::PayloadTooLarge);
        }

        let response = Response::new(HttpStatus::Ok)
            .with_header("Content-Type", content_type(&file_path));

        if req.is_head() {
            debug!("HEAD request for {:?}", file_path);
            return Ok(response.with_content_length(file_size));
        }

        let file = File::open(&file_path).map_err(|e| status_for_io(&file_path, e))?;
        debug!("File opened: {:?} ({} bytes)", file_path, file_size);
        Ok(response.with_file(file, file_size))
    }

    fn locate(
        &self,
        mut file_path: PathBuf,
        metadata: Metadata,
    ) -> Result<(PathBuf, Metadata), HttpStatus> {
        if !metadata.is_dir() {
            return Ok((file_path, metadata));
        }

        file_path.push(INDEX_FILE);
        match fs::metadata(&file_path) {
            Ok(index) if index.is_file() => Ok((file_path, index)),
            Ok(_) => {
                warn!("Index is not a regular file: {:?}", file_path);
                Err(HttpStatus::Forbidden)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Attempt to access directory: {:?}", file_path.parent());
                Err(HttpStatus::Forbidden)
            }
            Err(e) => Err(status_for_io(&file_path, e)),
        }
    }
}

impl Handler for FileServer {
    fn handle(&self, req: &Request) -> Response {
        let response = match self.serve(req) {
            Ok(response) => response,
            Err(HttpStatus::MethodNotAllowed) => {
                Response::error(HttpStatus::MethodNotAllowed).with_header("Allow", "GET, HEAD")
            }
            Err(status) => Response::error(status),
        };

        if req.is_head() {
            response.without_body()
        } else {
            response
        }
    }
}

/// `/docs?x=1` => 301 to `/docs/?x=1`
fn redirect_to_directory(req: &Request) -> Response {
    let location = match req.uri.split_once('?') {
        Some((path, query)) => format!("{}/?{}", path, query),
        None => format!("{}/", req.uri),
    };
    debug!("Redirecting {} to {}", req.uri, location);

    Response::error(HttpStatus::MovedPermanently).with_header("Location", &location)
}

/// Percent-decodes the request path and turns it into a path relative to
/// the document root. Parent components are rejected outright.
fn normalize_path(path: &str) -> Result<PathBuf, HttpStatus> {
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| HttpStatus::BadRequest)?;

    let mut normalized = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(segment) => normalized.push(segment),
            Component::ParentDir | Component::Prefix(_) => {
                warn!("Path traversal attempt: {}", path);
                return Err(HttpStatus::Forbidden);
            }
        }
    }

    Ok(normalized)
}

fn status_for_io(path: &Path, e: io::Error) -> HttpStatus {
    match e.kind() {
        io::ErrorKind::NotFound => {
            info!("File not found: {:?}", path);
            HttpStatus::NotFound
        }
        io::ErrorKind::PermissionDenied => {
            warn!("Permission denied: {:?}", path);
            HttpStatus::Forbidden
        }
        _ => {
            error!("Error accessing {:?}: {}", path, e);
            HttpStatus::InternalServerError
        }
    }
}

fn content_type(file_path: &Path) -> &'static str {
    let ext = file_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mime_types = &[
        ("html", "text/html; charset=utf-8"),
        ("htm", "text/html; charset=utf-8"),
        ("css", "text/css; charset=utf-8"),
        ("js", "text/javascript; charset=utf-8"),
        ("mjs", "text/javascript; charset=utf-8"),
        ("json", "application/json"),
        ("xml", "text/xml; charset=utf-8"),
        ("txt", "text/plain; charset=utf-8"),
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("svg", "image/svg+xml"),
        ("ico", "image/x-icon"),
        ("webp", "image/webp"),
        ("woff", "font/woff"),
        ("woff2", "font/woff2"),
        ("wasm", "application/wasm"),
        ("pdf", "application/pdf"),
    ];

    mime_types
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::response::Body;
    use tempfile::TempDir;

    fn site() -> (TempDir, FileServer) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("style.css"), "body {}").unwrap();
        fs::write(dir.path().join("hello world.txt"), "hi").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs").join("index.html"), "docs").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let server = FileServer::new(dir.path(), 1024);
        (dir, server)
    }

    fn get(server: &FileServer, uri: &str) -> Response {
        server.handle(&Request::new("GET", uri, "192.0.2.1:4000"))
    }

    #[test]
    fn serves_file_with_type_and_length() {
        let (_dir, server) = site();
        let resp = get(&server, "/style.css?v=3");

        assert_eq!(resp.status, HttpStatus::Ok);
        assert_eq!(resp.header("Content-Type"), Some("text/css; charset=utf-8"));
        assert_eq!(resp.content_length, 7);
        assert!(matches!(resp.body, Body::File { len: 7, .. }));
    }

    #[test]
    fn directory_serves_index() {
        let (_dir, server) = site();

        let resp = get(&server, "/");
        assert_eq!(resp.status, HttpStatus::Ok);
        assert_eq!(resp.content_length, 13);

        let resp = get(&server, "/docs/");
        assert_eq!(resp.status, HttpStatus::Ok);
        assert_eq!(resp.content_length, 4);
    }

    #[test]
    fn directory_without_index_is_forbidden() {
        let (_dir, server) = site();
        assert_eq!(get(&server, "/empty/").status, HttpStatus::Forbidden);
    }

    #[test]
    fn directory_without_slash_redirects() {
        let (_dir, server) = site();

        let resp = get(&server, "/docs");
        assert_eq!(resp.status, HttpStatus::MovedPermanently);
        assert_eq!(resp.header("Location"), Some("/docs/"));

        let resp = get(&server, "/docs?page=2");
        assert_eq!(resp.header("Location"), Some("/docs/?page=2"));

        let resp = get(&server, "/empty");
        assert_eq!(resp.status, HttpStatus::MovedPermanently);
        assert_eq!(resp.header("Location"), Some("/empty/"));
    }

    #[test]
    fn head_error_has_no_body() {
        let (_dir, server) = site();
        let resp = server.handle(&Request::new("HEAD", "/missing", "192.0.2.1:4000"));
        assert_eq!(resp.status, HttpStatus::NotFound);

        let mut out = Vec::new();
        let sent = resp.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(sent, 0);
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
        assert!(!text.contains("<html>"));
    }

    #[test]
    fn head_sends_no_body() {
        let (_dir, server) = site();
        let resp = server.handle(&Request::new("HEAD", "/index.html", "192.0.2.1:4000"));

        assert_eq!(resp.status, HttpStatus::Ok);
        assert_eq!(resp.content_length, 13);
        assert!(matches!(resp.body, Body::Empty));
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_dir, server) = site();
        let resp = get(&server, "/nope.html");
        assert_eq!(resp.status, HttpStatus::NotFound);
        assert_eq!(resp.header("Content-Type"), Some("text/html"));
    }

    #[test]
    fn missing_root_is_not_found() {
        let server = FileServer::new("/definitely/not/here", 1024);
        assert_eq!(get(&server, "/index.html").status, HttpStatus::NotFound);
    }

    #[test]
    fn traversal_is_forbidden() {
        let (_dir, server) = site();
        assert_eq!(get(&server, "/../etc/passwd").status, HttpStatus::Forbidden);
        assert_eq!(get(&server, "/docs/%2e%2e/%2e%2e/x").status, HttpStatus::Forbidden);
    }

    #[test]
    fn decodes_percent_escapes() {
        let (_dir, server) = site();
        assert_eq!(get(&server, "/hello%20world.txt").status, HttpStatus::Ok);
        assert_eq!(get(&server, "/%ff").status, HttpStatus::BadRequest);
    }

    #[test]
    fn other_methods_are_rejected() {
        let (_dir, server) = site();
        let resp = server.handle(&Request::new("POST", "/index.html", "192.0.2.1:4000"));
        assert_eq!(resp.status, HttpStatus::MethodNotAllowed);
        assert_eq!(resp.header("Allow"), Some("GET, HEAD"));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let (dir, server) = site();
        fs::write(dir.path().join("big.bin"), vec![0u8; 2048]).unwrap();
        assert_eq!(get(&server, "/big.bin").status, HttpStatus::PayloadTooLarge);
    }

    #[test]
    fn content_type_falls_back_to_octet_stream() {
        assert_eq!(content_type(Path::new("a/b.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("archive.tar.gz")), "application/octet-stream");
        assert_eq!(content_type(Path::new("Makefile")), "application/octet-stream");
    }
}
