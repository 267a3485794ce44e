pub mod config;
pub mod connection_manager;
pub mod file_server;
pub mod handler;
pub mod http_status;
pub mod logging;
pub mod request;
pub mod response;

use log::{debug, error, info, warn};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use threadpool::ThreadPool;

use crate::error::{Error, Result};
use config::ServerConfig;
use connection_manager::{ConnectionManager, ConnectionSlot};
use handler::Handler;
use http_status::HttpStatus;
use request::Request;
use response::Response;

pub struct HttpServer {
    config: ServerConfig,
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    connection_manager: Arc<ConnectionManager>,
    thread_pool: ThreadPool,
}

impl HttpServer {
    /// Binds the listener. Every request accepted by [`HttpServer::run`] is
    /// answered by `handler`.
    pub fn bind(config: &ServerConfig, handler: Arc<dyn Handler>) -> Result<Self> {
        let addr = if config.host.contains(':') {
            format!("[{}]:{}", config.host, config.port)
        } else {
            format!("{}:{}", config.host, config.port)
        };
        let listener = TcpListener::bind(&addr).map_err(|source| Error::Bind {
            addr: addr.clone(),
            source,
        })?;

        match listener.local_addr() {
            Ok(local) => info!("Server started on {}", local),
            Err(_) => info!("Server started on {}", addr),
        }

        Ok(Self {
            config: config.clone(),
            listener,
            handler,
            connection_manager: Arc::new(ConnectionManager::with_config(config)),
            thread_pool: ThreadPool::new(config.threads.max(1)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn run(&self) {
        info!("Server running with {} threads", self.config.threads.max(1));

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => self.accept_connection(stream),
                Err(e) => error!("Error accepting connection: {}", e),
            }
        }
    }

    fn accept_connection(&self, stream: TcpStream) {
        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => {
                error!("Failed to get peer address: {}", e);
                return;
            }
        };
        debug!("New connection from {}", peer);

        let Some(slot) = self.connection_manager.try_acquire() else {
            warn!(
                "Maximum connections reached, rejecting connection from {}",
                peer
            );
            reject(stream, peer);
            return;
        };

        debug!(
            "Accepted connection from {} (active: {})",
            peer,
            self.connection_manager.active_count()
        );

        let handler = Arc::clone(&self.handler);
        let read_timeout = timeout_from_secs(self.config.read_timeout);
        let write_timeout = timeout_from_secs(self.config.write_timeout);

        self.thread_pool.execute(move || {
            if let Err(e) = configure_stream(&stream, read_timeout, write_timeout) {
                error!("Failed to set timeouts for {}: {}", peer, e);
                return;
            }
            handle_connection(stream, peer, handler.as_ref(), slot);
        });
    }
}

fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: &dyn Handler,
    _slot: ConnectionSlot,
) {
    debug!(
        "[Thread {:?}] Handling connection from {}",
        std::thread::current().id(),
        peer
    );

    let peer_addr = peer.to_string();
    let response = match Request::read_from(&stream, &peer_addr) {
        Ok(req) => handler.handle(&req),
        Err(status) => {
            debug!("Rejecting request from {}: {}", peer, status.code());
            Response::error(status)
        }
    };

    match response.write_to(&stream) {
        Ok(sent) => debug!("Response sent to {} ({} body bytes)", peer, sent),
        Err(e) => debug!("Error writing response to {}: {}", peer, e),
    }
}

/// `0` disables the timeout.
fn timeout_from_secs(secs: u64) -> Option<Duration> {
    match secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

fn configure_stream(
    stream: &TcpStream,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
) -> io::Result<()> {
    stream.set_read_timeout(read_timeout)?;
    stream.set_write_timeout(write_timeout)
}

fn reject(stream: TcpStream, peer: SocketAddr) {
    let _ = stream.set_write_timeout(Some(Duration::from_secs(1)));
    if let Err(e) = Response::error(HttpStatus::ServiceUnavailable).write_to(&stream) {
        debug!("Error writing rejection to {}: {}", peer, e);
    }
}
