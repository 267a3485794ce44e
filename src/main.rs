use clap::Parser;
use log::info;
use std::sync::Arc;

use static_site_server::logger;
use static_site_server::server::HttpServer;
use static_site_server::server::config::ServerConfig;
use static_site_server::server::file_server::FileServer;
use static_site_server::server::handler::Handler;
use static_site_server::server::logging::LoggingMiddleware;

fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    logger::init(config.log_file.as_deref(), config.timezone)?;

    info!("Starting static site server with config: {:?}", config);

    let file_server = FileServer::new(&config.document_root, config.max_file_size);
    info!("Serving files from {:?}", file_server.root());

    let handler: Arc<dyn Handler> = Arc::new(LoggingMiddleware::new(file_server));
    let server = HttpServer::bind(&config, handler)?;
    server.run();

    Ok(())
}
