use chrono_tz::Tz;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_DOCUMENT_ROOT: &str = "public/";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Хост сервера
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Порт сервера
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Количество рабочих потоков в пуле потоков
    #[arg(short, long, env = "THREADS", default_value_t = 10)]
    pub threads: usize,

    /// Корневая директория с документами
    #[arg(
        short,
        long,
        env = "WEBSITE_DIR",
        default_value = DEFAULT_DOCUMENT_ROOT,
        value_parser = parse_document_root
    )]
    pub document_root: PathBuf,

    /// Максимальное количество одновременных соединений
    #[arg(long, default_value_t = 1000)]
    pub max_connections: usize,

    /// Максимальный размер файла в байтах (по умолчанию: 128 МБ)
    #[arg(long, default_value_t = 134217728)] // 128 * 1024 * 1024
    pub max_file_size: u64,

    /// Таймаут чтения заголовков запроса в секундах
    #[arg(long, default_value_t = 5)]
    pub read_timeout: u64,

    /// Таймаут записи ответа в секундах (0 отключает ограничение)
    #[arg(long, default_value_t = 30)]
    pub write_timeout: u64,

    /// Файл, в который дублируется журнал
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Часовой пояс меток времени в журнале
    #[arg(long, env = "LOG_TZ", default_value = "UTC", value_parser = parse_timezone)]
    pub timezone: Tz,
}

/// An empty value counts as unset.
fn parse_document_root(s: &str) -> Result<PathBuf, String> {
    if s.is_empty() {
        Ok(PathBuf::from(DEFAULT_DOCUMENT_ROOT))
    } else {
        Ok(PathBuf::from(s))
    }
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| e.to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            threads: 10,
            document_root: PathBuf::from(DEFAULT_DOCUMENT_ROOT),
            max_connections: 1000,
            max_file_size: 134217728,
            read_timeout: 5,
            write_timeout: 30,
            log_file: None,
            timezone: Tz::UTC,
        }
    }
}
