use clap::{Parser, ValueEnum};
use itinera_gateway::Environment;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "ITINERA_LISTEN_ADDR";
pub const ENVIRONMENT_ENV: &str = "ITINERA_ENVIRONMENT";
pub const STORAGE_BACKEND_ENV: &str = "ITINERA_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "ITINERA_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "ITINERA_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "ITINERA_REDIS_URL";
pub const JWT_SECRET_ENV: &str = "ITINERA_JWT_SECRET";
pub const PUBLIC_BASE_URL_ENV: &str = "ITINERA_PUBLIC_BASE_URL";
pub const CACHE_TIMEOUT_MS_ENV: &str = "ITINERA_CACHE_TIMEOUT_MS";
pub const STORE_TIMEOUT_MS_ENV: &str = "ITINERA_STORE_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "ITINERA_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvironmentArg {
    #[value(name = "development")]
    Development,
    #[value(name = "production")]
    Production,
    #[value(name = "test")]
    Test,
}

impl From<EnvironmentArg> for Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::Development => Environment::Development,
            EnvironmentArg::Production => Environment::Production,
            EnvironmentArg::Test => Environment::Test,
        }
    }
}

impl Display for EnvironmentArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Environment::from(*self).fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::InMemory => write!(f, "in-memory"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "itinera-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = ENVIRONMENT_ENV,
        value_enum,
        default_value_t = EnvironmentArg::Development
    )]
    pub environment: EnvironmentArg,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::InMemory
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,

    #[arg(long, env = JWT_SECRET_ENV, hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = PUBLIC_BASE_URL_ENV)]
    pub public_base_url: Option<String>,

    #[arg(long, env = CACHE_TIMEOUT_MS_ENV, default_value_t = DEFAULT_CACHE_TIMEOUT_MS)]
    pub cache_timeout_ms: u64,

    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = DEFAULT_STORE_TIMEOUT_MS)]
    pub store_timeout_ms: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}
