use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

#[cfg(not(test))]
pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

#[cfg(test)]
pub static CONF: Lazy<Config> = Lazy::new(Config::for_testing);

const STORE_BACKEND_VAR: &str = "LEDGER_STORE_BACKEND";

const DB_USERNAME_VAR: &str = "LEDGER_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "LEDGER_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "LEDGER_DB_HOSTNAME";
const DB_PORT_VAR: &str = "LEDGER_DB_PORT";
const DB_NAME_VAR: &str = "LEDGER_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "LEDGER_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "LEDGER_DB_IDLE_TIMEOUT_SECS";

const HASHING_KEY_VAR: &str = "LEDGER_HASHING_KEY_B64";
const TOKEN_SIGNING_KEY_VAR: &str = "LEDGER_TOKEN_SIGNING_KEY_B64";

const HASH_LENGTH_VAR: &str = "LEDGER_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "LEDGER_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "LEDGER_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "LEDGER_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "LEDGER_HASH_SALT_LENGTH";

const ACCESS_TOKEN_LIFETIME_MINS_VAR: &str = "LEDGER_ACCESS_TOKEN_LIFETIME_MINS";
const REFRESH_TOKEN_LIFETIME_DAYS_VAR: &str = "LEDGER_REFRESH_TOKEN_LIFETIME_DAYS";

const ACTIX_WORKER_COUNT_VAR: &str = "LEDGER_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "LEDGER_LOG_LEVEL";
const CORS_ALLOWED_ORIGINS_VAR: &str = "LEDGER_CORS_ALLOWED_ORIGINS";

const HASHING_KEY_SIZE: usize = 32;
const TOKEN_SIGNING_KEY_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

pub struct DbConfig {
    pub username: String,
    pub password: Zeroizing<String>,
    pub hostname: String,
    pub port: u16,
    pub name: String,
    pub max_connections: u32,
    pub idle_timeout: Duration,
}

impl DbConfig {
    pub fn database_uri(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password.as_str(), self.hostname, self.port, self.name,
        ))
    }
}

pub struct Config {
    pub store_backend: StoreBackend,
    /// Present only when `store_backend` is `Postgres`.
    pub db: Option<DbConfig>,

    pub hashing_key: Zeroizing<[u8; HASHING_KEY_SIZE]>,
    pub token_signing_key: Zeroizing<[u8; TOKEN_SIGNING_KEY_SIZE]>,

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

    pub access_token_lifetime: Duration,
    pub refresh_token_lifetime: Duration,

    pub actix_worker_count: usize,
    pub log_level: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let store_backend = match std::env::var(STORE_BACKEND_VAR) {
            Ok(backend) => backend
                .parse()
                .map_err(|_| ConfigError::invalid(STORE_BACKEND_VAR))?,
            Err(_) => StoreBackend::Postgres,
        };

        let db = match store_backend {
            StoreBackend::Postgres => Some(DbConfig {
                username: env_var(DB_USERNAME_VAR)?,
                password: Zeroizing::new(env_var(DB_PASSWORD_VAR)?),
                hostname: env_var(DB_HOSTNAME_VAR)?,
                port: env_var(DB_PORT_VAR)?,
                name: env_var(DB_NAME_VAR)?,
                max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
                idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),
            }),
            StoreBackend::Memory => None,
        };

        let cors_allowed_origins = env_var_or(CORS_ALLOWED_ORIGINS_VAR, String::new())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Config {
            store_backend,
            db,

            hashing_key: decode_key(HASHING_KEY_VAR)?,
            token_signing_key: decode_key(TOKEN_SIGNING_KEY_VAR)?,

            hash_length: env_var_or(HASH_LENGTH_VAR, 32),
            hash_iterations: env_var_or(HASH_ITERATIONS_VAR, 2),
            hash_mem_cost_kib: env_var_or(HASH_MEM_COST_KIB_VAR, 65536),
            hash_threads: env_var_or(HASH_THREADS_VAR, 1),
            hash_salt_length: env_var_or(HASH_SALT_LENGTH_VAR, 16),

            access_token_lifetime: Duration::from_secs(
                env_var_or(ACCESS_TOKEN_LIFETIME_MINS_VAR, 15) * 60,
            ),
            refresh_token_lifetime: Duration::from_secs(
                env_var_or(REFRESH_TOKEN_LIFETIME_DAYS_VAR, 30) * 86400,
            ),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
            cors_allowed_origins,
        })
    }

    /// Fixed configuration for unit tests: in-memory store, cheap hashing.
    #[cfg(test)]
    pub fn for_testing() -> Config {
        Config {
            store_backend: StoreBackend::Memory,
            db: None,

            hashing_key: Zeroizing::new([7; HASHING_KEY_SIZE]),
            token_signing_key: Zeroizing::new([11; TOKEN_SIGNING_KEY_SIZE]),

            hash_length: 16,
            hash_iterations: 1,
            hash_mem_cost_kib: 128,
            hash_threads: 1,
            hash_salt_length: 16,

            access_token_lifetime: Duration::from_secs(15 * 60),
            refresh_token_lifetime: Duration::from_secs(30 * 86400),

            actix_worker_count: 1,
            log_level: String::from("debug"),
            cors_allowed_origins: vec![String::from("http://localhost:5173")],
        }
    }
}

fn decode_key<const N: usize>(key: &'static str) -> Result<Zeroizing<[u8; N]>, ConfigError> {
    let encoded = Zeroizing::new(env_var::<String>(key)?);
    let decoded = Zeroizing::new(
        b64.decode(encoded.as_bytes())
            .map_err(|_| ConfigError::invalid(key))?,
    );

    if decoded.len() < N {
        return Err(ConfigError::invalid(key));
    }

    let mut bytes = Zeroizing::new([0u8; N]);
    bytes.copy_from_slice(&decoded[..N]);

    Ok(bytes)
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
