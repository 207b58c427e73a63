use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

const DEFAULT_SECRET: &str = "default_2048_secret";
const DEFAULT_SPAWN_DELAY_MS: u64 = 200;
const DEFAULT_SESSION_EXPIRY_SECONDS: u64 = 1800;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Preferences live in memory when unset.
    pub redis_url: Option<String>,
    pub secret: String,
    /// Time between committing a move and spawning its tile, left for client animations.
    pub spawn_delay: Duration,
    pub session_expiry: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            redis_url: None,
            secret: DEFAULT_SECRET.to_string(),
            spawn_delay: Duration::from_millis(DEFAULT_SPAWN_DELAY_MS),
            session_expiry: Duration::from_secs(DEFAULT_SESSION_EXPIRY_SECONDS),
        }
    }
}

impl Config {
    /// Reads the environment, falling back to defaults for anything missing or malformed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret = lookup("GAME2048_SECRET").unwrap_or_else(|| {
            warn!("GAME2048_SECRET not set, using the development secret");
            DEFAULT_SECRET.to_string()
        });

        let defaults = Config::default();
        Self {
            bind_addr: parse_or("BIND_ADDR", lookup("BIND_ADDR"), defaults.bind_addr),
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            secret,
            spawn_delay: Duration::from_millis(parse_or("SPAWN_DELAY_MS", lookup("SPAWN_DELAY_MS"), DEFAULT_SPAWN_DELAY_MS)),
            session_expiry: Duration::from_secs(parse_or(
                "SESSION_EXPIRY_SECONDS",
                lookup("SESSION_EXPIRY_SECONDS"),
                DEFAULT_SESSION_EXPIRY_SECONDS,
            )),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
