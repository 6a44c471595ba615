//! Configuration management.
//!
//! Loaded from environment variables (after an optional `.env` file) with
//! defaults; the single optional command-line argument overrides the bind
//! address.
//!
//! | Variable | Default |
//! |---|---|
//! | `TICKLIST_BIND` | `0.0.0.0:8080` |
//! | `TICKLIST_DATABASE` | `./todo.db` |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::Error;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE: &str = "./todo.db";

/// Service configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,
    /// Path of the SQLite database file.
    pub database: PathBuf,
}

impl Config {
    /// Loads configuration from `TICKLIST_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let bind = env::var("TICKLIST_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_owned());
        Ok(Self {
            bind: parse_bind(&bind)?,
            database: env::var_os("TICKLIST_DATABASE")
                .map_or_else(|| PathBuf::from(DEFAULT_DATABASE), PathBuf::from),
        })
    }

    /// Applies command-line arguments (program name already stripped):
    /// none keeps the configured bind, one replaces it, more is a usage error.
    pub fn with_args<I>(mut self, args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        match args.as_slice() {
            [] => {}
            [bind] => self.bind = parse_bind(bind)?,
            _ => return Err(Error::Usage("ticklist [bind]".to_owned())),
        }
        Ok(self)
    }
}

/// Parses `host:port`; a bare `:port` means every IPv4 interface.
pub fn parse_bind(raw: &str) -> Result<SocketAddr, Error> {
    let raw = raw.trim();
    let full = match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => raw.to_owned(),
    };
    full.parse().map_err(|_| Error::InvalidBind(raw.to_owned()))
}
