//! Environment-based server configuration.
//!
//! Everything has a sensible default, so `novabill-server` starts with no
//! environment at all:
//!
//! | Variable        | Default       | Meaning                              |
//! |-----------------|---------------|--------------------------------------|
//! | `BIND_ADDR`     | `0.0.0.0`     | interface to listen on               |
//! | `PORT`          | `5000`        | TCP port                             |
//! | `DATABASE_PATH` | `novabill.db` | SQLite file; `:memory:` = ephemeral  |
//! | `EVENT_BUFFER`  | `256`         | change-feed ring buffer per process  |

use std::env;
use std::net::SocketAddr;

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// `None` means in-memory (`DATABASE_PATH=:memory:`).
    pub database_path: Option<String>,
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            database_path: Some("novabill.db".to_string()),
            event_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_path = match env::var("DATABASE_PATH") {
            Ok(path) if path == ":memory:" => None,
            Ok(path) => Some(path),
            Err(_) => defaults.database_path,
        };

        ServerConfig {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_path,
            event_buffer: env::var("EVENT_BUFFER")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.event_buffer),
        }
    }

    /// Socket address to bind, or an error message for a bad `BIND_ADDR`.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|e| format!("invalid bind address {}:{}: {e}", self.bind_addr, self.port))
    }
}
