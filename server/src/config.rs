//! Server configuration

use std::time::Duration;

/// A development profile created in the in-memory store at startup, given on
/// the command line as `uid:token:display name`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedProfile {
    pub uid: String,
    pub token: String,
    pub display_name: String,
}

impl std::str::FromStr for SeedProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(uid), Some(token), Some(name))
                if !uid.is_empty() && !token.is_empty() && !name.trim().is_empty() =>
            {
                Ok(SeedProfile {
                    uid: uid.to_string(),
                    token: token.to_string(),
                    display_name: name.trim().to_string(),
                })
            }
            _ => Err(format!(
                "expected uid:token:display name, got '{}'",
                value
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    pub throwable_ttl: Duration,
    pub leaderboard_size: usize,
    pub leaderboard_refresh: Duration,
    pub handshake_timeout: Duration,
    /// Capacity of each connection's outbound queue
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_connections: 512,
            throwable_ttl: Duration::from_millis(shared::THROWABLE_TTL_MS),
            leaderboard_size: 10,
            leaderboard_refresh: Duration::from_secs(300),
            handshake_timeout: Duration::from_secs(10),
            outbound_queue: 256,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
