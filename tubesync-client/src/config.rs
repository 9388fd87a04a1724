//! Client configuration from flags and environment

use std::time::Duration;

use tubesync_core::session::DEFAULT_PING_INTERVAL;

/// Coordinator used when nothing else is configured
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8000/ws/demo-room";

/// Environment variable overriding the room URL
const URL_ENV: &str = "TUBESYNC_URL";

/// Environment variable overriding the ping interval (seconds, 0 disables)
const PING_ENV: &str = "TUBESYNC_PING_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Room URL to connect to
    pub url: String,
    /// Clock ping interval, `None` to disable
    pub ping_interval: Option<Duration>,
    /// Colored log output
    pub ansi: bool,
    /// Connect immediately on startup
    pub auto_connect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            ping_interval: Some(DEFAULT_PING_INTERVAL),
            ansi: true,
            auto_connect: true,
        }
    }
}

impl ClientConfig {
    /// Build from command-line arguments (without the program name) and an
    /// environment lookup. Flags win over the environment.
    ///
    /// Flags: `--url <url>`, `--ping-secs <n>`, `--no-ansi`, `--no-connect`,
    /// or a bare URL.
    pub fn from_sources<I, E>(args: I, env: E) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();

        if let Some(url) = env(URL_ENV) {
            config.url = url;
        }
        if let Some(secs) = env(PING_ENV) {
            config.ping_interval = parse_ping_secs(&secs)?;
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--url" => {
                    config.url = args.next().ok_or("--url needs a value")?;
                }
                "--ping-secs" => {
                    let secs = args.next().ok_or("--ping-secs needs a value")?;
                    config.ping_interval = parse_ping_secs(&secs)?;
                }
                "--no-ansi" => config.ansi = false,
                "--no-connect" => config.auto_connect = false,
                other if other.starts_with("--") => {
                    return Err(format!("unknown flag {}", other));
                }
                other => config.url = other.to_string(),
            }
        }

        Ok(config)
    }

    /// Build from the process arguments and environment
    pub fn from_env() -> Result<Self, String> {
        Self::from_sources(std::env::args().skip(1), |key| std::env::var(key).ok())
    }
}

fn parse_ping_secs(value: &str) -> Result<Option<Duration>, String> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid ping interval '{}'", value))?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_sources(Vec::new(), no_env).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.url, DEFAULT_URL);
    }

    #[test]
    fn test_flags() {
        let config = ClientConfig::from_sources(
            args(&["--url", "ws://host/ws/room", "--ping-secs", "0", "--no-ansi"]),
            no_env,
        )
        .unwrap();
        assert_eq!(config.url, "ws://host/ws/room");
        assert_eq!(config.ping_interval, None);
        assert!(!config.ansi);
        assert!(config.auto_connect);
    }

    #[test]
    fn test_bare_url_and_no_connect() {
        let config =
            ClientConfig::from_sources(args(&["--no-connect", "wss://sync.example/ws/x"]), no_env)
                .unwrap();
        assert_eq!(config.url, "wss://sync.example/ws/x");
        assert!(!config.auto_connect);
    }

    #[test]
    fn test_env_overrides_defaults_but_not_flags() {
        let env = |key: &str| match key {
            "TUBESYNC_URL" => Some("ws://env/ws/room".to_string()),
            "TUBESYNC_PING_SECS" => Some("5".to_string()),
            _ => None,
        };
        let config = ClientConfig::from_sources(Vec::new(), env).unwrap();
        assert_eq!(config.url, "ws://env/ws/room");
        assert_eq!(config.ping_interval, Some(Duration::from_secs(5)));

        let config = ClientConfig::from_sources(args(&["--url", "ws://flag/ws/room"]), env).unwrap();
        assert_eq!(config.url, "ws://flag/ws/room");
    }

    #[test]
    fn test_errors() {
        assert!(ClientConfig::from_sources(args(&["--url"]), no_env).is_err());
        assert!(ClientConfig::from_sources(args(&["--ping-secs", "abc"]), no_env).is_err());
        assert!(ClientConfig::from_sources(args(&["--verbose"]), no_env).is_err());
    }
}
