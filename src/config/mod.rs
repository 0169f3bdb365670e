// Configuration module entry point
// Loads layered configuration and exposes the read-only application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, RoutesConfig};

/// Config file looked up when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest priority first: built-in defaults, the config file (optional),
    /// `CONVERTER__SECTION__KEY` environment variables.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("CONVERTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 10099)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 0)?
            .set_default("performance.shutdown_grace", 5)?
            .set_default("http.server_name", "convert-server")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 0)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/convert-server").unwrap();
        assert_eq!(cfg.http.max_body_size, 0);
        assert!(cfg.routes.health.enabled);
        assert_eq!(cfg.routes.health.liveness_path, "/healthz");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.performance.connection_timeout, 0);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("convert-server-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("server.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nhost = \"127.0.0.1\"\nport = 18080\n\n[http]\nenable_cors = true\nmax_body_size = 1024\n\n[routes.health]\nenabled = false"
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "127.0.0.1:18080");
        assert!(cfg.http.enable_cors);
        assert_eq!(cfg.http.max_body_size, 1024);
        assert!(!cfg.routes.health.enabled);
        assert_eq!(cfg.routes.health.readiness_path, "/readyz");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_address() {
        let mut cfg = Config::load_from("does-not-exist/convert-server").unwrap();
        cfg.server.host = "not an ip".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
