//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default knowledge file, relative to the working directory.
pub const DEFAULT_KNOWLEDGE_FILE: &str = "knowledge_base.json";

/// Default port for the HTTP server.
pub const DEFAULT_PORT: u16 = 5000;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path of the knowledge file.
    pub knowledge_file: PathBuf,
    /// Append diagnostics to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Console chat settings.
    pub chat: ChatConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            knowledge_file: PathBuf::from(DEFAULT_KNOWLEDGE_FILE),
            log_file: None,
            chat: ChatConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Console chat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Ask for confirmation after each answer and offer a correction.
    pub confirm_answers: bool,
    /// Colorize speaker prefixes.
    pub color: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            confirm_answers: false,
            color: true,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    /// The `host:port` listen address.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.knowledge_file, PathBuf::from("knowledge_base.json"));
        assert!(config.log_file.is_none());
        assert!(!config.chat.confirm_answers);
        assert!(config.chat.color);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.address(), "127.0.0.1:5000");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            log_file = "chatbot.log"

            [server]
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.log_file, Some(PathBuf::from("chatbot.log")));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.knowledge_file, PathBuf::from(DEFAULT_KNOWLEDGE_FILE));
    }
}
