//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that is
//! populated from defaults, then from environment variables (a `.env` file
//! is loaded first when present).

use super::context::Credential;
use super::error::{Error, Result};
use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Default operating instructions sent to STDIO clients on `initialize`.
const DEFAULT_INSTRUCTIONS: &str = "This server manages projects, services and deployments on the \
remote infrastructure platform. Identifiers (projectId, serviceId, processId) come from the \
*_list tools. Mutating operations return a process: poll it with process_status until it \
finishes. Use knowledge_search and platform_guide before guessing service types or config.";

/// Main configuration structure for the MCP server.
///
/// This struct contains all configurable aspects of the server, organized
/// by domain for clarity and maintainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Upstream API credentials configuration.
    pub credentials: CredentialsConfig,

    /// Upstream service endpoints and timeouts.
    pub upstream: UpstreamConfig,

    /// Deployment CLI configuration.
    pub deploy: DeployConfig,

    /// Security and path validation configuration.
    pub security: SecurityConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,

    /// Free-text operating instructions returned to STDIO clients.
    pub instructions: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read `MCP_LOG_LEVEL`. `main` calls this before [`Config::from_env`].
    pub fn from_env() -> Self {
        let mut logging = Self::default();
        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            logging.level = level;
        }
        logging
    }
}

/// Configuration for upstream API credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// API token used by the STDIO transport for the whole session.
    pub api_token: Option<String>,

    /// Allow the STDIO transport to start without a token (local testing only).
    pub skip_validation: bool,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("skip_validation", &self.skip_validation)
            .finish()
    }
}

impl CredentialsConfig {
    /// Resolve the session credential for the STDIO transport.
    ///
    /// Fails when no token is configured unless validation is explicitly
    /// skipped, in which case the session runs without a credential and
    /// every platform tool reports the missing credential on its own.
    pub fn pipe_credential(&self) -> Result<Option<Credential>> {
        match self.api_token.as_deref().and_then(Credential::new) {
            Some(credential) => Ok(Some(credential)),
            None if self.skip_validation => {
                warn!(
                    "MCP_API_TOKEN not set and credential validation skipped - \
                     platform tools will report a missing credential"
                );
                Ok(None)
            }
            None => Err(Error::config(
                "MCP_API_TOKEN is not set. The STDIO transport needs an API token for the \
                 upstream platform (set MCP_SKIP_CREDENTIAL_CHECK=true to start without one \
                 for local testing)",
            )),
        }
    }
}

/// Upstream service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the infrastructure platform API.
    pub api_url: String,

    /// Base URL of the knowledge service.
    pub knowledge_url: String,

    /// Timeout applied to every outbound HTTP call, in seconds.
    pub request_timeout_secs: u64,

    /// Freshness window of cached guides, in seconds.
    pub guide_ttl_secs: u64,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn guide_ttl(&self) -> Duration {
        Duration::from_secs(self.guide_ttl_secs)
    }
}

/// Deployment CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Program invoked for deployments (name on PATH or absolute path).
    pub cli_program: String,

    /// Environment variable through which the credential reaches the CLI.
    pub token_env: String,

    /// Upper bound for a single deployment, in seconds.
    pub timeout_secs: u64,
}

impl DeployConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for security and path validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Optional root directory for deployment working directories.
    /// If None, no path restrictions are enforced.
    pub root_path: Option<PathBuf>,

    /// Whether to allow symlinks in path validation.
    /// If true, symlinks are followed and their targets are validated.
    /// If false, symlinks pointing outside the root are rejected.
    pub allow_symlinks: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            // No root path restriction by default
            root_path: None,
            // Allow symlinks by default with validation
            allow_symlinks: true,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.platform.example/v1".to_string(),
            knowledge_url: "https://knowledge.platform.example".to_string(),
            request_timeout_secs: 10,
            guide_ttl_secs: 600,
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            cli_program: "platform-cli".to_string(),
            token_env: "PLATFORM_TOKEN".to_string(),
            timeout_secs: 600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "infra-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instructions: DEFAULT_INSTRUCTIONS.to_string(),
            },
            logging: LoggingConfig::default(),
            transport: TransportConfig::default(),
            credentials: CredentialsConfig::default(),
            upstream: UpstreamConfig::default(),
            deploy: DeployConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`, `MCP_API_TOKEN`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(instructions) = std::env::var("MCP_INSTRUCTIONS") {
            config.server.instructions = instructions;
        }

        config.logging = LoggingConfig::from_env();

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        // Load credentials
        if let Ok(token) = std::env::var("MCP_API_TOKEN") {
            if !token.trim().is_empty() {
                config.credentials.api_token = Some(token);
                info!("API token loaded from environment");
            }
        }

        if let Ok(skip) = std::env::var("MCP_SKIP_CREDENTIAL_CHECK") {
            config.credentials.skip_validation = parse_flag(&skip);
        }

        // Load upstream endpoints
        if let Ok(url) = std::env::var("MCP_API_URL") {
            config.upstream.api_url = url;
        }

        if let Ok(url) = std::env::var("MCP_KNOWLEDGE_URL") {
            config.upstream.knowledge_url = url;
        }

        if let Some(secs) = env_secs("MCP_REQUEST_TIMEOUT_SECS") {
            config.upstream.request_timeout_secs = secs;
        }

        if let Some(secs) = env_secs("MCP_GUIDE_TTL_SECS") {
            config.upstream.guide_ttl_secs = secs;
        }

        // Load deployment CLI configuration
        if let Ok(program) = std::env::var("MCP_DEPLOY_CLI") {
            config.deploy.cli_program = program;
        }

        if let Ok(name) = std::env::var("MCP_DEPLOY_TOKEN_ENV") {
            config.deploy.token_env = name;
        }

        if let Some(secs) = env_secs("MCP_DEPLOY_TIMEOUT_SECS") {
            config.deploy.timeout_secs = secs;
        }

        // Load security configuration
        if let Ok(root_path) = std::env::var("MCP_ROOT_PATH") {
            config.security.root_path = Some(PathBuf::from(root_path));
            info!(
                "Path security enabled: deploy directories restricted to {:?}",
                config.security.root_path
            );
        } else {
            warn!(
                "MCP_ROOT_PATH not set - no path restrictions active. \
                 Any directory may be used as a deploy working directory."
            );
        }

        if let Ok(allow_symlinks) = std::env::var("MCP_ALLOW_SYMLINKS") {
            config.security.allow_symlinks = parse_flag(&allow_symlinks);
            info!("Symlinks allowed: {}", config.security.allow_symlinks);
        }

        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_secs(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!("Ignoring {}={:?}: expected a whole number of seconds", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_credentials_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_API_TOKEN", "test_token_12345");
        }
        let config = Config::from_env();
        assert_eq!(
            config.credentials.api_token.as_deref(),
            Some("test_token_12345")
        );
        unsafe {
            std::env::remove_var("MCP_API_TOKEN");
        }
    }

    #[test]
    fn test_timeouts_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_REQUEST_TIMEOUT_SECS", "3");
            std::env::set_var("MCP_DEPLOY_TIMEOUT_SECS", "not-a-number");
        }
        let config = Config::from_env();
        assert_eq!(config.upstream.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.deploy.timeout(), Duration::from_secs(600));
        unsafe {
            std::env::remove_var("MCP_REQUEST_TIMEOUT_SECS");
            std::env::remove_var("MCP_DEPLOY_TIMEOUT_SECS");
        }
    }

    #[test]
    fn test_log_level_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_LOG_LEVEL", "debug");
        }
        assert_eq!(LoggingConfig::from_env().level, "debug");
        assert_eq!(Config::from_env().logging.level, "debug");
        unsafe {
            std::env::remove_var("MCP_LOG_LEVEL");
        }
        assert_eq!(LoggingConfig::from_env().level, "info");
    }

    #[test]
    fn test_credentials_redacted_in_debug() {
        let creds = CredentialsConfig {
            api_token: Some("super_secret_token".to_string()),
            skip_validation: false,
        };
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("super_secret_token"));
    }

    #[test]
    fn test_pipe_credential_required() {
        let creds = CredentialsConfig::default();
        let err = creds.pipe_credential().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("MCP_API_TOKEN"));
    }

    #[test]
    fn test_pipe_credential_blank_token_rejected() {
        let creds = CredentialsConfig {
            api_token: Some("   ".to_string()),
            skip_validation: false,
        };
        assert!(creds.pipe_credential().is_err());
    }

    #[test]
    fn test_pipe_credential_skip_validation() {
        let creds = CredentialsConfig {
            api_token: None,
            skip_validation: true,
        };
        assert!(creds.pipe_credential().unwrap().is_none());
    }

    #[test]
    fn test_pipe_credential_present() {
        let creds = CredentialsConfig {
            api_token: Some("tok".to_string()),
            skip_validation: false,
        };
        let credential = creds.pipe_credential().unwrap().unwrap();
        assert_eq!(credential.expose(), "tok");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
