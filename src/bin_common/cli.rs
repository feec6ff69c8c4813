//! CLI utilities for binaries
//!
//! Handles configuration loading, environment variables, logging setup and
//! argument parsing for all binary executables.

use socketlink::{Method, RequestDescriptor, Result, SocketLinkError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Client configuration (config/socketlink.yaml)
    Client,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Client => "config/socketlink.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        "SOCKETLINK_CONFIG_PATH"
    }
}

/// Load configuration path from environment or use default
///
/// A custom path always wins over the environment.
///
/// # Examples
/// ```
/// use socketlink_cli::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Custom("my.yaml".to_string()));
/// assert_eq!(path.to_str(), Some("my.yaml"));
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return path.into();
    }
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Build a request from `<method> <path> [json-body]`
pub fn parse_request(args: &[String]) -> Result<RequestDescriptor> {
    let (method, path) = match args {
        [method, path, ..] => (method, path),
        _ => {
            return Err(SocketLinkError::InvalidRequest(
                "usage: socket_request <method> <path> [json-body]".into(),
            ))
        }
    };

    let method: Method = method.parse()?;
    let mut request = RequestDescriptor::new(method, path.as_str());

    if let Some(body) = args.get(2) {
        request = request.body(serde_json::from_str(body)?);
    }
    if args.len() > 3 {
        return Err(SocketLinkError::InvalidRequest(format!(
            "unexpected arguments: {}",
            args[3..].join(" ")
        )));
    }

    Ok(request)
}

/// Initialize tracing, honouring `RUST_LOG` and defaulting to `info`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_type_paths() {
        assert_eq!(ConfigType::Client.default_path(), "config/socketlink.yaml");

        let custom = ConfigType::Custom("custom/path.yaml".to_string());
        assert_eq!(custom.default_path(), "custom/path.yaml");
    }

    #[test]
    fn test_parse_request() {
        let request = parse_request(&args(&["GET", "/hello"])).unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "/hello");
        assert_eq!(request.body, None);

        let request = parse_request(&args(&["post", "/todos", r#"{"title":"a"}"#])).unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, Some(json!({"title": "a"})));
    }

    #[test]
    fn test_parse_request_errors() {
        assert!(matches!(
            parse_request(&args(&["get"])),
            Err(SocketLinkError::InvalidRequest(_))
        ));
        assert!(parse_request(&args(&["fetch", "/x"])).is_err());
        assert!(matches!(
            parse_request(&args(&["post", "/x", "{not json"])),
            Err(SocketLinkError::Serialization(_))
        ));
        assert!(parse_request(&args(&["get", "/x", "1", "extra"])).is_err());
    }
}
