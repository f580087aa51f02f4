//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::envelope::{TypeRegistry, DEFAULT_TYPES};
use crate::error::{Error, Result};

/// Port used when only a host is given
pub const DEFAULT_PORT: u16 = 5100;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Directory served at `/` (expects an `index.html`)
    pub static_dir: Option<PathBuf>,

    /// Accepted envelope type tags
    pub types: Vec<String>,

    /// Subscription type used when the request names none or an unknown one
    pub default_type: String,

    /// Largest accepted publish body in bytes
    pub max_body_size: usize,

    /// Largest accepted inbound WebSocket message in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            static_dir: None,
            types: DEFAULT_TYPES.iter().map(|t| t.to_string()).collect(),
            default_type: DEFAULT_TYPES[0].to_string(),
            max_body_size: 1024 * 1024, // 1MB
            max_message_size: 64 * 1024,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Serve static files from `dir`
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Set the accepted type tags
    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fallback subscription type
    pub fn default_type(mut self, kind: impl Into<String>) -> Self {
        self.default_type = kind.into();
        self
    }

    /// Set the publish body limit
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(Error::Config("no envelope types configured".into()));
        }
        if !self.types.contains(&self.default_type) {
            return Err(Error::Config(format!(
                "default type '{}' is not one of {:?}",
                self.default_type, self.types
            )));
        }
        Ok(())
    }

    /// Build the submission validator for this configuration
    pub fn type_registry(&self) -> TypeRegistry {
        TypeRegistry::new(self.types.iter().cloned())
    }
}

/// Parse a listen address
///
/// Accepts formats:
/// - "5100" -> 0.0.0.0:5100
/// - "localhost" -> 127.0.0.1:5100
/// - "localhost:5200" -> 127.0.0.1:5200
/// - "127.0.0.1" -> 127.0.0.1:5100
/// - "0.0.0.0:5100" -> 0.0.0.0:5100
pub fn parse_bind_addr(arg: &str) -> Result<SocketAddr> {
    if let Ok(port) = arg.parse::<u16>() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(Error::Config(format!(
        "invalid listen address '{}', expected PORT, IP, IP:PORT or 'localhost'",
        arg
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.types, vec!["octavebands", "frequencybins"]);
        assert_eq!(config.default_type, "octavebands");
        assert!(config.static_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:5200".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .static_dir("/srv/view")
            .types(["spectra"])
            .default_type("spectra")
            .max_body_size(4096);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.static_dir, Some(PathBuf::from("/srv/view")));
        assert_eq!(config.max_body_size, 4096);
        assert!(config.validate().is_ok());
        assert!(config.type_registry().is_valid_type("spectra"));
    }

    #[test]
    fn test_validate_rejects_unknown_default_type() {
        let config = ServerConfig::default().default_type("spectra");
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ServerConfig::default().types(Vec::<String>::new());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_bind_addr() {
        assert_eq!(
            parse_bind_addr("5300").unwrap(),
            "0.0.0.0:5300".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("localhost").unwrap(),
            "127.0.0.1:5100".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("localhost:5200").unwrap(),
            "127.0.0.1:5200".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("10.0.0.1").unwrap(),
            "10.0.0.1:5100".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_bind_addr("nope:xx").is_err());
    }
}
