use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for rdx
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub redaction: RedactionConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

/// Where rules come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSourceKind {
    /// SQLite rule store
    Store,
    /// Built-in defaults only
    Static,
}

/// Where audit events go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// `redaction_activity` and `audit_trail` tables
    #[default]
    Store,
    /// `rdx::audit` log target only
    Log,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub sink: AuditSinkKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_source")]
    pub source: RuleSourceKind,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// JSON keys blacked out when a request names none
    #[serde(default = "default_sensitive_fields")]
    pub sensitive_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_pdftotext")]
    pub pdftotext: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Take the requester IP from `X-Forwarded-For` (only behind a trusted proxy)
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: default_sensitive_fields(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            pdftotext: default_pdftotext(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trust_forwarded_for: false,
        }
    }
}

fn default_source() -> RuleSourceKind {
    RuleSourceKind::Store
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_sensitive_fields() -> Vec<String> {
    vec![
        "ssn".to_string(),
        "social_security_number".to_string(),
        "date_of_birth".to_string(),
        "patient_name".to_string(),
        "password".to_string(),
    ]
}

fn default_pdftotext() -> String {
    "pdftotext".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    17380
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            // Create default config file
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&path, content)?;
            Ok(config)
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "rdx", "rdx") {
            dirs.config_dir().join("config.toml")
        } else {
            std::env::temp_dir().join("rdx").join("config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rules.source, RuleSourceKind::Store);
        assert_eq!(config.rules.cache_ttl_secs, 3600);
        assert_eq!(config.server.port, 17380);
        assert!(config.storage.database_path.is_none());
        assert!(config.redaction.sensitive_fields.contains(&"ssn".to_string()));
        assert_eq!(config.audit.sink, AuditSinkKind::Store);
        assert!(!config.server.trust_forwarded_for);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.rules.cache_ttl_secs, config.rules.cache_ttl_secs);
        assert_eq!(parsed.extract.pdftotext, "pdftotext");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[rules]\nsource = \"static\"\ncache_ttl_secs = 60\n\n[server]\nport = 9000\ntrust_forwarded_for = true\n\n[audit]\nsink = \"log\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.rules.source, RuleSourceKind::Static);
        assert_eq!(config.rules.cache_ttl_secs, 60);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.extract.pdftotext, "pdftotext");
        assert!(config.server.trust_forwarded_for);
        assert_eq!(config.audit.sink, AuditSinkKind::Log);
    }

    #[test]
    fn test_config_path_is_absolute() {
        assert!(Config::config_path().is_absolute());
    }
}
