//! Configuration loading errors.

/// Config load error
#[derive(Debug, Clone)]
pub enum ConfigLoadError {
    /// I/O error
    Io(String),
    /// Parse error
    Parse(String),
    /// `config:` names a profile that is not defined
    UnknownProfile(String),
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::Io(msg) => write!(f, "IO error: {}", msg),
            ConfigLoadError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigLoadError::UnknownProfile(name) => write!(f, "Unknown profile: {}", name),
        }
    }
}

impl std::error::Error for ConfigLoadError {}
