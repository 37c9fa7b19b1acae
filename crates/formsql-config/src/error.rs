use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(formsql_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(formsql_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists: {0}")]
    #[diagnostic(
        code(formsql_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists(String),

    #[error("Invalid savepoint prefix: {0:?}")]
    #[diagnostic(
        code(formsql_config::invalid_savepoint_prefix),
        help("Use a non-empty prefix of ASCII letters, digits or underscores starting with a letter")
    )]
    InvalidSavepointPrefix(String),

    #[error("Invalid limit for `{0}`: must be greater than zero")]
    #[diagnostic(code(formsql_config::invalid_limit))]
    InvalidLimit(&'static str),

    #[error("IO error: {0}")]
    #[diagnostic(code(formsql_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
