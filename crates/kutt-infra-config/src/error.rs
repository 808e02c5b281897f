use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Stack file for '{0}' not found. Looked for:\n\
        - $KUTT_INFRA_CONFIG\n\
        - Kutt.{0}.local.yaml, Kutt.{0}.yaml in the current directory\n\
        - the same names under ./.kutt-infra/\n\
        - ~/.config/kutt-infra/Kutt.{0}.yaml"
    )]
    StackFileNotFound(String),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Missing required configuration value '{0}'")]
    MissingValue(String),

    #[error("Missing required secret '{0}'")]
    MissingSecret(String),

    #[error("Stack reference '{0}' not found")]
    ReferenceNotFound(String),

    #[error("Stack reference '{stack}' has no output '{key}'")]
    MissingReferenceOutput { stack: String, key: String },

    #[error("Invalid stack file: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
