use sitelens_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("{artifact} not found at {}. Run `sitelens {command}` first.", path.display())]
    MissingArtifact {
        artifact: &'static str,
        path: PathBuf,
        command: &'static str,
    },

    #[error("PageSpeed Insights API key is required. Pass --api-key or set {0}.")]
    MissingApiKey(&'static str),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

pub type Result<T> = std::result::Result<T, AuditError>;
