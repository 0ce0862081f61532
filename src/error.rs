use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FangstError {
    #[error("missing config file fangstdata.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("api request failed: {0}")]
    ApiHttp(String),

    #[error("api returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("river not found in store: {0}")]
    RiverNotFound(i64),

    #[error("station not found in store: {0}")]
    StationNotFound(i64),

    #[error("failed to build chart data: {0}")]
    Chart(String),

    #[error("failed to format export rows: {0}")]
    Export(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
