use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoSyncError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("GOOGLE_MAPS_API_KEY is not set. Set it in the environment or with `geo-sync config --set-api-key KEY`")]
    MissingApiKey,

    #[error("Cannot open sheet: {0}")]
    SourceUnavailable(String),

    #[error("Lookup failed for {query:?}: {reason}")]
    LookupFailed { query: String, reason: String },

    #[error("Admin form: {0}")]
    FormInteractionFailed(String),

    #[error("Sheet write rejected: {0}")]
    WriteFailed(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error(transparent)]
    Common(#[from] geo_sync_common::Error),
}

impl GeoSyncError {
    pub fn lookup(query: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        GeoSyncError::LookupFailed {
            query: query.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors that end the whole pass regardless of row policy
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GeoSyncError::SourceUnavailable(_)
                | GeoSyncError::WriteFailed(_)
                | GeoSyncError::Config(_)
                | GeoSyncError::MissingApiKey
                | GeoSyncError::Auth(_)
        )
    }
}

impl From<calamine::Error> for GeoSyncError {
    fn from(e: calamine::Error) -> Self {
        GeoSyncError::Workbook(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for GeoSyncError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        GeoSyncError::Workbook(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoSyncError>;
