use thiserror::Error;

pub type MixerResult<T> = Result<T, MixerError>;

#[derive(Error, Debug)]
pub enum MixerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("Workbook is missing required part '{0}'")]
    MissingEntry(String),

    #[error("no {0} table found")]
    TableNotFound(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl MixerError {
    /// Wrap a quick-xml failure with the package part it came from.
    pub fn xml(part: impl Into<String>, err: impl std::fmt::Display) -> Self {
        MixerError::Xml {
            part: part.into(),
            message: err.to_string(),
        }
    }

    /// True for failures scoped to a single table lookup.
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, MixerError::TableNotFound(_))
    }
}
