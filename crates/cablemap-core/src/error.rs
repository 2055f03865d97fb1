pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The node/port/mode combination is not one the planner supports.
    #[error("Invalid topology: {message}")]
    InvalidSpec { message: String },

    #[error("Unsupported rack-aware architecture option: {option:?} (expected A, B, C or D)")]
    UnsupportedArchitectureOption { option: String },

    #[error("Topology JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Topology YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }
}
