//! Error taxonomy for the packaging pipeline and reconciler.

use venv_manager::EnvError;

/// Errors produced while building a deployment package or reconciling
/// event-source triggers.
#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    /// Invalid or conflicting packaging options. Raised before any
    /// filesystem mutation wherever feasible.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The dependency installer environment could not be provisioned.
    /// The workspace is left on disk for inspection.
    #[error("provisioning failed: {0}")]
    Provisioning(#[source] EnvError),

    /// Filesystem failure during collection or archiving.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive container failure.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Non-conflict remote API failure, surfaced verbatim.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl From<EnvError> for ShipperError {
    fn from(err: EnvError) -> Self {
        match err {
            // A bad explicit environment path is a caller mistake, not an
            // installer failure.
            EnvError::InvalidEnvironment(path) => ShipperError::Configuration(format!(
                "not a valid environment: {}",
                path.display()
            )),
            other => ShipperError::Provisioning(other),
        }
    }
}

/// Failures reported by the remote event-source API.
///
/// The "mapping already exists" conflict is deliberately *not* a variant
/// here: it is an expected control-flow signal modelled as
/// [`crate::subscribers::CreateOutcome::Conflict`].
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Creation reported a conflict but the follow-up listing had no
    /// mapping for the trigger's source. Remote state changed under us.
    #[error("mapping for source {source_arn} on function {function} reported a conflict but was not listed")]
    MappingVanished { source_arn: String, function: String },

    /// Any other remote API failure.
    #[error("remote api failure: {0}")]
    Api(String),
}

/// Result type for packaging and reconciliation operations.
pub type Result<T> = std::result::Result<T, ShipperError>;
