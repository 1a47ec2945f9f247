//! lambda-shipper core library
//!
//! Packages a serverless function's code and dependencies into a
//! deterministic zip archive and reconciles its event-source triggers
//! against the remote compute service. The produced archive is handed
//! to an external uploader; a concrete cloud API client implements
//! [`subscribers::EventSourceApi`].

pub mod archive;
pub mod collect;
pub mod config;
pub mod error;
pub mod fakes;
pub mod ignore;
pub mod package;
pub mod subscribers;
pub mod telemetry;
pub mod workspace;

pub use archive::{write_archive, BuiltArchive};
pub use config::{
    EnvStrategy, FunctionConfig, PackageSpec, VirtualenvSetting, DEFAULT_CONFIG_FILE,
    DEFAULT_ZIPFILE_NAME,
};
pub use error::{RemoteError, Result, ShipperError};
pub use ignore::IgnoreRuleSet;
pub use package::{build_package, build_package_with};
pub use subscribers::{
    reconcile, CreateOutcome, EventSourceApi, EventSourceSpec, Mapping, MappingIdentity,
    MappingParams, ReconcileAction, StartingPosition,
};
pub use telemetry::init_tracing;
pub use workspace::Workspace;

/// lambda-shipper version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
