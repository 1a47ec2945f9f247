//! Event-source trigger reconciliation.
//!
//! Each configured trigger binds a stream or queue to the deployed
//! function. Reconciliation is create-first: the common case (first
//! deploy) needs a single round trip and no read-then-write race. When
//! creation reports that a mapping already exists, the existing
//! mapping's identity is looked up and an update is issued instead, so
//! redeploying with unchanged configuration never errors and never
//! duplicates a mapping.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, Result};

/// The remote service's opaque identifier for an existing mapping.
///
/// Only ever obtained from a listing after a creation conflict, used to
/// target the follow-up update, and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingIdentity(pub String);

impl std::fmt::Display for MappingIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where consumption of the event source begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartingPosition {
    #[default]
    TrimHorizon,
    Latest,
}

/// One declared trigger from the function configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventSourceSpec {
    /// Stream/queue locator.
    pub source_arn: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default)]
    pub starting_position: StartingPosition,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_batch_size() -> u32 {
    100
}

fn default_enabled() -> bool {
    true
}

impl EventSourceSpec {
    /// The invocation parameters this trigger wants on its mapping.
    pub fn params(&self) -> MappingParams {
        MappingParams {
            batch_size: self.batch_size,
            starting_position: self.starting_position,
            enabled: self.enabled,
        }
    }
}

/// Invocation parameters carried by a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingParams {
    pub batch_size: u32,
    pub starting_position: StartingPosition,
    pub enabled: bool,
}

/// A remote event-source mapping record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub identity: MappingIdentity,
    pub source_arn: String,
    pub function: String,
    pub params: MappingParams,
}

/// Outcome of a creation attempt.
///
/// "A mapping for this source and function already exists" is a tagged
/// variant, not an error: the reconciler pattern-matches on it rather
/// than inspecting error messages.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Mapping),
    Conflict,
}

/// Remote event-source API boundary.
///
/// A concrete cloud client implements this; tests use
/// [`crate::fakes::MemoryEventSourceApi`]. The client is stateless from
/// the reconciler's perspective and calls are awaited one at a time.
#[async_trait]
pub trait EventSourceApi: Send + Sync {
    /// Attempt to create a mapping from `source_arn` to `function`.
    async fn create_mapping(
        &self,
        source_arn: &str,
        function: &str,
        params: &MappingParams,
    ) -> std::result::Result<CreateOutcome, RemoteError>;

    /// List all mappings targeting `function`.
    async fn list_mappings(
        &self,
        function: &str,
    ) -> std::result::Result<Vec<Mapping>, RemoteError>;

    /// Replace the parameters of an existing mapping.
    async fn update_mapping(
        &self,
        identity: &MappingIdentity,
        params: &MappingParams,
    ) -> std::result::Result<(), RemoteError>;
}

/// What reconciliation did for one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// A new mapping was created.
    Created(MappingIdentity),
    /// An existing mapping was updated in place.
    Updated(MappingIdentity),
}

/// Reconcile every declared trigger against the remote service.
///
/// Triggers are handled sequentially, each ending in the `RECONCILED`
/// state or aborting the whole run: any remote failure other than the
/// create-conflict is fatal and surfaced verbatim. Disabled triggers
/// still reconcile — enablement is just a mapping parameter.
pub async fn reconcile(
    api: &dyn EventSourceApi,
    function: &str,
    triggers: &[EventSourceSpec],
) -> Result<Vec<ReconcileAction>> {
    let mut actions = Vec::with_capacity(triggers.len());

    for trigger in triggers {
        let params = trigger.params();
        let action = match api
            .create_mapping(&trigger.source_arn, function, &params)
            .await?
        {
            CreateOutcome::Created(mapping) => {
                tracing::info!(
                    source = %trigger.source_arn,
                    function,
                    identity = %mapping.identity,
                    "event source mapping created"
                );
                ReconcileAction::Created(mapping.identity)
            }
            CreateOutcome::Conflict => {
                let existing = api
                    .list_mappings(function)
                    .await?
                    .into_iter()
                    .find(|m| m.source_arn == trigger.source_arn)
                    .ok_or_else(|| RemoteError::MappingVanished {
                        source_arn: trigger.source_arn.clone(),
                        function: function.to_string(),
                    })?;

                api.update_mapping(&existing.identity, &params).await?;
                tracing::info!(
                    source = %trigger.source_arn,
                    function,
                    identity = %existing.identity,
                    "existing event source mapping updated"
                );
                ReconcileAction::Updated(existing.identity)
            }
        };
        actions.push(action);
    }

    Ok(actions)
}
