//! In-memory fake of the remote event-source API (testing only)
//!
//! `MemoryEventSourceApi` satisfies the [`EventSourceApi`] contract
//! without any network: mappings live in a mutex-held table keyed by
//! (source, function), creation of a duplicate pair reports
//! [`CreateOutcome::Conflict`], and call counters let tests assert the
//! reconciler's exact round-trip behavior.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::subscribers::{
    CreateOutcome, EventSourceApi, Mapping, MappingIdentity, MappingParams,
};

type Key = (String, String); // (source_arn, function)

/// In-memory event-source mapping table.
#[derive(Debug, Default)]
pub struct MemoryEventSourceApi {
    mappings: Mutex<HashMap<Key, Mapping>>,
    create_calls: AtomicUsize,
    list_calls: AtomicUsize,
    update_calls: AtomicUsize,
    /// When set, every call fails with this message.
    fail_with: Mutex<Option<String>>,
}

impl MemoryEventSourceApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, to exercise fatal-error paths.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(message.into());
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of mappings currently held.
    pub fn mapping_count(&self) -> usize {
        self.mappings.lock().unwrap().len()
    }

    /// Snapshot of a mapping by source and function.
    pub fn mapping(&self, source_arn: &str, function: &str) -> Option<Mapping> {
        self.mappings
            .lock()
            .unwrap()
            .get(&(source_arn.to_string(), function.to_string()))
            .cloned()
    }

    fn check_failure(&self) -> std::result::Result<(), RemoteError> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(RemoteError::Api(message));
        }
        Ok(())
    }
}

#[async_trait]
impl EventSourceApi for MemoryEventSourceApi {
    async fn create_mapping(
        &self,
        source_arn: &str,
        function: &str,
        params: &MappingParams,
    ) -> std::result::Result<CreateOutcome, RemoteError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let key = (source_arn.to_string(), function.to_string());
        let mut mappings = self.mappings.lock().unwrap();
        if mappings.contains_key(&key) {
            return Ok(CreateOutcome::Conflict);
        }

        let mapping = Mapping {
            identity: MappingIdentity(uuid::Uuid::new_v4().to_string()),
            source_arn: source_arn.to_string(),
            function: function.to_string(),
            params: *params,
        };
        mappings.insert(key, mapping.clone());
        Ok(CreateOutcome::Created(mapping))
    }

    async fn list_mappings(
        &self,
        function: &str,
    ) -> std::result::Result<Vec<Mapping>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        Ok(self
            .mappings
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.function == function)
            .cloned()
            .collect())
    }

    async fn update_mapping(
        &self,
        identity: &MappingIdentity,
        params: &MappingParams,
    ) -> std::result::Result<(), RemoteError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let mut mappings = self.mappings.lock().unwrap();
        let mapping = mappings
            .values_mut()
            .find(|m| &m.identity == identity)
            .ok_or_else(|| RemoteError::Api(format!("no mapping with identity {identity}")))?;
        mapping.params = *params;
        Ok(())
    }
}
