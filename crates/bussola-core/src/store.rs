//! Persistence collaborator interface
//!
//! Storage of advisory reports lives outside this core (the hosting
//! application persists them wherever it likes); this module only defines
//! the boundary, plus an in-memory implementation for tests and
//! ephemeral runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::AdvisoryReport;

/// Stores and retrieves advisory reports by identifier
#[async_trait]
pub trait AdvisoryStore: Send + Sync {
    async fn save(&self, id: &str, report: &AdvisoryReport) -> Result<()>;

    async fn load(&self, id: &str) -> Result<Option<AdvisoryReport>>;
}

/// In-memory advisory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    reports: Arc<RwLock<HashMap<String, AdvisoryReport>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdvisoryStore for MemoryStore {
    async fn save(&self, id: &str, report: &AdvisoryReport) -> Result<()> {
        let mut reports = self
            .reports
            .write()
            .map_err(|_| Error::Config("advisory store lock poisoned".into()))?;
        reports.insert(id.to_string(), report.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<AdvisoryReport>> {
        let reports = self
            .reports
            .read()
            .map_err(|_| Error::Config("advisory store lock poisoned".into()))?;
        Ok(reports.get(id).cloned())
    }
}
