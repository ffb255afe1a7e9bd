use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::repos::{AuditRepo, RepoError};
use crate::cache::{CacheConfig, CacheTrigger, KvCache, MemoryBackend};
use crate::domain::entities::AuditLogRecord;

#[derive(Default)]
pub(crate) struct FakeAuditRepo {
    records: Mutex<Vec<AuditLogRecord>>,
}

impl FakeAuditRepo {
    pub(crate) fn actions(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|record| record.action.clone())
            .collect()
    }
}

#[async_trait]
impl AuditRepo for FakeAuditRepo {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().rev().take(limit as usize).cloned().collect())
    }
}

pub(crate) fn memory_trigger() -> CacheTrigger {
    let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(256).expect("non-zero")));
    CacheTrigger::new(KvCache::new(backend, CacheConfig::default()))
}
