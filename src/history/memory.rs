//! 内存历史存储
//!
//! VecDeque 按追加顺序保存；设置 capacity 时由存储淘汰最旧记录（账本本身从不删除）。

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::core::EngineError;
use crate::history::{ExecutionRecord, HistoryStore};

#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<VecDeque<ExecutionRecord>>,
    capacity: Option<usize>,
}

impl InMemoryHistoryStore {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// 最多保留 capacity 条（至少 1 条）
    pub fn bounded(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

fn poisoned() -> EngineError {
    EngineError::PersistenceError("history lock poisoned".to_string())
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, record: ExecutionRecord) -> Result<(), EngineError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.push_back(record);
        if let Some(cap) = self.capacity {
            while records.len() > cap {
                records.pop_front();
            }
        }
        Ok(())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>, EngineError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let take = limit.unwrap_or(records.len());
        Ok(records.iter().rev().take(take).cloned().collect())
    }

    async fn len(&self) -> Result<usize, EngineError> {
        Ok(self.records.read().map_err(|_| poisoned())?.len())
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        self.records.read().map(|_| ()).map_err(|_| poisoned())
    }
}
