//! 执行历史账本
//!
//! ExecutionLedger 是唯一的写入方：append 经由一把追加锁串行化，保证追加顺序 = 完成顺序；
//! 具体存储（内存 / SQLite）实现 HistoryStore，保留与淘汰策略属于存储自身。

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::{EngineError, ExecutionResult};

pub use memory::InMemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

/// 一条执行记录，追加后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// 账本分配的追加序号（从 1 开始）
    #[serde(default)]
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub task_description: String,
    pub result: ExecutionResult,
    pub duration_seconds: f64,
    pub model: String,
}

impl ExecutionRecord {
    pub fn new(result: &ExecutionResult) -> Self {
        Self {
            sequence: 0,
            timestamp: Utc::now(),
            agent_name: result.agent.clone(),
            task_description: result.task.clone(),
            result: result.clone(),
            duration_seconds: result.duration_seconds,
            model: result.model.clone(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_success()
    }
}

/// 历史存储：追加与按新旧倒序读取
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: ExecutionRecord) -> Result<(), EngineError>;

    /// 最新在前；limit 为 None 时返回全部
    async fn list(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>, EngineError>;

    /// 存储中的记录数
    async fn len(&self) -> Result<usize, EngineError>;

    /// 健康探测，/health 使用
    async fn health_check(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// 账本：持有存储与追加锁（锁内维护下一个序号）
pub struct ExecutionLedger {
    store: Arc<dyn HistoryStore>,
    append_lock: Mutex<u64>,
}

impl ExecutionLedger {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            append_lock: Mutex::new(0),
        }
    }

    /// 基于已有记录的存储创建账本，序号从现有记录数之后继续
    pub async fn resume(store: Arc<dyn HistoryStore>) -> Result<Self, EngineError> {
        let existing = store.len().await? as u64;
        Ok(Self {
            store,
            append_lock: Mutex::new(existing),
        })
    }

    /// 无界内存账本
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryHistoryStore::unbounded()))
    }

    /// 串行追加；存储失败只影响本次调用，序号不前进
    pub async fn append(&self, mut record: ExecutionRecord) -> Result<u64, EngineError> {
        let mut last = self.append_lock.lock().await;
        let seq = *last + 1;
        record.sequence = seq;
        self.store.append(record).await?;
        *last = seq;
        Ok(seq)
    }

    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>, EngineError> {
        self.store.list(limit).await
    }

    pub async fn len(&self) -> Result<usize, EngineError> {
        self.store.len().await
    }

    pub async fn health_check(&self) -> Result<(), EngineError> {
        self.store.health_check().await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// 第一次追加失败，之后正常
    struct FlakyStore {
        inner: InMemoryHistoryStore,
        failed_once: AtomicBool,
    }

    #[async_trait]
    impl HistoryStore for FlakyStore {
        async fn append(&self, record: ExecutionRecord) -> Result<(), EngineError> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(EngineError::PersistenceError("disk full".into()));
            }
            self.inner.append(record).await
        }

        async fn list(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>, EngineError> {
            self.inner.list(limit).await
        }

        async fn len(&self) -> Result<usize, EngineError> {
            self.inner.len().await
        }
    }

    #[tokio::test]
    async fn test_list_limit_most_recent_first() {
        let ledger = ExecutionLedger::in_memory();
        for i in 0..5 {
            ledger.append(record(&format!("task {i}"))).await.unwrap();
        }
        let recent = ledger.list(Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].task_description, "task 4");
        assert_eq!(recent[1].task_description, "task 3");
        assert_eq!(ledger.list(None).await.unwrap().len(), 5);
        assert_eq!(ledger.list(Some(50)).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_persistence_error_does_not_block_future_appends() {
        let ledger = ExecutionLedger::new(Arc::new(FlakyStore {
            inner: InMemoryHistoryStore::unbounded(),
            failed_once: AtomicBool::new(false),
        }));
        let err = ledger.append(record("a")).await.unwrap_err();
        assert!(matches!(err, EngineError::PersistenceError(_)));
        assert_eq!(ledger.append(record("b")).await.unwrap(), 1);
        assert_eq!(ledger.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_unique_sequences() {
        let ledger = Arc::new(ExecutionLedger::in_memory());
        let mut handles = Vec::new();
        for i in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.append(record(&format!("t{i}"))).await.unwrap()
            }));
        }
        let mut seqs = Vec::new();
        for h in handles {
            seqs.push(h.await.unwrap());
        }
        seqs.sort();
        assert_eq!(seqs, (1..=20).collect::<Vec<_>>());

        let listed = ledger.list(None).await.unwrap();
        let listed_seqs: Vec<u64> = listed.iter().map(|r| r.sequence).collect();
        assert_eq!(listed_seqs, (1..=20).rev().collect::<Vec<_>>());
    }
}
