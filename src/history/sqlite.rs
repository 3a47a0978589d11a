//! SQLite 历史存储
//!
//! 单表 execution_history，自增主键即追加顺序；result 以 JSON 文本保存。
//! rusqlite 为同步接口，所有调用放进 spawn_blocking。

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::core::EngineError;
use crate::history::{ExecutionRecord, HistoryStore};

pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

fn db_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::PersistenceError(e.to_string())
}

impl SqliteHistoryStore {
    /// 打开（或创建）数据库文件并建表；父目录不存在时自动创建
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(db_err)?;
            }
        }
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::with_connection(Connection::open_in_memory().map_err(db_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, EngineError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS execution_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sequence INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                task_description TEXT NOT NULL,
                result_json TEXT NOT NULL,
                duration_seconds REAL NOT NULL,
                model TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, EngineError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| EngineError::PersistenceError("sqlite lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(db_err)?
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, record: ExecutionRecord) -> Result<(), EngineError> {
        let result_json = serde_json::to_string(&record.result).map_err(db_err)?;
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO execution_history
                    (sequence, timestamp, agent_name, task_description, result_json, duration_seconds, model)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.sequence as i64,
                    record.timestamp.to_rfc3339(),
                    record.agent_name,
                    record.task_description,
                    result_json,
                    record.duration_seconds,
                    record.model,
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>, EngineError> {
        // SQLite 中 LIMIT -1 表示不限
        let limit = limit.map(|l| l.min(i64::MAX as usize) as i64).unwrap_or(-1);
        self.blocking(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT sequence, timestamp, agent_name, task_description, result_json, duration_seconds, model
                     FROM execution_history
                     ORDER BY id DESC
                     LIMIT ?1",
                )
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })
                .map_err(db_err)?;

            let mut records = Vec::new();
            for row in rows {
                let (sequence, ts, agent_name, task_description, result_json, duration_seconds, model) =
                    row.map_err(db_err)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts)
                    .map_err(db_err)?
                    .with_timezone(&Utc);
                let result = serde_json::from_str(&result_json).map_err(db_err)?;
                records.push(ExecutionRecord {
                    sequence: sequence as u64,
                    timestamp,
                    agent_name,
                    task_description,
                    result,
                    duration_seconds,
                    model,
                });
            }
            Ok(records)
        })
        .await
    }

    async fn len(&self) -> Result<usize, EngineError> {
        self.blocking(|conn| {
            let n: i64 = conn
                .query_row("SELECT COUNT(*) FROM execution_history", [], |row| row.get(0))
                .map_err(db_err)?;
            Ok(n as usize)
        })
        .await
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        self.blocking(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(db_err)?;
            Ok(())
        })
        .await
    }
}
