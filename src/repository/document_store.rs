// ==========================================
// 搅拌站配料控制系统 - 文档存储端口
// ==========================================
// 职责: 按 key 读写 JSON 文档 + 按 key 订阅变更
// 实现: InMemoryDocumentStore（测试）/ SqliteDocumentStore（应用）
// 约束: 整文档读改写,后写覆盖先写,不做乐观锁
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// 变更广播通道容量
const CHANGE_CHANNEL_CAPACITY: usize = 64;

// ==========================================
// DocumentChange - 文档变更事件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub key: String,
    pub value: Option<JsonValue>, // None 表示已删除
}

// ==========================================
// Subscription - 单个 key 的订阅
// ==========================================
// 丢弃即退订
pub struct Subscription {
    key: String,
    rx: broadcast::Receiver<DocumentChange>,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 等待该 key 的下一次变更; 存储被释放后返回 None
    pub async fn recv(&mut self) -> Option<DocumentChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.key == self.key => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(key = %self.key, skipped, "订阅落后，跳过旧变更");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// 非阻塞轮询
    pub fn try_recv(&mut self) -> Option<DocumentChange> {
        loop {
            match self.rx.try_recv() {
                Ok(change) if change.key == self.key => return Some(change),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// 显式退订
    pub fn unsubscribe(self) {
        tracing::debug!(key = %self.key, "退订文档变更");
    }
}

// ==========================================
// ChangeNotifier - 变更广播
// ==========================================
#[derive(Clone)]
struct ChangeNotifier {
    tx: broadcast::Sender<DocumentChange>,
}

impl ChangeNotifier {
    fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { tx }
    }

    fn notify(&self, key: &str, value: Option<JsonValue>) {
        // 无订阅者时 send 返回 Err,忽略即可
        let _ = self.tx.send(DocumentChange {
            key: key.to_string(),
            value,
        });
    }

    fn subscribe(&self, key: &str) -> Subscription {
        Subscription {
            key: key.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

// ==========================================
// DocumentStore Trait
// ==========================================
pub trait DocumentStore: Send + Sync {
    /// 读取文档
    fn get(&self, key: &str) -> RepositoryResult<Option<JsonValue>>;

    /// 写入文档（整体覆盖）
    fn set(&self, key: &str, value: JsonValue) -> RepositoryResult<()>;

    /// 删除文档,返回是否存在
    fn delete(&self, key: &str) -> RepositoryResult<bool>;

    /// 列出指定前缀的 key（升序）
    fn keys_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>>;

    /// 订阅单个 key 的变更
    fn subscribe(&self, key: &str) -> Subscription;
}

// ==========================================
// InMemoryDocumentStore
// ==========================================
pub struct InMemoryDocumentStore {
    docs: Mutex<BTreeMap<String, JsonValue>>,
    notifier: ChangeNotifier,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            notifier: ChangeNotifier::new(),
        }
    }

    fn lock_docs(&self) -> RepositoryResult<MutexGuard<'_, BTreeMap<String, JsonValue>>> {
        self.docs
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, key: &str) -> RepositoryResult<Option<JsonValue>> {
        Ok(self.lock_docs()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: JsonValue) -> RepositoryResult<()> {
        self.lock_docs()?.insert(key.to_string(), value.clone());
        self.notifier.notify(key, Some(value));
        Ok(())
    }

    fn delete(&self, key: &str) -> RepositoryResult<bool> {
        let existed = self.lock_docs()?.remove(key).is_some();
        if existed {
            self.notifier.notify(key, None);
        }
        Ok(existed)
    }

    fn keys_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        Ok(self
            .lock_docs()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn subscribe(&self, key: &str) -> Subscription {
        self.notifier.subscribe(key)
    }
}

// ==========================================
// SqliteDocumentStore
// ==========================================
// 表: documents(key TEXT PRIMARY KEY, value TEXT, updated_at TEXT)
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    notifier: ChangeNotifier,
}

impl SqliteDocumentStore {
    /// 基于共享连接创建（幂等建表）
    pub fn new(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let store = Self {
            conn,
            notifier: ChangeNotifier::new(),
        };
        {
            let conn = store.get_conn()?;
            crate::db::ensure_documents_table(&conn)?;
        }
        Ok(store)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, key: &str) -> RepositoryResult<Option<JsonValue>> {
        let conn = self.get_conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| RepositoryError::SerializationError {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: JsonValue) -> RepositoryResult<()> {
        {
            let conn = self.get_conn()?;
            conn.execute(
                r#"
                INSERT INTO documents (key, value, updated_at)
                VALUES (?1, ?2, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                params![key, value.to_string()],
            )?;
        }
        self.notifier.notify(key, Some(value));
        Ok(())
    }

    fn delete(&self, key: &str) -> RepositoryResult<bool> {
        let rows = {
            let conn = self.get_conn()?;
            conn.execute("DELETE FROM documents WHERE key = ?1", params![key])?
        };
        if rows > 0 {
            self.notifier.notify(key, None);
        }
        Ok(rows > 0)
    }

    fn keys_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT key FROM documents WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }

    fn subscribe(&self, key: &str) -> Subscription {
        self.notifier.subscribe(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sqlite_store() -> SqliteDocumentStore {
        let conn = Connection::open_in_memory().unwrap();
        SqliteDocumentStore::new(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn exercise_store(store: &dyn DocumentStore) {
        assert!(store.get("missing").unwrap().is_none());

        store.set("print_jobs/plant-a", json!({"n": 1})).unwrap();
        store.set("print_jobs/plant-b", json!({"n": 2})).unwrap();
        store.set("production_schedule", json!([])).unwrap();
        store.set("print_jobs/plant-a", json!({"n": 3})).unwrap();

        assert_eq!(store.get("print_jobs/plant-a").unwrap(), Some(json!({"n": 3})));
        assert_eq!(
            store.keys_with_prefix("print_jobs/").unwrap(),
            vec!["print_jobs/plant-a".to_string(), "print_jobs/plant-b".to_string()]
        );

        assert!(store.delete("print_jobs/plant-b").unwrap());
        assert!(!store.delete("print_jobs/plant-b").unwrap());
        assert_eq!(store.keys_with_prefix("print_jobs/").unwrap().len(), 1);
    }

    #[test]
    fn test_in_memory_store_crud() {
        exercise_store(&InMemoryDocumentStore::new());
    }

    #[test]
    fn test_sqlite_store_crud() {
        exercise_store(&sqlite_store());
    }

    #[test]
    fn test_try_recv_filters_by_key() {
        let store = InMemoryDocumentStore::new();
        let mut sub = store.subscribe("weight_sensor");
        assert!(sub.try_recv().is_none());

        store.set("other", json!(1)).unwrap();
        store.set("weight_sensor", json!({"semen": 5.0})).unwrap();

        let change = sub.try_recv().unwrap();
        assert_eq!(change.key, "weight_sensor");
        assert_eq!(change.value, Some(json!({"semen": 5.0})));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_recv_async_and_delete_notification() {
        let store = Arc::new(sqlite_store());
        let mut sub = store.subscribe("weight_sensor");

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            writer.set("weight_sensor", json!({"air": 1.0})).unwrap();
            writer.delete("weight_sensor").unwrap();
        });

        let first = sub.recv().await.unwrap();
        assert_eq!(first.value, Some(json!({"air": 1.0})));
        let second = sub.recv().await.unwrap();
        assert!(second.value.is_none());
        sub.unsubscribe();
    }
}
