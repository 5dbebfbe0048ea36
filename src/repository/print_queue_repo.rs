// ==========================================
// 搅拌站配料控制系统 - 打印队列仓储
// ==========================================
// 文档: print_jobs/{location}
// 说明: 每个站点一个槽位,由外部打印监听程序读取
// ==========================================

use crate::domain::production::PrintJob;
use crate::repository::document_store::DocumentStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Arc;

pub const PRINT_JOBS_PREFIX: &str = "print_jobs/";

pub struct PrintQueueRepository {
    store: Arc<dyn DocumentStore>,
}

impl PrintQueueRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn key_of(location: &str) -> String {
        format!("{}{}", PRINT_JOBS_PREFIX, location.trim())
    }

    /// 写入打印任务（覆盖该站点上一条）
    pub fn enqueue(&self, location: &str, job: &PrintJob) -> RepositoryResult<()> {
        if location.trim().is_empty() {
            return Err(RepositoryError::ValidationError("打印站点不能为空".to_string()));
        }
        let value = serde_json::to_value(job)?;
        self.store.set(&Self::key_of(location), value)
    }

    pub fn find(&self, location: &str) -> RepositoryResult<Option<PrintJob>> {
        let key = Self::key_of(location);
        match self.store.get(&key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| RepositoryError::SerializationError {
                    key,
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// 打印完成后清除
    pub fn clear(&self, location: &str) -> RepositoryResult<bool> {
        self.store.delete(&Self::key_of(location))
    }
}
