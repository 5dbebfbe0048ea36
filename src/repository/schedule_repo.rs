// ==========================================
// 搅拌站配料控制系统 - 生产计划仓储
// ==========================================
// 文档: production_schedule (ScheduleRowRecord 数组)
// 约束: 整表读改写,后写覆盖先写（多标签页并发写会丢更新）
// ==========================================

use crate::domain::schedule::{ScheduleRow, ScheduleRowRecord};
use crate::repository::document_store::{DocumentStore, Subscription};
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Arc;

pub const SCHEDULE_KEY: &str = "production_schedule";

pub struct ScheduleRepository {
    store: Arc<dyn DocumentStore>,
}

impl ScheduleRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 读取边界记录（字符串形式）
    pub fn load_records(&self) -> RepositoryResult<Vec<ScheduleRowRecord>> {
        match self.store.get(SCHEDULE_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                RepositoryError::SerializationError {
                    key: SCHEDULE_KEY.to_string(),
                    message: e.to_string(),
                }
            }),
            None => Ok(Vec::new()),
        }
    }

    /// 读取并解析为类型化计划行（不做重算）
    pub fn load(&self) -> RepositoryResult<Vec<ScheduleRow>> {
        Ok(self
            .load_records()?
            .iter()
            .map(ScheduleRow::from_record)
            .collect())
    }

    /// 整表写回
    pub fn save(&self, rows: &[ScheduleRow]) -> RepositoryResult<()> {
        let records: Vec<ScheduleRowRecord> = rows.iter().map(ScheduleRow::to_record).collect();
        let value = serde_json::to_value(&records)?;
        self.store.set(SCHEDULE_KEY, value)?;
        tracing::debug!(rows = rows.len(), "生产计划已写回");
        Ok(())
    }

    /// 订阅计划变更
    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe(SCHEDULE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ScheduleStatus;
    use crate::repository::document_store::InMemoryDocumentStore;
    use serde_json::json;

    #[test]
    fn test_load_empty_when_missing() {
        let repo = ScheduleRepository::new(Arc::new(InMemoryDocumentStore::new()));
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_parses_string_fields() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .set(
                SCHEDULE_KEY,
                json!([{"no": "A1", "volume": "10", "terkirim": "x", "status": "Proses"}]),
            )
            .unwrap();
        let repo = ScheduleRepository::new(store);
        let rows = repo.load().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].volume, 10.0);
        assert_eq!(rows[0].delivered, 0.0);
        assert_eq!(rows[0].status, Some(ScheduleStatus::Proses));
    }

    #[test]
    fn test_save_writes_wire_format() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = ScheduleRepository::new(store.clone());
        let mut row = ScheduleRow::new("A1", 10.0);
        row.delivered = 10.0;
        row.remaining = Some(0.0);
        row.total = Some(10.0);
        row.status = Some(ScheduleStatus::Selesai);
        repo.save(&[row]).unwrap();

        let raw = store.get(SCHEDULE_KEY).unwrap().unwrap();
        assert_eq!(raw[0]["terkirim"], "10.00");
        assert_eq!(raw[0]["sisa"], "0.00");
        assert_eq!(raw[0]["totalVol"], "10.00");
        assert_eq!(raw[0]["status"], "Selesai");
    }

    #[test]
    fn test_malformed_document_is_serialization_error() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.set(SCHEDULE_KEY, json!({"not": "an array"})).unwrap();
        let repo = ScheduleRepository::new(store);
        assert!(matches!(
            repo.load(),
            Err(RepositoryError::SerializationError { .. })
        ));
    }
}
