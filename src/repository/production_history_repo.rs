// ==========================================
// 搅拌站配料控制系统 - 生产记录仓储
// ==========================================
// 文档: production_history/{job_id}
// 红线: 只追加,同一 job_id 不可覆盖
// ==========================================

use crate::domain::production::ProductionHistoryEntry;
use crate::repository::document_store::DocumentStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Arc;

pub const HISTORY_PREFIX: &str = "production_history/";

pub struct ProductionHistoryRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProductionHistoryRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn key_of(job_id: &str) -> String {
        format!("{}{}", HISTORY_PREFIX, job_id)
    }

    /// 追加生产记录
    ///
    /// # 返回
    /// - `Ok(job_id)`: 写入成功
    /// - `Err(ValidationError)`: job_id 已存在
    pub fn insert(&self, entry: &ProductionHistoryEntry) -> RepositoryResult<String> {
        let key = Self::key_of(&entry.job_id);
        if self.store.get(&key)?.is_some() {
            return Err(RepositoryError::ValidationError(format!(
                "生产记录已存在: job_id={}",
                entry.job_id
            )));
        }
        let value = serde_json::to_value(entry)?;
        self.store.set(&key, value)?;
        Ok(entry.job_id.clone())
    }

    pub fn find_by_id(&self, job_id: &str) -> RepositoryResult<Option<ProductionHistoryEntry>> {
        let key = Self::key_of(job_id);
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

    /// 全部记录（按结束时间升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<ProductionHistoryEntry>> {
        let mut entries = Vec::new();
        for key in self.store.keys_with_prefix(HISTORY_PREFIX)? {
            let job_id = &key[HISTORY_PREFIX.len()..];
            if let Some(entry) = self.find_by_id(job_id)? {
                entries.push(entry);
            }
        }
        entries.sort_by_key(|e| e.end_time);
        Ok(entries)
    }

    /// 某计划编号下的记录
    pub fn list_by_req_no(&self, req_no: &str) -> RepositoryResult<Vec<ProductionHistoryEntry>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|e| e.req_no == req_no)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::formula::MaterialWeights;
    use crate::repository::document_store::InMemoryDocumentStore;
    use chrono::NaiveDate;

    fn make_entry(req_no: &str, hour: u32) -> ProductionHistoryEntry {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap();
        let end = start + chrono::Duration::minutes(10);
        ProductionHistoryEntry {
            job_id: ProductionHistoryEntry::make_job_id(req_no, end),
            req_no: req_no.to_string(),
            formula_id: None,
            customer: "PT Maju".to_string(),
            location: "Blok C".to_string(),
            grade: "K225".to_string(),
            volume: 5.0,
            mix_count: 2,
            slump: Some(12.0),
            medium: "Pompa".to_string(),
            start_time: start,
            end_time: end,
            target_weights: MaterialWeights::zero(),
            actual_weights: MaterialWeights::zero(),
            deviations: MaterialWeights::zero(),
            operator_name: "Budi".to_string(),
            config_snapshot_json: None,
        }
    }

    #[test]
    fn test_insert_once_only() {
        let repo = ProductionHistoryRepository::new(Arc::new(InMemoryDocumentStore::new()));
        let entry = make_entry("A1", 8);
        assert_eq!(repo.insert(&entry).unwrap(), entry.job_id);
        assert!(matches!(
            repo.insert(&entry),
            Err(RepositoryError::ValidationError(_))
        ));
        assert_eq!(repo.find_by_id(&entry.job_id).unwrap(), Some(entry));
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let repo = ProductionHistoryRepository::new(Arc::new(InMemoryDocumentStore::new()));
        repo.insert(&make_entry("B2", 10)).unwrap();
        repo.insert(&make_entry("A1", 8)).unwrap();
        repo.insert(&make_entry("A1", 9)).unwrap();

        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].end_time <= w[1].end_time));
        assert_eq!(repo.list_by_req_no("A1").unwrap().len(), 2);
    }
}
