// ==========================================
// 搅拌站配料控制系统 - 生产计划 API
// ==========================================
// 职责: 表格式单元格编辑、整表读取/保存（均经台账重算）
// 红线: 完成/取消的计划行只读; 派生列（sisa/totalVol）不可直接编辑
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::schedule::{ScheduleRow, ScheduleRowRecord};
use crate::domain::types::ScheduleStatus;
use crate::engine::schedule_ledger::ScheduleLedger;
use crate::repository::ScheduleRepository;

/// 可编辑的列（外部文档字段名）
pub const EDITABLE_FIELDS: [&str; 11] = [
    "no",
    "noPo",
    "namaPelanggan",
    "lokasiProyek",
    "mutuBeton",
    "slump",
    "mediaPengecoran",
    "volume",
    "terkirim",
    "penambahanVol",
    "status",
];

// ==========================================
// ScheduleApi - 生产计划 API
// ==========================================
pub struct ScheduleApi {
    schedule_repo: Arc<ScheduleRepository>,
}

impl ScheduleApi {
    pub fn new(schedule_repo: Arc<ScheduleRepository>) -> Self {
        Self { schedule_repo }
    }

    /// 读取计划表（读取时即重算）
    pub fn load(&self) -> ApiResult<Vec<ScheduleRow>> {
        let rows = self.schedule_repo.load()?;
        Ok(ScheduleLedger::recalculate_all(&rows))
    }

    /// 读取为边界记录（界面表格直接展示）
    pub fn load_records(&self) -> ApiResult<Vec<ScheduleRowRecord>> {
        Ok(self.load()?.iter().map(ScheduleRow::to_record).collect())
    }

    /// 重算后整表保存
    pub fn save(&self, rows: &[ScheduleRow]) -> ApiResult<Vec<ScheduleRow>> {
        let rows = ScheduleLedger::recalculate_all(rows);
        self.schedule_repo.save(&rows)?;
        tracing::info!(rows = rows.len(), "生产计划已保存");
        Ok(rows)
    }

    /// 追加计划行（导入使用）
    pub fn append_rows(&self, new_rows: &[ScheduleRow]) -> ApiResult<usize> {
        let mut rows = self.schedule_repo.load()?;
        rows.extend_from_slice(new_rows);
        self.save(&rows)?;
        Ok(new_rows.len())
    }

    /// 编辑一个单元格
    ///
    /// # 参数
    /// - index: 行下标（表格顺序）
    /// - field: 列名（外部文档字段名）
    /// - value: 新值（原样字符串,解析在台账模型中完成）
    ///
    /// # 返回
    /// 重算后的该行记录
    pub fn edit_cell(&self, index: usize, field: &str, value: &str) -> ApiResult<ScheduleRowRecord> {
        if !EDITABLE_FIELDS.contains(&field) {
            return Err(ApiError::InvalidInput(format!("列 {} 不可编辑", field)));
        }
        if field == "status" && !value.trim().is_empty() && ScheduleStatus::from_str(value).is_none() {
            return Err(ApiError::InvalidInput(format!("未知计划状态: {}", value)));
        }

        let mut rows = self.schedule_repo.load()?;
        let row = rows
            .get(index)
            .ok_or_else(|| ApiError::NotFound(format!("计划行(index={})不存在", index)))?;
        if row.is_locked() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "计划行 {} 已{}，不可编辑",
                row.no,
                row.status.map(|s| s.as_str()).unwrap_or_default()
            )));
        }

        let mut record = row.to_record();
        set_record_field(&mut record, field, value);
        let updated = ScheduleLedger::recalculate_row(&ScheduleRow::from_record(&record));
        rows[index] = updated.clone();

        self.schedule_repo.save(&rows)?;
        tracing::info!(index, field, no = %updated.no, "计划单元格已更新");
        Ok(updated.to_record())
    }
}

fn set_record_field(record: &mut ScheduleRowRecord, field: &str, value: &str) {
    let value = value.to_string();
    match field {
        "no" => record.no = value,
        "noPo" => record.no_po = value,
        "namaPelanggan" => record.nama_pelanggan = value,
        "lokasiProyek" => record.lokasi_proyek = value,
        "mutuBeton" => record.mutu_beton = value,
        "slump" => record.slump = value,
        "mediaPengecoran" => record.media_pengecoran = value,
        "volume" => record.volume = value,
        "terkirim" => record.terkirim = value,
        "penambahanVol" => record.penambahan_vol = value,
        "status" => record.status = value,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{DocumentStore, InMemoryDocumentStore};

    fn api_with_rows(rows: Vec<ScheduleRow>) -> ScheduleApi {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let repo = Arc::new(ScheduleRepository::new(store));
        repo.save(&rows).unwrap();
        ScheduleApi::new(repo)
    }

    #[test]
    fn test_edit_recalculates_row() {
        let api = api_with_rows(vec![ScheduleRow::new("A1", 10.0)]);

        let rec = api.edit_cell(0, "penambahanVol", "2").unwrap();
        assert_eq!(rec.total_vol, "12.00");
        assert_eq!(rec.sisa, "10.00");
        assert_eq!(rec.status, "Menunggu");

        let rec = api.edit_cell(0, "terkirim", "4").unwrap();
        assert_eq!(rec.sisa, "6.00");
        assert_eq!(api.load_records().unwrap()[0].terkirim, "4.00");
    }

    #[test]
    fn test_locked_row_rejects_edit() {
        let mut done = ScheduleRow::new("A1", 10.0);
        done.status = Some(ScheduleStatus::Selesai);
        let api = api_with_rows(vec![done]);

        let err = api.edit_cell(0, "volume", "20").unwrap_err();
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
        assert_eq!(api.load().unwrap()[0].volume, 10.0);
    }

    #[test]
    fn test_derived_and_unknown_fields_rejected() {
        let api = api_with_rows(vec![ScheduleRow::new("A1", 10.0)]);
        assert!(matches!(api.edit_cell(0, "sisa", "1"), Err(ApiError::InvalidInput(_))));
        assert!(matches!(api.edit_cell(0, "status", "Rusak"), Err(ApiError::InvalidInput(_))));
        assert!(matches!(api.edit_cell(5, "volume", "1"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_clearing_no_makes_row_inert() {
        let api = api_with_rows(vec![ScheduleRow::new("A1", 10.0)]);
        let rec = api.edit_cell(0, "no", "").unwrap();
        assert!(rec.sisa.is_empty());
        assert!(rec.status.is_empty());
    }
}
