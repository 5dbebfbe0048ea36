// ==========================================
// 搅拌站配料控制系统 - 生产计划导入
// ==========================================
// 列名: 与计划文档字段一致（no, noPo, namaPelanggan, lokasiProyek, mutuBeton,
//       slump, mediaPengecoran, volume, terkirim, penambahanVol, status）
// 规则: no 为空的行保留为占位行; 派生列（sisa/totalVol）一律重算
// ==========================================

use crate::domain::schedule::{ScheduleRow, ScheduleRowRecord};
use crate::engine::schedule_ledger::ScheduleLedger;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{field, RawRecord};
use crate::importer::formula_importer::{ImportIssue, ImportReport};

pub struct ScheduleImporter;

impl ScheduleImporter {
    /// 原始行 → 已重算的计划行
    pub fn map_records(records: &[RawRecord]) -> ImportResult<ImportReport<ScheduleRow>> {
        if let Some(first) = records.first() {
            if field(first, "no").is_none() {
                return Err(ImportError::MissingColumn("no".to_string()));
            }
        }

        let get = |r: &RawRecord, name: &str| field(r, name).unwrap_or("").to_string();
        let mut skipped = Vec::new();

        let items = records
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                let record = ScheduleRowRecord {
                    no: get(r, "no"),
                    no_po: get(r, "noPo"),
                    nama_pelanggan: get(r, "namaPelanggan"),
                    lokasi_proyek: get(r, "lokasiProyek"),
                    mutu_beton: get(r, "mutuBeton"),
                    slump: get(r, "slump"),
                    media_pengecoran: get(r, "mediaPengecoran"),
                    volume: get(r, "volume"),
                    terkirim: get(r, "terkirim"),
                    penambahan_vol: get(r, "penambahanVol"),
                    sisa: String::new(),
                    total_vol: String::new(),
                    status: get(r, "status"),
                };
                if !record.status.trim().is_empty()
                    && crate::domain::types::ScheduleStatus::from_str(&record.status).is_none()
                {
                    skipped.push(ImportIssue {
                        row: idx + 1,
                        message: format!("未知状态 {}，已按空状态导入", record.status.trim()),
                    });
                }
                ScheduleLedger::recalculate_row(&ScheduleRow::from_record(&record))
            })
            .collect::<Vec<_>>();

        tracing::info!(rows = items.len(), issues = skipped.len(), "生产计划导入映射完成");
        Ok(ImportReport { items, skipped })
    }
}
