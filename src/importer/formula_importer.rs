// ==========================================
// 搅拌站配料控制系统 - 配合比导入
// ==========================================
// 列名: id, mutuBeton, mutuCode, pasir1..additive3（大小写不敏感）
// 规则: id 为空的行跳过; 数值列无法解析的行跳过并记录原因; 负值归零
// ==========================================

use crate::domain::formula::{Formula, MaterialWeights};
use crate::domain::types::MaterialChannel;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{field, RawRecord};
use serde::{Deserialize, Serialize};

/// 导入问题（不阻断整个文件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub row: usize, // 数据行号（表头后从 1 开始）
    pub message: String,
}

/// 导入报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport<T> {
    pub items: Vec<T>,
    pub skipped: Vec<ImportIssue>,
}

impl<T> ImportReport<T> {
    pub fn imported_count(&self) -> usize {
        self.items.len()
    }
}

pub struct FormulaImporter;

impl FormulaImporter {
    /// 原始行 → 配合比
    pub fn map_records(records: &[RawRecord]) -> ImportResult<ImportReport<Formula>> {
        if let Some(first) = records.first() {
            if field(first, "mutuBeton").is_none() {
                return Err(ImportError::MissingColumn("mutuBeton".to_string()));
            }
        }

        let mut report = ImportReport {
            items: Vec::new(),
            skipped: Vec::new(),
        };

        for (idx, record) in records.iter().enumerate() {
            let row = idx + 1;
            let id = field(record, "id").unwrap_or("").trim();
            if id.is_empty() {
                report.skipped.push(ImportIssue {
                    row,
                    message: "id 为空".to_string(),
                });
                continue;
            }

            match Self::map_one(record, row) {
                Ok(formula) => report.items.push(formula),
                Err(e) => report.skipped.push(ImportIssue {
                    row,
                    message: e.to_string(),
                }),
            }
        }

        tracing::info!(
            imported = report.items.len(),
            skipped = report.skipped.len(),
            "配合比导入映射完成"
        );
        Ok(report)
    }

    fn map_one(record: &RawRecord, row: usize) -> ImportResult<Formula> {
        let mut per_unit = MaterialWeights::zero();
        for ch in MaterialChannel::ALL {
            let raw = field(record, ch.as_str()).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let value = raw
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|e| ImportError::TypeConversionError {
                    row,
                    field: ch.as_str().to_string(),
                    message: format!("{} ({})", raw, e),
                })?;
            per_unit.set(ch, value);
        }

        let id = field(record, "id").unwrap_or("").trim();
        let grade = field(record, "mutuBeton").unwrap_or("").trim();
        let mut formula = Formula::new(id, grade, per_unit);
        formula.mutu_code = field(record, "mutuCode")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(formula)
    }
}
