// ==========================================
// 搅拌站配料控制系统 - 导入 API
// ==========================================
// 职责: 从文件导入配合比（按 id 覆盖）与生产计划（追加后整表重算）
// ==========================================

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::schedule_api::ScheduleApi;
use crate::importer::{FormulaImporter, ImportIssue, ScheduleImporter, UniversalFileParser};
use crate::repository::FormulaRepository;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 导入成功的行数
    pub imported: usize,
    /// 跳过/告警的行
    pub skipped: Vec<ImportIssue>,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

// ==========================================
// ImportApi - 导入API
// ==========================================
pub struct ImportApi {
    formula_repo: Arc<FormulaRepository>,
    schedule_api: Arc<ScheduleApi>,
}

impl ImportApi {
    pub fn new(formula_repo: Arc<FormulaRepository>, schedule_api: Arc<ScheduleApi>) -> Self {
        Self {
            formula_repo,
            schedule_api,
        }
    }

    /// 导入配合比（同 id 覆盖,其余追加）
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn import_formulas<P: AsRef<Path>>(&self, path: P) -> ApiResult<ImportApiResponse> {
        let started = Instant::now();
        let records = UniversalFileParser.parse(path.as_ref())?;
        let report = FormulaImporter::map_records(&records)?;

        for formula in &report.items {
            self.formula_repo.upsert(formula.clone())?;
        }

        tracing::info!(
            imported = report.imported_count(),
            skipped = report.skipped.len(),
            "配合比导入完成"
        );
        Ok(ImportApiResponse {
            imported: report.imported_count(),
            skipped: report.skipped,
            elapsed_ms: started.elapsed().as_millis() as i64,
        })
    }

    /// 导入生产计划（追加到现有台账末尾）
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn import_schedule<P: AsRef<Path>>(&self, path: P) -> ApiResult<ImportApiResponse> {
        let started = Instant::now();
        let records = UniversalFileParser.parse(path.as_ref())?;
        let report = ScheduleImporter::map_records(&records)?;

        let imported = self.schedule_api.append_rows(&report.items)?;

        tracing::info!(imported, issues = report.skipped.len(), "生产计划导入完成");
        Ok(ImportApiResponse {
            imported,
            skipped: report.skipped,
            elapsed_ms: started.elapsed().as_millis() as i64,
        })
    }
}
