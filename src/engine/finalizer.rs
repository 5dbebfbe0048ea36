// ==========================================
// 搅拌站配料控制系统 - 批次收尾
// ==========================================
// 职责: 台账回写 → 生产记录 → 打印任务/完成日志
// 失败策略: 不重试、不回滚; 错误向上返回,由 API 层记录并提示
// ==========================================

use crate::domain::formula::MaterialWeights;
use crate::domain::job::JobInfo;
use crate::domain::production::{PrintJob, ProductionHistoryEntry};
use crate::domain::types::PrintMode;
use crate::engine::schedule_ledger::{DeliveryOutcome, ScheduleLedger};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{PrintQueueRepository, ProductionHistoryRepository, ScheduleRepository};
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 收尾输入 / 输出
// ==========================================

/// 一个已结束批次的数据
#[derive(Debug, Clone)]
pub struct FinishedBatch<'a> {
    pub job: &'a JobInfo,
    pub target_weights: MaterialWeights,
    pub actual_weights: MaterialWeights,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// 收尾所需的配置
#[derive(Debug, Clone)]
pub struct FinalizeSettings {
    pub print_mode: PrintMode,
    pub operator_name: String,
    pub plant_location: String,
    pub config_snapshot: Option<JsonValue>,
}

/// 收尾结果
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub entry: ProductionHistoryEntry,
    pub delivery: DeliveryOutcome,
    pub print_enqueued: bool,
}

// ==========================================
// BatchFinalizer
// ==========================================
pub struct BatchFinalizer {
    schedule_repo: Arc<ScheduleRepository>,
    history_repo: Arc<ProductionHistoryRepository>,
    print_repo: Arc<PrintQueueRepository>,
}

impl BatchFinalizer {
    pub fn new(
        schedule_repo: Arc<ScheduleRepository>,
        history_repo: Arc<ProductionHistoryRepository>,
        print_repo: Arc<PrintQueueRepository>,
    ) -> Self {
        Self {
            schedule_repo,
            history_repo,
            print_repo,
        }
    }

    /// 批次收尾
    ///
    /// # 步骤
    /// 1. 台账: terkirim += 目标方量, sisa = total - terkirim, 状态 Selesai/Proses
    /// 2. 生产记录: 目标/实际/偏差 + 配置快照
    /// 3. 打印模式为 PRINT 时写入打印队列,否则只记录日志
    #[instrument(skip(self, batch, settings), fields(req_no = %batch.job.req_no, volume = batch.job.target_volume))]
    pub fn finish_and_print_batch(
        &self,
        batch: &FinishedBatch<'_>,
        settings: &FinalizeSettings,
    ) -> RepositoryResult<FinalizeOutcome> {
        let req_no = batch.job.req_no.trim();
        if req_no.is_empty() {
            return Err(RepositoryError::ValidationError("计划编号为空，无法收尾".to_string()));
        }

        // ===== 1. 台账回写 =====
        let mut rows = self.schedule_repo.load()?;
        let row = ScheduleLedger::find_row(&rows, req_no).ok_or_else(|| RepositoryError::NotFound {
            entity: "ScheduleRow".to_string(),
            id: req_no.to_string(),
        })?;
        // Selesai / Batal 行已锁定, 不允许回写
        if row.is_locked() {
            let status = row.status.map(|s| s.to_string()).unwrap_or_default();
            tracing::warn!(req_no, status = %status, "计划行已锁定，拒绝回写");
            return Err(RepositoryError::ValidationError(format!(
                "计划行 {} 状态为 {}，不能回写",
                req_no, status
            )));
        }
        let delivery = ScheduleLedger::compute_delivery(row, batch.job.target_volume);
        ScheduleLedger::apply_delivery(&mut rows, req_no, &delivery);
        self.schedule_repo.save(&rows)?;
        tracing::info!(
            old_delivered = delivery.old_delivered,
            new_delivered = delivery.new_delivered,
            remaining = delivery.remaining,
            status = %delivery.status,
            "计划台账已回写"
        );

        // ===== 2. 生产记录 =====
        let entry = ProductionHistoryEntry {
            job_id: ProductionHistoryEntry::make_job_id(req_no, batch.end_time),
            req_no: req_no.to_string(),
            formula_id: batch.job.formula_id.clone(),
            customer: batch.job.customer.clone(),
            location: batch.job.location.clone(),
            grade: batch.job.grade.clone(),
            volume: batch.job.target_volume,
            mix_count: batch.job.mix_count,
            slump: batch.job.slump,
            medium: batch.job.medium.clone(),
            start_time: batch.start_time,
            end_time: batch.end_time,
            target_weights: batch.target_weights,
            actual_weights: batch.actual_weights,
            deviations: ProductionHistoryEntry::compute_deviations(
                &batch.actual_weights,
                &batch.target_weights,
            ),
            operator_name: settings.operator_name.clone(),
            config_snapshot_json: settings.config_snapshot.clone(),
        };
        self.history_repo.insert(&entry)?;
        tracing::info!(job_id = %entry.job_id, "生产记录已保存");

        // ===== 3. 打印 / 日志 =====
        let print_enqueued = match settings.print_mode {
            PrintMode::Print => {
                let job = PrintJob::pending(settings.operator_name.clone(), entry.clone());
                self.print_repo.enqueue(&settings.plant_location, &job)?;
                tracing::info!(print_id = %job.print_id, location = %settings.plant_location, "打印任务已入队");
                true
            }
            PrintMode::LogOnly => {
                tracing::info!(job_id = %entry.job_id, "批次完成（仅记录，不打印）");
                false
            }
        };

        Ok(FinalizeOutcome {
            entry,
            delivery,
            print_enqueued,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::ScheduleRow;
    use crate::domain::types::ScheduleStatus;
    use crate::repository::{DocumentStore, InMemoryDocumentStore};
    use chrono::NaiveDate;

    struct Fixture {
        store: Arc<InMemoryDocumentStore>,
        schedule: Arc<ScheduleRepository>,
        history: Arc<ProductionHistoryRepository>,
        print: Arc<PrintQueueRepository>,
        finalizer: BatchFinalizer,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDocumentStore::new());
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let schedule = Arc::new(ScheduleRepository::new(dyn_store.clone()));
        let history = Arc::new(ProductionHistoryRepository::new(dyn_store.clone()));
        let print = Arc::new(PrintQueueRepository::new(dyn_store));
        let finalizer = BatchFinalizer::new(schedule.clone(), history.clone(), print.clone());
        Fixture {
            store,
            schedule,
            history,
            print,
            finalizer,
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn settings(mode: PrintMode) -> FinalizeSettings {
        FinalizeSettings {
            print_mode: mode,
            operator_name: "Budi".to_string(),
            plant_location: "plant-1".to_string(),
            config_snapshot: None,
        }
    }

    fn job(req_no: &str, volume: f64) -> JobInfo {
        let mut job = JobInfo::empty();
        job.req_no = req_no.to_string();
        job.set_target_volume(volume);
        job
    }

    #[test]
    fn test_full_batch_completes_row_and_enqueues_print() {
        let f = fixture();
        let rows = ScheduleLedger::recalculate_all(&[ScheduleRow::new("A1", 10.0)]);
        f.schedule.save(&rows).unwrap();

        let job = job("A1", 10.0);
        let mut target = MaterialWeights::zero();
        target.semen = 3500.0;
        let mut actual = target;
        actual.semen = 3512.3;

        let outcome = f
            .finalizer
            .finish_and_print_batch(
                &FinishedBatch {
                    job: &job,
                    target_weights: target,
                    actual_weights: actual,
                    start_time: at(8, 0),
                    end_time: at(8, 5),
                },
                &settings(PrintMode::Print),
            )
            .unwrap();

        let rec = f.schedule.load().unwrap()[0].to_record();
        assert_eq!(rec.terkirim, "10.00");
        assert_eq!(rec.sisa, "0.00");
        assert_eq!(rec.status, "Selesai");

        assert_eq!(outcome.entry.deviations.semen, 12.3);
        assert!(f.history.find_by_id(&outcome.entry.job_id).unwrap().is_some());
        assert!(outcome.print_enqueued);
        let print = f.print.find("plant-1").unwrap().unwrap();
        assert_eq!(print.operator_name, "Budi");
        assert_eq!(print.payload.job_id, outcome.entry.job_id);
    }

    #[test]
    fn test_partial_batch_sets_proses_and_log_only_skips_print() {
        let f = fixture();
        let rows = ScheduleLedger::recalculate_all(&[ScheduleRow::new("B2", 10.0)]);
        f.schedule.save(&rows).unwrap();

        let job = job("B2", 4.0);
        let outcome = f
            .finalizer
            .finish_and_print_batch(
                &FinishedBatch {
                    job: &job,
                    target_weights: MaterialWeights::zero(),
                    actual_weights: MaterialWeights::zero(),
                    start_time: at(9, 0),
                    end_time: at(9, 3),
                },
                &settings(PrintMode::LogOnly),
            )
            .unwrap();

        assert_eq!(outcome.delivery.status, ScheduleStatus::Proses);
        assert_eq!(outcome.delivery.remaining, 6.0);
        assert!(!outcome.print_enqueued);
        assert!(f.print.find("plant-1").unwrap().is_none());
    }

    #[test]
    fn test_missing_row_is_not_found() {
        let f = fixture();
        let job = job("Z9", 1.0);
        let err = f
            .finalizer
            .finish_and_print_batch(
                &FinishedBatch {
                    job: &job,
                    target_weights: MaterialWeights::zero(),
                    actual_weights: MaterialWeights::zero(),
                    start_time: at(9, 0),
                    end_time: at(9, 1),
                },
                &settings(PrintMode::Print),
            )
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert!(f.store.keys_with_prefix("production_history/").unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_row_is_not_written_back() {
        let f = fixture();
        let mut row = ScheduleRow::new("A1", 10.0);
        row.status = Some(ScheduleStatus::Batal);
        f.schedule.save(&ScheduleLedger::recalculate_all(&[row])).unwrap();

        let job = job("A1", 4.0);
        let err = f
            .finalizer
            .finish_and_print_batch(
                &FinishedBatch {
                    job: &job,
                    target_weights: MaterialWeights::zero(),
                    actual_weights: MaterialWeights::zero(),
                    start_time: at(10, 0),
                    end_time: at(10, 2),
                },
                &settings(PrintMode::Print),
            )
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));

        let rec = f.schedule.load().unwrap()[0].to_record();
        assert_eq!(rec.status, "Batal");
        assert_eq!(rec.terkirim, "0.00");
        assert!(f.store.keys_with_prefix("production_history/").unwrap().is_empty());
        assert!(f.print.find("plant-1").unwrap().is_none());
    }
}
