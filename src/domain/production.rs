// ==========================================
// 搅拌站配料控制系统 - 生产记录领域模型
// ==========================================
// 职责: 批次完成后的不可变生产记录 + 打印任务
// 红线: 生产记录只写一次,之后不可修改
// ==========================================

use crate::domain::formula::MaterialWeights;
use crate::domain::schedule::round2;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ProductionHistoryEntry - 生产记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionHistoryEntry {
    // ===== 标识 =====
    pub job_id: String,               // reqNo + 时间戳
    pub req_no: String,               // 计划编号
    pub formula_id: Option<String>,   // 配合比ID

    // ===== 任务信息 =====
    pub customer: String,
    pub location: String,
    pub grade: String,
    pub volume: f64,                  // 本批方量
    pub mix_count: u32,               // 分盘数
    pub slump: Option<f64>,
    pub medium: String,

    // ===== 时间 =====
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,

    // ===== 重量 (kg) =====
    pub target_weights: MaterialWeights, // 单盘目标
    pub actual_weights: MaterialWeights, // 实际
    pub deviations: MaterialWeights,     // 实际 - 目标 (2 位小数)

    // ===== 审计 =====
    pub operator_name: String,
    #[serde(default)]
    pub config_snapshot_json: Option<JsonValue>,
}

impl ProductionHistoryEntry {
    /// 生成批次 ID: reqNo + 结束时间戳（毫秒）
    pub fn make_job_id(req_no: &str, end_time: NaiveDateTime) -> String {
        format!("{}-{}", req_no.trim(), end_time.and_utc().timestamp_millis())
    }

    /// 逐通道偏差（保留 2 位小数）
    pub fn compute_deviations(actual: &MaterialWeights, target: &MaterialWeights) -> MaterialWeights {
        actual.zip_with(target, |a, t| round2(a - t))
    }

    /// 批次耗时（秒）
    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds().max(0)
    }
}

// ==========================================
// PrintJob - 打印任务
// ==========================================
// 按站点位置存储,由外部打印监听程序消费
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub print_id: String,
    pub status: String,        // pending / printed
    pub operator_name: String,
    pub payload: ProductionHistoryEntry,
    pub created_at: NaiveDateTime,
}

impl PrintJob {
    pub const STATUS_PENDING: &'static str = "pending";

    /// 创建待打印任务
    pub fn pending(operator_name: impl Into<String>, payload: ProductionHistoryEntry) -> Self {
        Self {
            print_id: uuid::Uuid::new_v4().to_string(),
            status: Self::STATUS_PENDING.to_string(),
            operator_name: operator_name.into(),
            payload,
            created_at: chrono::Local::now().naive_local(),
        }
    }
}
