// ==========================================
// 搅拌站配料控制系统 - 生产计划（台账）领域模型
// ==========================================
// 职责: 计划行的类型化模型 + 外部文档的字符串边界模型
// 红线: 数值只在边界解析一次,内部全部以数值保存
// 不变量: remaining = volume - delivered; total = volume + added
// ==========================================

use crate::domain::types::ScheduleStatus;
use serde::{Deserialize, Serialize};

/// 四舍五入到 2 位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 按 2 位小数格式化
pub fn format2(value: f64) -> String {
    format!("{:.2}", round2(value))
}

/// 解析数值字段: 空白/非法/非有限值一律视为 0
pub fn parse_number(raw: &str) -> f64 {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// 解析可空数值字段: 空白返回 None
fn parse_optional_number(raw: &str) -> Option<f64> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(parse_number(raw))
    }
}

/// 紧凑格式（源字段回写用，如 "10"、"2.5"）
fn format_compact(value: f64) -> String {
    let rounded = round2(value);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

// ==========================================
// ScheduleRow - 计划行（类型化）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    // ===== 标识 =====
    pub no: String,               // 计划编号 (reqNo 外键目标)
    pub po_number: String,        // 采购订单号
    pub customer: String,         // 客户名称
    pub location: String,         // 工地位置
    pub grade: String,            // 混凝土等级
    pub slump: Option<f64>,       // 坍落度 (cm)
    pub medium: String,           // 浇筑方式 (泵送/直卸等)

    // ===== 方量 (m³) =====
    pub volume: f64,              // 需求方量
    pub delivered: f64,           // 已发方量
    pub added: f64,               // 追加方量

    // ===== 派生字段 =====
    pub remaining: Option<f64>,   // 剩余方量
    pub total: Option<f64>,       // 总方量
    pub status: Option<ScheduleStatus>,
}

impl ScheduleRow {
    /// 创建计划行（派生字段为空，需经台账重算）
    pub fn new(no: impl Into<String>, volume: f64) -> Self {
        Self {
            no: no.into(),
            po_number: String::new(),
            customer: String::new(),
            location: String::new(),
            grade: String::new(),
            slump: None,
            medium: String::new(),
            volume,
            delivered: 0.0,
            added: 0.0,
            remaining: None,
            total: None,
            status: None,
        }
    }

    /// 编号为空的占位行
    pub fn is_inert(&self) -> bool {
        self.no.trim().is_empty()
    }

    /// 完成/取消后锁定
    pub fn is_locked(&self) -> bool {
        self.status.map(|s| s.is_terminal()).unwrap_or(false)
    }

    /// 可被批次引用: 非占位且非终态
    pub fn is_active(&self) -> bool {
        !self.is_inert() && !self.is_locked()
    }

    /// 编号匹配（首尾空白不敏感）
    pub fn matches_no(&self, req_no: &str) -> bool {
        let req_no = req_no.trim();
        !req_no.is_empty() && self.no.trim() == req_no
    }

    /// 总方量（派生字段缺失时现算）
    pub fn total_volume(&self) -> f64 {
        self.total.unwrap_or(self.volume + self.added)
    }

    /// 剩余方量（派生字段缺失时现算）
    pub fn remaining_volume(&self) -> f64 {
        self.remaining.unwrap_or(self.volume - self.delivered)
    }

    /// 从边界记录解析（只在这里做字符串 → 数值）
    pub fn from_record(record: &ScheduleRowRecord) -> Self {
        Self {
            no: record.no.trim().to_string(),
            po_number: record.no_po.trim().to_string(),
            customer: record.nama_pelanggan.trim().to_string(),
            location: record.lokasi_proyek.trim().to_string(),
            grade: record.mutu_beton.trim().to_string(),
            slump: parse_optional_number(&record.slump),
            medium: record.media_pengecoran.trim().to_string(),
            volume: parse_number(&record.volume),
            delivered: parse_number(&record.terkirim),
            added: parse_number(&record.penambahan_vol),
            remaining: parse_optional_number(&record.sisa),
            total: parse_optional_number(&record.total_vol),
            status: ScheduleStatus::from_str(&record.status),
        }
    }

    /// 格式化为边界记录（只在这里做数值 → 字符串）
    pub fn to_record(&self) -> ScheduleRowRecord {
        let inert = self.is_inert();
        ScheduleRowRecord {
            no: self.no.clone(),
            no_po: self.po_number.clone(),
            nama_pelanggan: self.customer.clone(),
            lokasi_proyek: self.location.clone(),
            mutu_beton: self.grade.clone(),
            slump: self.slump.map(format_compact).unwrap_or_default(),
            media_pengecoran: self.medium.clone(),
            volume: format_compact(self.volume),
            terkirim: if inert { String::new() } else { format2(self.delivered) },
            penambahan_vol: if inert { String::new() } else { format_compact(self.added) },
            sisa: self.remaining.map(format2).unwrap_or_default(),
            total_vol: self.total.map(format2).unwrap_or_default(),
            status: self.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
        }
    }
}

// ==========================================
// ScheduleRowRecord - 计划行（外部文档边界）
// ==========================================
// 对齐外部文档字段名; 全部为字符串
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleRowRecord {
    pub no: String,
    pub no_po: String,
    pub nama_pelanggan: String,
    pub lokasi_proyek: String,
    pub mutu_beton: String,
    pub slump: String,
    pub media_pengecoran: String,
    pub volume: String,
    pub terkirim: String,
    pub penambahan_vol: String,
    pub sisa: String,
    pub total_vol: String,
    pub status: String,
}
