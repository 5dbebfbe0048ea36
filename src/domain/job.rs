// ==========================================
// 搅拌站配料控制系统 - 当前批次任务信息
// ==========================================
// 职责: 一个进行中批次的表单数据（内存态,一次一个）
// 生命周期: 空 → reqNo 命中有效计划行后填充并锁定 → 匹配失效时解锁
// ==========================================

use crate::domain::schedule::ScheduleRow;
use serde::{Deserialize, Serialize};

// ==========================================
// JobInfo - 批次任务信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub formula_id: Option<String>, // 选中的配合比
    pub req_no: String,             // 计划编号（外键: ScheduleRow.no）
    pub customer: String,           // 客户（锁定时只读）
    pub location: String,           // 工地（锁定时只读）
    pub grade: String,              // 等级（锁定时只读）
    pub target_volume: f64,         // 目标方量 (m³, ≥0)
    pub mix_count: u32,             // 分盘数 (≥1)
    pub slump: Option<f64>,         // 坍落度 (cm)
    pub medium: String,             // 浇筑方式
    pub locked: bool,               // 已与计划行绑定
}

impl Default for JobInfo {
    fn default() -> Self {
        Self::empty()
    }
}

impl JobInfo {
    /// 空任务
    pub fn empty() -> Self {
        Self {
            formula_id: None,
            req_no: String::new(),
            customer: String::new(),
            location: String::new(),
            grade: String::new(),
            target_volume: 0.0,
            mix_count: 1,
            slump: None,
            medium: String::new(),
            locked: false,
        }
    }

    /// 是否填写了计划编号
    pub fn has_req_no(&self) -> bool {
        !self.req_no.trim().is_empty()
    }

    /// 设置目标方量（负值/非有限值按 0 处理）
    pub fn set_target_volume(&mut self, volume: f64) {
        self.target_volume = if volume.is_finite() && volume > 0.0 { volume } else { 0.0 };
    }

    /// 设置分盘数（非正值强制为 1）
    pub fn set_mix_count(&mut self, mix_count: i64) {
        self.mix_count = if mix_count < 1 {
            1
        } else {
            u32::try_from(mix_count).unwrap_or(u32::MAX)
        };
    }

    /// 单盘方量
    pub fn per_mix_volume(&self) -> f64 {
        self.target_volume / f64::from(self.mix_count.max(1))
    }

    /// 从命中的计划行复制只读字段并锁定
    pub fn lock_to_row(&mut self, row: &ScheduleRow, formula_id: Option<String>) {
        self.customer = row.customer.clone();
        self.location = row.location.clone();
        self.grade = row.grade.clone();
        self.slump = row.slump;
        self.medium = row.medium.clone();
        if formula_id.is_some() {
            self.formula_id = formula_id;
        }
        self.locked = true;
    }

    /// 解锁并清除从计划行复制的字段
    pub fn unlock(&mut self) {
        self.customer.clear();
        self.location.clear();
        self.grade.clear();
        self.slump = None;
        self.medium.clear();
        self.locked = false;
    }
}
