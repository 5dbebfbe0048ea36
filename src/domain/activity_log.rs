// ==========================================
// 搅拌站配料控制系统 - 活动日志
// ==========================================
// 职责: 控制面板上的时间戳彩色日志（仅会话内,不持久化）
// 约束: 只保留最近 10 条; id 单调递增; 按转换发生顺序追加
// ==========================================

use crate::domain::types::LogColor;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// 保留条数
pub const ACTIVITY_LOG_CAPACITY: usize = 10;

// ==========================================
// ActivityLogEntry - 活动日志条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: u64,
    pub message: String,
    pub color: LogColor,
    pub timestamp: NaiveDateTime,
}

impl ActivityLogEntry {
    /// 显示时间 (HH:MM:SS)
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

// ==========================================
// ActivityLog - 定长环形日志
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: VecDeque<ActivityLogEntry>,
    next_id: u64,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以当前本地时间追加
    pub fn push(&mut self, message: impl Into<String>, color: LogColor) -> &ActivityLogEntry {
        self.push_at(message, color, chrono::Local::now().naive_local())
    }

    /// 以指定时间追加（超出容量时丢弃最旧的条目）
    pub fn push_at(
        &mut self,
        message: impl Into<String>,
        color: LogColor,
        timestamp: NaiveDateTime,
    ) -> &ActivityLogEntry {
        self.next_id += 1;
        if self.entries.len() == ACTIVITY_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(ActivityLogEntry {
            id: self.next_id,
            message: message.into(),
            color,
            timestamp,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// 清空（id 计数不回退）
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 按追加顺序（旧 → 新）
    pub fn entries(&self) -> impl Iterator<Item = &ActivityLogEntry> {
        self.entries.iter()
    }

    /// 最新在前
    pub fn recent(&self) -> Vec<ActivityLogEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn latest(&self) -> Option<&ActivityLogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_keeps_most_recent() {
        let mut log = ActivityLog::new();
        for i in 0..15 {
            log.push(format!("msg {}", i), LogColor::Gray);
        }
        assert_eq!(log.len(), ACTIVITY_LOG_CAPACITY);
        let first = log.entries().next().unwrap();
        assert_eq!(first.message, "msg 5");
        assert_eq!(log.latest().unwrap().message, "msg 14");
        assert_eq!(log.recent()[0].message, "msg 14");
    }

    #[test]
    fn test_ids_monotonic_across_clear() {
        let mut log = ActivityLog::new();
        let a = log.push("a", LogColor::Green).id;
        let b = log.push("b", LogColor::Red).id;
        assert!(b > a);
        log.clear();
        assert!(log.is_empty());
        let c = log.push("c", LogColor::Blue).id;
        assert!(c > b);
    }
}
