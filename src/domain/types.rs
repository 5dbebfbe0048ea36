// ==========================================
// 搅拌站配料控制系统 - 领域类型定义
// ==========================================
// 职责: 计划状态、控制模式、打印模式、日志颜色、物料通道
// 序列化格式: 与外部文档存储保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 计划状态 (Schedule Status)
// ==========================================
// 序列化值沿用现场的印尼语状态名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Menunggu, // 等待
    Proses,   // 生产中
    Selesai,  // 完成
    Tunda,    // 推迟
    Batal,    // 取消
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ScheduleStatus {
    /// 转换为存储字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Menunggu => "Menunggu",
            ScheduleStatus::Proses => "Proses",
            ScheduleStatus::Selesai => "Selesai",
            ScheduleStatus::Tunda => "Tunda",
            ScheduleStatus::Batal => "Batal",
        }
    }

    /// 从字符串解析状态（大小写不敏感，未知值返回 None）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "menunggu" => Some(ScheduleStatus::Menunggu),
            "proses" => Some(ScheduleStatus::Proses),
            "selesai" => Some(ScheduleStatus::Selesai),
            "tunda" => Some(ScheduleStatus::Tunda),
            "batal" => Some(ScheduleStatus::Batal),
            _ => None,
        }
    }

    /// 终态: 完成/取消，行被锁定不可再编辑
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduleStatus::Selesai | ScheduleStatus::Batal)
    }
}

// ==========================================
// 控制模式 (Control Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMode {
    Manual, // 操作员手动启停
    Auto,   // 定时器驱动的全流程
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Manual => write!(f, "MANUAL"),
            ControlMode::Auto => write!(f, "AUTO"),
        }
    }
}

// ==========================================
// 打印模式 (Print Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintMode {
    Print,   // 写入打印队列
    LogOnly, // 仅记录完成
}

impl fmt::Display for PrintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PrintMode {
    /// 从字符串解析（未知值返回 None，由调用方决定默认值）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PRINT" => Some(PrintMode::Print),
            "LOG_ONLY" => Some(PrintMode::LogOnly),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PrintMode::Print => "PRINT",
            PrintMode::LogOnly => "LOG_ONLY",
        }
    }
}

// ==========================================
// 活动日志颜色标签 (Log Color)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogColor {
    Green,  // 启动/完成
    Yellow, // 暂停/提示
    Red,    // 停止/断电
    Blue,   // 流程步骤
    Gray,   // 一般信息
}

// ==========================================
// 物料通道 (Material Channel)
// ==========================================
// 顺序固定: 2 种砂, 4 种石, 水泥, 水, 3 种外加剂
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialChannel {
    Pasir1,
    Pasir2,
    Batu1,
    Batu2,
    Batu3,
    Batu4,
    Semen,
    Air,
    Additive1,
    Additive2,
    Additive3,
}

impl MaterialChannel {
    /// 全部 11 个通道（固定顺序）
    pub const ALL: [MaterialChannel; 11] = [
        MaterialChannel::Pasir1,
        MaterialChannel::Pasir2,
        MaterialChannel::Batu1,
        MaterialChannel::Batu2,
        MaterialChannel::Batu3,
        MaterialChannel::Batu4,
        MaterialChannel::Semen,
        MaterialChannel::Air,
        MaterialChannel::Additive1,
        MaterialChannel::Additive2,
        MaterialChannel::Additive3,
    ];

    /// 文档字段名
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialChannel::Pasir1 => "pasir1",
            MaterialChannel::Pasir2 => "pasir2",
            MaterialChannel::Batu1 => "batu1",
            MaterialChannel::Batu2 => "batu2",
            MaterialChannel::Batu3 => "batu3",
            MaterialChannel::Batu4 => "batu4",
            MaterialChannel::Semen => "semen",
            MaterialChannel::Air => "air",
            MaterialChannel::Additive1 => "additive1",
            MaterialChannel::Additive2 => "additive2",
            MaterialChannel::Additive3 => "additive3",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        MaterialChannel::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// 在 ALL 中的下标
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// 骨料（砂 + 石），对应称重传感器的 aggregate 读数
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            MaterialChannel::Pasir1
                | MaterialChannel::Pasir2
                | MaterialChannel::Batu1
                | MaterialChannel::Batu2
                | MaterialChannel::Batu3
                | MaterialChannel::Batu4
        )
    }
}

impl fmt::Display for MaterialChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_status_parse_and_terminal() {
        assert_eq!(ScheduleStatus::from_str("selesai"), Some(ScheduleStatus::Selesai));
        assert_eq!(ScheduleStatus::from_str(" Proses "), Some(ScheduleStatus::Proses));
        assert_eq!(ScheduleStatus::from_str(""), None);
        assert!(ScheduleStatus::Batal.is_terminal());
        assert!(ScheduleStatus::Selesai.is_terminal());
        assert!(!ScheduleStatus::Tunda.is_terminal());
        assert!(!ScheduleStatus::Menunggu.is_terminal());
    }

    #[test]
    fn test_channel_order_matches_index() {
        for (i, ch) in MaterialChannel::ALL.iter().enumerate() {
            assert_eq!(ch.index(), i);
        }
        assert_eq!(MaterialChannel::from_str("SEMEN"), Some(MaterialChannel::Semen));
        assert!(MaterialChannel::Batu4.is_aggregate());
        assert!(!MaterialChannel::Air.is_aggregate());
    }

    #[test]
    fn test_print_mode_roundtrip_str() {
        assert_eq!(PrintMode::from_str("log_only"), Some(PrintMode::LogOnly));
        assert_eq!(PrintMode::Print.to_db_str(), "PRINT");
        assert_eq!(PrintMode::from_str("fax"), None);
    }
}
