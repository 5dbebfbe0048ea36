// ==========================================
// 搅拌站配料控制系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite（文档存储 + config_kv）
// 系统定位: 单批次配料控制（配合比 → 目标重量 → 过程控制 → 台账回写）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "id");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 文档存储端口与类型化仓储
pub mod repository;

// 引擎层 - 配料/台账/过程规则
pub mod engine;

// 导入层 - 外部表格
pub mod importer;

// 配置层 - 控制参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装与后台任务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ControlMode, LogColor, MaterialChannel, PrintMode, ScheduleStatus};

// 领域实体
pub use domain::{
    ActivityLog, Formula, JobInfo, MaterialWeights, ProductionHistoryEntry, ScheduleRow,
    ScheduleRowRecord, WeightReading,
};

// 引擎
pub use engine::{
    BatchFinalizer, ProcessState, ScheduleLedger, StartGuard, TargetWeightCalculator,
    WeightSimulator,
};

// API
pub use api::{ControlPanelApi, ImportApi, ScheduleApi, StatusPanel};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "搅拌站配料控制系统";

// 数据库版本
pub const DB_VERSION: &str = "v1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
