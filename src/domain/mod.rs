// ==========================================
// 搅拌站配料控制系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod activity_log;
pub mod formula;
pub mod job;
pub mod production;
pub mod schedule;
pub mod sensor;
pub mod types;

// 重导出核心类型
pub use activity_log::{ActivityLog, ActivityLogEntry, ACTIVITY_LOG_CAPACITY};
pub use formula::{Formula, MaterialWeights};
pub use job::JobInfo;
pub use production::{PrintJob, ProductionHistoryEntry};
pub use schedule::{format2, parse_number, round2, ScheduleRow, ScheduleRowRecord};
pub use sensor::WeightReading;
pub use types::{ControlMode, LogColor, MaterialChannel, PrintMode, ScheduleStatus};
