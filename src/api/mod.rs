// ==========================================
// 搅拌站配料控制系统 - API 层
// ==========================================
// 职责: 面向操作界面的业务 API（控制面板、状态面板、计划表、导入）
// ==========================================

pub mod error;
pub mod control_panel_api;
pub mod status_panel;
pub mod schedule_api;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use control_panel_api::{CommandOutcome, ControlPanelApi};
pub use status_panel::{format_mmss, ChannelStatus, StatusPanel, StatusPanelView};
pub use schedule_api::ScheduleApi;
pub use import_api::{ImportApi, ImportApiResponse};
