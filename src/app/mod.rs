// ==========================================
// 搅拌站配料控制系统 - 应用层
// ==========================================
// 职责: 组装仓储/引擎/API,管理后台节拍与订阅任务
// ==========================================

pub mod state;
pub mod ticker;

// 重导出
pub use state::{get_default_db_path, AppState};
pub use ticker::{ProcessTicker, ScheduleFeed, SensorFeed, TickerHandle, TICK_PERIOD};
