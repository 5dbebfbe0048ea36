// ==========================================
// 搅拌站配料控制系统 - 配置层
// ==========================================
// 职责: 控制参数管理（搅拌时间、容量、打印模式等）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod control_settings;
pub mod plant_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use control_settings::ControlSettings;
pub use plant_config_trait::PlantConfigReader;
