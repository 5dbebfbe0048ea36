// ==========================================
// 搅拌站配料控制系统 - 控制配置汇总
// ==========================================

use crate::domain::types::PrintMode;
use crate::engine::process::StepDurations;
use serde::{Deserialize, Serialize};

/// 控制面板运行所需的全部配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    // ===== 自动流程时长（秒） =====
    pub mixing_time_secs: u32,
    pub weighing_time_secs: u32,
    pub discharge_time_secs: u32,

    // ===== 容量 =====
    pub max_mix_volume_m3: f64,

    // ===== 打印与站点 =====
    pub print_mode: PrintMode,
    pub operator_name: String,
    pub plant_location: String,
    pub locale: String,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            mixing_time_secs: 15,
            weighing_time_secs: 10,
            discharge_time_secs: 5,
            max_mix_volume_m3: 3.5,
            print_mode: PrintMode::Print,
            operator_name: "Operator".to_string(),
            plant_location: "default".to_string(),
            locale: "id".to_string(),
        }
    }
}

impl ControlSettings {
    pub fn step_durations(&self) -> StepDurations {
        StepDurations {
            weighing_secs: self.weighing_time_secs,
            mixing_secs: self.mixing_time_secs.max(1),
            discharge_secs: self.discharge_time_secs,
        }
    }
}
