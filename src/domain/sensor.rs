// ==========================================
// 搅拌站配料控制系统 - 称重传感器读数
// ==========================================
// 对齐外部文档: {aggregate, air, semen}
// ==========================================

use serde::{Deserialize, Serialize};

/// 称重传感器快照 (kg)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightReading {
    #[serde(default)]
    pub aggregate: f64, // 骨料秤
    #[serde(default)]
    pub air: f64,       // 水秤
    #[serde(default)]
    pub semen: f64,     // 水泥秤
}

impl WeightReading {
    /// 未初始化时写入的默认读数
    pub fn zero() -> Self {
        Self::default()
    }
}
