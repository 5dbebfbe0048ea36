// ==========================================
// 搅拌站配料控制系统 - 称重模拟
// ==========================================
// 职责: 在无真实 PLC 时模拟各通道下料,并合并传感器读数
// 规则: 各通道并行下料,称量时间内线性逼近目标值
// ==========================================

use crate::domain::formula::MaterialWeights;
use crate::domain::sensor::WeightReading;
use crate::domain::types::MaterialChannel;

// ==========================================
// WeightSimulator - 单盘称量模拟
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightSimulator {
    target: MaterialWeights,
    current: MaterialWeights,
    dispensed_total: MaterialWeights, // 已完成盘次的累计实际量
}

impl WeightSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新一盘（当前秤清零）
    pub fn begin_cycle(&mut self, target: MaterialWeights) {
        self.target = target;
        self.current = MaterialWeights::zero();
    }

    /// 称量推进: elapsed / duration 比例线性逼近目标
    pub fn advance(&mut self, elapsed_secs: u32, duration_secs: u32) {
        let ratio = if duration_secs == 0 {
            1.0
        } else {
            (f64::from(elapsed_secs) / f64::from(duration_secs)).clamp(0.0, 1.0)
        };
        self.current = self.target.map(|_, t| t * ratio);
    }

    /// 卸料: 当前秤计入累计并清零
    pub fn discharge(&mut self) {
        self.dispensed_total = self.dispensed_total.zip_with(&self.current, |a, b| a + b);
        self.current = MaterialWeights::zero();
    }

    /// 合并传感器读数: 骨料总量按目标比例分摊到各骨料通道
    pub fn apply_reading(&mut self, reading: &WeightReading) {
        let aggregate_target = self.target.aggregate_total();
        for ch in MaterialChannel::ALL.iter().copied().filter(|c| c.is_aggregate()) {
            let share = if aggregate_target > 0.0 {
                self.target.get(ch) / aggregate_target
            } else {
                0.0
            };
            self.current.set(ch, reading.aggregate.max(0.0) * share);
        }
        self.current.semen = reading.semen.max(0.0);
        self.current.air = reading.air.max(0.0);
    }

    /// 手动模式停机时采集的“实际”重量
    pub fn capture_actual(&self) -> MaterialWeights {
        self.current
    }

    pub fn current(&self) -> &MaterialWeights {
        &self.current
    }

    pub fn target(&self) -> &MaterialWeights {
        &self.target
    }

    pub fn dispensed_total(&self) -> &MaterialWeights {
        &self.dispensed_total
    }

    /// 当前秤占目标百分比（目标为 0 时为 0）
    pub fn percent_of_target(&self, channel: MaterialChannel) -> f64 {
        let target = self.target.get(channel);
        if target > 0.0 {
            (self.current.get(channel) / target * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// 全部清零
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
