// ==========================================
// 搅拌站配料控制系统 - 目标重量计算
// ==========================================
// 职责: 配合比 × 目标方量 ÷ 分盘数 → 单盘各通道目标重量
// 公式: weight = formula[channel] * target_volume / mix_count
// 约束: 无错误路径; 未选配合比时全部为 0; mix_count < 1 按 1 计
// ==========================================

use crate::domain::formula::{Formula, MaterialWeights};
use tracing::instrument;

// ==========================================
// TargetWeightCalculator - 目标重量计算器
// ==========================================
pub struct TargetWeightCalculator;

impl TargetWeightCalculator {
    /// 计算单盘目标重量（纯函数）
    ///
    /// # 参数
    /// - `formula`: 选中的配合比（None 表示未选择）
    /// - `target_volume`: 目标方量 m³（负值/非有限值按 0 处理）
    /// - `mix_count`: 分盘数（0 按 1 处理）
    pub fn compute_targets(
        formula: Option<&Formula>,
        target_volume: f64,
        mix_count: u32,
    ) -> MaterialWeights {
        let formula = match formula {
            Some(f) => f,
            None => return MaterialWeights::zero(),
        };
        let volume = if target_volume.is_finite() && target_volume > 0.0 {
            target_volume
        } else {
            0.0
        };
        let divisor = f64::from(mix_count.max(1));

        formula
            .per_unit
            .map(|_, per_unit| per_unit * volume / divisor)
    }
}

// ==========================================
// TargetWeightMemo - 记忆化包装
// ==========================================
// 仅当配合比、方量或分盘数变化时重算
#[derive(Debug, Default)]
pub struct TargetWeightMemo {
    last: Option<MemoEntry>,
    recompute_count: u64,
}

#[derive(Debug, Clone)]
struct MemoEntry {
    formula: Option<Formula>,
    volume_bits: u64,
    mix_count: u32,
    weights: MaterialWeights,
}

impl TargetWeightMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取目标重量（命中缓存则直接返回）
    #[instrument(level = "debug", skip(self, formula), fields(formula_id = formula.map(|f| f.id.as_str())))]
    pub fn get(&mut self, formula: Option<&Formula>, target_volume: f64, mix_count: u32) -> MaterialWeights {
        let volume_bits = target_volume.to_bits();
        if let Some(entry) = &self.last {
            if entry.formula.as_ref() == formula
                && entry.volume_bits == volume_bits
                && entry.mix_count == mix_count
            {
                return entry.weights;
            }
        }

        let weights = TargetWeightCalculator::compute_targets(formula, target_volume, mix_count);
        self.recompute_count += 1;
        tracing::debug!(recompute_count = self.recompute_count, "目标重量重算");
        self.last = Some(MemoEntry {
            formula: formula.cloned(),
            volume_bits,
            mix_count,
            weights,
        });
        weights
    }

    /// 重算次数（用于观测缓存命中）
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count
    }

    /// 清除缓存
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MaterialChannel;

    fn k225() -> Formula {
        let mut per_unit = MaterialWeights::zero();
        per_unit.pasir1 = 420.0;
        per_unit.pasir2 = 310.0;
        per_unit.batu1 = 520.0;
        per_unit.batu2 = 480.0;
        per_unit.semen = 350.0;
        per_unit.air = 180.0;
        per_unit.additive1 = 1.75;
        Formula::new("F-K225", "K225", per_unit)
    }

    #[test]
    fn test_k225_scenario() {
        let targets = TargetWeightCalculator::compute_targets(Some(&k225()), 7.0, 2);
        assert_eq!(targets.semen, 1225.0);
        assert_eq!(targets.air, 630.0);
    }

    #[test]
    fn test_every_channel_follows_formula() {
        let formula = k225();
        for &(volume, mix) in &[(0.0, 1u32), (1.0, 1), (7.0, 2), (3.3, 3), (12.5, 4)] {
            let targets = TargetWeightCalculator::compute_targets(Some(&formula), volume, mix);
            for ch in MaterialChannel::ALL {
                assert_eq!(
                    targets.get(ch),
                    formula.quantity(ch) * volume / f64::from(mix),
                    "channel {} volume {} mix {}",
                    ch,
                    volume,
                    mix
                );
            }
        }
    }

    #[test]
    fn test_no_formula_is_all_zero() {
        let targets = TargetWeightCalculator::compute_targets(None, 10.0, 2);
        assert_eq!(targets, MaterialWeights::zero());
    }

    #[test]
    fn test_zero_mix_count_treated_as_one() {
        let a = TargetWeightCalculator::compute_targets(Some(&k225()), 2.0, 0);
        let b = TargetWeightCalculator::compute_targets(Some(&k225()), 2.0, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_memo_recomputes_only_on_change() {
        let formula = k225();
        let mut memo = TargetWeightMemo::new();
        memo.get(Some(&formula), 7.0, 2);
        memo.get(Some(&formula), 7.0, 2);
        assert_eq!(memo.recompute_count(), 1);

        memo.get(Some(&formula), 7.0, 3);
        assert_eq!(memo.recompute_count(), 2);
        memo.get(None, 7.0, 3);
        assert_eq!(memo.recompute_count(), 3);
        memo.invalidate();
        memo.get(None, 7.0, 3);
        assert_eq!(memo.recompute_count(), 4);
    }
}
