// ==========================================
// 搅拌站配料控制系统 - 配合比领域模型
// ==========================================
// 职责: 配合比 (job-mix formula) 与按通道的重量集合
// 红线: 被运行中的批次引用后不可修改（由外部配合比管理维护）
// ==========================================

use crate::domain::types::MaterialChannel;
use serde::{Deserialize, Serialize};

// ==========================================
// MaterialWeights - 按通道的重量/用量集合
// ==========================================
// 用途: 配合比单方用量、目标重量、实际重量、偏差
// 字段名与外部文档一致 (pasir1 ... additive3)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialWeights {
    #[serde(default)]
    pub pasir1: f64,
    #[serde(default)]
    pub pasir2: f64,
    #[serde(default)]
    pub batu1: f64,
    #[serde(default)]
    pub batu2: f64,
    #[serde(default)]
    pub batu3: f64,
    #[serde(default)]
    pub batu4: f64,
    #[serde(default)]
    pub semen: f64,
    #[serde(default)]
    pub air: f64,
    #[serde(default)]
    pub additive1: f64,
    #[serde(default)]
    pub additive2: f64,
    #[serde(default)]
    pub additive3: f64,
}

impl MaterialWeights {
    /// 全零
    pub fn zero() -> Self {
        Self::default()
    }

    /// 读取单个通道
    pub fn get(&self, channel: MaterialChannel) -> f64 {
        match channel {
            MaterialChannel::Pasir1 => self.pasir1,
            MaterialChannel::Pasir2 => self.pasir2,
            MaterialChannel::Batu1 => self.batu1,
            MaterialChannel::Batu2 => self.batu2,
            MaterialChannel::Batu3 => self.batu3,
            MaterialChannel::Batu4 => self.batu4,
            MaterialChannel::Semen => self.semen,
            MaterialChannel::Air => self.air,
            MaterialChannel::Additive1 => self.additive1,
            MaterialChannel::Additive2 => self.additive2,
            MaterialChannel::Additive3 => self.additive3,
        }
    }

    /// 写入单个通道
    pub fn set(&mut self, channel: MaterialChannel, value: f64) {
        let slot = match channel {
            MaterialChannel::Pasir1 => &mut self.pasir1,
            MaterialChannel::Pasir2 => &mut self.pasir2,
            MaterialChannel::Batu1 => &mut self.batu1,
            MaterialChannel::Batu2 => &mut self.batu2,
            MaterialChannel::Batu3 => &mut self.batu3,
            MaterialChannel::Batu4 => &mut self.batu4,
            MaterialChannel::Semen => &mut self.semen,
            MaterialChannel::Air => &mut self.air,
            MaterialChannel::Additive1 => &mut self.additive1,
            MaterialChannel::Additive2 => &mut self.additive2,
            MaterialChannel::Additive3 => &mut self.additive3,
        };
        *slot = value;
    }

    /// 按固定通道顺序迭代
    pub fn iter(&self) -> impl Iterator<Item = (MaterialChannel, f64)> + '_ {
        MaterialChannel::ALL.iter().map(move |&ch| (ch, self.get(ch)))
    }

    /// 逐通道映射
    pub fn map<F: Fn(MaterialChannel, f64) -> f64>(&self, f: F) -> Self {
        let mut out = Self::zero();
        for (ch, v) in self.iter() {
            out.set(ch, f(ch, v));
        }
        out
    }

    /// 逐通道合并两组值
    pub fn zip_with<F: Fn(f64, f64) -> f64>(&self, other: &Self, f: F) -> Self {
        self.map(|ch, v| f(v, other.get(ch)))
    }

    /// 所有通道之和
    pub fn total(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum()
    }

    /// 骨料通道（砂 + 石）之和
    pub fn aggregate_total(&self) -> f64 {
        self.iter()
            .filter(|(ch, _)| ch.is_aggregate())
            .map(|(_, v)| v)
            .sum()
    }

    /// 外加剂通道之和
    pub fn additive_total(&self) -> f64 {
        self.additive1 + self.additive2 + self.additive3
    }

    /// 负值与非有限值归零
    pub fn sanitized(&self) -> Self {
        self.map(|_, v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
    }
}

// ==========================================
// Formula - 配合比
// ==========================================
// 对齐外部文档: {id, mutuBeton, mutuCode?, pasir1 ... additive3}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formula {
    pub id: String,                // 配合比ID
    pub mutu_beton: String,        // 混凝土等级 (如 K225)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutu_code: Option<String>, // 等级代码后缀
    #[serde(flatten)]
    pub per_unit: MaterialWeights, // 每方用量 (kg/m³)
}

impl Formula {
    /// 创建配合比（单方用量中的负值归零）
    pub fn new(id: impl Into<String>, mutu_beton: impl Into<String>, per_unit: MaterialWeights) -> Self {
        Self {
            id: id.into(),
            mutu_beton: mutu_beton.into(),
            mutu_code: None,
            per_unit: per_unit.sanitized(),
        }
    }

    /// 单个通道的单方用量
    pub fn quantity(&self, channel: MaterialChannel) -> f64 {
        self.per_unit.get(channel)
    }

    /// 显示名称: 等级 + 可选代码后缀
    pub fn display_label(&self) -> String {
        match self.mutu_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => format!("{} {}", self.mutu_beton, code),
            _ => self.mutu_beton.clone(),
        }
    }

    /// 等级匹配（忽略大小写与首尾空白）
    pub fn matches_grade(&self, grade: &str) -> bool {
        let grade = grade.trim();
        !grade.is_empty()
            && (self.mutu_beton.trim().eq_ignore_ascii_case(grade)
                || self.display_label().trim().eq_ignore_ascii_case(grade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_formula_deserialize_missing_fields_default_to_zero() {
        let value = json!({
            "id": "F1",
            "mutuBeton": "K225",
            "semen": 350.0,
            "air": 180.0
        });
        let formula: Formula = serde_json::from_value(value).unwrap();
        assert_eq!(formula.quantity(MaterialChannel::Semen), 350.0);
        assert_eq!(formula.quantity(MaterialChannel::Batu3), 0.0);
        assert!(formula.mutu_code.is_none());
    }

    #[test]
    fn test_display_label_and_grade_match() {
        let mut formula = Formula::new("F1", "K300", MaterialWeights::zero());
        assert_eq!(formula.display_label(), "K300");
        formula.mutu_code = Some("FA".to_string());
        assert_eq!(formula.display_label(), "K300 FA");
        assert!(formula.matches_grade("k300"));
        assert!(formula.matches_grade("K300 FA"));
        assert!(!formula.matches_grade(""));
    }

    #[test]
    fn test_weights_totals() {
        let mut w = MaterialWeights::zero();
        w.set(MaterialChannel::Pasir1, 100.0);
        w.set(MaterialChannel::Batu2, 50.0);
        w.set(MaterialChannel::Semen, 30.0);
        w.set(MaterialChannel::Additive3, 2.0);
        assert_eq!(w.aggregate_total(), 150.0);
        assert_eq!(w.additive_total(), 2.0);
        assert_eq!(w.total(), 182.0);
    }

    #[test]
    fn test_sanitized_clears_negative() {
        let mut w = MaterialWeights::zero();
        w.set(MaterialChannel::Air, -5.0);
        w.set(MaterialChannel::Semen, f64::NAN);
        let s = w.sanitized();
        assert_eq!(s.air, 0.0);
        assert_eq!(s.semen, 0.0);
    }
}
