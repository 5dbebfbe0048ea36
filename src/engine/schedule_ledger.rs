// ==========================================
// 搅拌站配料控制系统 - 生产计划台账引擎
// ==========================================
// 职责: 派生字段重算、计划编号匹配、方量告警、发货回写计算
// 不变量: remaining = volume - delivered; total = volume + added (2 位小数)
// 红线: 编号为空的行是占位行,派生字段全部为空
// ==========================================

use crate::domain::schedule::{round2, ScheduleRow, ScheduleRowRecord};
use crate::domain::types::ScheduleStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

// ==========================================
// ScheduleWarning - 计划状态告警
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleWarning {
    /// 计划编号不存在
    NotFound { req_no: String },
    /// 计划已推迟
    Postponed { req_no: String },
    /// 计划已完成/取消
    Closed { req_no: String, status: ScheduleStatus },
}

impl ScheduleWarning {
    /// 消息键（i18n）
    pub fn message_key(&self) -> &'static str {
        match self {
            ScheduleWarning::NotFound { .. } => "warning.schedule_not_found",
            ScheduleWarning::Postponed { .. } => "warning.schedule_postponed",
            ScheduleWarning::Closed { .. } => "warning.schedule_closed",
        }
    }
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleWarning::NotFound { req_no } => write!(f, "SCHEDULE_NOT_FOUND: {}", req_no),
            ScheduleWarning::Postponed { req_no } => write!(f, "SCHEDULE_POSTPONED: {}", req_no),
            ScheduleWarning::Closed { req_no, status } => {
                write!(f, "SCHEDULE_CLOSED: {} ({})", req_no, status)
            }
        }
    }
}

// ==========================================
// ScheduleAssessment - 编号匹配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScheduleAssessment {
    /// 命中的非终态计划行
    pub active_row: Option<ScheduleRow>,
    /// 计划状态告警
    pub warning: Option<ScheduleWarning>,
}

// ==========================================
// DeliveryOutcome - 批次完成后的台账回写结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub old_delivered: f64,
    pub new_delivered: f64,
    pub remaining: f64,
    pub total: f64,
    pub status: ScheduleStatus,
}

// ==========================================
// ScheduleLedger - 台账引擎
// ==========================================
pub struct ScheduleLedger;

impl ScheduleLedger {
    /// 重算单行派生字段（幂等）
    ///
    /// - 编号为空: 清空 remaining/total/status/delivered/added
    /// - 否则: remaining = volume - delivered, total = volume + added（2 位小数）
    pub fn recalculate_row(row: &ScheduleRow) -> ScheduleRow {
        let mut out = row.clone();
        if row.is_inert() {
            out.remaining = None;
            out.total = None;
            out.status = None;
            out.delivered = 0.0;
            out.added = 0.0;
            return out;
        }

        out.remaining = Some(round2(row.volume - row.delivered));
        out.total = Some(round2(row.volume + row.added));
        if out.status.is_none() {
            out.status = Some(ScheduleStatus::Menunggu);
        }
        out
    }

    /// 重算整表
    #[instrument(skip(rows), fields(rows = rows.len()))]
    pub fn recalculate_all(rows: &[ScheduleRow]) -> Vec<ScheduleRow> {
        rows.iter().map(Self::recalculate_row).collect()
    }

    /// 边界版本: 解析 → 重算 → 格式化
    pub fn recalculate_record(record: &ScheduleRowRecord) -> ScheduleRowRecord {
        Self::recalculate_row(&ScheduleRow::from_record(record)).to_record()
    }

    /// 按编号查找（任意状态）
    pub fn find_row<'a>(rows: &'a [ScheduleRow], req_no: &str) -> Option<&'a ScheduleRow> {
        rows.iter().find(|r| r.matches_no(req_no))
    }

    /// 评估计划编号: 命中的有效行 + 状态告警
    pub fn assess(rows: &[ScheduleRow], req_no: &str) -> ScheduleAssessment {
        let req_no = req_no.trim();
        if req_no.is_empty() {
            return ScheduleAssessment::default();
        }

        match Self::find_row(rows, req_no) {
            None => ScheduleAssessment {
                active_row: None,
                warning: Some(ScheduleWarning::NotFound {
                    req_no: req_no.to_string(),
                }),
            },
            Some(row) => match row.status {
                Some(status) if status.is_terminal() => ScheduleAssessment {
                    active_row: None,
                    warning: Some(ScheduleWarning::Closed {
                        req_no: req_no.to_string(),
                        status,
                    }),
                },
                Some(ScheduleStatus::Tunda) => ScheduleAssessment {
                    active_row: Some(row.clone()),
                    warning: Some(ScheduleWarning::Postponed {
                        req_no: req_no.to_string(),
                    }),
                },
                _ => ScheduleAssessment {
                    active_row: Some(row.clone()),
                    warning: None,
                },
            },
        }
    }

    /// 本批方量是否超过计划剩余方量（仅对台账侧取两位小数）
    pub fn volume_exceeds_remaining(row: &ScheduleRow, batch_volume: f64) -> bool {
        batch_volume > round2(row.remaining_volume())
    }

    /// 计算批次完成后的回写结果
    ///
    /// - new_delivered = old_delivered + batch_volume（batch_volume < 0 按 0 处理）
    /// - remaining = total - new_delivered
    /// - new_delivered >= total → Selesai, 否则 Proses
    pub fn compute_delivery(row: &ScheduleRow, batch_volume: f64) -> DeliveryOutcome {
        let batch_volume = if batch_volume.is_finite() { batch_volume.max(0.0) } else { 0.0 };
        let old_delivered = row.delivered;
        let new_delivered = round2(old_delivered + batch_volume);
        let total = round2(row.total_volume());
        let status = if new_delivered >= total {
            ScheduleStatus::Selesai
        } else {
            ScheduleStatus::Proses
        };

        DeliveryOutcome {
            old_delivered,
            new_delivered,
            remaining: round2(total - new_delivered),
            total,
            status,
        }
    }

    /// 将回写结果应用到指定编号的行,返回是否命中
    pub fn apply_delivery(rows: &mut [ScheduleRow], req_no: &str, outcome: &DeliveryOutcome) -> bool {
        match rows.iter_mut().find(|r| r.matches_no(req_no)) {
            Some(row) => {
                row.delivered = outcome.new_delivered;
                row.remaining = Some(outcome.remaining);
                row.total = Some(outcome.total);
                row.status = Some(outcome.status);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(no: &str, volume: f64, delivered: f64, added: f64) -> ScheduleRow {
        let mut r = ScheduleRow::new(no, volume);
        r.delivered = delivered;
        r.added = added;
        r
    }

    #[test]
    fn test_recalculate_invariants() {
        for &(v, d, a) in &[(10.0, 0.0, 0.0), (10.0, 3.333, 2.0), (7.5, 7.5, 0.25), (1.0, 4.0, 0.0)] {
            let out = ScheduleLedger::recalculate_row(&row("A1", v, d, a));
            assert_eq!(out.remaining, Some(round2(v - d)));
            assert_eq!(out.total, Some(round2(v + a)));
        }
    }

    #[test]
    fn test_recalculate_blank_row_clears_derived() {
        let mut blank = row("  ", 10.0, 4.0, 1.0);
        blank.status = Some(ScheduleStatus::Proses);
        blank.remaining = Some(6.0);
        let out = ScheduleLedger::recalculate_row(&blank);
        assert!(out.remaining.is_none());
        assert!(out.total.is_none());
        assert!(out.status.is_none());
        assert_eq!(out.delivered, 0.0);
        assert_eq!(out.added, 0.0);
    }

    #[test]
    fn test_recalculate_idempotent() {
        let rows = vec![row("A1", 10.0, 3.0, 2.0), row("", 4.0, 1.0, 0.0), row("B", 0.0, 0.0, 0.0)];
        let once = ScheduleLedger::recalculate_all(&rows);
        let twice = ScheduleLedger::recalculate_all(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_added_volume_scenario_record() {
        let record = ScheduleRowRecord {
            no: "A1".to_string(),
            volume: "10".to_string(),
            penambahan_vol: "2".to_string(),
            ..Default::default()
        };
        let out = ScheduleLedger::recalculate_record(&record);
        assert_eq!(out.total_vol, "12.00");
        assert_eq!(out.sisa, "10.00");
        assert_eq!(ScheduleLedger::recalculate_record(&out), out);
    }

    #[test]
    fn test_blank_record_scenario() {
        let record = ScheduleRowRecord {
            volume: "10".to_string(),
            terkirim: "3".to_string(),
            sisa: "7".to_string(),
            status: "Proses".to_string(),
            ..Default::default()
        };
        let out = ScheduleLedger::recalculate_record(&record);
        assert_eq!(out.sisa, "");
        assert_eq!(out.total_vol, "");
        assert_eq!(out.status, "");
        assert_eq!(out.terkirim, "");
        assert_eq!(out.penambahan_vol, "");
    }

    #[test]
    fn test_assess_variants() {
        let mut done = row("C3", 5.0, 5.0, 0.0);
        done.status = Some(ScheduleStatus::Selesai);
        let mut postponed = row("B2", 5.0, 0.0, 0.0);
        postponed.status = Some(ScheduleStatus::Tunda);
        let rows = vec![row("A1", 10.0, 0.0, 0.0), postponed, done];

        assert_eq!(ScheduleLedger::assess(&rows, ""), ScheduleAssessment::default());

        let a = ScheduleLedger::assess(&rows, " A1 ");
        assert_eq!(a.active_row.unwrap().no, "A1");
        assert!(a.warning.is_none());

        let b = ScheduleLedger::assess(&rows, "B2");
        assert!(b.active_row.is_some());
        assert!(matches!(b.warning, Some(ScheduleWarning::Postponed { .. })));

        let c = ScheduleLedger::assess(&rows, "C3");
        assert!(c.active_row.is_none());
        assert!(matches!(
            c.warning,
            Some(ScheduleWarning::Closed { status: ScheduleStatus::Selesai, .. })
        ));

        let z = ScheduleLedger::assess(&rows, "Z9");
        assert!(matches!(z.warning, Some(ScheduleWarning::NotFound { .. })));
    }

    #[test]
    fn test_volume_exceeds_remaining() {
        let r = ScheduleLedger::recalculate_row(&row("A1", 10.0, 6.0, 0.0));
        assert!(!ScheduleLedger::volume_exceeds_remaining(&r, 4.0));
        assert!(ScheduleLedger::volume_exceeds_remaining(&r, 4.01));
    }

    #[test]
    fn test_delivery_full_batch_completes_row() {
        let r = ScheduleLedger::recalculate_row(&row("A1", 10.0, 0.0, 0.0));
        let outcome = ScheduleLedger::compute_delivery(&r, 10.0);
        assert_eq!(outcome.new_delivered, 10.0);
        assert_eq!(outcome.remaining, 0.0);
        assert_eq!(outcome.status, ScheduleStatus::Selesai);

        let mut rows = vec![r];
        assert!(ScheduleLedger::apply_delivery(&mut rows, "A1", &outcome));
        let rec = rows[0].to_record();
        assert_eq!(rec.terkirim, "10.00");
        assert_eq!(rec.sisa, "0.00");
        assert_eq!(rec.status, "Selesai");
    }

    #[test]
    fn test_delivery_is_monotonic_and_status_iff_total_reached() {
        let r = ScheduleLedger::recalculate_row(&row("A1", 10.0, 2.0, 2.0));
        for &v in &[-3.0, 0.0, 1.5, 9.99, 10.0, 15.0] {
            let outcome = ScheduleLedger::compute_delivery(&r, v);
            assert!(outcome.new_delivered >= outcome.old_delivered);
            assert_eq!(
                outcome.status == ScheduleStatus::Selesai,
                outcome.new_delivered >= outcome.total
            );
        }
    }
}
