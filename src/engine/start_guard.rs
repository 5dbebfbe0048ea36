// ==========================================
// 搅拌站配料控制系统 - 启动前置条件检查
// ==========================================
// 职责: START 前置条件 → 拒绝原因（值,非错误）
// 顺序: 电源 → 计划编号 → 方量 → 单盘容量(AUTO) → 剩余方量 → 计划状态 → 有效计划行 → 重复启动
// ==========================================

use crate::domain::job::JobInfo;
use crate::domain::types::ControlMode;
use crate::engine::schedule_ledger::{ScheduleAssessment, ScheduleLedger, ScheduleWarning};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// JobWarning - 批次表单告警（界面显示）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobWarning {
    /// 单盘方量超过搅拌机容量（两种模式都显示, 仅 AUTO 阻止 START）
    MixCapacityExceeded { per_mix: f64, limit: f64 },
    /// 本批方量超过计划剩余
    VolumeExceedsRemaining { requested: f64, remaining: f64 },
}

impl JobWarning {
    pub fn message_key(&self) -> &'static str {
        match self {
            JobWarning::MixCapacityExceeded { .. } => "warning.mix_capacity",
            JobWarning::VolumeExceedsRemaining { .. } => "warning.volume_exceeds_remaining",
        }
    }
}

// ==========================================
// StartRejection - START 拒绝原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StartRejection {
    PowerOff,
    MissingReqNo,
    NonPositiveVolume,
    Job(JobWarning),
    Schedule(ScheduleWarning),
    NoActiveSchedule,
    AlreadyRunning,
}

impl StartRejection {
    pub fn message_key(&self) -> &'static str {
        match self {
            StartRejection::PowerOff => "start.power_off",
            StartRejection::MissingReqNo => "start.missing_req_no",
            StartRejection::NonPositiveVolume => "start.non_positive_volume",
            StartRejection::Job(w) => w.message_key(),
            StartRejection::Schedule(w) => w.message_key(),
            StartRejection::NoActiveSchedule => "start.no_active_schedule",
            StartRejection::AlreadyRunning => "start.already_running",
        }
    }
}

impl fmt::Display for StartRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartRejection::PowerOff => write!(f, "POWER_OFF"),
            StartRejection::MissingReqNo => write!(f, "MISSING_REQ_NO"),
            StartRejection::NonPositiveVolume => write!(f, "NON_POSITIVE_VOLUME"),
            StartRejection::Job(JobWarning::MixCapacityExceeded { per_mix, limit }) => {
                write!(f, "MIX_CAPACITY_EXCEEDED: {:.2} > {:.2}", per_mix, limit)
            }
            StartRejection::Job(JobWarning::VolumeExceedsRemaining { requested, remaining }) => {
                write!(f, "VOLUME_EXCEEDS_REMAINING: {:.2} > {:.2}", requested, remaining)
            }
            StartRejection::Schedule(w) => write!(f, "{}", w),
            StartRejection::NoActiveSchedule => write!(f, "NO_ACTIVE_SCHEDULE"),
            StartRejection::AlreadyRunning => write!(f, "ALREADY_RUNNING"),
        }
    }
}

// ==========================================
// StartContext - 检查输入
// ==========================================
#[derive(Debug, Clone)]
pub struct StartContext<'a> {
    pub powered: bool,
    pub mode: ControlMode,
    pub job: &'a JobInfo,
    pub schedule: &'a ScheduleAssessment,
    pub process_active: bool, // 手动运行中 / 自动流程未回到空闲
    pub max_mix_volume: f64,
}

// ==========================================
// StartGuard
// ==========================================
pub struct StartGuard;

impl StartGuard {
    /// 当前表单告警
    pub fn job_warnings(ctx: &StartContext<'_>) -> Vec<JobWarning> {
        let mut warnings = Vec::new();

        // 按原值比较: 3.504 > 3.5 必须告警
        let per_mix = ctx.job.per_mix_volume();
        if per_mix > ctx.max_mix_volume {
            warnings.push(JobWarning::MixCapacityExceeded {
                per_mix,
                limit: ctx.max_mix_volume,
            });
        }

        if let Some(row) = &ctx.schedule.active_row {
            if ScheduleLedger::volume_exceeds_remaining(row, ctx.job.target_volume) {
                warnings.push(JobWarning::VolumeExceedsRemaining {
                    requested: ctx.job.target_volume,
                    remaining: row.remaining_volume(),
                });
            }
        }

        warnings
    }

    /// 检查 START 是否允许; 返回第一个拒绝原因
    pub fn check(ctx: &StartContext<'_>) -> Result<(), StartRejection> {
        if !ctx.powered {
            return Err(StartRejection::PowerOff);
        }
        if !ctx.job.has_req_no() {
            return Err(StartRejection::MissingReqNo);
        }
        if ctx.job.target_volume <= 0.0 {
            return Err(StartRejection::NonPositiveVolume);
        }
        let blocking = Self::job_warnings(ctx).into_iter().find(|w| match w {
            JobWarning::MixCapacityExceeded { .. } => ctx.mode == ControlMode::Auto,
            JobWarning::VolumeExceedsRemaining { .. } => true,
        });
        if let Some(warning) = blocking {
            return Err(StartRejection::Job(warning));
        }
        if let Some(warning) = &ctx.schedule.warning {
            return Err(StartRejection::Schedule(warning.clone()));
        }
        if ctx.schedule.active_row.is_none() {
            return Err(StartRejection::NoActiveSchedule);
        }
        if ctx.process_active {
            return Err(StartRejection::AlreadyRunning);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::ScheduleRow;
    use crate::domain::types::ScheduleStatus;

    fn job(req_no: &str, volume: f64, mix: i64) -> JobInfo {
        let mut job = JobInfo::empty();
        job.req_no = req_no.to_string();
        job.set_target_volume(volume);
        job.set_mix_count(mix);
        job
    }

    fn rows() -> Vec<ScheduleRow> {
        let mut done = ScheduleRow::new("C3", 5.0);
        done.status = Some(ScheduleStatus::Selesai);
        ScheduleLedger::recalculate_all(&[ScheduleRow::new("A1", 10.0), done])
    }

    fn check(powered: bool, mode: ControlMode, job: &JobInfo, active: bool) -> Result<(), StartRejection> {
        let assessment = ScheduleLedger::assess(&rows(), &job.req_no);
        StartGuard::check(&StartContext {
            powered,
            mode,
            job,
            schedule: &assessment,
            process_active: active,
            max_mix_volume: 3.5,
        })
    }

    #[test]
    fn test_start_allowed() {
        assert_eq!(check(true, ControlMode::Manual, &job("A1", 7.0, 2), false), Ok(()));
        assert_eq!(check(true, ControlMode::Auto, &job("A1", 7.0, 2), false), Ok(()));
    }

    #[test]
    fn test_start_refusals() {
        assert_eq!(
            check(false, ControlMode::Manual, &job("A1", 5.0, 2), false),
            Err(StartRejection::PowerOff)
        );
        assert_eq!(
            check(true, ControlMode::Manual, &job("  ", 5.0, 2), false),
            Err(StartRejection::MissingReqNo)
        );
        assert_eq!(
            check(true, ControlMode::Manual, &job("A1", 0.0, 2), false),
            Err(StartRejection::NonPositiveVolume)
        );
        assert!(matches!(
            check(true, ControlMode::Auto, &job("A1", 8.0, 2), false),
            Err(StartRejection::Job(JobWarning::MixCapacityExceeded { .. }))
        ));
        assert!(matches!(
            check(true, ControlMode::Manual, &job("A1", 12.0, 4), false),
            Err(StartRejection::Job(JobWarning::VolumeExceedsRemaining { .. }))
        ));
        assert!(matches!(
            check(true, ControlMode::Manual, &job("Z9", 1.0, 1), false),
            Err(StartRejection::Schedule(ScheduleWarning::NotFound { .. }))
        ));
        assert!(matches!(
            check(true, ControlMode::Manual, &job("C3", 1.0, 1), false),
            Err(StartRejection::Schedule(ScheduleWarning::Closed { .. }))
        ));
        assert_eq!(
            check(true, ControlMode::Manual, &job("A1", 1.0, 1), true),
            Err(StartRejection::AlreadyRunning)
        );
    }

    #[test]
    fn test_capacity_only_blocks_in_auto() {
        assert_eq!(check(true, ControlMode::Manual, &job("A1", 8.0, 2), false), Ok(()));
    }

    #[test]
    fn test_capacity_warning_shown_in_manual() {
        let job = job("A1", 8.0, 2);
        let assessment = ScheduleLedger::assess(&rows(), &job.req_no);
        let warnings = StartGuard::job_warnings(&StartContext {
            powered: true,
            mode: ControlMode::Manual,
            job: &job,
            schedule: &assessment,
            process_active: false,
            max_mix_volume: 3.5,
        });
        assert_eq!(
            warnings,
            vec![JobWarning::MixCapacityExceeded { per_mix: 4.0, limit: 3.5 }]
        );
    }

    #[test]
    fn test_capacity_boundary() {
        // 7.008 / 2 = 3.504 刚好超过 3.5
        assert!(matches!(
            check(true, ControlMode::Auto, &job("A1", 7.008, 2), false),
            Err(StartRejection::Job(JobWarning::MixCapacityExceeded { .. }))
        ));
        // 恰好等于容量允许
        assert_eq!(check(true, ControlMode::Auto, &job("A1", 7.0, 2), false), Ok(()));
    }

    #[test]
    fn test_volume_just_above_remaining() {
        assert!(matches!(
            check(true, ControlMode::Manual, &job("A1", 10.004, 4), false),
            Err(StartRejection::Job(JobWarning::VolumeExceedsRemaining { .. }))
        ));
        assert_eq!(check(true, ControlMode::Manual, &job("A1", 10.0, 4), false), Ok(()));
    }
}
