// ==========================================
// 搅拌站配料控制系统 - 状态面板视图模型
// ==========================================
// 职责: 将控制面板瞬态投影为只读视图
// - 计时显示 MM:SS（搅拌阶段倒计时,其余阶段正计时）
// - 步骤标签、分盘进度、各通道完成百分比
// - 告警列表、活动日志（最新在前）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::api::control_panel_api::{ControlPanelApi, ControlPanelState};
use crate::domain::activity_log::ActivityLogEntry;
use crate::domain::types::{ControlMode, MaterialChannel};
use crate::engine::process::{AutoState, ManualState, Phase, ProcessState};
use crate::engine::schedule_ledger::ScheduleWarning;
use crate::engine::start_guard::{JobWarning, StartRejection};
use crate::i18n;

/// 单个配料通道的显示数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub channel: MaterialChannel,
    pub target: f64,
    pub current: f64,
    pub percent: f64,
}

/// 状态面板视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPanelView {
    pub powered: bool,
    pub mode: ControlMode,
    pub state: ProcessState,
    pub step_label: String,
    pub timer_display: String,   // MM:SS
    pub current_mix: u32,
    pub mix_count: u32,
    pub channels: Vec<ChannelStatus>,
    pub warnings: Vec<String>,
    pub log: Vec<ActivityLogEntry>, // 最新在前
}

impl StatusPanelView {
    /// 分盘进度 "current/total"
    pub fn mix_progress(&self) -> String {
        format!("{}/{}", self.current_mix, self.mix_count)
    }
}

/// 秒数 → MM:SS
pub fn format_mmss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

// ==========================================
// StatusPanel - 视图构建
// ==========================================
pub struct StatusPanel;

impl StatusPanel {
    pub fn build(api: &ControlPanelApi) -> StatusPanelView {
        let mut st = api.lock_state();
        Self::from_state(&mut st)
    }

    pub(crate) fn from_state(st: &mut ControlPanelState) -> StatusPanelView {
        let targets = st.targets();
        let current = *st.simulator.current();

        let channels = MaterialChannel::ALL
            .iter()
            .copied()
            .map(|channel| {
                let target = targets.get(channel);
                let now = current.get(channel);
                let percent = if target > 0.0 {
                    (now / target * 100.0).clamp(0.0, 100.0)
                } else {
                    0.0
                };
                ChannelStatus {
                    channel,
                    target,
                    current: now,
                    percent,
                }
            })
            .collect();

        let mut warnings: Vec<String> = st.job_warnings().iter().map(job_warning_text).collect();
        if let Some(w) = &st.schedule.warning {
            warnings.push(schedule_warning_text(w));
        }

        let mix_count = st.job.mix_count.max(1);
        StatusPanelView {
            powered: st.powered,
            mode: st.process.mode(),
            state: st.process,
            step_label: i18n::t(st.process.step_label_key()),
            timer_display: format_mmss(timer_secs(st)),
            current_mix: current_mix(st.process, mix_count),
            mix_count,
            channels,
            warnings,
            log: st.log.recent(),
        }
    }
}

fn timer_secs(st: &ControlPanelState) -> u32 {
    match st.process {
        ProcessState::Manual(ManualState::Running { .. }) => st.manual_elapsed_secs,
        ProcessState::Auto(AutoState::Running(step) | AutoState::Paused(step)) => match step.phase {
            Phase::Mixing { remaining } => remaining,
            Phase::Weighing { elapsed } | Phase::Discharging { elapsed } => elapsed,
        },
        // 空闲时显示预设搅拌时间
        _ => st.settings.mixing_time_secs,
    }
}

fn current_mix(state: ProcessState, mix_count: u32) -> u32 {
    match state {
        ProcessState::Auto(AutoState::Complete) => mix_count,
        ProcessState::Manual(ManualState::Running { .. }) => 1,
        _ => state.active_step().map(|s| s.cycle).unwrap_or(0),
    }
}

/// 作业告警文本（当前语言）
pub fn job_warning_text(w: &JobWarning) -> String {
    let (a, b) = match w {
        JobWarning::MixCapacityExceeded { per_mix, limit } => {
            (("per_mix", format!("{:.2}", per_mix)), ("limit", format!("{:.2}", limit)))
        }
        JobWarning::VolumeExceedsRemaining { requested, remaining } => (
            ("requested", format!("{:.2}", requested)),
            ("remaining", format!("{:.2}", remaining)),
        ),
    };
    i18n::t_with_args(w.message_key(), &[(a.0, a.1.as_str()), (b.0, b.1.as_str())])
}

/// 计划告警文本（当前语言）
pub fn schedule_warning_text(w: &ScheduleWarning) -> String {
    match w {
        ScheduleWarning::NotFound { req_no } | ScheduleWarning::Postponed { req_no } => {
            i18n::t_with_args(w.message_key(), &[("req_no", req_no.as_str())])
        }
        ScheduleWarning::Closed { req_no, status } => i18n::t_with_args(
            w.message_key(),
            &[("req_no", req_no.as_str()), ("status", status.as_str())],
        ),
    }
}

/// START 拒绝原因文本（当前语言）
pub fn rejection_text(r: &StartRejection) -> String {
    match r {
        StartRejection::Job(w) => job_warning_text(w),
        StartRejection::Schedule(w) => schedule_warning_text(w),
        other => i18n::t(other.message_key()),
    }
}
