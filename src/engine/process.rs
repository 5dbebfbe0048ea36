// ==========================================
// 搅拌站配料控制系统 - 生产过程状态机
// ==========================================
// 职责: 手动/自动两种模式的过程状态 + 唯一的转换函数
// 转换: transition(state, command, ctx) -> (next_state, effects)
// 自动流程: idle → weighing → mixing → discharging (× 分盘数) → complete → idle
// 约束: 暂停只能包裹进行中的步骤; 被拒绝的 START 不产生日志
// ==========================================

use crate::domain::types::{ControlMode, LogColor};
use crate::engine::start_guard::StartRejection;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 状态定义
// ==========================================

/// 自动流程中的一个步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// 称量（已用秒数）
    Weighing { elapsed: u32 },
    /// 搅拌（剩余秒数）
    Mixing { remaining: u32 },
    /// 卸料（已用秒数）
    Discharging { elapsed: u32 },
}

/// 进行中的步骤: 第 cycle 盘（从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStep {
    pub cycle: u32,
    pub phase: Phase,
}

/// 自动模式状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoState {
    Idle,
    Running(ActiveStep),
    Paused(ActiveStep),
    Complete,
}

/// 手动模式状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualState {
    Idle,
    Running { elapsed: u32 },
}

/// 过程状态（不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Manual(ManualState),
    Auto(AutoState),
}

impl Default for ProcessState {
    fn default() -> Self {
        ProcessState::Manual(ManualState::Idle)
    }
}

impl ProcessState {
    /// 指定模式下的空闲状态
    pub fn idle(mode: ControlMode) -> Self {
        match mode {
            ControlMode::Manual => ProcessState::Manual(ManualState::Idle),
            ControlMode::Auto => ProcessState::Auto(AutoState::Idle),
        }
    }

    pub fn mode(&self) -> ControlMode {
        match self {
            ProcessState::Manual(_) => ControlMode::Manual,
            ProcessState::Auto(_) => ControlMode::Auto,
        }
    }

    /// 手动运行标志
    pub fn is_manual_running(&self) -> bool {
        matches!(self, ProcessState::Manual(ManualState::Running { .. }))
    }

    /// 有批次在进行（含暂停）
    pub fn is_active(&self) -> bool {
        match self {
            ProcessState::Manual(ManualState::Running { .. }) => true,
            ProcessState::Auto(AutoState::Running(_)) | ProcessState::Auto(AutoState::Paused(_)) => true,
            _ => false,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, ProcessState::Auto(AutoState::Paused(_)))
    }

    /// 当前步骤（暂停时返回被暂停的步骤）
    pub fn active_step(&self) -> Option<ActiveStep> {
        match self {
            ProcessState::Auto(AutoState::Running(step)) | ProcessState::Auto(AutoState::Paused(step)) => {
                Some(*step)
            }
            _ => None,
        }
    }

    /// 步骤标签（i18n 键）
    pub fn step_label_key(&self) -> &'static str {
        match self {
            ProcessState::Manual(ManualState::Idle) => "step.idle",
            ProcessState::Manual(ManualState::Running { .. }) => "step.running",
            ProcessState::Auto(AutoState::Idle) => "step.idle",
            ProcessState::Auto(AutoState::Paused(_)) => "step.paused",
            ProcessState::Auto(AutoState::Complete) => "step.complete",
            ProcessState::Auto(AutoState::Running(step)) => match step.phase {
                Phase::Weighing { .. } => "step.weighing",
                Phase::Mixing { .. } => "step.mixing",
                Phase::Discharging { .. } => "step.discharging",
            },
        }
    }
}

// ==========================================
// 命令 / 上下文 / 副作用
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessCommand {
    Start,
    Stop,
    Pause,
    Resume,
    Tick,
    Reset,
    PowerOff,
    SetMode(ControlMode),
}

impl fmt::Display for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessCommand::Start => write!(f, "START"),
            ProcessCommand::Stop => write!(f, "STOP"),
            ProcessCommand::Pause => write!(f, "PAUSE"),
            ProcessCommand::Resume => write!(f, "RESUME"),
            ProcessCommand::Tick => write!(f, "TICK"),
            ProcessCommand::Reset => write!(f, "RESET"),
            ProcessCommand::PowerOff => write!(f, "POWER_OFF"),
            ProcessCommand::SetMode(mode) => write!(f, "SET_MODE({})", mode),
        }
    }
}

/// 自动流程各步骤时长（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDurations {
    pub weighing_secs: u32,
    pub mixing_secs: u32,
    pub discharge_secs: u32,
}

impl Default for StepDurations {
    fn default() -> Self {
        Self {
            weighing_secs: 10,
            mixing_secs: 15,
            discharge_secs: 5,
        }
    }
}

/// 转换上下文
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionContext {
    /// START 前置条件检查结果（None 表示允许）
    pub start_blocker: Option<StartRejection>,
    pub durations: StepDurations,
    /// 分盘数（≥1）
    pub mix_count: u32,
}

/// 活动日志事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogEvent {
    ManualStarted,
    ManualStopped,
    AutoStarted { mix_count: u32 },
    AutoStopped,
    Paused,
    Resumed,
    WeighingStarted { cycle: u32, mix_count: u32 },
    MixingStarted { cycle: u32, mix_count: u32, secs: u32 },
    DischargeStarted { cycle: u32, mix_count: u32 },
    BatchComplete,
    ModeChanged(ControlMode),
}

impl LogEvent {
    pub fn message_key(&self) -> &'static str {
        match self {
            LogEvent::ManualStarted => "log.manual_started",
            LogEvent::ManualStopped => "log.manual_stopped",
            LogEvent::AutoStarted { .. } => "log.auto_started",
            LogEvent::AutoStopped => "log.auto_stopped",
            LogEvent::Paused => "log.paused",
            LogEvent::Resumed => "log.resumed",
            LogEvent::WeighingStarted { .. } => "log.weighing_started",
            LogEvent::MixingStarted { .. } => "log.mixing_started",
            LogEvent::DischargeStarted { .. } => "log.discharge_started",
            LogEvent::BatchComplete => "log.batch_complete",
            LogEvent::ModeChanged(_) => "log.mode_changed",
        }
    }

    /// 模板参数
    pub fn args(&self) -> Vec<(&'static str, String)> {
        match self {
            LogEvent::AutoStarted { mix_count } => vec![("mix_count", mix_count.to_string())],
            LogEvent::WeighingStarted { cycle, mix_count }
            | LogEvent::DischargeStarted { cycle, mix_count } => vec![
                ("cycle", cycle.to_string()),
                ("mix_count", mix_count.to_string()),
            ],
            LogEvent::MixingStarted { cycle, mix_count, secs } => vec![
                ("cycle", cycle.to_string()),
                ("mix_count", mix_count.to_string()),
                ("secs", secs.to_string()),
            ],
            LogEvent::ModeChanged(mode) => vec![("mode", mode.to_string())],
            _ => Vec::new(),
        }
    }

    pub fn color(&self) -> LogColor {
        match self {
            LogEvent::ManualStarted | LogEvent::AutoStarted { .. } | LogEvent::BatchComplete => {
                LogColor::Green
            }
            LogEvent::ManualStopped | LogEvent::AutoStopped => LogColor::Red,
            LogEvent::Paused | LogEvent::Resumed => LogColor::Yellow,
            LogEvent::WeighingStarted { .. }
            | LogEvent::MixingStarted { .. }
            | LogEvent::DischargeStarted { .. } => LogColor::Blue,
            LogEvent::ModeChanged(_) => LogColor::Gray,
        }
    }
}

/// 批次结束来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalizeSource {
    /// 手动 STOP: 采集当前秤值作为实际量
    ManualStop,
    /// 自动流程完成: 使用累计下料量
    AutoComplete,
}

/// 转换副作用（由调用方执行）
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEffect {
    /// 追加活动日志
    Log(LogEvent),
    /// 新批次开始: 记录开始时间、清空累计量
    BeginBatch,
    /// 新一盘开始: 当前秤清零并装载目标
    BeginCycle { cycle: u32 },
    /// 称量推进
    AdvanceWeighing { elapsed: u32, duration: u32 },
    /// 卸料: 当前秤计入累计
    DischargeCycle { cycle: u32 },
    /// 采集实际量并执行批次收尾
    FinalizeBatch(FinalizeSource),
    /// 中止批次（不收尾）: 清空秤值
    AbortBatch,
    /// 断电: 清空全部瞬态（秤值、日志）
    ResetTransient,
    /// START 被拒绝
    StartRejected(StartRejection),
    /// 当前状态下命令无效（忽略）
    Ignored(ProcessCommand),
}

/// 转换结果
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: ProcessState,
    pub effects: Vec<ProcessEffect>,
}

impl Transition {
    fn to(next: ProcessState, effects: Vec<ProcessEffect>) -> Self {
        Self { next, effects }
    }

    fn ignored(state: ProcessState, cmd: ProcessCommand) -> Self {
        Self {
            next: state,
            effects: vec![ProcessEffect::Ignored(cmd)],
        }
    }

    /// 是否被接受（状态或副作用有实际变化）
    pub fn is_accepted(&self) -> bool {
        !self.effects.iter().any(|e| {
            matches!(e, ProcessEffect::Ignored(_) | ProcessEffect::StartRejected(_))
        })
    }
}

// ==========================================
// 转换函数
// ==========================================

/// 唯一的状态转换入口（纯函数）
pub fn transition(state: ProcessState, cmd: ProcessCommand, ctx: &TransitionContext) -> Transition {
    use ProcessEffect as E;

    // 断电与模式切换对两种模式一致
    match cmd {
        ProcessCommand::PowerOff => {
            return Transition::to(ProcessState::idle(state.mode()), vec![E::ResetTransient]);
        }
        ProcessCommand::SetMode(mode) => {
            if state.is_active() || mode == state.mode() {
                return Transition::ignored(state, cmd);
            }
            return Transition::to(
                ProcessState::idle(mode),
                vec![E::AbortBatch, E::Log(LogEvent::ModeChanged(mode))],
            );
        }
        _ => {}
    }

    match state {
        ProcessState::Manual(manual) => transition_manual(manual, cmd, ctx),
        ProcessState::Auto(auto) => transition_auto(auto, cmd, ctx),
    }
}

fn transition_manual(state: ManualState, cmd: ProcessCommand, ctx: &TransitionContext) -> Transition {
    use ProcessEffect as E;
    let wrap = ProcessState::Manual;

    match (state, cmd) {
        (_, ProcessCommand::Start) => {
            if let Some(rejection) = &ctx.start_blocker {
                return Transition::to(wrap(state), vec![E::StartRejected(rejection.clone())]);
            }
            if let ManualState::Running { .. } = state {
                return Transition::to(wrap(state), vec![E::StartRejected(StartRejection::AlreadyRunning)]);
            }
            Transition::to(
                wrap(ManualState::Running { elapsed: 0 }),
                vec![
                    E::BeginBatch,
                    E::BeginCycle { cycle: 1 },
                    E::Log(LogEvent::ManualStarted),
                ],
            )
        }
        (ManualState::Running { .. }, ProcessCommand::Stop) => Transition::to(
            wrap(ManualState::Idle),
            vec![
                E::Log(LogEvent::ManualStopped),
                E::FinalizeBatch(FinalizeSource::ManualStop),
            ],
        ),
        (ManualState::Running { elapsed }, ProcessCommand::Tick) => {
            let elapsed = elapsed.saturating_add(1);
            Transition::to(
                wrap(ManualState::Running { elapsed }),
                vec![E::AdvanceWeighing {
                    elapsed,
                    duration: ctx.durations.weighing_secs,
                }],
            )
        }
        _ => Transition::ignored(wrap(state), cmd),
    }
}

fn transition_auto(state: AutoState, cmd: ProcessCommand, ctx: &TransitionContext) -> Transition {
    use ProcessEffect as E;
    let wrap = ProcessState::Auto;
    let mix_count = ctx.mix_count.max(1);

    match (state, cmd) {
        (AutoState::Idle | AutoState::Complete, ProcessCommand::Start) => {
            if let Some(rejection) = &ctx.start_blocker {
                return Transition::to(wrap(state), vec![E::StartRejected(rejection.clone())]);
            }
            Transition::to(
                wrap(AutoState::Running(ActiveStep {
                    cycle: 1,
                    phase: Phase::Weighing { elapsed: 0 },
                })),
                vec![
                    E::BeginBatch,
                    E::BeginCycle { cycle: 1 },
                    E::Log(LogEvent::AutoStarted { mix_count }),
                    E::Log(LogEvent::WeighingStarted { cycle: 1, mix_count }),
                ],
            )
        }
        (AutoState::Running(_) | AutoState::Paused(_), ProcessCommand::Start) => {
            Transition::to(wrap(state), vec![E::StartRejected(StartRejection::AlreadyRunning)])
        }
        (AutoState::Running(_) | AutoState::Paused(_), ProcessCommand::Stop) => Transition::to(
            wrap(AutoState::Idle),
            vec![E::AbortBatch, E::Log(LogEvent::AutoStopped)],
        ),
        (AutoState::Running(step), ProcessCommand::Pause) => {
            Transition::to(wrap(AutoState::Paused(step)), vec![E::Log(LogEvent::Paused)])
        }
        (AutoState::Paused(step), ProcessCommand::Resume) => {
            Transition::to(wrap(AutoState::Running(step)), vec![E::Log(LogEvent::Resumed)])
        }
        (AutoState::Complete, ProcessCommand::Reset) => Transition::to(wrap(AutoState::Idle), Vec::new()),
        (AutoState::Running(step), ProcessCommand::Tick) => tick_auto(step, ctx.durations, mix_count),
        _ => Transition::ignored(wrap(state), cmd),
    }
}

/// 自动流程推进一秒
fn tick_auto(step: ActiveStep, durations: StepDurations, mix_count: u32) -> Transition {
    use ProcessEffect as E;
    let cycle = step.cycle;
    let running = |phase| ProcessState::Auto(AutoState::Running(ActiveStep { cycle, phase }));

    match step.phase {
        Phase::Weighing { elapsed } => {
            let elapsed = elapsed.saturating_add(1);
            let mut effects = vec![E::AdvanceWeighing {
                elapsed,
                duration: durations.weighing_secs,
            }];
            if elapsed >= durations.weighing_secs {
                let secs = durations.mixing_secs.max(1);
                effects.push(E::Log(LogEvent::MixingStarted { cycle, mix_count, secs }));
                Transition::to(running(Phase::Mixing { remaining: secs }), effects)
            } else {
                Transition::to(running(Phase::Weighing { elapsed }), effects)
            }
        }
        Phase::Mixing { remaining } => {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                Transition::to(
                    running(Phase::Discharging { elapsed: 0 }),
                    vec![E::Log(LogEvent::DischargeStarted { cycle, mix_count })],
                )
            } else {
                Transition::to(running(Phase::Mixing { remaining }), Vec::new())
            }
        }
        Phase::Discharging { elapsed } => {
            let elapsed = elapsed.saturating_add(1);
            if elapsed < durations.discharge_secs {
                return Transition::to(running(Phase::Discharging { elapsed }), Vec::new());
            }
            if cycle < mix_count {
                let next = cycle + 1;
                Transition::to(
                    ProcessState::Auto(AutoState::Running(ActiveStep {
                        cycle: next,
                        phase: Phase::Weighing { elapsed: 0 },
                    })),
                    vec![
                        E::DischargeCycle { cycle },
                        E::BeginCycle { cycle: next },
                        E::Log(LogEvent::WeighingStarted { cycle: next, mix_count }),
                    ],
                )
            } else {
                Transition::to(
                    ProcessState::Auto(AutoState::Complete),
                    vec![
                        E::DischargeCycle { cycle },
                        E::Log(LogEvent::BatchComplete),
                        E::FinalizeBatch(FinalizeSource::AutoComplete),
                    ],
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(mix_count: u32) -> TransitionContext {
        TransitionContext {
            start_blocker: None,
            durations: StepDurations {
                weighing_secs: 2,
                mixing_secs: 3,
                discharge_secs: 1,
            },
            mix_count,
        }
    }

    fn run(state: ProcessState, cmd: ProcessCommand, c: &TransitionContext) -> (ProcessState, Vec<ProcessEffect>) {
        let t = transition(state, cmd, c);
        (t.next, t.effects)
    }

    #[test]
    fn test_manual_start_stop_finalizes() {
        let c = ctx(1);
        let (s, effects) = run(ProcessState::default(), ProcessCommand::Start, &c);
        assert!(s.is_manual_running());
        assert!(effects.contains(&ProcessEffect::BeginBatch));

        let (s, effects) = run(s, ProcessCommand::Stop, &c);
        assert!(!s.is_manual_running());
        assert_eq!(
            effects.last(),
            Some(&ProcessEffect::FinalizeBatch(FinalizeSource::ManualStop))
        );
    }

    #[test]
    fn test_manual_double_start_rejected() {
        let c = ctx(1);
        let (s, _) = run(ProcessState::default(), ProcessCommand::Start, &c);
        let t = transition(s, ProcessCommand::Start, &c);
        assert_eq!(t.next, s);
        assert_eq!(
            t.effects,
            vec![ProcessEffect::StartRejected(StartRejection::AlreadyRunning)]
        );
        assert!(!t.is_accepted());
    }

    #[test]
    fn test_rejected_start_is_noop() {
        let mut c = ctx(1);
        c.start_blocker = Some(StartRejection::PowerOff);
        for state in [ProcessState::idle(ControlMode::Manual), ProcessState::idle(ControlMode::Auto)] {
            let t = transition(state, ProcessCommand::Start, &c);
            assert_eq!(t.next, state);
            assert!(!t.effects.iter().any(|e| matches!(e, ProcessEffect::Log(_))));
        }
    }

    #[test]
    fn test_power_off_resets_any_state() {
        let c = ctx(2);
        let (manual, _) = run(ProcessState::default(), ProcessCommand::Start, &c);
        let (s, effects) = run(manual, ProcessCommand::PowerOff, &c);
        assert_eq!(s, ProcessState::Manual(ManualState::Idle));
        assert_eq!(effects, vec![ProcessEffect::ResetTransient]);

        let (auto, _) = run(ProcessState::idle(ControlMode::Auto), ProcessCommand::Start, &c);
        let (paused, _) = run(auto, ProcessCommand::Pause, &c);
        let (s, _) = run(paused, ProcessCommand::PowerOff, &c);
        assert_eq!(s, ProcessState::Auto(AutoState::Idle));
    }

    #[test]
    fn test_auto_full_sequence_two_cycles() {
        let c = ctx(2);
        let (mut s, _) = run(ProcessState::idle(ControlMode::Auto), ProcessCommand::Start, &c);
        let mut discharges = 0;
        let mut finalized = false;
        let mut ticks = 0;
        while s != ProcessState::Auto(AutoState::Complete) {
            let (next, effects) = run(s, ProcessCommand::Tick, &c);
            for e in &effects {
                match e {
                    ProcessEffect::DischargeCycle { .. } => discharges += 1,
                    ProcessEffect::FinalizeBatch(FinalizeSource::AutoComplete) => finalized = true,
                    _ => {}
                }
            }
            s = next;
            ticks += 1;
            assert!(ticks < 100, "sequence did not terminate");
        }
        // (2 称量 + 3 搅拌 + 1 卸料) × 2 盘
        assert_eq!(ticks, 12);
        assert_eq!(discharges, 2);
        assert!(finalized);

        let (s, _) = run(s, ProcessCommand::Reset, &c);
        assert_eq!(s, ProcessState::Auto(AutoState::Idle));
    }

    #[test]
    fn test_pause_resumes_prior_step() {
        let c = ctx(1);
        let (s, _) = run(ProcessState::idle(ControlMode::Auto), ProcessCommand::Start, &c);
        let (s, _) = run(s, ProcessCommand::Tick, &c);
        let step = s.active_step().unwrap();

        let (paused, _) = run(s, ProcessCommand::Pause, &c);
        assert!(paused.is_paused());
        let (still, effects) = run(paused, ProcessCommand::Tick, &c);
        assert_eq!(still, paused);
        assert_eq!(effects, vec![ProcessEffect::Ignored(ProcessCommand::Tick)]);

        let (resumed, _) = run(paused, ProcessCommand::Resume, &c);
        assert_eq!(resumed.active_step(), Some(step));
        assert!(!resumed.is_paused());
    }

    #[test]
    fn test_pause_only_wraps_active_steps() {
        let c = ctx(1);
        let t = transition(ProcessState::idle(ControlMode::Auto), ProcessCommand::Pause, &c);
        assert!(!t.is_accepted());
        let t = transition(ProcessState::default(), ProcessCommand::Pause, &c);
        assert!(!t.is_accepted());
    }

    #[test]
    fn test_auto_stop_aborts_without_finalize() {
        let c = ctx(1);
        let (s, _) = run(ProcessState::idle(ControlMode::Auto), ProcessCommand::Start, &c);
        let (s, effects) = run(s, ProcessCommand::Stop, &c);
        assert_eq!(s, ProcessState::Auto(AutoState::Idle));
        assert!(effects.contains(&ProcessEffect::AbortBatch));
        assert!(!effects.iter().any(|e| matches!(e, ProcessEffect::FinalizeBatch(_))));
    }

    #[test]
    fn test_mode_switch_only_when_idle() {
        let c = ctx(1);
        let (s, _) = run(ProcessState::default(), ProcessCommand::SetMode(ControlMode::Auto), &c);
        assert_eq!(s.mode(), ControlMode::Auto);

        let (running, _) = run(s, ProcessCommand::Start, &c);
        let t = transition(running, ProcessCommand::SetMode(ControlMode::Manual), &c);
        assert_eq!(t.next, running);
        assert!(!t.is_accepted());
    }

    #[test]
    fn test_step_labels() {
        assert_eq!(ProcessState::default().step_label_key(), "step.idle");
        let running = ProcessState::Auto(AutoState::Running(ActiveStep {
            cycle: 1,
            phase: Phase::Mixing { remaining: 4 },
        }));
        assert_eq!(running.step_label_key(), "step.mixing");
    }
}
