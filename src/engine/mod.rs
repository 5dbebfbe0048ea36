// ==========================================
// 搅拌站配料控制系统 - 引擎层
// ==========================================
// 职责: 实现配料/台账/过程控制规则,不直接访问存储
// 红线: 状态转换只经过 process::transition; 校验结果是值不是错误
// ==========================================

pub mod finalizer;
pub mod notifications;
pub mod process;
pub mod schedule_ledger;
pub mod start_guard;
pub mod target_weights;
pub mod weight_simulation;

// 重导出核心引擎
pub use finalizer::{BatchFinalizer, FinalizeOutcome, FinalizeSettings, FinishedBatch};
pub use notifications::{
    CollectingToastPublisher, NoOpToastPublisher, OptionalToastPublisher, Toast, ToastPublisher,
    ToastVariant,
};
pub use process::{
    transition, ActiveStep, AutoState, FinalizeSource, LogEvent, ManualState, Phase,
    ProcessCommand, ProcessEffect, ProcessState, StepDurations, Transition, TransitionContext,
};
pub use schedule_ledger::{DeliveryOutcome, ScheduleAssessment, ScheduleLedger, ScheduleWarning};
pub use start_guard::{JobWarning, StartContext, StartGuard, StartRejection};
pub use target_weights::{TargetWeightCalculator, TargetWeightMemo};
pub use weight_simulation::WeightSimulator;
