// ==========================================
// 搅拌站配料控制系统 - 控制面板 API
// ==========================================
// 职责: 操作员控制面板门面
// - 批次表单（计划编号、配合比、方量、分盘数、搅拌时间）
// - 电源/模式/启停/暂停命令 → process::transition → 执行副作用
// - 称重传感器读数合并
// 失败策略: 持久化失败记录 error 日志 + destructive 提示,方法正常返回
// ==========================================

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::api::error::{ApiError, ApiResult};
use crate::api::status_panel::rejection_text;
use crate::config::{config_keys, ConfigManager, ControlSettings};
use crate::domain::activity_log::ActivityLog;
use crate::domain::formula::{Formula, MaterialWeights};
use crate::domain::job::JobInfo;
use crate::domain::sensor::WeightReading;
use crate::domain::types::{ControlMode, LogColor};
use crate::engine::finalizer::{BatchFinalizer, FinalizeOutcome, FinalizeSettings, FinishedBatch};
use crate::engine::notifications::{OptionalToastPublisher, Toast};
use crate::engine::process::{
    transition, FinalizeSource, LogEvent, ProcessCommand, ProcessEffect, ProcessState,
    TransitionContext,
};
use crate::engine::schedule_ledger::{ScheduleAssessment, ScheduleLedger, ScheduleWarning};
use crate::engine::start_guard::{JobWarning, StartContext, StartGuard, StartRejection};
use crate::engine::target_weights::TargetWeightMemo;
use crate::engine::weight_simulation::WeightSimulator;
use crate::i18n;
use crate::repository::{FormulaRepository, ScheduleRepository, WeightSensorRepository};

// ==========================================
// 面板内部状态
// ==========================================

/// 控制面板的全部瞬态（不持久化）
#[derive(Debug)]
pub(crate) struct ControlPanelState {
    pub(crate) powered: bool,
    pub(crate) process: ProcessState,
    pub(crate) job: JobInfo,
    pub(crate) formula: Option<Formula>,
    pub(crate) settings: ControlSettings,
    pub(crate) memo: TargetWeightMemo,
    pub(crate) simulator: WeightSimulator,
    pub(crate) log: ActivityLog,
    pub(crate) schedule: ScheduleAssessment,
    pub(crate) sensor: Option<WeightReading>,
    pub(crate) sensor_driven: bool, // 本批次已收到实时读数,停止模拟推进
    pub(crate) batch_start: Option<NaiveDateTime>,
    pub(crate) manual_elapsed_secs: u32,
}

impl ControlPanelState {
    pub(crate) fn new(settings: ControlSettings) -> Self {
        Self {
            powered: false,
            process: ProcessState::default(),
            job: JobInfo::empty(),
            formula: None,
            settings,
            memo: TargetWeightMemo::new(),
            simulator: WeightSimulator::new(),
            log: ActivityLog::new(),
            schedule: ScheduleAssessment::default(),
            sensor: None,
            sensor_driven: false,
            batch_start: None,
            manual_elapsed_secs: 0,
        }
    }

    /// 当前单盘目标重量（记忆化）
    pub(crate) fn targets(&mut self) -> MaterialWeights {
        self.memo
            .get(self.formula.as_ref(), self.job.target_volume, self.job.mix_count)
    }

    fn start_context(&self) -> StartContext<'_> {
        StartContext {
            powered: self.powered,
            mode: self.process.mode(),
            job: &self.job,
            schedule: &self.schedule,
            process_active: self.process.is_active(),
            max_mix_volume: self.settings.max_mix_volume_m3,
        }
    }

    pub(crate) fn job_warnings(&self) -> Vec<JobWarning> {
        if !self.job.has_req_no() {
            return Vec::new();
        }
        StartGuard::job_warnings(&self.start_context())
    }

    fn push_log(&mut self, event: &LogEvent) {
        let args = event.args();
        let borrowed: Vec<(&str, &str)> = args.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let message = i18n::t_with_args(event.message_key(), &borrowed);
        tracing::info!(event = event.message_key(), "{}", message);
        self.log.push(message, event.color());
    }

    /// 批次收尾成功后清空全部批次瞬态
    fn reset_batch(&mut self) {
        self.simulator.reset();
        self.log.clear();
        self.job = JobInfo::empty();
        self.formula = None;
        self.memo.invalidate();
        self.schedule = ScheduleAssessment::default();
        self.batch_start = None;
        self.manual_elapsed_secs = 0;
        self.sensor_driven = false;
    }
}

// ==========================================
// 命令结果
// ==========================================

/// 一条命令的执行结果
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command: ProcessCommand,
    pub accepted: bool,
    pub state: ProcessState,
    pub rejection: Option<StartRejection>,
    pub finalized: Option<FinalizeOutcome>,
    pub error: Option<String>,
}

impl CommandOutcome {
    fn new(command: ProcessCommand, state: ProcessState) -> Self {
        Self {
            command,
            accepted: false,
            state,
            rejection: None,
            finalized: None,
            error: None,
        }
    }
}

// ==========================================
// ControlPanelApi - 控制面板 API
// ==========================================
pub struct ControlPanelApi {
    formula_repo: Arc<FormulaRepository>,
    schedule_repo: Arc<ScheduleRepository>,
    sensor_repo: Arc<WeightSensorRepository>,
    finalizer: Arc<BatchFinalizer>,
    config_manager: Option<Arc<ConfigManager>>,
    toasts: OptionalToastPublisher,
    state: Mutex<ControlPanelState>,
}

impl ControlPanelApi {
    /// 创建新的ControlPanelApi实例
    pub fn new(
        formula_repo: Arc<FormulaRepository>,
        schedule_repo: Arc<ScheduleRepository>,
        sensor_repo: Arc<WeightSensorRepository>,
        finalizer: Arc<BatchFinalizer>,
        settings: ControlSettings,
    ) -> Self {
        Self {
            formula_repo,
            schedule_repo,
            sensor_repo,
            finalizer,
            config_manager: None,
            toasts: OptionalToastPublisher::none(),
            state: Mutex::new(ControlPanelState::new(settings)),
        }
    }

    /// 注入配置管理器（搅拌时间写回 + 配置快照）
    pub fn with_config_manager(mut self, config_manager: Arc<ConfigManager>) -> Self {
        self.config_manager = Some(config_manager);
        self
    }

    /// 注入提示发布者
    pub fn with_toasts(mut self, toasts: OptionalToastPublisher) -> Self {
        self.toasts = toasts;
        self
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ControlPanelState> {
        // 中毒的锁仍可安全读取: 状态在每次命令结束时都是一致的
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 记录失败并发出 destructive 提示
    fn report_failure(&self, context: &str, err: &ApiError) {
        tracing::error!(context = context, error = %err, "操作失败");
        self.toasts.publish(Toast::destructive(
            i18n::t("toast.failure_title"),
            format!("{}: {}", context, err),
        ));
    }

    // ==========================================
    // 电源 / 模式
    // ==========================================

    pub fn power_on(&self) {
        let mut st = self.lock_state();
        if st.powered {
            return;
        }
        st.powered = true;
        let message = i18n::t("log.power_on");
        st.log.push(message, LogColor::Green);
        tracing::info!("控制面板上电");
    }

    /// 断电: 强制复位过程状态,清空秤值与活动日志
    pub fn power_off(&self) -> CommandOutcome {
        let mut st = self.lock_state();
        let outcome = self.execute(&mut st, ProcessCommand::PowerOff, None);
        st.powered = false;
        tracing::info!("控制面板断电");
        outcome
    }

    pub fn is_powered(&self) -> bool {
        self.lock_state().powered
    }

    pub fn set_mode(&self, mode: ControlMode) -> CommandOutcome {
        let mut st = self.lock_state();
        self.execute(&mut st, ProcessCommand::SetMode(mode), None)
    }

    // ==========================================
    // 批次表单
    // ==========================================

    /// 设置计划编号: 命中有效计划行则复制字段并锁定,否则解锁
    pub fn set_req_no(&self, req_no: &str) -> ScheduleAssessment {
        let mut st = self.lock_state();
        if st.process.is_active() {
            tracing::warn!(req_no = req_no, "批次进行中，忽略计划编号变更");
            return st.schedule.clone();
        }
        st.job.req_no = req_no.trim().to_string();
        self.refresh_assessment(&mut st);
        st.schedule.clone()
    }

    /// 计划台账变更后重新匹配（订阅回调使用）
    pub fn refresh_schedule(&self) -> ScheduleAssessment {
        let mut st = self.lock_state();
        self.refresh_assessment(&mut st);
        st.schedule.clone()
    }

    fn refresh_assessment(&self, st: &mut ControlPanelState) {
        let rows = match self.schedule_repo.load() {
            Ok(rows) => ScheduleLedger::recalculate_all(&rows),
            Err(e) => {
                self.report_failure("load schedule", &ApiError::from(e));
                return;
            }
        };

        st.schedule = ScheduleLedger::assess(&rows, &st.job.req_no);
        if let Some(warning) = &st.schedule.warning {
            tracing::warn!(warning = %warning, "计划状态告警");
        }

        // 批次进行中: 表单与配合比保持不变，目标重量以启动时为准
        if st.process.is_active() {
            tracing::debug!(req_no = %st.job.req_no, "批次进行中，跳过表单重新绑定");
            return;
        }

        match st.schedule.active_row.clone() {
            Some(row) => {
                let formula = match self.formula_repo.find_by_grade(&row.grade) {
                    Ok(found) => found,
                    Err(e) => {
                        self.report_failure("load formulas", &ApiError::from(e));
                        None
                    }
                };
                st.job.lock_to_row(&row, formula.as_ref().map(|f| f.id.clone()));
                if formula.is_some() {
                    st.formula = formula;
                }
                tracing::info!(req_no = %row.no, grade = %row.grade, "批次已绑定计划行");
            }
            None => {
                if st.job.locked {
                    st.job.unlock();
                    tracing::info!("计划行失效，批次已解锁");
                }
            }
        }
    }

    /// 选择配合比（None 表示清空）
    pub fn set_formula(&self, formula_id: Option<&str>) -> ApiResult<()> {
        let formula = match formula_id.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(id) => Some(
                self.formula_repo
                    .find_by_id(id)?
                    .ok_or_else(|| ApiError::NotFound(format!("配合比(id={})不存在", id)))?,
            ),
        };

        let mut st = self.lock_state();
        if st.process.is_active() {
            return Err(ApiError::BusinessRuleViolation("批次进行中，不能更换配合比".to_string()));
        }
        st.job.formula_id = formula.as_ref().map(|f| f.id.clone());
        st.formula = formula;
        Ok(())
    }

    /// 客户/工地（锁定时只读）
    pub fn set_customer_location(&self, customer: &str, location: &str) -> ApiResult<()> {
        let mut st = self.lock_state();
        if st.job.locked {
            return Err(ApiError::BusinessRuleViolation(
                "批次已绑定计划行，客户与工地只读".to_string(),
            ));
        }
        st.job.customer = customer.trim().to_string();
        st.job.location = location.trim().to_string();
        Ok(())
    }

    pub fn set_target_volume(&self, volume: f64) {
        let mut st = self.lock_state();
        if st.process.is_active() {
            tracing::warn!(volume, "批次进行中，忽略方量变更");
            return;
        }
        st.job.set_target_volume(volume);
    }

    pub fn set_mix_count(&self, mix_count: i64) {
        let mut st = self.lock_state();
        if st.process.is_active() {
            tracing::warn!(mix_count, "批次进行中，忽略分盘数变更");
            return;
        }
        st.job.set_mix_count(mix_count);
    }

    pub fn set_slump(&self, slump: Option<f64>) {
        self.lock_state().job.slump = slump.filter(|v| v.is_finite() && *v >= 0.0);
    }

    pub fn set_medium(&self, medium: &str) {
        self.lock_state().job.medium = medium.trim().to_string();
    }

    /// 设置搅拌时间（整秒, ≥1）; 配置管理器存在时写回配置
    pub fn set_mixing_time(&self, secs: i64) -> ApiResult<u32> {
        if secs < 1 {
            return Err(ApiError::InvalidInput(format!("搅拌时间必须 ≥1 秒: {}", secs)));
        }
        let secs = u32::try_from(secs)
            .map_err(|_| ApiError::InvalidInput(format!("搅拌时间超出范围: {}", secs)))?;

        self.lock_state().settings.mixing_time_secs = secs;

        if let Some(cm) = &self.config_manager {
            if let Err(e) = cm.set_config_value(config_keys::MIXING_TIME_SECS, &secs.to_string()) {
                self.report_failure("save mixing time", &ApiError::ConfigError(e.to_string()));
            }
        }
        Ok(secs)
    }

    /// 应用新的控制配置
    pub fn apply_settings(&self, settings: ControlSettings) {
        self.lock_state().settings = settings;
    }

    pub fn settings(&self) -> ControlSettings {
        self.lock_state().settings.clone()
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn job(&self) -> JobInfo {
        self.lock_state().job.clone()
    }

    pub fn process_state(&self) -> ProcessState {
        self.lock_state().process
    }

    pub fn is_manual_running(&self) -> bool {
        self.lock_state().process.is_manual_running()
    }

    /// 当前单盘目标重量
    pub fn target_weights(&self) -> MaterialWeights {
        self.lock_state().targets()
    }

    pub fn activity_log(&self) -> ActivityLog {
        self.lock_state().log.clone()
    }

    pub fn job_warnings(&self) -> Vec<JobWarning> {
        self.lock_state().job_warnings()
    }

    pub fn schedule_warning(&self) -> Option<ScheduleWarning> {
        self.lock_state().schedule.warning.clone()
    }

    /// 当前 START 是否可用（界面按钮状态）
    pub fn start_blocker(&self) -> Option<StartRejection> {
        let st = self.lock_state();
        StartGuard::check(&st.start_context()).err()
    }

    // ==========================================
    // 传感器
    // ==========================================

    /// 启动时读取传感器文档（缺失则写入默认读数）
    pub fn sync_sensor(&self) -> Option<WeightReading> {
        match self.sensor_repo.read_or_init() {
            Ok(reading) => {
                self.apply_sensor_reading(reading);
                Some(reading)
            }
            Err(e) => {
                self.report_failure("read weight sensor", &ApiError::from(e));
                None
            }
        }
    }

    /// 合并一条传感器读数（过程进行中时覆盖模拟秤值）
    pub fn apply_sensor_reading(&self, reading: WeightReading) {
        let mut st = self.lock_state();
        st.sensor = Some(reading);
        if st.process.is_active() {
            st.simulator.apply_reading(&reading);
            st.sensor_driven = true;
        }
        tracing::debug!(
            aggregate = reading.aggregate,
            air = reading.air,
            semen = reading.semen,
            "传感器读数已合并"
        );
    }

    // ==========================================
    // 过程命令
    // ==========================================

    pub fn start(&self) -> CommandOutcome {
        let mut st = self.lock_state();
        // 启动前以最新台账重新匹配
        self.refresh_assessment(&mut st);
        let blocker = StartGuard::check(&st.start_context()).err();
        self.execute(&mut st, ProcessCommand::Start, blocker)
    }

    pub fn stop(&self) -> CommandOutcome {
        let mut st = self.lock_state();
        self.execute(&mut st, ProcessCommand::Stop, None)
    }

    pub fn pause(&self) -> CommandOutcome {
        let mut st = self.lock_state();
        self.execute(&mut st, ProcessCommand::Pause, None)
    }

    pub fn resume(&self) -> CommandOutcome {
        let mut st = self.lock_state();
        self.execute(&mut st, ProcessCommand::Resume, None)
    }

    /// 定时器推进一秒（断电时不推进）
    pub fn tick(&self) -> CommandOutcome {
        let mut st = self.lock_state();
        if !st.powered {
            return CommandOutcome::new(ProcessCommand::Tick, st.process);
        }
        self.execute(&mut st, ProcessCommand::Tick, None)
    }

    pub fn reset(&self) -> CommandOutcome {
        let mut st = self.lock_state();
        self.execute(&mut st, ProcessCommand::Reset, None)
    }

    /// 执行一次状态转换及其副作用
    fn execute(
        &self,
        st: &mut ControlPanelState,
        command: ProcessCommand,
        start_blocker: Option<StartRejection>,
    ) -> CommandOutcome {
        let ctx = TransitionContext {
            start_blocker,
            durations: st.settings.step_durations(),
            mix_count: st.job.mix_count,
        };
        let result = transition(st.process, command, &ctx);
        st.process = result.next;

        let mut outcome = CommandOutcome::new(command, st.process);
        outcome.accepted = result.is_accepted();

        for effect in result.effects {
            match effect {
                ProcessEffect::Log(event) => st.push_log(&event),
                ProcessEffect::BeginBatch => {
                    st.simulator.reset();
                    st.batch_start = Some(chrono::Local::now().naive_local());
                    st.manual_elapsed_secs = 0;
                    st.sensor_driven = false;
                    tracing::info!(req_no = %st.job.req_no, volume = st.job.target_volume, "批次开始");
                }
                ProcessEffect::BeginCycle { cycle } => {
                    let targets = st.targets();
                    st.simulator.begin_cycle(targets);
                    tracing::debug!(cycle, "开始新一盘");
                }
                ProcessEffect::AdvanceWeighing { elapsed, duration } => {
                    if st.process.is_manual_running() {
                        st.manual_elapsed_secs = elapsed;
                    }
                    if !st.sensor_driven {
                        st.simulator.advance(elapsed, duration);
                    }
                }
                ProcessEffect::DischargeCycle { cycle } => {
                    st.simulator.discharge();
                    tracing::debug!(cycle, "卸料完成");
                }
                ProcessEffect::FinalizeBatch(source) => {
                    match self.finalize(st, source) {
                        Ok(done) => {
                            st.reset_batch();
                            self.toasts.publish(Toast::info(
                                i18n::t("toast.batch_complete_title"),
                                done.entry.job_id.clone(),
                            ));
                            outcome.finalized = Some(done);
                        }
                        Err(e) => {
                            self.report_failure("finish batch", &e);
                            st.batch_start = None;
                            outcome.error = Some(e.to_string());
                        }
                    }
                }
                ProcessEffect::AbortBatch => {
                    st.simulator.reset();
                    st.batch_start = None;
                    st.manual_elapsed_secs = 0;
                    st.sensor_driven = false;
                }
                ProcessEffect::ResetTransient => {
                    st.simulator.reset();
                    st.log.clear();
                    st.batch_start = None;
                    st.manual_elapsed_secs = 0;
                    st.sensor_driven = false;
                }
                ProcessEffect::StartRejected(rejection) => {
                    tracing::warn!(reason = %rejection, "START 被拒绝");
                    self.toasts.publish(Toast::warning(
                        i18n::t("toast.start_rejected_title"),
                        rejection_text(&rejection),
                    ));
                    outcome.rejection = Some(rejection);
                }
                ProcessEffect::Ignored(cmd) => {
                    tracing::debug!(command = %cmd, state = ?st.process, "命令在当前状态下无效");
                }
            }
        }

        outcome.state = st.process;
        outcome
    }

    /// 采集实际量并调用批次收尾
    fn finalize(&self, st: &mut ControlPanelState, source: FinalizeSource) -> ApiResult<FinalizeOutcome> {
        let end_time = chrono::Local::now().naive_local();
        let start_time = st.batch_start.unwrap_or(end_time);
        let target_weights = st.targets();

        // 自动流程: 累计下料量按盘数平均,与单盘目标同口径
        let actual_weights = match source {
            FinalizeSource::ManualStop => st.simulator.capture_actual(),
            FinalizeSource::AutoComplete => {
                let mixes = f64::from(st.job.mix_count.max(1));
                st.simulator.dispensed_total().map(|_, v| v / mixes)
            }
        };

        let settings = FinalizeSettings {
            print_mode: st.settings.print_mode,
            operator_name: st.settings.operator_name.clone(),
            plant_location: st.settings.plant_location.clone(),
            config_snapshot: self.config_snapshot(),
        };

        let batch = FinishedBatch {
            job: &st.job,
            target_weights,
            actual_weights,
            start_time,
            end_time,
        };
        Ok(self.finalizer.finish_and_print_batch(&batch, &settings)?)
    }

    fn config_snapshot(&self) -> Option<JsonValue> {
        let cm = self.config_manager.as_ref()?;
        match cm.get_config_snapshot() {
            Ok(raw) => serde_json::from_str(&raw).ok(),
            Err(e) => {
                tracing::warn!(error = %e, "配置快照读取失败，生产记录不含快照");
                None
            }
        }
    }
}
