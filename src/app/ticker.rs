// ==========================================
// 搅拌站配料控制系统 - 后台任务
// ==========================================
// ProcessTicker: 固定周期（默认 1 Hz）向控制面板发送 Tick
// SensorFeed:    订阅称重传感器文档,读数到达即合并
// ScheduleFeed:  订阅生产计划文档,变更后重新匹配当前批次
// 拆除: TickerHandle::shutdown() 显式停止并等待任务结束
// ==========================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::api::ControlPanelApi;
use crate::repository::{SensorSubscription, Subscription};

/// 默认节拍周期
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

// ==========================================
// TickerHandle - 后台任务句柄
// ==========================================
pub struct TickerHandle {
    name: &'static str,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl TickerHandle {
    fn new(name: &'static str, shutdown_tx: oneshot::Sender<()>, join: JoinHandle<()>) -> Self {
        Self {
            name,
            shutdown_tx: Some(shutdown_tx),
            join,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// 发送停止信号并等待任务退出
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.join).await {
            tracing::warn!(task = self.name, error = %e, "后台任务异常退出");
        }
        tracing::debug!(task = self.name, "后台任务已停止");
    }
}

// ==========================================
// ProcessTicker - 过程节拍
// ==========================================
pub struct ProcessTicker;

impl ProcessTicker {
    pub fn spawn(api: Arc<ControlPanelApi>) -> TickerHandle {
        Self::spawn_with_period(api, TICK_PERIOD)
    }

    pub fn spawn_with_period(api: Arc<ControlPanelApi>, period: Duration) -> TickerHandle {
        let (tx, mut rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(period_ms = period.as_millis() as u64, "过程节拍已启动");

            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    _ = interval.tick() => {
                        let outcome = api.tick();
                        if let Some(err) = outcome.error {
                            tracing::error!(error = %err, "节拍触发的批次收尾失败");
                        }
                    }
                }
            }
        });
        TickerHandle::new("process_ticker", tx, join)
    }
}

// ==========================================
// SensorFeed - 传感器读数订阅
// ==========================================
pub struct SensorFeed;

impl SensorFeed {
    pub fn spawn(api: Arc<ControlPanelApi>, mut subscription: SensorSubscription) -> TickerHandle {
        let (tx, mut rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    reading = subscription.recv() => match reading {
                        Some(reading) => api.apply_sensor_reading(reading),
                        None => break,
                    },
                }
            }
            subscription.unsubscribe();
        });
        TickerHandle::new("sensor_feed", tx, join)
    }
}

// ==========================================
// ScheduleFeed - 生产计划订阅
// ==========================================
pub struct ScheduleFeed;

impl ScheduleFeed {
    pub fn spawn(api: Arc<ControlPanelApi>, mut subscription: Subscription) -> TickerHandle {
        let (tx, mut rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    change = subscription.recv() => match change {
                        Some(_) => {
                            api.refresh_schedule();
                        }
                        None => break,
                    },
                }
            }
            subscription.unsubscribe();
        });
        TickerHandle::new("schedule_feed", tx, join)
    }
}
