// ==========================================
// 搅拌站配料控制系统 - 称重传感器仓储
// ==========================================
// 文档: weight_sensor ({aggregate, air, semen})
// 说明: 文档缺失视为“未初始化”,写入一次默认读数而非报错
// ==========================================

use crate::domain::sensor::WeightReading;
use crate::repository::document_store::{DocumentStore, Subscription};
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Arc;

pub const SENSOR_KEY: &str = "weight_sensor";

pub struct WeightSensorRepository {
    store: Arc<dyn DocumentStore>,
}

impl WeightSensorRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 读取当前读数; 缺失时写入全零读数并返回
    pub fn read_or_init(&self) -> RepositoryResult<WeightReading> {
        match self.store.get(SENSOR_KEY)? {
            Some(value) => decode(value),
            None => {
                tracing::info!("称重传感器文档未初始化，写入默认读数");
                let reading = WeightReading::zero();
                self.write(&reading)?;
                Ok(reading)
            }
        }
    }

    pub fn write(&self, reading: &WeightReading) -> RepositoryResult<()> {
        self.store.set(SENSOR_KEY, serde_json::to_value(reading)?)
    }

    /// 订阅读数变更
    pub fn subscribe(&self) -> SensorSubscription {
        SensorSubscription {
            inner: self.store.subscribe(SENSOR_KEY),
        }
    }
}

fn decode(value: serde_json::Value) -> RepositoryResult<WeightReading> {
    serde_json::from_value(value).map_err(|e| RepositoryError::SerializationError {
        key: SENSOR_KEY.to_string(),
        message: e.to_string(),
    })
}

// ==========================================
// SensorSubscription - 解码后的读数订阅
// ==========================================
// 删除事件与无法解码的文档被跳过
pub struct SensorSubscription {
    inner: Subscription,
}

impl SensorSubscription {
    /// 等待下一条读数; 存储释放后返回 None
    pub async fn recv(&mut self) -> Option<WeightReading> {
        loop {
            let change = self.inner.recv().await?;
            if let Some(reading) = change.value.and_then(|v| decode(v).ok()) {
                return Some(reading);
            }
        }
    }

    /// 非阻塞读取下一条读数
    pub fn try_recv(&mut self) -> Option<WeightReading> {
        loop {
            let change = self.inner.try_recv()?;
            if let Some(reading) = change.value.and_then(|v| decode(v).ok()) {
                return Some(reading);
            }
        }
    }

    /// 显式退订
    pub fn unsubscribe(self) {
        self.inner.unsubscribe();
    }
}
