// ==========================================
// 搅拌站配料控制系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约束: 格式错误的配置值回退默认值并记录 warn
// ==========================================

use crate::config::control_settings::ControlSettings;
use crate::config::plant_config_trait::PlantConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::PrintMode;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::ensure_config_table(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            crate::db::ensure_config_table(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 批次收尾时写入生产记录,便于审计
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取数值配置; 缺失用默认值, 格式错误回退默认值并告警
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error + Send + Sync>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(
                        config_key = key,
                        raw_value = %raw,
                        default = %default,
                        "配置值格式错误，使用默认值"
                    );
                    Ok(default)
                }
            },
        }
    }

    fn get_string_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取正整数秒配置（<1 视为格式错误）
    fn get_positive_secs(&self, key: &str, default: u32) -> Result<u32, Box<dyn Error + Send + Sync>> {
        let value = self.get_parsed_or_default::<u32>(key, default)?;
        if value < 1 {
            tracing::warn!(config_key = key, value, default, "时长必须 ≥1 秒，使用默认值");
            return Ok(default);
        }
        Ok(value)
    }

    /// 同步读取全部控制配置
    pub fn load_settings(&self) -> Result<ControlSettings, Box<dyn Error + Send + Sync>> {
        let defaults = ControlSettings::default();

        let max_mix_volume_m3 = {
            let v = self.get_parsed_or_default(config_keys::MAX_MIX_VOLUME_M3, defaults.max_mix_volume_m3)?;
            if v.is_finite() && v > 0.0 {
                v
            } else {
                tracing::warn!(value = v, "单盘容量必须为正数，使用默认值");
                defaults.max_mix_volume_m3
            }
        };

        let print_mode = {
            let raw = self.get_string_or_default(config_keys::PRINT_MODE, defaults.print_mode.to_db_str())?;
            PrintMode::from_str(&raw).unwrap_or_else(|| {
                tracing::warn!(raw_value = %raw, "打印模式配置无效，使用 PRINT");
                defaults.print_mode
            })
        };

        Ok(ControlSettings {
            mixing_time_secs: self.get_positive_secs(config_keys::MIXING_TIME_SECS, defaults.mixing_time_secs)?,
            weighing_time_secs: self
                .get_parsed_or_default(config_keys::WEIGHING_TIME_SECS, defaults.weighing_time_secs)?,
            discharge_time_secs: self
                .get_parsed_or_default(config_keys::DISCHARGE_TIME_SECS, defaults.discharge_time_secs)?,
            max_mix_volume_m3,
            print_mode,
            operator_name: self.get_string_or_default(config_keys::OPERATOR_NAME, &defaults.operator_name)?,
            plant_location: self.get_string_or_default(config_keys::PLANT_LOCATION, &defaults.plant_location)?,
            locale: self.get_string_or_default(config_keys::LOCALE, &defaults.locale)?,
        })
    }
}

// ==========================================
// PlantConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PlantConfigReader for ConfigManager {
    async fn get_mixing_time_secs(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        self.get_positive_secs(config_keys::MIXING_TIME_SECS, 15)
    }

    async fn get_weighing_time_secs(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        self.get_parsed_or_default(config_keys::WEIGHING_TIME_SECS, 10)
    }

    async fn get_discharge_time_secs(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        self.get_parsed_or_default(config_keys::DISCHARGE_TIME_SECS, 5)
    }

    async fn get_max_mix_volume(&self) -> Result<f64, Box<dyn Error + Send + Sync>> {
        Ok(self.load_settings()?.max_mix_volume_m3)
    }

    async fn get_print_mode(&self) -> Result<PrintMode, Box<dyn Error + Send + Sync>> {
        Ok(self.load_settings()?.print_mode)
    }

    async fn get_operator_name(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.get_string_or_default(config_keys::OPERATOR_NAME, "Operator")
    }

    async fn get_plant_location(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.get_string_or_default(config_keys::PLANT_LOCATION, "default")
    }

    async fn get_locale(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.get_string_or_default(config_keys::LOCALE, "id")
    }

    async fn get_control_settings(&self) -> Result<ControlSettings, Box<dyn Error + Send + Sync>> {
        self.load_settings()
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 自动流程时长
    pub const MIXING_TIME_SECS: &str = "mixing_time_secs";
    pub const WEIGHING_TIME_SECS: &str = "weighing_time_secs";
    pub const DISCHARGE_TIME_SECS: &str = "discharge_time_secs";

    // 容量
    pub const MAX_MIX_VOLUME_M3: &str = "max_mix_volume_m3";

    // 打印与站点
    pub const PRINT_MODE: &str = "print_mode";
    pub const OPERATOR_NAME: &str = "operator_name";
    pub const PLANT_LOCATION: &str = "plant_location";

    // 界面语言
    pub const LOCALE: &str = "locale";
}
