// ==========================================
// 搅拌站配料控制系统 - 控制配置读取 Trait
// ==========================================
// 职责: 定义控制面板所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::control_settings::ControlSettings;
use crate::domain::types::PrintMode;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// PlantConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PlantConfigReader: Send + Sync {
    // ===== 自动流程时长 =====

    /// 搅拌时间（整秒, ≥1）
    ///
    /// # 默认值
    /// - 15
    async fn get_mixing_time_secs(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;

    /// 称量时间（秒）
    ///
    /// # 默认值
    /// - 10
    async fn get_weighing_time_secs(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;

    /// 卸料时间（秒）
    ///
    /// # 默认值
    /// - 5
    async fn get_discharge_time_secs(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;

    // ===== 容量 =====

    /// 单盘最大方量 (m³)
    ///
    /// # 默认值
    /// - 3.5
    async fn get_max_mix_volume(&self) -> Result<f64, Box<dyn Error + Send + Sync>>;

    // ===== 打印与站点 =====

    /// 打印模式（PRINT / LOG_ONLY）
    async fn get_print_mode(&self) -> Result<PrintMode, Box<dyn Error + Send + Sync>>;

    async fn get_operator_name(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    async fn get_plant_location(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// 界面语言（id / en / zh-CN）
    async fn get_locale(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// 一次读取全部控制配置
    async fn get_control_settings(&self) -> Result<ControlSettings, Box<dyn Error + Send + Sync>> {
        Ok(ControlSettings {
            mixing_time_secs: self.get_mixing_time_secs().await?,
            weighing_time_secs: self.get_weighing_time_secs().await?,
            discharge_time_secs: self.get_discharge_time_secs().await?,
            max_mix_volume_m3: self.get_max_mix_volume().await?,
            print_mode: self.get_print_mode().await?,
            operator_name: self.get_operator_name().await?,
            plant_location: self.get_plant_location().await?,
            locale: self.get_locale().await?,
        })
    }
}
