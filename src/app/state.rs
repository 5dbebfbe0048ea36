// ==========================================
// 搅拌站配料控制系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ControlPanelApi, ImportApi, ScheduleApi};
use crate::config::{ConfigManager, ControlSettings};
use crate::db;
use crate::engine::finalizer::BatchFinalizer;
use crate::engine::notifications::OptionalToastPublisher;
use crate::i18n;
use crate::repository::{
    DocumentStore, FormulaRepository, PrintQueueRepository, ProductionHistoryRepository,
    ScheduleRepository, SqliteDocumentStore, WeightSensorRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的控制配置
    pub settings: ControlSettings,

    /// 控制面板API
    pub control_panel_api: Arc<ControlPanelApi>,

    /// 生产计划API
    pub schedule_api: Arc<ScheduleApi>,

    /// 导入API
    pub import_api: Arc<ImportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 仓储（供后台订阅与查询使用）
    pub formula_repo: Arc<FormulaRepository>,
    pub schedule_repo: Arc<ScheduleRepository>,
    pub history_repo: Arc<ProductionHistoryRepository>,
    pub print_queue_repo: Arc<PrintQueueRepository>,
    pub sensor_repo: Arc<WeightSensorRepository>,
}

impl AppState {
    /// 创建新的AppState实例（不发布界面提示）
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_toasts(db_path, OptionalToastPublisher::none())
    }

    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化 schema
    /// 2. 加载控制配置并设置界面语言
    /// 3. 初始化所有Repository与API
    pub fn with_toasts(db_path: String, toasts: OptionalToastPublisher) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        db::init_schema(&conn).map_err(|e| format!("数据库 schema 初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let settings = config_manager
            .load_settings()
            .map_err(|e| format!("无法加载控制配置: {}", e))?;
        i18n::set_locale(&settings.locale);
        tracing::info!(
            locale = %settings.locale,
            print_mode = %settings.print_mode,
            mixing_time_secs = settings.mixing_time_secs,
            "控制配置已加载"
        );

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let store: Arc<dyn DocumentStore> = Arc::new(
            SqliteDocumentStore::new(conn.clone())
                .map_err(|e| format!("无法创建SqliteDocumentStore: {}", e))?,
        );
        let formula_repo = Arc::new(FormulaRepository::new(store.clone()));
        let schedule_repo = Arc::new(ScheduleRepository::new(store.clone()));
        let history_repo = Arc::new(ProductionHistoryRepository::new(store.clone()));
        let print_queue_repo = Arc::new(PrintQueueRepository::new(store.clone()));
        let sensor_repo = Arc::new(WeightSensorRepository::new(store));

        // ==========================================
        // 初始化API层
        // ==========================================
        let finalizer = Arc::new(BatchFinalizer::new(
            schedule_repo.clone(),
            history_repo.clone(),
            print_queue_repo.clone(),
        ));

        let control_panel_api = Arc::new(
            ControlPanelApi::new(
                formula_repo.clone(),
                schedule_repo.clone(),
                sensor_repo.clone(),
                finalizer,
                settings.clone(),
            )
            .with_config_manager(config_manager.clone())
            .with_toasts(toasts),
        );
        control_panel_api.sync_sensor();

        let schedule_api = Arc::new(ScheduleApi::new(schedule_repo.clone()));
        let import_api = Arc::new(ImportApi::new(formula_repo.clone(), schedule_api.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            settings,
            control_panel_api,
            schedule_api,
            import_api,
            config_manager,
            formula_repo,
            schedule_repo,
            history_repo,
            print_queue_repo,
            sensor_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 BATCHING_PLANT_DB_PATH（非空时）
/// - 否则: 用户数据目录/batching-plant/batching_plant.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("BATCHING_PLANT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./batching_plant.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("batching-plant");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("batching_plant.db");
        }
    }

    path.to_string_lossy().to_string()
}
