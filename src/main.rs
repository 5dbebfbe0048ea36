// ==========================================
// 搅拌站配料控制系统 - 主入口
// ==========================================
// 无界面运行: 初始化数据库与控制面板,启动节拍与订阅任务,
// Ctrl+C 后停止后台任务并断电
//
// 用法:
//   batching-plant [--import-formulas <file>] [--import-schedule <file>]
// ==========================================

use anyhow::{anyhow, Context, Result};

use batching_plant::app::{get_default_db_path, AppState, ProcessTicker, ScheduleFeed, SensorFeed};
use batching_plant::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", batching_plant::APP_NAME);
    tracing::info!("系统版本: {}", batching_plant::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e)).context("无法初始化AppState")?;

    // 命令行导入
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let path = iter
            .next()
            .ok_or_else(|| anyhow!("参数 {} 缺少文件路径", flag))?;
        let res = match flag.as_str() {
            "--import-formulas" => state.import_api.import_formulas(path),
            "--import-schedule" => state.import_api.import_schedule(path),
            other => return Err(anyhow!("未知参数: {}", other)),
        }
        .with_context(|| format!("导入失败: {}", path))?;
        tracing::info!(imported = res.imported, skipped = res.skipped.len(), "导入完成: {}", path);
    }

    // 启动摘要
    let formulas = state.formula_repo.list().context("读取配合比失败")?;
    let rows = state.schedule_api.load().context("读取生产计划失败")?;
    let active = rows.iter().filter(|r| r.is_active()).count();
    let history = state.history_repo.list_all().context("读取生产记录失败")?;
    tracing::info!(
        formulas = formulas.len(),
        schedule_rows = rows.len(),
        active_rows = active,
        history = history.len(),
        "数据加载完成"
    );

    let api = state.control_panel_api.clone();
    api.power_on();

    let handles = vec![
        ProcessTicker::spawn(api.clone()),
        SensorFeed::spawn(api.clone(), state.sensor_repo.subscribe()),
        ScheduleFeed::spawn(api.clone(), state.schedule_repo.subscribe()),
    ];

    tracing::info!("控制核心已就绪，按 Ctrl+C 退出");
    tokio::signal::ctrl_c().await.context("等待退出信号失败")?;

    for handle in handles {
        handle.shutdown().await;
    }
    api.power_off();
    tracing::info!("已退出");
    Ok(())
}
