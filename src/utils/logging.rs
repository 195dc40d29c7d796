/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::AppResult;
use crate::models::attendance::FlowResult;
use crate::orchestrator::ProcessingStats;
use crate::workflow::FlowCtx;

/// 初始化日志输出
///
/// 级别由 `RUST_LOG` 控制，默认 `info`。重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 考勤回放模式");
    info!("🌐 门户地址: {}", config.base_url);
    info!("📊 最大并发数: {}", config.max_concurrent_flows);
    info!(
        "🔁 重试: {} 次 ({}s ~ {}s)",
        config.max_retries, config.retry_floor_secs, config.retry_ceiling_secs
    );
    if !config.verify_public_ip {
        info!("⚠️ 已关闭公网 IP 校验");
    }
    info!("{}", "=".repeat(60));
}

/// 记录任务加载信息
pub fn log_jobs_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待处理的任务", total);
    info!("📋 最多同时执行 {} 个流程\n", max_concurrent);
}

/// 记录单个流程的结果
pub fn log_flow_result(ctx: &FlowCtx, result: &AppResult<FlowResult>) {
    match result {
        Ok(r) if r.success => info!(
            "{} ✅ {} (坐标 {:.6}, {:.6})",
            ctx, r.message, r.submitted_location.latitude, r.submitted_location.longitude
        ),
        Ok(r) => warn!(
            "{} ⚠️ {}: {}",
            ctx,
            r.message,
            truncate_text(&crate::services::html_scan::visible_text(&r.final_html), 120)
        ),
        Err(e) => warn!("{} ❌ 处理失败 (状态码类别 {}): {}", ctx, e.status_class(), e),
    }
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &ProcessingStats) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("⚠️ 门户拒绝: {}", stats.rejected);
    info!("❌ 失败: {}", stats.failed);
    info!("🚫 无效任务: {}", stats.invalid);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("  corto ", 10), "corto");
        assert_eq!(truncate_text("contraseña incorrecta", 10), "contraseña...");
    }

    #[test]
    fn test_init_twice() {
        init();
        init();
    }
}
