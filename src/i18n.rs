// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持印尼语（默认）、英文、中文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 3] = ["id", "en", "zh-CN"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言（不支持的语言回退到 id）
///
/// # 参数
/// - locale: 语言代码（"id"、"en" 或 "zh-CN"）
pub fn set_locale(locale: &str) {
    let locale = locale.trim();
    if SUPPORTED_LOCALES.contains(&locale) {
        rust_i18n::set_locale(locale);
    } else {
        tracing::warn!(locale, "不支持的语言，回退到 id");
        rust_i18n::set_locale("id");
    }
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use batching_plant::i18n::t;
/// let msg = t("step.mixing");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数, 替换 %{name} 占位符）
///
/// # 示例
/// ```no_run
/// use batching_plant::i18n::t_with_args;
/// let msg = t_with_args("warning.schedule_not_found", &[("req_no", "A1")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
