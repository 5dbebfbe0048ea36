// ==========================================
// 搅拌站配料控制系统 - 操作提示（Toast）发布
// ==========================================
// 职责: 定义提示发布 trait，引擎/API 层不依赖具体界面
// 说明: 持久化失败以 destructive 提示呈现给操作员
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// 提示类型
// ==========================================

/// 提示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    /// 普通提示
    Default,
    /// 警告（校验未通过）
    Warning,
    /// 失败（持久化异常）
    Destructive,
}

impl ToastVariant {
    pub fn as_str(&self) -> &str {
        match self {
            ToastVariant::Default => "default",
            ToastVariant::Warning => "warning",
            ToastVariant::Destructive => "destructive",
        }
    }
}

/// 操作提示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Warning,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }
}

// ==========================================
// 提示发布 Trait
// ==========================================

/// 提示发布者
///
/// 发布失败不影响调用方流程,因此没有返回值
pub trait ToastPublisher: Send + Sync {
    fn publish(&self, toast: Toast);
}

/// 空操作发布者（仅写 tracing）
#[derive(Debug, Clone, Default)]
pub struct NoOpToastPublisher;

impl ToastPublisher for NoOpToastPublisher {
    fn publish(&self, toast: Toast) {
        tracing::debug!(
            "NoOpToastPublisher: 跳过提示 - variant={}, title={}",
            toast.variant.as_str(),
            toast.title
        );
    }
}

/// 收集型发布者
///
/// 界面轮询 `drain()` 取走待显示的提示
#[derive(Debug, Default)]
pub struct CollectingToastPublisher {
    toasts: Mutex<Vec<Toast>>,
}

impl CollectingToastPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取走全部待显示提示
    pub fn drain(&self) -> Vec<Toast> {
        match self.toasts.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.toasts.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ToastPublisher for CollectingToastPublisher {
    fn publish(&self, toast: Toast) {
        if let Ok(mut guard) = self.toasts.lock() {
            guard.push(toast);
        }
    }
}

/// 可选的提示发布者包装
///
/// 简化 Option<Arc<dyn ToastPublisher>> 的使用
#[derive(Clone)]
pub struct OptionalToastPublisher {
    inner: Option<Arc<dyn ToastPublisher>>,
}

impl OptionalToastPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn ToastPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布提示）
    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn publish(&self, toast: Toast) {
        match &self.inner {
            Some(publisher) => publisher.publish(toast),
            None => {
                tracing::debug!(
                    "OptionalToastPublisher: 未配置发布者，跳过提示 - title={}",
                    toast.title
                );
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalToastPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_publisher_drain() {
        let publisher = CollectingToastPublisher::new();
        publisher.publish(Toast::destructive("保存失败", "database locked"));
        publisher.publish(Toast::info("完成", "A1"));
        assert_eq!(publisher.len(), 2);

        let toasts = publisher.drain();
        assert_eq!(toasts[0].variant, ToastVariant::Destructive);
        assert!(publisher.is_empty());
    }

    #[test]
    fn test_optional_publisher_forwards() {
        let inner = Arc::new(CollectingToastPublisher::new());
        let publisher = OptionalToastPublisher::with_publisher(inner.clone());
        assert!(publisher.is_configured());
        publisher.publish(Toast::warning("提示", "reqNo"));
        assert_eq!(inner.len(), 1);

        let none = OptionalToastPublisher::none();
        assert!(!none.is_configured());
        none.publish(Toast::warning("提示", "reqNo"));
    }
}
