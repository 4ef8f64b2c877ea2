//! 优雅停止管理器
//!
//! 按注册顺序执行关闭回调（调度任务 → 实时风控 → 执行工作池 → 连接池），
//! 单个回调超时或失败不阻断后续回调。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// 关闭回调函数
pub type ShutdownHook = Box<
    dyn Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// 关闭配置
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// 总超时时间
    pub total_timeout: Duration,
    /// 每个钩子的超时时间
    pub hook_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(30),
            hook_timeout: Duration::from_secs(10),
        }
    }
}

pub struct ShutdownManager {
    is_shutting_down: Arc<AtomicBool>,
    hooks: Arc<RwLock<Vec<(String, ShutdownHook)>>>,
    config: ShutdownConfig,
}

impl ShutdownManager {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            hooks: Arc::new(RwLock::new(Vec::new())),
            config,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Acquire)
    }

    /// 注册关闭回调，执行顺序与注册顺序一致
    pub async fn register_shutdown_hook<F, Fut>(&self, name: &str, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let boxed: ShutdownHook = Box::new(move || Box::pin(hook()));
        let mut hooks = self.hooks.write().await;
        hooks.push((name.to_string(), boxed));
        info!("注册关闭回调: {}", name);
    }

    /// 执行优雅关闭
    pub async fn shutdown(&self) -> Result<()> {
        if self
            .is_shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("关闭已在进行中");
            return Ok(());
        }

        info!("开始执行优雅关闭，总超时: {:?}", self.config.total_timeout);
        match tokio::time::timeout(self.config.total_timeout, self.run_hooks()).await {
            Ok(()) => {
                info!("优雅关闭完成");
                Ok(())
            }
            Err(_) => {
                error!("关闭超时 ({:?})", self.config.total_timeout);
                Err(anyhow::anyhow!("关闭超时"))
            }
        }
    }

    async fn run_hooks(&self) {
        let hooks = self.hooks.read().await;
        for (name, hook) in hooks.iter() {
            match tokio::time::timeout(self.config.hook_timeout, hook()).await {
                Ok(Ok(())) => info!("关闭回调完成: {}", name),
                Ok(Err(e)) => error!("关闭回调失败: {}: {}", name, e),
                Err(_) => error!("关闭回调超时: {} ({:?})", name, self.config.hook_timeout),
            }
        }
    }

    /// 等待退出信号
    pub async fn wait_for_shutdown_signal() -> &'static str {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c");
            "CTRL+C"
        }
    }
}

/// 全局关闭管理器实例
static SHUTDOWN_MANAGER: once_cell::sync::OnceCell<ShutdownManager> =
    once_cell::sync::OnceCell::new();

pub fn init_shutdown_manager(config: Option<ShutdownConfig>) -> &'static ShutdownManager {
    SHUTDOWN_MANAGER.get_or_init(|| ShutdownManager::new(config.unwrap_or_default()))
}

pub fn get_shutdown_manager() -> &'static ShutdownManager {
    SHUTDOWN_MANAGER
        .get()
        .expect("ShutdownManager not initialized")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn hooks_run_in_registration_order() {
        let manager = ShutdownManager::new(ShutdownConfig {
            total_timeout: Duration::from_secs(5),
            hook_timeout: Duration::from_secs(1),
        });

        let order = Arc::new(RwLock::new(Vec::new()));
        for name in ["first", "second"] {
            let order = Arc::clone(&order);
            manager
                .register_shutdown_hook(name, move || {
                    let order = Arc::clone(&order);
                    async move {
                        order.write().await.push(name);
                        Ok(())
                    }
                })
                .await;
        }

        manager.shutdown().await.unwrap();
        assert!(manager.is_shutting_down());
        assert_eq!(*order.read().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failing_hook_does_not_block_rest() {
        let manager = ShutdownManager::new(ShutdownConfig {
            total_timeout: Duration::from_secs(5),
            hook_timeout: Duration::from_secs(1),
        });

        let ran = Arc::new(AtomicUsize::new(0));
        manager
            .register_shutdown_hook("broken", || async { Err(anyhow::anyhow!("boom")) })
            .await;
        let ran2 = Arc::clone(&ran);
        manager
            .register_shutdown_hook("after", move || {
                let ran2 = Arc::clone(&ran2);
                async move {
                    ran2.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        manager.shutdown().await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
