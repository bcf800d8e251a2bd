pub mod api;
pub mod config;
pub mod core;

use std::sync::Once;

static LOGGER: Once = Once::new();

/// 初始化日志（读取 RUST_LOG，默认 info），重复调用无副作用
pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_millis()
            .try_init();
    });
}
