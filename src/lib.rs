pub mod analysis;
pub mod commands;
pub mod models;

/// Initialize logging for the host client. Safe to call more than once;
/// respects RUST_LOG, defaults to info.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
