//! Logging setup for hosts embedding the crate

/// Initialize env_logger for a host that has no logger of its own.
///
/// Quiet by default: other crates log at `warn`, blocksight at `info`.
/// `RUST_LOG` overrides both. Safe to call more than once; later calls
/// are no-ops if a global logger is already installed.
///
/// # Example
/// ```
/// blocksight::core::logging::init();
/// log::info!("highlighter started");
/// ```
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("warn,blocksight=info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
        log::info!("still logging");
    }
}
