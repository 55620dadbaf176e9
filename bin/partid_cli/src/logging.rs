/// Logs go to stderr so stdout carries only JSON. `RUST_LOG` overrides the
/// default `info` level.
pub fn init() {
    env_logger::Builder::new()
        .target(env_logger::Target::Stderr)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
