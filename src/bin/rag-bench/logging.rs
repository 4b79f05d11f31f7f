use env_logger::Env;

/// Installs env_logger. An explicit `--log-level` wins over `RUST_LOG`, which wins
/// over the config file level.
pub fn init_logging(cli_level: Option<&str>, config_level: &str) {
    let mut builder = match cli_level {
        Some(level) => {
            let mut builder = env_logger::Builder::new();
            builder.parse_filters(level);
            builder
        }
        None => env_logger::Builder::from_env(Env::default().default_filter_or(config_level)),
    };
    builder.format_timestamp_millis();
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
