//! Shared logger setup for all three binaries.

/// Initialize `env_logger` with `RUST_LOG` honored if set, defaulting to
/// `debug` when `-v`/`--verbose` was passed on the command line, `info`
/// otherwise.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
