//! Logging setup for kmsfb
//!
//! Binaries install a `tracing` subscriber with `init_tracing`. The C ABI
//! layer may run inside a host without a subscriber, so it also writes
//! through `wlog!`, which follows the `YYYY-MM-DD HH:MM:SS [MODULE] Message`
//! format on stderr.

#[macro_export]
macro_rules! wlog {
    ($module:expr, $($arg:tt)*) => {{
        let now = chrono::Local::now();
        eprintln!("{} [{}] {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            $module,
            format!($($arg)*)
        );
    }};
}

/// Standardized module identifiers
pub const DEVICE: &str = "DEVICE";
pub const C_API: &str = "C_API";

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,kmsfb=debug";

/// Installs the fmt subscriber with the standardized timestamp format.
pub fn init_tracing() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", DEFAULT_FILTER);
    }

    // A host may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S".to_string(),
        ))
        .with_ansi(false)
        .try_init();
}
