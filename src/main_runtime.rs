use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use vault_maxi::config::LoggingConfig;

pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},vault_maxi=debug", logging.level)));

    // Prefer VAULTMAXI_LOG_DIR, fall back to LOG_DIR; no file logging when neither is set.
    let log_dir = std::env::var("VAULTMAXI_LOG_DIR")
        .or_else(|_| std::env::var("LOG_DIR"))
        .ok();

    // `tracing_appender::rolling::daily` panics if it cannot create the first file,
    // so writability is checked up front.
    let file_layer = log_dir.as_ref().and_then(|dir| {
        if std::fs::create_dir_all(dir).is_err() {
            eprintln!("Warning: Could not create log directory {}, file logging disabled", dir);
            return None;
        }
        let test_path = std::path::Path::new(dir).join(".vault_maxi_write_test");
        match std::fs::OpenOptions::new().create(true).append(true).open(&test_path) {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);
                let file_appender = tracing_appender::rolling::daily(dir, "vault-maxi.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // One run per process; the guard lives until exit.
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    dir, e
                );
                None
            }
        }
    });

    let console_layer = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(filter)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, log_dir) {
        eprintln!("Logging to: {}/vault-maxi.log", dir);
    }
}
