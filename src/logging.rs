use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "portal.log";
const DEFAULT_FILTER: &str = "portal_kit=info,tower_http=info,info";

/// Console output plus a daily JSON file under `logs/`. `RUST_LOG` overrides
/// the default filter. If the log directory cannot be created the server
/// still starts, logging to the console only.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stdout);

    let file_layer = match fs::create_dir_all(LOG_DIR) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // flushed on drop; the subscriber lives for the whole process
            std::mem::forget(guard);
            Some(fmt::layer().json().with_writer(writer))
        }
        Err(e) => {
            eprintln!("log directory {LOG_DIR:?} unavailable, file logging disabled: {e}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}
