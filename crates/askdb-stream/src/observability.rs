use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn observability_enabled(flag: Option<&str>) -> bool {
    flag.and_then(parse_bool_env).unwrap_or(true)
}

fn resolve_env_filter(
    askdb_level: Option<&str>,
    rust_log: Option<&str>,
    default_level: &str,
) -> tracing_subscriber::EnvFilter {
    askdb_level
        .into_iter()
        .chain(rust_log)
        .find_map(|directives| tracing_subscriber::EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new(default_level))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `ASKDB_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `ASKDB_LOG_LEVEL`: optional level/filter override (`info`, `askdb_stream=debug`, ...).
/// - `ASKDB_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr in a compact console format so stdout stays
///   free for query output.
/// - `RUST_LOG`: fallback filter when `ASKDB_LOG_LEVEL` is unset.
pub fn init_observability(default_level: &str) {
    INIT.get_or_init(|| {
        let flag = std::env::var("ASKDB_OBSERVABILITY_ENABLED").ok();
        if !observability_enabled(flag.as_deref()) {
            return;
        }

        let level = std::env::var("ASKDB_LOG_LEVEL").ok();
        let rust_log = std::env::var("RUST_LOG").ok();
        let env_filter = resolve_env_filter(level.as_deref(), rust_log.as_deref(), default_level);
        if let Ok(path_raw) = std::env::var("ASKDB_JSON_LOG_PATH") {
            let path = std::path::PathBuf::from(path_raw);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                let _ = std::fs::create_dir_all(parent);
            }
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("askdb.logs.jsonl");
            let writer = tracing_appender::rolling::never(dir, file_name);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init();
        } else {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init();
        }
    });
}
