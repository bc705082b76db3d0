use tracing::level_filters::LevelFilter;

const AUTOMATON_LOGLEVEL: &str = "AUTOMATON_LOGLEVEL";

const DEFAULT_LOGLEVEL: LevelFilter = LevelFilter::INFO;

/// Level from `AUTOMATON_LOGLEVEL`, falling back to `INFO` when unset or
/// unparseable.
pub fn get_log_level() -> LevelFilter {
    let level_from_env = std::env::var(AUTOMATON_LOGLEVEL);
    level_from_env.map_or(DEFAULT_LOGLEVEL, |res| {
        parse_log_level(&res).unwrap_or(DEFAULT_LOGLEVEL)
    })
}

/// Accepts the usual level names in any case, plus `WARNING` and `CRITICAL`
/// as found in existing deployments.
pub fn parse_log_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "critical" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

const AUTOMATON_CONFIG: &str = "AUTOMATON_CONFIG";

pub fn get_inline_config() -> Option<String> {
    let config_from_env = std::env::var(AUTOMATON_CONFIG);
    config_from_env.ok().filter(|config| !config.trim().is_empty())
}
