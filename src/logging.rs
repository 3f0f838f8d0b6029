use tracing_subscriber::EnvFilter;

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

/// Installs the fmt subscriber; later calls are ignored
pub fn init_logger_once(filter: &str) {
    INIT_LOGGER.call_once(|| {
        let mut env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
        for quiet in ["winit=warn", "eframe=warn", "hyper=warn"] {
            if let Ok(directive) = quiet.parse() {
                env_filter = env_filter.add_directive(directive);
            }
        }
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    });
}
