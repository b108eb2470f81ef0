use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "analytics_service=info,resource_client=info";

/// `RUST_LOG` wins when set; otherwise the service crates log at info.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
