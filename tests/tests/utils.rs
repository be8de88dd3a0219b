use kvload::core::{RunConfig, ScenarioConfig, Thresholds};
use metrics_exporter_prometheus::PrometheusBuilder;
use mock_service::MockConfig;
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::EnvFilter;
use url::Url;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("kvload=debug,mock_service=info"))
            .with_test_writer()
            .init();

        // Global recorder for the engine's metrics.
        PrometheusBuilder::new().install_recorder().unwrap();
    });
}

/// Serves a fresh mock on an ephemeral port and returns its base URL.
#[allow(unused)]
pub async fn mock(config: MockConfig) -> Url {
    let addr = mock_service::spawn(config).await.unwrap();
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// A local address with nothing listening on it.
#[allow(unused)]
pub async fn dead_target() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}

#[allow(unused)]
pub fn run_config(target: Url, scenarios: Vec<ScenarioConfig>) -> RunConfig {
    RunConfig {
        target,
        scenarios,
        thresholds: Thresholds::default(),
        seed: Some(42),
        ..RunConfig::default()
    }
}
