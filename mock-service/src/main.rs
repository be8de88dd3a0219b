use mock_service::MockConfig;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Reads `PORT`, `DELAY_MS`, `FAIL_EVERY` and `MAX_TPS` from the environment.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = env_or("PORT", 8080)?;
    let config = MockConfig::default()
        .delay(Duration::from_millis(env_or("DELAY_MS", 0)?))
        .fail_every(env_or("FAIL_EVERY", 0)?)
        .max_tps(env_or("MAX_TPS", 0)?);

    mock_service::run(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), config).await
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => Ok(value.parse()?),
        Err(_) => Ok(default),
    }
}
