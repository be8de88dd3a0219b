use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::{NonZeroU32, NonZeroU64};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Fault injection for the mock.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Added to every response.
    pub delay: Duration,
    /// Answer every Nth request with a 500.
    pub fail_every: Option<NonZeroU64>,
    /// Answer requests beyond this rate with a 500.
    pub max_tps: Option<NonZeroU32>,
}

impl MockConfig {
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = NonZeroU64::new(n);
        self
    }

    pub fn max_tps(mut self, tps: u32) -> Self {
        self.max_tps = NonZeroU32::new(tps);
        self
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Entry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PutBody {
    #[serde(default)]
    pub value: String,
}

type Reply = (StatusCode, Json<ApiResponse>);

struct Store {
    data: RwLock<HashMap<String, String>>,
    config: MockConfig,
    limiter: Option<DefaultDirectRateLimiter>,
    requests: AtomicU64,
    tps: Arc<AtomicU64>,
}

impl Store {
    /// Applies the configured delay and faults. `Err` is the reply to send instead.
    async fn admit(&self) -> Result<(), Reply> {
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.tps.fetch_add(1, Ordering::Relaxed);

        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }

        if let Some(every) = self.config.fail_every {
            if n % every.get() == 0 {
                debug!("Injecting failure on request {n}");
                return Err(reply(StatusCode::INTERNAL_SERVER_ERROR, "injected failure", None));
            }
        }
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                return Err(reply(StatusCode::INTERNAL_SERVER_ERROR, "over capacity", None));
            }
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn reply(status: StatusCode, message: impl Into<String>, data: Option<Entry>) -> Reply {
    (
        status,
        Json(ApiResponse {
            message: message.into(),
            data,
        }),
    )
}

fn no_such_key(key: &str) -> Reply {
    reply(StatusCode::NOT_FOUND, format!("no such key: '{key}'"), None)
}

/// Handle on a running mock's request counter.
#[derive(Debug, Clone, Default)]
pub struct TpsCounter(Arc<AtomicU64>);

impl TpsCounter {
    /// Requests since the last call.
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

pub fn router(config: MockConfig) -> (Router, TpsCounter) {
    let tps = TpsCounter::default();
    let store = Arc::new(Store {
        data: RwLock::new(HashMap::new()),
        limiter: config
            .max_tps
            .map(|tps| RateLimiter::direct(Quota::per_second(tps))),
        config,
        requests: AtomicU64::new(0),
        tps: tps.0.clone(),
    });

    let app = Router::new()
        .route("/get/:key", get(get_key))
        .route("/put/:key", put(put_key))
        .route("/delete/:key", delete(delete_key))
        .layer(TraceLayer::new_for_http())
        .with_state(store);
    (app, tps)
}

/// Serves the mock on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener, config: MockConfig) -> anyhow::Result<()> {
    let (app, _) = router(config);
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn run(addr: SocketAddr, config: MockConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Mock KV service listening on {}", listener.local_addr()?);
    let (app, tps) = router(config);
    tokio::spawn(tps_measure_task(tps));
    axum::serve(listener, app).await?;
    Ok(())
}

/// Binds an ephemeral local port and serves the mock in the background.
pub async fn spawn(config: MockConfig) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(serve(listener, config));
    Ok(addr)
}

#[debug_handler]
async fn get_key(Path(key): Path<String>, State(store): State<Arc<Store>>) -> Reply {
    if let Err(reply) = store.admit().await {
        return reply;
    }

    match store.read().get(&key) {
        Some(value) => reply(
            StatusCode::OK,
            "success",
            Some(Entry {
                key,
                value: value.clone(),
            }),
        ),
        None => no_such_key(&key),
    }
}

#[debug_handler]
async fn put_key(
    Path(key): Path<String>,
    State(store): State<Arc<Store>>,
    Json(body): Json<PutBody>,
) -> Reply {
    if let Err(reply) = store.admit().await {
        return reply;
    }

    if body.value.is_empty() {
        return reply(StatusCode::BAD_REQUEST, "value must not be empty", None);
    }

    store.write().insert(key.clone(), body.value.clone());
    reply(
        StatusCode::CREATED,
        "success",
        Some(Entry {
            key,
            value: body.value,
        }),
    )
}

#[debug_handler]
async fn delete_key(Path(key): Path<String>, State(store): State<Arc<Store>>) -> Reply {
    if let Err(reply) = store.admit().await {
        return reply;
    }

    match store.write().remove(&key) {
        Some(_) => reply(StatusCode::OK, "success", None),
        None => no_such_key(&key),
    }
}

/** TPS Printer **/

pub async fn tps_measure_task(tps: TpsCounter) {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        info!("{} TPS", tps.take());
    }
}
