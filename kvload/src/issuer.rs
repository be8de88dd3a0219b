//! Sending a single request and turning the result into an [`Observation`].
use crate::error::Error;
use crate::workload::Request;
use kvload_core::{FailureKind, Observation, OperationKind, Outcome, RunConfig};
use reqwest::{Client, Method};
use std::time::Instant;
use time::OffsetDateTime;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

/// Sends one request and reports what happened.
///
/// Implementations never fail: a request that could not be completed is recorded as an
/// [`Outcome::Failed`] observation. Nothing is retried.
#[trait_variant::make(Issuer: Send)]
pub trait LocalIssuer {
    async fn issue(&self, request: &Request) -> Observation;
}

/// [`Issuer`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpIssuer {
    client: Client,
    base: String,
}

impl HttpIssuer {
    pub fn new(config: &RunConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify)
            .timeout(config.request_timeout);

        if config.no_connection_reuse {
            builder = builder.pool_max_idle_per_host(0);
        }

        Ok(Self {
            client: builder.build()?,
            base: config.target.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, request: &Request) -> String {
        format!("{}{}", self.base, request.operation.path(&request.key))
    }
}

impl Issuer for HttpIssuer {
    async fn issue(&self, request: &Request) -> Observation {
        let method = match request.operation {
            OperationKind::Get => Method::GET,
            OperationKind::Put => Method::PUT,
            OperationKind::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, self.url(request));
        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let timestamp = OffsetDateTime::now_utc();
        let start = Instant::now();
        let outcome = match builder.send().await {
            // NOTE: Latency includes reading the full body.
            Ok(response) => {
                let status = response.status().as_u16();
                match response.bytes().await {
                    Ok(_) => Outcome::Status(status),
                    Err(err) => Outcome::Failed(classify(&err)),
                }
            }
            Err(err) => Outcome::Failed(classify(&err)),
        };
        let latency = start.elapsed();

        if let Outcome::Failed(kind) = outcome {
            trace!("{} {} failed: {kind}", request.operation, request.key);
        }

        Observation::new(request.operation, outcome, latency, timestamp)
    }
}

fn classify(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() {
        FailureKind::Connect
    } else {
        FailureKind::Request
    }
}
