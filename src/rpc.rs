//! Solana JSON-RPC client with bounded retry and exponential backoff.
//!
//! Every call is retried up to `RetryConfig::max_attempts` times. Between
//! attempts the client sleeps `base_delay * 2^attempt` (1s, 2s, 4s, ... with the
//! default base); there is no sleep after the final attempt. Each attempt yields
//! an explicit [`Attempt`] which the loop inspects to decide whether to return,
//! retry or abort.

use crate::config::RetryConfig;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {method}")]
    Status {
        method: String,
        status: reqwest::StatusCode,
    },

    #[error("JSON-RPC error: code={code}, message={message}")]
    JsonRpc { code: i64, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{method} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        method: String,
        attempts: u32,
        #[source]
        source: Box<RpcError>,
    },
}

/// Coarse failure class used by callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection refused, timeout, non-2xx status.
    Transport,
    /// Error envelope or a response of unexpected shape.
    Protocol,
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Http(e) if e.is_decode() => ErrorKind::Protocol,
            RpcError::Http(_) | RpcError::Status { .. } => ErrorKind::Transport,
            RpcError::JsonRpc { .. } | RpcError::Deserialize(_) | RpcError::InvalidResponse(_) => {
                ErrorKind::Protocol
            }
            RpcError::RetriesExhausted { source, .. } => source.kind(),
        }
    }
}

/// Outcome of a single request attempt.
#[derive(Debug)]
enum Attempt<T> {
    Success(T),
    Retry(RpcError),
    Abort(RpcError),
}

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

/// JSON-RPC response envelope.
///
/// `result` stays untyped until the error field has been checked so that an
/// explicit `null` result can be told apart from a shape mismatch. serde_json is
/// built with `preserve_order`, so object keys keep the order of the response.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// `getEpochInfo` result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub absolute_slot: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
    #[serde(default)]
    pub epoch: u64,
    pub block_height: Option<u64>,
}

/// `getLeaderSchedule` result: validator identity -> slot offsets within the epoch.
///
/// Insertion ordered, so iteration follows the order of the response body.
pub type LeaderSchedule = IndexMap<String, Vec<u64>>;

/// One entry of the `getClusterNodes` result
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterNode {
    #[serde(default)]
    pub pubkey: Option<String>,
    #[serde(default)]
    pub gossip: Option<String>,
}

/// Empty positional parameter list, sent as `[]`.
const NO_PARAMS: [Value; 0] = [];

/// Delay before the retry that follows attempt `attempt` (0-based).
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
}

/// Solana JSON-RPC client.
pub struct SolanaRpcClient {
    client: reqwest::Client,
    rpc_url: String,
    config: RetryConfig,
    request_id: AtomicU64,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: impl Into<String>, config: RetryConfig) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            config,
            request_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make a single RPC call, retrying transient failures up to the configured bound.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            debug!("RPC call: {} (attempt {}/{})", method, attempt + 1, max_attempts);

            match self.attempt(method, &params).await {
                Attempt::Success(result) => {
                    debug!("RPC call {} succeeded", method);
                    return Ok(result);
                }
                Attempt::Abort(e) => {
                    error!("RPC call {} aborted: {}", method, e);
                    return Err(e);
                }
                Attempt::Retry(e) => {
                    warn!(
                        "Attempt {}/{} for {} failed ({:?}): {}",
                        attempt + 1,
                        max_attempts,
                        method,
                        e.kind(),
                        e
                    );
                    last_error = Some(e);
                }
            }

            if attempt + 1 < max_attempts {
                let delay = backoff_delay(self.config.base_delay(), attempt);
                info!("Retrying {} in {:?}...", method, delay);
                tokio::time::sleep(delay).await;
            }
        }

        let source = last_error
            .unwrap_or_else(|| RpcError::InvalidResponse(format!("no attempt made for {}", method)));
        error!(
            "All {} attempts failed for {}. Last error: {}",
            max_attempts, method, source
        );

        Err(RpcError::RetriesExhausted {
            method: method.to_string(),
            attempts: max_attempts,
            source: Box::new(source),
        })
    }

    async fn attempt<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Attempt<R> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            method,
            params,
        };

        let response = match self.client.post(&self.rpc_url).json(&request).send().await {
            Ok(resp) => resp,
            // Malformed URL or unserializable params: retrying cannot help
            Err(e) if e.is_builder() => return Attempt::Abort(e.into()),
            Err(e) => return Attempt::Retry(e.into()),
        };

        let status = response.status();
        if !status.is_success() {
            return Attempt::Retry(RpcError::Status {
                method: method.to_string(),
                status,
            });
        }

        let envelope: JsonRpcResponse = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => return Attempt::Retry(e.into()),
        };

        if let Some(error) = envelope.error {
            return Attempt::Retry(RpcError::JsonRpc {
                code: error.code,
                message: error.message,
            });
        }

        match serde_json::from_value(envelope.result) {
            Ok(result) => Attempt::Success(result),
            Err(e) => Attempt::Retry(e.into()),
        }
    }

    pub async fn get_epoch_info(&self) -> Result<EpochInfo, RpcError> {
        self.call("getEpochInfo", NO_PARAMS).await
    }

    /// Leader schedule for the current epoch. `None` when the node answers `null`.
    pub async fn get_leader_schedule(&self) -> Result<Option<LeaderSchedule>, RpcError> {
        self.call("getLeaderSchedule", NO_PARAMS).await
    }

    pub async fn get_cluster_nodes(&self) -> Result<Vec<ClusterNode>, RpcError> {
        self.call("getClusterNodes", NO_PARAMS).await
    }
}
