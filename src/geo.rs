//! Validator geolocation.
//!
//! Builds the validator -> region map:
//! - Node discovery via `getClusterNodes`
//! - IP extraction from gossip addresses, skipping loopback and private ranges
//! - Country lookup against an ip-api compatible service, throttled to the
//!   service's request budget and cached for the duration of the run
//! - Country -> region classification (see [`crate::region`])
//!
//! Only the node-list fetch can fail the run. Every per-node problem degrades
//! that node to [`Region::Unknown`].

use crate::config::{GeoConfig, PipelineConfig};
use crate::output::{check_output_dir, write_json_atomic, OutputError};
use crate::region::Region;
use crate::rpc::{ClusterNode, RpcError, SolanaRpcClient};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Validator pubkey -> region. Ordered so the document is reproducible.
pub type RegionMap = BTreeMap<String, Region>;

/// Extract the IP from an `ip:port` gossip address.
///
/// The host is everything before the final colon; bracketed IPv6 hosts are
/// unwrapped. Returns `None` for anything that does not parse as an IP.
pub fn extract_ip(gossip: &str) -> Option<IpAddr> {
    let (host, _port) = gossip.trim().rsplit_once(':')?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse().ok()
}

/// False for loopback, RFC 1918 private and unspecified addresses.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) follow the IPv4 rules.
pub fn is_routable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_routable_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_routable_v4(&v4),
            None => !(v6.is_loopback() || v6.is_unspecified()),
        },
    }
}

fn is_routable_v4(v4: &Ipv4Addr) -> bool {
    !(v4.is_loopback() || v4.is_private() || v4.is_unspecified())
}

/// The IP to geolocate for a gossip address, if there is one worth a lookup.
pub fn routable_ip(gossip: Option<&str>) -> Option<IpAddr> {
    gossip
        .and_then(extract_ip)
        .filter(is_routable)
}

/// In-run geolocation cache.
///
/// `Some(None)` from [`GeoCache::get`] means the IP was looked up and has no
/// usable country; `None` means it was never looked up.
#[derive(Debug, Default)]
pub struct GeoCache {
    entries: HashMap<IpAddr, Option<String>>,
}

impl GeoCache {
    pub fn get(&self, ip: &IpAddr) -> Option<Option<&str>> {
        self.entries.get(ip).map(|c| c.as_deref())
    }

    pub fn insert(&mut self, ip: IpAddr, country: Option<String>) {
        self.entries.insert(ip, country);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// ip-api response (only the requested fields)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoResponse {
    #[serde(default)]
    status: String,
    country_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Outcome of one lookup request.
#[derive(Debug)]
enum LookupAttempt {
    /// Service answered; country may still be absent
    Resolved(Option<String>),
    RateLimited,
    Failed(GeoError),
}

impl GeoResponse {
    fn into_attempt(self) -> LookupAttempt {
        if self.status == "success" {
            return LookupAttempt::Resolved(self.country_code.filter(|c| !c.is_empty()));
        }
        let message = self.message.unwrap_or_default();
        if self.status == "fail" && message.to_lowercase().contains("rate limit") {
            return LookupAttempt::RateLimited;
        }
        debug!("Lookup returned status={:?} message={:?}", self.status, message);
        LookupAttempt::Resolved(None)
    }
}

/// Throttled, cached IP -> country lookup.
pub struct GeoLocator {
    client: reqwest::Client,
    config: GeoConfig,
    cache: GeoCache,
    throttle: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
    network_calls: u64,
}

impl GeoLocator {
    pub fn new(config: GeoConfig) -> Result<Self, GeoError> {
        // One request per interval, no burst
        let quota = Quota::with_period(config.min_request_interval())
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));
        let throttle = RateLimiter::direct(quota);

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            cache: GeoCache::default(),
            throttle,
            network_calls: 0,
        })
    }

    pub fn cache(&self) -> &GeoCache {
        &self.cache
    }

    /// Number of lookup requests sent so far.
    pub fn network_calls(&self) -> u64 {
        self.network_calls
    }

    /// Country code for `ip`, or `None` when it cannot be determined.
    ///
    /// Never fails: errors and exhausted rate-limit retries are cached as `None`.
    pub async fn lookup(&mut self, ip: IpAddr) -> Option<String> {
        if let Some(cached) = self.cache.get(&ip) {
            debug!("Cache hit for {}", ip);
            return cached.map(str::to_string);
        }

        let max_retries = self.config.max_rate_limit_retries;
        let mut rate_limit_retries = 0;

        let country = loop {
            match self.request(ip).await {
                LookupAttempt::Resolved(country) => break country,
                LookupAttempt::Failed(e) => {
                    warn!("Geolocation failed for {}: {}", ip, e);
                    break None;
                }
                LookupAttempt::RateLimited if rate_limit_retries >= max_retries => {
                    error!(
                        "Max retries ({}) exceeded for rate limiting on {}",
                        max_retries, ip
                    );
                    break None;
                }
                LookupAttempt::RateLimited => {
                    rate_limit_retries += 1;
                    warn!(
                        "Rate limited by geolocation service, waiting {:?}... (retry {}/{})",
                        self.config.rate_limit_cooldown(),
                        rate_limit_retries,
                        max_retries
                    );
                    tokio::time::sleep(self.config.rate_limit_cooldown()).await;
                }
            }
        };

        self.cache.insert(ip, country.clone());
        country
    }

    async fn request(&mut self, ip: IpAddr) -> LookupAttempt {
        self.throttle.until_ready().await;
        self.network_calls += 1;

        let url = format!("{}/json/{}", self.config.base_url.trim_end_matches('/'), ip);
        let response = match self
            .client
            .get(&url)
            .query(&[("fields", "status,countryCode,message")])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return LookupAttempt::Failed(e.into()),
        };

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return LookupAttempt::RateLimited;
        }
        if !status.is_success() {
            return LookupAttempt::Failed(GeoError::Status(status));
        }

        match response.json::<GeoResponse>().await {
            Ok(body) => body.into_attempt(),
            Err(e) => LookupAttempt::Failed(e.into()),
        }
    }
}

/// Per-run counters. Observability only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoStats {
    /// Geolocated into a named region
    pub resolved: usize,
    /// Looked up, ended as unknown
    pub unresolved: usize,
    /// No identity, or no routable IP
    pub skipped: usize,
}

/// Outcome of a geolocation run
#[derive(Debug, Clone)]
pub struct GeoSummary {
    pub nodes: usize,
    pub entries: usize,
    pub stats: GeoStats,
    pub lookups: u64,
    pub regions: BTreeMap<Region, usize>,
    pub bytes_written: usize,
    pub output_path: PathBuf,
}

/// Count entries per region.
pub fn region_distribution(map: &RegionMap) -> BTreeMap<Region, usize> {
    let mut counts = BTreeMap::new();
    for region in map.values() {
        *counts.entry(*region).or_insert(0) += 1;
    }
    counts
}

const PROGRESS_INTERVAL: usize = 50;

/// Whether to log progress before handling the node at `index`, whatever
/// that node turns out to be.
fn progress_due(index: usize) -> bool {
    index > 0 && index % PROGRESS_INTERVAL == 0
}

/// Fetch -> geolocate -> classify -> persist pipeline for validator regions.
pub struct GeoPipeline {
    client: SolanaRpcClient,
    locator: GeoLocator,
    output_path: PathBuf,
}

impl GeoPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, GeoError> {
        let client = SolanaRpcClient::new(config.rpc_url.clone(), config.rpc.clone())?;
        let locator = GeoLocator::new(config.geo.clone())?;
        Ok(Self::with_parts(client, locator, config.paths.geo_output.clone()))
    }

    pub fn with_parts(client: SolanaRpcClient, locator: GeoLocator, output_path: PathBuf) -> Self {
        Self {
            client,
            locator,
            output_path,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn locator(&self) -> &GeoLocator {
        &self.locator
    }

    /// Classify every node. One entry per node that has an identity.
    pub async fn classify_nodes(&mut self, nodes: &[ClusterNode]) -> (RegionMap, GeoStats) {
        let mut map = RegionMap::new();
        let mut stats = GeoStats::default();

        for (i, node) in nodes.iter().enumerate() {
            if progress_due(i) {
                info!("Progress: {}/{} validators processed", i, nodes.len());
            }

            let Some(pubkey) = node.pubkey.as_deref().filter(|p| !p.is_empty()) else {
                stats.skipped += 1;
                continue;
            };
            let short = pubkey.get(..8).unwrap_or(pubkey);

            let Some(ip) = routable_ip(node.gossip.as_deref()) else {
                debug!("No routable IP for {}... ({:?})", short, node.gossip);
                map.insert(pubkey.to_string(), Region::Unknown);
                stats.skipped += 1;
                continue;
            };

            let country = self.locator.lookup(ip).await;
            let region = Region::from_country_code(country.as_deref());
            map.insert(pubkey.to_string(), region);

            if region.is_known() {
                stats.resolved += 1;
                debug!("{}... -> {} -> {:?} -> {}", short, ip, country, region);
            } else {
                stats.unresolved += 1;
                debug!("{}... -> {} -> unknown", short, ip);
            }
        }

        (map, stats)
    }

    /// Run the full pipeline. Only the node-list fetch can fail it.
    pub async fn run(&mut self) -> Result<GeoSummary, GeoError> {
        check_output_dir(&self.output_path)?;

        info!("Fetching cluster nodes...");
        let nodes = self.client.get_cluster_nodes().await?;
        info!("Found {} cluster nodes", nodes.len());

        let (map, stats) = self.classify_nodes(&nodes).await;
        info!(
            "Completed: {} geolocated, {} unknown, {} skipped ({} lookups)",
            stats.resolved,
            stats.unresolved,
            stats.skipped,
            self.locator.network_calls()
        );

        let regions = region_distribution(&map);
        info!("Region distribution: {:?}", regions);

        let bytes_written = write_json_atomic(&map, &self.output_path)?;

        Ok(GeoSummary {
            nodes: nodes.len(),
            entries: map.len(),
            stats,
            lookups: self.locator.network_calls(),
            regions,
            bytes_written,
            output_path: self.output_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::output::read_json;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn geo_config(server: &MockServer) -> GeoConfig {
        GeoConfig {
            base_url: server.base_url(),
            request_timeout_secs: 5,
            requests_per_minute: 60_000,
            rate_limit_cooldown_secs: 0,
            max_rate_limit_retries: 3,
        }
    }

    fn node(pubkey: Option<&str>, gossip: Option<&str>) -> ClusterNode {
        ClusterNode {
            pubkey: pubkey.map(str::to_string),
            gossip: gossip.map(str::to_string),
        }
    }

    async fn mock_country<'a>(server: &'a MockServer, ip: &str, body: serde_json::Value) -> httpmock::Mock<'a> {
        let path = format!("/json/{}", ip);
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(path)
                    .query_param("fields", "status,countryCode,message");
                then.status(200).json_body(body);
            })
            .await
    }

    #[test]
    fn test_extract_ip() {
        assert_eq!(extract_ip("1.2.3.4:8001"), Some("1.2.3.4".parse().unwrap()));
        assert_eq!(extract_ip("[2001:db8::1]:8001"), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(extract_ip("1.2.3.4"), None);
        assert_eq!(extract_ip("not-an-ip:8001"), None);
        assert_eq!(extract_ip(""), None);
    }

    #[test]
    fn test_private_ranges_are_not_routable() {
        for ip in [
            "127.0.0.1",
            "127.255.255.254",
            "10.0.0.1",
            "10.255.255.255",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.5",
            "0.0.0.0",
            "::1",
            "::ffff:192.168.1.5",
            "::ffff:10.0.0.1",
            "::ffff:127.0.0.1",
        ] {
            assert!(!is_routable(&ip.parse().unwrap()), "{} should not be routable", ip);
        }
        for ip in [
            "8.8.8.8",
            "172.15.0.1",
            "172.32.0.1",
            "192.169.0.1",
            "11.0.0.1",
            "2001:db8::1",
            "::ffff:8.8.8.8",
        ] {
            assert!(is_routable(&ip.parse().unwrap()), "{} should be routable", ip);
        }
    }

    #[test]
    fn test_routable_ip() {
        assert_eq!(routable_ip(None), None);
        assert_eq!(routable_ip(Some("192.168.1.5:8001")), None);
        assert_eq!(routable_ip(Some("[::ffff:192.168.1.5]:8001")), None);
        assert_eq!(routable_ip(Some("garbage")), None);
        assert_eq!(routable_ip(Some("8.8.8.8:8001")), Some("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_response_interpretation() {
        let parse = |v: serde_json::Value| serde_json::from_value::<GeoResponse>(v).unwrap().into_attempt();

        assert!(matches!(
            parse(json!({"status": "success", "countryCode": "DE"})),
            LookupAttempt::Resolved(Some(c)) if c == "DE"
        ));
        assert!(matches!(
            parse(json!({"status": "fail", "message": "Rate limit exceeded"})),
            LookupAttempt::RateLimited
        ));
        assert!(matches!(
            parse(json!({"status": "fail", "message": "private range"})),
            LookupAttempt::Resolved(None)
        ));
        assert!(matches!(
            parse(json!({"status": "success"})),
            LookupAttempt::Resolved(None)
        ));
        assert!(matches!(
            parse(json!({"status": "fail", "message": null})),
            LookupAttempt::Resolved(None)
        ));
        assert!(matches!(
            parse(json!({"status": "success", "countryCode": "JP", "message": null})),
            LookupAttempt::Resolved(Some(c)) if c == "JP"
        ));
    }

    #[test]
    fn test_progress_counts_every_node() {
        let due: Vec<usize> = (0..=150).filter(|&i| progress_due(i)).collect();
        assert_eq!(due, vec![50, 100, 150]);
    }

    #[tokio::test]
    async fn test_lookup_is_cached() {
        let server = MockServer::start_async().await;
        let mock = mock_country(&server, "8.8.8.8", json!({"status": "success", "countryCode": "US"})).await;

        let mut locator = GeoLocator::new(geo_config(&server)).unwrap();
        let ip: IpAddr = "8.8.8.8".parse().unwrap();

        let first = locator.lookup(ip).await;
        let second = locator.lookup(ip).await;

        assert_eq!(first.as_deref(), Some("US"));
        assert_eq!(first, second);
        mock.assert_hits_async(1).await;
        assert_eq!(locator.network_calls(), 1);
        assert_eq!(locator.cache().get(&ip), Some(Some("US")));
    }

    #[tokio::test]
    async fn test_country_classification() {
        let server = MockServer::start_async().await;
        mock_country(&server, "1.1.1.1", json!({"status": "success", "countryCode": "DE"})).await;
        mock_country(&server, "2.2.2.2", json!({"status": "success", "countryCode": "ZZ"})).await;

        let mut locator = GeoLocator::new(geo_config(&server)).unwrap();
        let de = locator.lookup("1.1.1.1".parse().unwrap()).await;
        let zz = locator.lookup("2.2.2.2".parse().unwrap()).await;

        assert_eq!(Region::from_country_code(de.as_deref()), Region::Frankfurt);
        assert_eq!(Region::from_country_code(zz.as_deref()), Region::Unknown);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_are_bounded() {
        let server = MockServer::start_async().await;
        let mock = mock_country(
            &server,
            "3.3.3.3",
            json!({"status": "fail", "message": "rate limit exceeded"}),
        )
        .await;

        let mut locator = GeoLocator::new(geo_config(&server)).unwrap();
        let ip: IpAddr = "3.3.3.3".parse().unwrap();
        let country = locator.lookup(ip).await;

        assert_eq!(country, None);
        // First request plus three retries
        mock.assert_hits_async(4).await;
        assert_eq!(locator.cache().get(&ip), Some(None));

        // Cached "no country" short-circuits
        assert_eq!(locator.lookup(ip).await, None);
        mock.assert_hits_async(4).await;
    }

    #[tokio::test]
    async fn test_http_429_counts_as_rate_limit() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/json/4.4.4.4");
                then.status(429);
            })
            .await;

        let mut config = geo_config(&server);
        config.max_rate_limit_retries = 1;
        let mut locator = GeoLocator::new(config).unwrap();

        assert_eq!(locator.lookup("4.4.4.4".parse().unwrap()).await, None);
        mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_lookup_failures_degrade_to_none() {
        let server = MockServer::start_async().await;
        let error_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/json/5.5.5.5");
                then.status(500);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/json/6.6.6.6");
                then.status(200).body("not json");
            })
            .await;

        let mut locator = GeoLocator::new(geo_config(&server)).unwrap();
        assert_eq!(locator.lookup("5.5.5.5".parse().unwrap()).await, None);
        assert_eq!(locator.lookup("6.6.6.6".parse().unwrap()).await, None);
        assert_eq!(locator.cache().len(), 2);

        // Failures are cached, no second request
        assert_eq!(locator.lookup("5.5.5.5".parse().unwrap()).await, None);
        error_mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_throttle_spaces_network_calls_only() {
        let server = MockServer::start_async().await;
        mock_country(&server, "7.7.7.7", json!({"status": "success", "countryCode": "JP"})).await;
        mock_country(&server, "8.8.4.4", json!({"status": "success", "countryCode": "US"})).await;

        let mut config = geo_config(&server);
        config.requests_per_minute = 300; // 200ms spacing
        let mut locator = GeoLocator::new(config).unwrap();

        let started = Instant::now();
        locator.lookup("7.7.7.7".parse().unwrap()).await;
        locator.lookup("8.8.4.4".parse().unwrap()).await;
        assert!(started.elapsed() >= Duration::from_millis(150));

        let cached = Instant::now();
        locator.lookup("7.7.7.7".parse().unwrap()).await;
        locator.lookup("8.8.4.4".parse().unwrap()).await;
        assert!(cached.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_private_gossip_skips_lookup() {
        let server = MockServer::start_async().await;
        let any_lookup = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).json_body(json!({"status": "success", "countryCode": "US"}));
            })
            .await;

        let rpc = SolanaRpcClient::new(server.url("/rpc"), RetryConfig::default()).unwrap();
        let locator = GeoLocator::new(geo_config(&server)).unwrap();
        let mut pipeline = GeoPipeline::with_parts(rpc, locator, PathBuf::from("unused.json"));

        let (map, stats) = pipeline
            .classify_nodes(&[
                node(Some("Private"), Some("192.168.1.5:8001")),
                node(Some("MappedPrivate"), Some("[::ffff:192.168.1.5]:8001")),
                node(Some("Loopback"), Some("127.0.0.1:8001")),
                node(Some("NoGossip"), None),
                node(Some("Malformed"), Some("nonsense")),
                node(None, Some("8.8.8.8:8001")),
            ])
            .await;

        any_lookup.assert_hits_async(0).await;
        assert_eq!(map.len(), 5);
        assert_eq!(map.get("Private"), Some(&Region::Unknown));
        assert_eq!(map.get("MappedPrivate"), Some(&Region::Unknown));
        assert!(map.values().all(|r| *r == Region::Unknown));
        assert_eq!(stats.skipped, 6);
        assert_eq!(stats.resolved + stats.unresolved, 0);
    }

    #[tokio::test]
    async fn test_run_writes_region_map() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rpc").body_contains("getClusterNodes");
                then.status(200).json_body(json!({
                    "jsonrpc": "2.0", "id": 1,
                    "result": [
                        {"pubkey": "ValA", "gossip": "1.1.1.1:8001"},
                        {"pubkey": "ValB", "gossip": "1.1.1.1:8002"},
                        {"pubkey": "ValC", "gossip": "2.2.2.2:8001"},
                        {"pubkey": "ValD", "gossip": "10.0.0.7:8001"},
                        {"gossip": "3.3.3.3:8001"}
                    ]
                }));
            })
            .await;
        let de = mock_country(&server, "1.1.1.1", json!({"status": "success", "countryCode": "DE"})).await;
        mock_country(&server, "2.2.2.2", json!({"status": "success", "countryCode": "ZZ"})).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/leader_geo.json");
        let rpc = SolanaRpcClient::new(server.url("/rpc"), RetryConfig::default()).unwrap();
        let locator = GeoLocator::new(geo_config(&server)).unwrap();
        let mut pipeline = GeoPipeline::with_parts(rpc, locator, path.clone());

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.nodes, 5);
        assert_eq!(summary.entries, 4);
        assert_eq!(
            summary.stats,
            GeoStats {
                resolved: 2,
                unresolved: 1,
                skipped: 2
            }
        );
        assert_eq!(summary.lookups, 2);
        assert_eq!(summary.regions.get(&Region::Frankfurt), Some(&2));
        de.assert_hits_async(1).await;

        let written: BTreeMap<String, String> = read_json(&path).unwrap();
        assert_eq!(written.get("ValA").map(String::as_str), Some("Frankfurt"));
        assert_eq!(written.get("ValC").map(String::as_str), Some("unknown"));
        assert_eq!(written.get("ValD").map(String::as_str), Some("unknown"));
    }

    #[tokio::test]
    async fn test_node_fetch_failure_is_fatal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rpc");
                then.status(502);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leader_geo.json");
        let retry = RetryConfig {
            max_attempts: 2,
            request_timeout_secs: 5,
            base_delay_ms: 1,
        };
        let rpc = SolanaRpcClient::new(server.url("/rpc"), retry).unwrap();
        let locator = GeoLocator::new(geo_config(&server)).unwrap();
        let mut pipeline = GeoPipeline::with_parts(rpc, locator, path.clone());

        assert!(matches!(pipeline.run().await, Err(GeoError::Rpc(_))));
        assert!(!path.exists());
    }
}
