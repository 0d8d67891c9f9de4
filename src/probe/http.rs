//! HTTP availability, latency and keyword probes.

use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

use super::{with_timeout, ProbeError, HTTP_TIMEOUT};
use crate::report::{Availability, KeywordMatch, KeywordStatus, Latency};
use crate::target::TargetAddr;

/// A fetched HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client used by the availability and keyword probes.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET `url` and read the full body.
    async fn get(&self, url: &Url) -> Result<HttpResponse, ProbeError>;
}

/// `reqwest`-backed fetcher with a fixed user agent.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &Url) -> Result<HttpResponse, ProbeError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(HTTP_TIMEOUT)
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        // Read the full body to measure complete transfer time
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Single GET against the target: availability plus wall-clock latency.
pub async fn check_availability(fetcher: &dyn HttpFetcher, target: &str) -> (Availability, Latency) {
    let addr = match TargetAddr::parse(target) {
        Ok(addr) => addr,
        Err(e) => return (Availability::error(e.to_string()), Latency::failed()),
    };

    let start = Instant::now();
    match with_timeout(HTTP_TIMEOUT, fetcher.get(&addr.url)).await {
        Ok(response) => {
            let elapsed = start.elapsed().as_millis() as u64;
            (
                Availability::from_status_code(response.status),
                Latency::measured(elapsed),
            )
        }
        Err(e) => {
            tracing::debug!("Availability probe failed for {}: {}", target, e);
            (Availability::error(e.to_string()), Latency::failed())
        }
    }
}

/// Fetch the target body and count case-insensitive keyword occurrences.
pub async fn check_keyword(fetcher: &dyn HttpFetcher, target: &str, keyword: &str) -> KeywordMatch {
    let failed = |reason: String| KeywordMatch {
        keyword: keyword.to_string(),
        status: KeywordStatus::Error,
        occurrences: 0,
        error: Some(reason),
    };

    let addr = match TargetAddr::parse(target) {
        Ok(addr) => addr,
        Err(e) => return failed(e.to_string()),
    };

    match with_timeout(HTTP_TIMEOUT, fetcher.get(&addr.url)).await {
        Ok(response) => {
            let occurrences = count_occurrences(&response.body, keyword);
            KeywordMatch {
                keyword: keyword.to_string(),
                status: if occurrences > 0 {
                    KeywordStatus::Found
                } else {
                    KeywordStatus::NotFound
                },
                occurrences,
                error: None,
            }
        }
        Err(e) => {
            tracing::debug!("Keyword probe failed for {}: {}", target, e);
            failed(e.to_string())
        }
    }
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack
        .to_lowercase()
        .matches(&needle.to_lowercase())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{AvailabilityStatus, LatencyBucket};
    use crate::testing::FakeHttp;
    use std::time::Duration;

    #[tokio::test]
    async fn test_http_probe_invalid_url() {
        let fetcher = FakeHttp::ok(200, "");
        let (availability, latency) = check_availability(&fetcher, "http://").await;
        assert_eq!(availability.status, AvailabilityStatus::Error);
        assert_eq!(latency.bucket, LatencyBucket::Critical);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_availability_online_and_offline() {
        let (availability, latency) =
            check_availability(&FakeHttp::ok(204, ""), "https://example.com").await;
        assert_eq!(availability.status, AvailabilityStatus::Online);
        assert_eq!(availability.status_code, Some(204));
        assert_eq!(latency.bucket, LatencyBucket::Good);

        let (availability, _) =
            check_availability(&FakeHttp::ok(503, ""), "https://example.com").await;
        assert_eq!(availability.status, AvailabilityStatus::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_availability_times_out_after_ten_seconds() {
        let fetcher = FakeHttp::ok(200, "").with_delay(Duration::from_secs(60));
        let (availability, latency) = check_availability(&fetcher, "https://example.com").await;
        assert_eq!(availability.status, AvailabilityStatus::Error);
        assert!(availability.error.unwrap().contains("timed out"));
        assert_eq!(latency.value_ms, None);
    }

    #[tokio::test]
    async fn test_keyword_counts_case_insensitively() {
        let fetcher = FakeHttp::ok(200, "Status: OK. all systems ok, ok?");
        let result = check_keyword(&fetcher, "https://example.com", "Ok").await;
        assert_eq!(result.status, KeywordStatus::Found);
        assert_eq!(result.occurrences, 3);
    }

    #[tokio::test]
    async fn test_keyword_absent_is_not_an_error() {
        let fetcher = FakeHttp::ok(200, "nothing to see");
        let result = check_keyword(&fetcher, "https://example.com", "maintenance").await;
        assert_eq!(result.status, KeywordStatus::NotFound);
        assert_eq!(result.occurrences, 0);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_keyword_fetch_failure() {
        let fetcher = FakeHttp::failing("connection reset");
        let result = check_keyword(&fetcher, "https://example.com", "ok").await;
        assert_eq!(result.status, KeywordStatus::Error);
    }
}
