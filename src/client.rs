// src/client.rs

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;
use std::{collections::BTreeMap, fmt, thread::sleep, time::Duration};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::data::{MetaInfo, StatList, StatsData};
use crate::remap::RemapLabels;
use crate::response;

/// Upper bound on a single retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// The three e-Stat JSON endpoints this client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    StatsList,
    MetaInfo,
    StatsData,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::StatsList => "getStatsList",
            Endpoint::MetaInfo => "getMetaInfo",
            Endpoint::StatsData => "getStatsData",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Query parameters passed through to the API as-is.
///
/// `appId` and `lang` are owned by [`ClientConfig`] and overwritten on send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// `yyyy`, `yyyymm` or `yyyymm-yyyymm`.
    pub fn survey_years(self, years: impl Into<String>) -> Self {
        self.set("surveyYears", years)
    }

    pub fn stats_code(self, code: impl Into<String>) -> Self {
        self.set("statsCode", code)
    }

    pub fn search_word(self, word: impl Into<String>) -> Self {
        self.set("searchWord", word)
    }

    pub fn stats_data_id(self, id: impl Into<String>) -> Self {
        self.set("statsDataId", id)
    }

    /// 1-based row to start from, typically a previous response's `NEXT_KEY`.
    pub fn start_position(self, pos: u64) -> Self {
        self.set("startPosition", pos.to_string())
    }

    pub fn limit(self, limit: u64) -> Self {
        self.set("limit", limit.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Blocking e-Stat client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Labels for `@unit`/`$` matching the configured response language.
    pub fn remap_labels(&self) -> RemapLabels {
        RemapLabels::for_lang(self.config.lang)
    }

    fn url_for(&self, endpoint: Endpoint) -> Result<Url> {
        self.config
            .base_url
            .join(endpoint.path())
            .with_context(|| format!("joining {} onto {}", endpoint, self.config.base_url))
    }

    fn get_json_core(&self, url: &Url, query: &BTreeMap<String, String>) -> Result<Value> {
        // reqwest errors embed the full URL, app id included; strip it and
        // report the bare endpoint URL instead
        self.http
            .get(url.clone())
            .query(query)
            .send()
            .map_err(|e| e.without_url())
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .map_err(|e| e.without_url())
            .with_context(|| format!("Non-success status {}", url))?
            .json::<Value>()
            .map_err(|e| e.without_url())
            .with_context(|| format!("Decoding JSON from {}", url))
    }

    fn get_json_with_retry(&self, url: &Url, query: &BTreeMap<String, String>) -> Result<Value> {
        let mut attempts = 0;
        loop {
            match self.get_json_core(url, query) {
                Ok(v) => return Ok(v),
                Err(e) if attempts < self.config.max_retries && is_retryable(&e) => {
                    attempts += 1;
                    let backoff = backoff_delay(self.config.initial_backoff, attempts);
                    warn!(%url, attempt = attempts, delay_ms = backoff.as_millis() as u64, error = %e, "Retrying");
                    sleep(backoff);
                }
                Err(e) => {
                    error!(%url, attempts, error = %e, "Giving up");
                    return Err(e);
                }
            }
        }
    }

    /// GET `endpoint` with `params` (plus `appId`/`lang`) and return the parsed body.
    ///
    /// Fails on transport errors, non-2xx statuses and API `RESULT.STATUS >= 100`.
    #[instrument(level = "info", skip(self, params))]
    pub fn get_json(&self, endpoint: Endpoint, params: &Params) -> Result<Value> {
        let url = self.url_for(endpoint)?;
        debug!(params = ?params, "request");

        let mut query = params.0.clone();
        query.insert("appId".to_string(), self.config.app_id.clone());
        query.insert("lang".to_string(), self.config.lang.as_param().to_string());

        let body = self.get_json_with_retry(&url, &query)?;

        match response::result_header(&body) {
            Some(result) if result.is_error() => {
                bail!(
                    "{} returned status {}: {}",
                    endpoint,
                    result.status,
                    result.error_msg
                );
            }
            Some(result) if result.status != 0 => {
                info!(status = result.status, msg = %result.error_msg, "non-zero status");
            }
            Some(_) => {}
            None => warn!("response has no RESULT header"),
        }
        Ok(body)
    }

    /// `getStatsList`: catalogue of statistical tables.
    pub fn get_stat_list_json(&self, params: &Params) -> Result<Value> {
        self.get_json(Endpoint::StatsList, params)
    }

    pub fn get_stat_list(&self, params: &Params) -> Result<StatList> {
        Ok(StatList::new(self.get_stat_list_json(params)?))
    }

    /// `getMetaInfo`: table info and class definitions for one `statsDataId`.
    pub fn get_meta_info_json(&self, params: &Params) -> Result<Value> {
        self.get_json(Endpoint::MetaInfo, params)
    }

    pub fn get_meta_info(&self, params: &Params) -> Result<MetaInfo> {
        Ok(MetaInfo::new(self.get_meta_info_json(params)?))
    }

    /// `getStatsData`: observations plus their class definitions.
    pub fn get_stats_data_json(&self, params: &Params) -> Result<Value> {
        self.get_json(Endpoint::StatsData, params)
    }

    /// Requires `statsDataId` (or `dataSetId`); fails before any request otherwise.
    pub fn get_stats_data(&self, params: &Params) -> Result<StatsData> {
        let id = match params.get("statsDataId").or_else(|| params.get("dataSetId")) {
            Some(id) => id.to_string(),
            None => bail!("getStatsData needs statsDataId or dataSetId"),
        };
        Ok(StatsData::new(id, self.get_stats_data_json(params)?))
    }
}

/// Delay before retry number `attempt` (1-based): doubling from `initial`, capped at [`MAX_BACKOFF`].
fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    initial.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Connection failures and 5xx are worth another try; 4xx will fail the same way again.
fn is_retryable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .map_or(true, |e| e.status().map_or(true, |s| s.is_server_error()))
}

// Transport is exercised against a mock server in tests/client.rs.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builders() {
        let p = Params::new()
            .survey_years("2020")
            .stats_data_id("0003410379")
            .start_position(100001)
            .limit(10);
        assert_eq!(p.get("surveyYears"), Some("2020"));
        assert_eq!(p.get("statsDataId"), Some("0003410379"));
        assert_eq!(p.get("startPosition"), Some("100001"));
        assert_eq!(p.get("limit"), Some("10"));

        // ordered by key
        let keys: Vec<&str> = p.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["limit", "startPosition", "statsDataId", "surveyYears"]);
    }

    #[test]
    fn test_params_from_iter() {
        let p: Params = [("cdArea", "13000"), ("cdCat01", "001")].into_iter().collect();
        assert_eq!(p.get("cdArea"), Some("13000"));
    }

    #[test]
    fn test_endpoint_urls() -> Result<()> {
        let client = Client::new(ClientConfig::new("app")?)?;
        assert_eq!(
            client.url_for(Endpoint::StatsData)?.as_str(),
            "https://api.e-stat.go.jp/rest/3.0/app/json/getStatsData"
        );
        Ok(())
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 8), MAX_BACKOFF);
        // far past the u32 range of the doubling factor
        assert_eq!(backoff_delay(base, 40), MAX_BACKOFF);
        assert_eq!(backoff_delay(base, u32::MAX), MAX_BACKOFF);
        assert_eq!(backoff_delay(Duration::ZERO, 40), Duration::ZERO);
    }

    #[test]
    fn test_stats_data_without_id_fails_early() -> Result<()> {
        // unroutable base URL: reaching the network would fail differently
        let config = ClientConfig::new("app")?
            .with_base_url("http://127.0.0.1:9/")?
            .with_retries(0, Duration::from_millis(1));
        let client = Client::new(config)?;

        let err = client
            .get_stats_data(&Params::new().survey_years("2020"))
            .unwrap_err();
        assert!(err.to_string().contains("statsDataId"));
        Ok(())
    }
}
