use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use tracing::{debug, instrument};

use crate::core::rates::{RateProvider, RateTable};

/// Message surfaced for any non-success HTTP status.
pub const NETWORK_ERROR: &str = "Network response was not ok";

// ExchangeRateApiProvider implementation for RateProvider
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent("fxconv/1.0").build()?;
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn latest_url(&self, source: &str) -> String {
        format!("{}/v6/{}/latest/{}", self.base_url, self.api_key, source)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    base_code: Option<String>,
    time_last_update_utc: Option<String>,
    #[serde(deserialize_with = "ordered_rates")]
    conversion_rates: Vec<(String, f64)>,
}

/// Reads the `conversion_rates` object as pairs so the provider's ordering
/// survives deserialization.
fn ordered_rates<'de, D>(deserializer: D) -> Result<Vec<(String, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedRates;

    impl<'de> Visitor<'de> for OrderedRates {
        type Value = Vec<(String, f64)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of currency codes to numeric rates")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((code, rate)) = map.next_entry::<String, f64>()? {
                pairs.push((code, rate));
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(OrderedRates)
}

fn parse_update_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc2822(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(source = %source))]
    async fn fetch_rates(&self, source: &str) -> Result<RateTable> {
        let url = self.latest_url(source);
        // Keep the key out of the logs.
        debug!(
            "Requesting rates from {}/v6/***/latest/{}",
            self.base_url, source
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency: {}", e.without_url(), source))?;

        debug!(status = %response.status(), "Received rate response");
        if !response.status().is_success() {
            return Err(anyhow!(NETWORK_ERROR));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse rate response for {}: {}", source, e))?;

        let base = data.base_code.unwrap_or_else(|| source.to_string());
        let last_updated = parse_update_time(data.time_last_update_utc.as_deref());
        let table = RateTable::from_pairs(base, data.conversion_rates).with_last_updated(last_updated);
        debug!(count = table.len(), "Parsed rate table");
        Ok(table)
    }
}
