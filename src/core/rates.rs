//! Exchange rate abstractions

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Rates for every known currency, relative to a single base currency.
///
/// Codes keep the order in which the provider listed them; that order drives
/// the currency selection lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    base: Option<String>,
    codes: Vec<String>,
    rates: HashMap<String, f64>,
    last_updated: Option<DateTime<Utc>>,
}

impl RateTable {
    pub fn new(base: impl Into<String>) -> Self {
        RateTable {
            base: Some(base.into()),
            ..Default::default()
        }
    }

    /// Builds a table from `(code, rate)` pairs, keeping their order. A
    /// repeated code keeps its first position and its last rate.
    pub fn from_pairs<I, S>(base: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut table = RateTable::new(base);
        for (code, rate) in pairs {
            table.insert(code.into(), rate);
        }
        table
    }

    pub fn insert(&mut self, code: String, rate: f64) {
        if self.rates.insert(code.clone(), rate).is_none() {
            self.codes.push(code);
        }
    }

    pub fn with_last_updated(mut self, last_updated: Option<DateTime<Utc>>) -> Self {
        self.last_updated = last_updated;
        self
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Currency codes in provider order.
    pub fn currencies(&self) -> &[String] {
        &self.codes
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.codes
            .iter()
            .filter_map(|code| self.rates.get(code).map(|rate| (code.as_str(), *rate)))
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches rates of all supported currencies relative to `source`.
    async fn fetch_rates(&self, source: &str) -> Result<RateTable>;
}
