//! Converter view-model.
//!
//! `ConverterSession` owns every piece of form state. Its setters are the only
//! way to change that state, and none of them touch the network: a source
//! change hands back a [`FetchRequest`] that the caller executes and later
//! reports through [`ConverterSession::complete_fetch`].

use anyhow::Result;
use tracing::debug;

use crate::core::config::DefaultsConfig;
use crate::core::{Amount, RateTable, convert};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Error(String),
}

/// A fetch the caller must perform. `token` identifies it when the result
/// comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: u64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied,
    Failed(String),
    /// A newer fetch was issued after this one; its result was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct ConverterSession {
    amount: Amount,
    source: String,
    target: String,
    rates: RateTable,
    converted: String,
    state: RequestState,
    latest_token: u64,
}

impl Default for ConverterSession {
    fn default() -> Self {
        Self::new(&DefaultsConfig::default())
    }
}

impl ConverterSession {
    pub fn new(defaults: &DefaultsConfig) -> Self {
        ConverterSession {
            amount: Amount::from(defaults.amount),
            source: normalize_code(&defaults.source),
            target: normalize_code(&defaults.target),
            rates: RateTable::default(),
            converted: String::new(),
            state: RequestState::Idle,
            latest_token: 0,
        }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn currencies(&self) -> &[String] {
        self.rates.currencies()
    }

    /// Last computed result. Empty until the first conversion.
    pub fn converted(&self) -> &str {
        &self.converted
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            RequestState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == RequestState::Loading
    }

    pub fn can_convert(&self) -> bool {
        !self.is_loading()
    }

    pub fn set_amount_input(&mut self, input: &str) {
        self.amount = Amount::parse(input);
    }

    pub fn set_target(&mut self, code: &str) {
        self.target = normalize_code(code);
    }

    /// Selects a new source currency and starts a fetch for it. Selecting the
    /// current source again is a no-op and issues no fetch.
    pub fn set_source(&mut self, code: &str) -> Option<FetchRequest> {
        let code = normalize_code(code);
        if code == self.source {
            debug!(source = %code, "Source unchanged, no fetch");
            return None;
        }
        self.source = code;
        Some(self.begin_fetch())
    }

    /// Marks the session as loading and issues a fetch for the current source.
    pub fn begin_fetch(&mut self) -> FetchRequest {
        self.latest_token += 1;
        self.state = RequestState::Loading;
        debug!(token = self.latest_token, source = %self.source, "Fetch issued");
        FetchRequest {
            token: self.latest_token,
            currency: self.source.clone(),
        }
    }

    /// Applies the result of the fetch identified by `token`. Only the most
    /// recently issued fetch may change the session.
    pub fn complete_fetch(&mut self, token: u64, result: Result<RateTable>) -> FetchOutcome {
        if token != self.latest_token {
            debug!(token, latest = self.latest_token, "Discarding stale fetch result");
            return FetchOutcome::Stale;
        }

        match result {
            Ok(rates) => {
                debug!(token, count = rates.len(), "Rate table replaced");
                self.rates = rates;
                self.state = RequestState::Idle;
                FetchOutcome::Applied
            }
            Err(e) => {
                let message = e.to_string();
                debug!(token, error = %message, "Fetch failed, keeping previous rates");
                self.state = RequestState::Error(message.clone());
                FetchOutcome::Failed(message)
            }
        }
    }

    /// Computes the converted amount from the current state. Returns `None`
    /// without changing anything while a fetch is outstanding.
    pub fn convert(&mut self) -> Option<&str> {
        if !self.can_convert() {
            return None;
        }
        self.converted = convert(self.amount, &self.target, &self.rates);
        Some(self.converted.as_str())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
