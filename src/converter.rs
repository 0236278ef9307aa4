//! Event loop glue between the converter session and a rate provider.
//!
//! Fetches run as spawned tasks and report back over a channel, so user input
//! keeps flowing while a request is in flight. Results are applied in the
//! order they arrive; the session drops any that are no longer current.

use anyhow::{Result, bail};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::RateProvider;
use crate::core::config::DefaultsConfig;
use crate::core::rates::RateTable;
use crate::session::{ConverterSession, FetchOutcome, FetchRequest};

/// A user action on the converter form.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Amount(String),
    Source(String),
    Target(String),
    Convert,
    Currencies,
    Show,
    Help,
    Quit,
}

impl FromStr for Input {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };

        let input = match (cmd.to_lowercase().as_str(), arg) {
            // Blank amount is allowed; it clears the field.
            ("amount" | "a", arg) => Input::Amount(arg.to_string()),
            ("from" | "f", code) if !code.is_empty() => Input::Source(code.to_string()),
            ("to" | "t", code) if !code.is_empty() => Input::Target(code.to_string()),
            ("from" | "f" | "to" | "t", _) => bail!("Missing currency code for `{cmd}`"),
            ("convert" | "c", _) => Input::Convert,
            ("currencies" | "list" | "l", _) => Input::Currencies,
            ("show" | "s", _) => Input::Show,
            ("help" | "h" | "?", _) => Input::Help,
            ("quit" | "exit" | "q", _) => Input::Quit,
            _ => bail!("Unknown command: {line}"),
        };
        Ok(input)
    }
}

/// What the front end should render after an input.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// State changed; nothing in particular to show.
    Updated,
    /// A fetch was started for this currency.
    Fetching(String),
    Converted(String),
    /// Convert was requested while rates are loading.
    Busy,
    Currencies(Vec<String>),
    Show,
    Help,
    Quit,
}

type Completion = (u64, Result<RateTable>);

pub struct Converter {
    provider: Arc<dyn RateProvider>,
    session: ConverterSession,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl Converter {
    pub fn new(provider: Arc<dyn RateProvider>, defaults: &DefaultsConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Converter {
            provider,
            session: ConverterSession::new(defaults),
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn session(&self) -> &ConverterSession {
        &self.session
    }

    /// Number of spawned fetches whose results have not been received yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Issues the initial fetch for the configured source currency.
    pub fn start(&mut self) -> FetchRequest {
        info!(source = %self.session.source(), "Converter starting");
        let request = self.session.begin_fetch();
        self.spawn_fetch(request.clone());
        request
    }

    pub fn dispatch(&mut self, input: Input) -> Reply {
        debug!(?input, "Dispatching input");
        match input {
            Input::Amount(raw) => {
                self.session.set_amount_input(&raw);
                Reply::Updated
            }
            Input::Target(code) => {
                self.session.set_target(&code);
                Reply::Updated
            }
            Input::Source(code) => match self.session.set_source(&code) {
                Some(request) => {
                    let currency = request.currency.clone();
                    self.spawn_fetch(request);
                    Reply::Fetching(currency)
                }
                None => Reply::Updated,
            },
            Input::Convert => match self.session.convert() {
                Some(result) => Reply::Converted(result.to_string()),
                None => Reply::Busy,
            },
            Input::Currencies => Reply::Currencies(self.session.currencies().to_vec()),
            Input::Show => Reply::Show,
            Input::Help => Reply::Help,
            Input::Quit => Reply::Quit,
        }
    }

    fn spawn_fetch(&mut self, request: FetchRequest) {
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = provider.fetch_rates(&request.currency).await;
            // The receiver lives as long as the converter; a send error only
            // means the converter was dropped.
            let _ = tx.send((request.token, result));
        });
    }

    /// Waits for the next fetch to finish and applies it. Returns `None` when
    /// nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<FetchOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let (token, result) = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(self.session.complete_fetch(token, result))
    }

    /// Applies completions until the session is no longer loading.
    pub async fn settle(&mut self) -> Option<FetchOutcome> {
        let mut last = None;
        while self.session.is_loading() {
            match self.next_completion().await {
                Some(outcome) => last = Some(outcome),
                None => break,
            }
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers from a fixed set of tables, optionally after a per-currency delay.
    struct FakeProvider {
        calls: Mutex<Vec<String>>,
        delays: Vec<(&'static str, u64)>,
    }

    impl FakeProvider {
        fn new() -> Self {
            FakeProvider {
                calls: Mutex::new(Vec::new()),
                delays: Vec::new(),
            }
        }

        fn with_delay(mut self, currency: &'static str, millis: u64) -> Self {
            self.delays.push((currency, millis));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RateProvider for FakeProvider {
        async fn fetch_rates(&self, source: &str) -> Result<RateTable> {
            self.calls.lock().unwrap().push(source.to_string());
            if let Some((_, millis)) = self.delays.iter().find(|(c, _)| *c == source) {
                tokio::time::sleep(Duration::from_millis(*millis)).await;
            }
            match source {
                "INR" => Ok(RateTable::from_pairs("INR", [("USD", 0.012), ("EUR", 0.011)])),
                "USD" => Ok(RateTable::from_pairs("USD", [("INR", 83.1), ("EUR", 0.92)])),
                "EUR" => Ok(RateTable::from_pairs("EUR", [("INR", 90.2), ("USD", 1.08)])),
                _ => Err(anyhow!("Network response was not ok")),
            }
        }
    }

    fn converter(provider: Arc<FakeProvider>) -> Converter {
        Converter::new(provider, &DefaultsConfig::default())
    }

    #[test]
    fn test_parse_inputs() {
        assert_eq!("amount 10".parse::<Input>().unwrap(), Input::Amount("10".into()));
        assert_eq!("amount".parse::<Input>().unwrap(), Input::Amount(String::new()));
        assert_eq!(" from usd ".parse::<Input>().unwrap(), Input::Source("usd".into()));
        assert_eq!("to EUR".parse::<Input>().unwrap(), Input::Target("EUR".into()));
        assert_eq!("c".parse::<Input>().unwrap(), Input::Convert);
        assert_eq!("list".parse::<Input>().unwrap(), Input::Currencies);
        assert_eq!("QUIT".parse::<Input>().unwrap(), Input::Quit);
    }

    #[test]
    fn test_parse_invalid_inputs() {
        assert!("from".parse::<Input>().is_err());
        assert!("to   ".parse::<Input>().is_err());
        let err = "launch rockets".parse::<Input>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: launch rockets");
    }

    #[tokio::test]
    async fn test_start_fetches_source_once() {
        let provider = Arc::new(FakeProvider::new());
        let mut converter = converter(Arc::clone(&provider));

        converter.start();
        assert!(converter.session().is_loading());
        assert_eq!(converter.settle().await, Some(FetchOutcome::Applied));

        assert_eq!(provider.calls(), vec!["INR"]);
        assert_eq!(converter.session().currencies(), &["USD", "EUR"]);
    }

    #[tokio::test]
    async fn test_convert_flow() {
        let provider = Arc::new(FakeProvider::new());
        let mut converter = converter(Arc::clone(&provider));
        converter.start();
        converter.settle().await;

        converter.dispatch(Input::Amount("10".into()));
        converter.dispatch(Input::Target("USD".into()));
        assert_eq!(
            converter.dispatch(Input::Convert),
            Reply::Converted("0.12".to_string())
        );
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_input_accepted_while_fetch_outstanding() {
        let provider = Arc::new(FakeProvider::new().with_delay("USD", 50));
        let mut converter = converter(Arc::clone(&provider));
        converter.start();
        converter.settle().await;

        assert_eq!(
            converter.dispatch(Input::Source("USD".into())),
            Reply::Fetching("USD".to_string())
        );
        assert_eq!(converter.dispatch(Input::Amount("2".into())), Reply::Updated);
        assert_eq!(converter.dispatch(Input::Target("INR".into())), Reply::Updated);
        assert_eq!(converter.dispatch(Input::Convert), Reply::Busy);

        converter.settle().await;
        assert_eq!(
            converter.dispatch(Input::Convert),
            Reply::Converted("166.20".to_string())
        );
        assert_eq!(provider.calls(), vec!["INR", "USD"]);
    }

    #[tokio::test]
    async fn test_last_issued_fetch_wins() {
        let provider = Arc::new(FakeProvider::new().with_delay("USD", 100));
        let mut converter = converter(Arc::clone(&provider));
        converter.start();
        converter.settle().await;

        converter.dispatch(Input::Source("USD".into()));
        converter.dispatch(Input::Source("EUR".into()));
        assert_eq!(converter.in_flight(), 2);

        // EUR answers first, the slower USD answer arrives afterwards
        assert_eq!(converter.next_completion().await, Some(FetchOutcome::Applied));
        assert_eq!(converter.next_completion().await, Some(FetchOutcome::Stale));
        assert_eq!(converter.next_completion().await, None);

        assert_eq!(converter.session().rates().base(), Some("EUR"));
        assert_eq!(converter.session().source(), "EUR");
    }

    #[tokio::test]
    async fn test_reselecting_source_does_not_fetch() {
        let provider = Arc::new(FakeProvider::new());
        let mut converter = converter(Arc::clone(&provider));
        converter.start();
        converter.settle().await;

        assert_eq!(converter.dispatch(Input::Source("inr".into())), Reply::Updated);
        assert_eq!(converter.in_flight(), 0);
        assert!(!converter.session().is_loading());
        assert_eq!(provider.calls(), vec!["INR"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_rates_usable() {
        let provider = Arc::new(FakeProvider::new());
        let mut converter = converter(Arc::clone(&provider));
        converter.start();
        converter.settle().await;

        converter.dispatch(Input::Source("XXX".into()));
        let outcome = converter.settle().await;
        assert_eq!(
            outcome,
            Some(FetchOutcome::Failed("Network response was not ok".to_string()))
        );
        assert_eq!(
            converter.session().error(),
            Some("Network response was not ok")
        );

        converter.dispatch(Input::Amount("100".into()));
        assert_eq!(
            converter.dispatch(Input::Convert),
            Reply::Converted("1.20".to_string())
        );
    }
}
