pub mod cli;
pub mod converter;
pub mod core;
pub mod providers;
pub mod session;

use crate::converter::Converter;
use crate::core::RateProvider;
use crate::core::config::AppConfig;
use crate::providers::ExchangeRateApiProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Convert {
        amount: String,
        from: Option<String>,
        to: Option<String>,
    },
    Rates {
        from: Option<String>,
    },
    Interactive,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Currency converter starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        base_url = config.base_url(),
        defaults = ?config.defaults,
        "Loaded config"
    );

    let api_key = config.resolve_api_key()?;
    let provider: Arc<dyn RateProvider> =
        Arc::new(ExchangeRateApiProvider::new(config.base_url(), &api_key)?);

    match command {
        AppCommand::Convert { amount, from, to } => {
            cli::convert::run(
                provider,
                &config.defaults,
                &amount,
                from.as_deref(),
                to.as_deref(),
            )
            .await?;
            Ok(())
        }
        AppCommand::Rates { from } => {
            let source = from.as_deref().unwrap_or(&config.defaults.source);
            cli::rates::run(provider.as_ref(), source).await
        }
        AppCommand::Interactive => {
            cli::interactive::run(Converter::new(provider, &config.defaults)).await
        }
    }
}
