use super::ui;
use crate::converter::{Converter, Input, Reply};
use crate::core::RateProvider;
use crate::core::config::DefaultsConfig;
use anyhow::{Result, bail};
use std::sync::Arc;

/// Fetches rates for `from` once and converts `amount` into `to`.
///
/// Returns the converted value; a failed fetch is returned as an error since
/// there are no earlier rates to fall back on.
pub async fn run(
    provider: Arc<dyn RateProvider>,
    defaults: &DefaultsConfig,
    amount: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<String> {
    let mut defaults = defaults.clone();
    if let Some(from) = from {
        defaults.source = from.to_string();
    }
    if let Some(to) = to {
        defaults.target = to.to_string();
    }

    let mut converter = Converter::new(provider, &defaults);
    converter.dispatch(Input::Amount(amount.to_string()));

    let spinner = ui::new_spinner(format!("Fetching {} rates...", converter.session().source()));
    converter.start();
    converter.settle().await;
    spinner.finish_and_clear();

    if let Some(error) = converter.session().error() {
        bail!("{error}");
    }

    let converted = match converter.dispatch(Input::Convert) {
        Reply::Converted(value) => value,
        other => bail!("Unexpected reply to convert: {other:?}"),
    };

    let session = converter.session();
    println!(
        "{} {} = {} {}",
        session.amount(),
        session.source(),
        ui::style_text(&converted, ui::StyleType::Result),
        session.target()
    );
    Ok(converted)
}
