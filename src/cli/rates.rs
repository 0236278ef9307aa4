use super::ui;
use crate::core::{RateProvider, RateTable};
use anyhow::Result;
use comfy_table::{Cell, Table};
use tracing::debug;

/// Fetches and prints the rate table for `source`, in provider order.
pub async fn run(provider: &dyn RateProvider, source: &str) -> Result<()> {
    let source = source.trim().to_uppercase();
    let spinner = ui::new_spinner(format!("Fetching {source} rates..."));
    let result = provider.fetch_rates(&source).await;
    spinner.finish_and_clear();

    let rates = result?;
    debug!(count = rates.len(), "Displaying rates");

    println!(
        "\nRates for {}",
        ui::style_text(rates.base().unwrap_or(&source), ui::StyleType::Title)
    );
    println!("{}", rates_table(&rates));
    if let Some(updated) = rates.last_updated() {
        println!(
            "{}",
            ui::style_text(
                &format!("Last updated: {}", updated.format("%Y-%m-%d %H:%M UTC")),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}

fn rates_table(rates: &RateTable) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);
    for (code, rate) in rates.iter() {
        table.add_row(vec![Cell::new(code), ui::rate_cell(rate)]);
    }
    table
}
