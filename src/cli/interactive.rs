//! Line oriented front end for the converter form.

use super::ui;
use crate::converter::{Converter, Input, Reply};
use crate::session::{ConverterSession, FetchOutcome, RequestState};
use anyhow::Result;
use indicatif::ProgressBar;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
Commands:
  amount <value>   set the amount (blank or non-numeric clears it)
  from <code>      set the source currency and fetch its rates
  to <code>        set the target currency
  convert          convert the amount with the current rates
  currencies       list currencies from the last fetch
  show             show the form
  help             show this help
  quit             exit";

/// Runs the converter against stdin and stdout until `quit` or end of input.
pub async fn run(converter: Converter) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_with_io(converter, stdin, &mut stdout).await
}

pub async fn run_with_io<R, W>(mut converter: Converter, reader: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "{}", ui::style_text("Currency Converter", ui::StyleType::Title))?;
    writeln!(out, "{}", ui::style_text("Type `help` for commands.", ui::StyleType::Subtle))?;

    let mut lines = reader.lines();
    let request = converter.start();
    let mut spinner = Some(loading_spinner(&request.currency));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("End of input");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let input = match line.parse::<Input>() {
                    Ok(input) => input,
                    Err(e) => {
                        writeln!(out, "{}", ui::style_text(&e.to_string(), ui::StyleType::Error))?;
                        continue;
                    }
                };
                match converter.dispatch(input) {
                    Reply::Quit => break,
                    Reply::Fetching(currency) => {
                        if let Some(pb) = spinner.take() {
                            pb.finish_and_clear();
                        }
                        spinner = Some(loading_spinner(&currency));
                    }
                    reply => render_reply(out, &reply, converter.session())?,
                }
            }
            Some(outcome) = converter.next_completion(), if converter.in_flight() > 0 => {
                if !converter.session().is_loading() {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                }
                render_outcome(out, &outcome, converter.session())?;
            }
        }
    }

    if let Some(pb) = spinner.take() {
        pb.finish_and_clear();
    }
    Ok(())
}

fn loading_spinner(currency: &str) -> ProgressBar {
    ui::new_spinner(format!("Converting... fetching {currency} rates"))
}

fn render_outcome<W: Write>(
    out: &mut W,
    outcome: &FetchOutcome,
    session: &ConverterSession,
) -> Result<()> {
    match outcome {
        FetchOutcome::Applied => writeln!(
            out,
            "{}",
            ui::style_text(
                &format!(
                    "Loaded {} currencies for {}",
                    session.currencies().len(),
                    session.source()
                ),
                ui::StyleType::Subtle
            )
        )?,
        FetchOutcome::Failed(message) => {
            writeln!(out, "{}", ui::style_text(message, ui::StyleType::Error))?
        }
        FetchOutcome::Stale => {}
    }
    Ok(())
}

fn render_reply<W: Write>(out: &mut W, reply: &Reply, session: &ConverterSession) -> Result<()> {
    match reply {
        Reply::Updated | Reply::Fetching(_) | Reply::Quit => {}
        Reply::Converted(value) => writeln!(
            out,
            "{} {}",
            ui::style_text("Converted Amount:", ui::StyleType::Label),
            ui::style_text(value, ui::StyleType::Result)
        )?,
        Reply::Busy => writeln!(
            out,
            "{}",
            ui::style_text("Converting... rates are still loading", ui::StyleType::Subtle)
        )?,
        Reply::Currencies(codes) if codes.is_empty() => {
            writeln!(out, "{}", ui::style_text("No currencies loaded", ui::StyleType::Subtle))?
        }
        Reply::Currencies(codes) => writeln!(out, "{}", codes.join(" "))?,
        Reply::Show => render_form(out, session)?,
        Reply::Help => writeln!(out, "{HELP}")?,
    }
    Ok(())
}

fn render_form<W: Write>(out: &mut W, session: &ConverterSession) -> Result<()> {
    let label = |text: &str| ui::style_text(text, ui::StyleType::Label);
    writeln!(out, "{} {}", label("Enter Amount:"), session.amount())?;
    writeln!(out, "{} {}", label("Convert From:"), session.source())?;
    writeln!(out, "{} {}", label("Convert To:"), session.target())?;
    writeln!(out, "{} {}", label("Converted Amount:"), session.converted())?;
    match session.state() {
        RequestState::Idle => {}
        RequestState::Loading => writeln!(
            out,
            "{}",
            ui::style_text("Converting...", ui::StyleType::Subtle)
        )?,
        RequestState::Error(message) => {
            writeln!(out, "{}", ui::style_text(message, ui::StyleType::Error))?
        }
    }
    Ok(())
}
