use std::io::Read;

use clap::Args;
use colored::Colorize;
use tracing::warn;

use crate::{model::*, process::Processor};

#[derive(Debug, Args)]
pub struct Command {
    /// Transaction text, read from stdin when omitted.
    pub text: Vec<String>,
    #[arg(short, long)]
    pub json: bool,
}

/// Joins arguments with spaces, falling back to stdin.
pub fn input_text(text: &[String]) -> Result<String> {
    if !text.is_empty() {
        return Ok(text.join(" "));
    }

    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

pub fn execute_command(processor: &Processor, cmd: &Command) -> Result<()> {
    let text = input_text(&cmd.text)?;
    let processed = processor.process(&text);

    if processed.is_empty() {
        warn!("no transactions in input");
    }

    if cmd.json {
        println!("{}", serde_json::to_string(&processed)?);
        return Ok(());
    }

    let label_width = processed
        .entries
        .iter()
        .flat_map(|p| p.entry.lines().iter())
        .map(|l| l.label.to_string().len())
        .max()
        .unwrap_or_default();
    let account_width = processed
        .entries
        .iter()
        .flat_map(|p| p.entry.lines().iter())
        .map(|l| l.account.len())
        .max()
        .unwrap_or_default();

    for posted in processed.entries.iter() {
        println!(
            "{} ({})",
            posted.segment.bold(),
            posted.entry.transaction_type()
        );
        if posted.entry.is_empty() {
            println!("  {}", "no amounts".dimmed());
        }
        for line in posted.entry.lines() {
            println!(
                "  {:label_width$} {:account_width$} {:>12}",
                line.label.to_string(),
                line.account,
                format_amount(&line.amount),
                label_width = label_width,
                account_width = account_width,
            );
        }
    }

    for diagnostic in processed.diagnostics.iter() {
        println!("{}", diagnostic.to_string().red());
    }

    Ok(())
}
