use clap::Args;
use colored::Colorize;

use crate::{model::*, process::Processor};

#[derive(Debug, Args)]
pub struct Command {
    /// Also list the jurisdiction tax rates.
    #[arg(long)]
    pub rates: bool,
}

pub fn execute_command(processor: &Processor, cmd: &Command) -> Result<()> {
    let engine = processor.engine();
    let rules = engine.lexicon().rules().collect::<Vec<_>>();

    let type_width = rules.iter().map(|r| r.type_id.len()).max().unwrap_or_default();
    let main_width = rules
        .iter()
        .map(|r| r.main_account.len())
        .max()
        .unwrap_or_default();

    for rule in rules.iter() {
        let row = format!(
            "{:type_width$} {:6} {:7} {:main_width$} {}",
            rule.type_id,
            rule.polarity,
            if rule.taxable { "taxable" } else { "" },
            rule.main_account,
            rule.counterpart_account.as_deref().unwrap_or("-"),
            type_width = type_width,
            main_width = main_width,
        );
        if engine.is_implemented(&rule.type_id) {
            println!("{}", row);
        } else {
            println!("{} {}", row.yellow(), format!("(no rule '{}')", rule.rule).red());
        }
    }

    let missing = engine.missing_rules();
    if !missing.is_empty() {
        println!(
            "{} of {} types cannot be posted: {}",
            missing.len(),
            rules.len(),
            missing.iter().map(|r| r.type_id.as_str()).join(", ")
        );
    }

    if cmd.rates {
        println!();
        let taxes = engine.taxes();
        for jurisdiction in taxes.jurisdictions().sorted() {
            println!("{:20} {}", jurisdiction, taxes.tax_rate(jurisdiction));
        }
    }

    Ok(())
}
