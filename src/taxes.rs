use std::{collections::HashMap, fs::File, path::Path, str::FromStr};

use anyhow::Context;
use bigdecimal::{BigDecimal, One, Zero};
use thiserror::Error;
use tracing::debug;

use crate::model::round_cents;

const STANDARD: &str = include_str!("../data/taxes.json");

#[derive(Debug, Error)]
pub enum TaxError {
    #[error("Unparseable rate '{rate}' for {jurisdiction}")]
    UnparseableRate { jurisdiction: String, rate: String },
    #[error("Rate {rate} for {jurisdiction} is outside [0, 1)")]
    OutOfRange {
        jurisdiction: String,
        rate: BigDecimal,
    },
    #[error("Duplicate jurisdiction: {0}")]
    DuplicateJurisdiction(String),
}

/// Sales tax rate by jurisdiction. Jurisdictions are matched lowercase and
/// anything missing is untaxed.
#[derive(Debug, Clone, Default)]
pub struct TaxTable {
    rates: HashMap<String, BigDecimal>,
}

impl TaxTable {
    /// Rates are given as strings so they stay exact.
    pub fn new(rates: HashMap<String, String>) -> Result<Self, TaxError> {
        let mut parsed = HashMap::new();
        for (jurisdiction, rate) in rates.into_iter() {
            let value =
                BigDecimal::from_str(rate.trim()).map_err(|_| TaxError::UnparseableRate {
                    jurisdiction: jurisdiction.clone(),
                    rate: rate.clone(),
                })?;
            if value < BigDecimal::zero() || value >= BigDecimal::one() {
                return Err(TaxError::OutOfRange {
                    jurisdiction,
                    rate: value,
                });
            }
            let key = jurisdiction.to_lowercase();
            if parsed.insert(key.clone(), value).is_some() {
                return Err(TaxError::DuplicateJurisdiction(key));
            }
        }

        Ok(Self { rates: parsed })
    }

    pub fn standard() -> anyhow::Result<Self> {
        let rates: HashMap<String, String> = serde_json::from_str(STANDARD)?;
        Ok(Self::new(rates)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
        let rates: HashMap<String, String> =
            serde_json::from_reader(file).with_context(|| format!("parsing {:?}", path))?;
        Ok(Self::new(rates).with_context(|| format!("validating {:?}", path))?)
    }

    pub fn tax_rate(&self, jurisdiction: &str) -> BigDecimal {
        self.rates
            .get(&jurisdiction.to_lowercase())
            .cloned()
            .unwrap_or_else(BigDecimal::zero)
    }

    /// Rounded to cents, half to even.
    pub fn tax_amount(&self, amount: &BigDecimal, jurisdiction: &str) -> BigDecimal {
        let rate = self.tax_rate(jurisdiction);
        let tax = round_cents(&(amount * &rate));

        debug!("tax {} @ {} ({}) = {}", amount, rate, jurisdiction, tax);

        tax
    }

    pub fn jurisdictions(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(|k| k.as_str())
    }
}
