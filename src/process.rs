use std::sync::Arc;

use serde::{ser::SerializeStruct, Serialize};
use tracing::{debug, info, span, Level};

use crate::{
    extract::Extractor,
    lexicon::Lexicon,
    model::{ExtractedEntities, JournalEntry},
    nlp::{Pipeline, RulePipeline},
    posting::{Engine, PostingError},
    taxes::TaxTable,
};

const SEPARATORS: [char; 4] = [';', '；', '。', '．'];

/// Splits on clause separators, leaving decimal points alone. Segments are
/// trimmed and empty ones dropped.
pub fn split_segments(input: &str) -> Vec<&str> {
    let chars = input.char_indices().collect::<Vec<_>>();
    let is_digit_at = |i: usize| chars.get(i).map(|(_, c)| c.is_ascii_digit()).unwrap_or(false);

    let mut segments = Vec::new();
    let mut start = 0;
    for (i, (offset, c)) in chars.iter().enumerate() {
        let separates = SEPARATORS.contains(c)
            || (*c == '.' && !(i > 0 && is_digit_at(i - 1) && is_digit_at(i + 1)));
        if separates {
            segments.push(&input[start..*offset]);
            start = offset + c.len_utf8();
        }
    }
    segments.push(&input[start..]);

    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub segment: String,
    pub entities: ExtractedEntities,
    pub entry: JournalEntry,
}

impl Serialize for Posted {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Posted", 5)?;
        state.serialize_field("segment", &self.segment)?;
        state.serialize_field("entities", &self.entities)?;
        state.serialize_field("transaction_type", self.entry.transaction_type())?;
        state.serialize_field("entry", &self.entry)?;
        state.serialize_field("balanced", &self.entry.is_balanced())?;
        state.end()
    }
}

/// A segment that produced no entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub segment: String,
    pub error: PostingError,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unable to process transaction: {}", self.segment)
    }
}

impl Serialize for Diagnostic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Diagnostic", 3)?;
        state.serialize_field("segment", &self.segment)?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("error", &self.error.to_string())?;
        state.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Processed {
    pub entries: Vec<Posted>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Processed {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.diagnostics.is_empty()
    }
}

pub struct Processor {
    extractor: Extractor,
    engine: Engine,
}

impl Processor {
    pub fn new(lexicon: Arc<Lexicon>, taxes: Arc<TaxTable>, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            extractor: Extractor::new(lexicon.clone(), pipeline),
            engine: Engine::new(lexicon, taxes),
        }
    }

    pub fn standard() -> anyhow::Result<Self> {
        Ok(Self::new(
            Arc::new(Lexicon::standard()?),
            Arc::new(TaxTable::standard()?),
            Arc::new(RulePipeline::standard()?),
        ))
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn process(&self, raw: &str) -> Processed {
        let _span = span!(Level::INFO, "process").entered();

        let mut processed = Processed::default();
        for segment in split_segments(raw) {
            let _span = span!(Level::DEBUG, "segment", segment).entered();

            let entities = self.extractor.extract(segment);
            if entities.is_unknown() {
                debug!("nothing classified '{}'", segment);
            }
            match self.engine.post(&entities.transaction_type, &entities) {
                Ok(entry) => {
                    debug!("{}", entry);
                    processed.entries.push(Posted {
                        segment: segment.to_owned(),
                        entities,
                        entry,
                    });
                }
                Err(error) => {
                    info!("{}: {}", segment, error);
                    processed.diagnostics.push(Diagnostic {
                        segment: segment.to_owned(),
                        error,
                    });
                }
            }
        }

        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_three_segments() {
        assert_eq!(split_segments("A;B;C"), vec!["A", "B", "C"]);
        assert_eq!(split_segments("  A ;  B;C  "), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_split_drops_empty_segments() {
        assert_eq!(split_segments(";; A;;B ;  ;"), vec!["A", "B"]);
        assert!(split_segments("  ").is_empty());
    }

    #[test]
    fn test_split_keeps_decimals() {
        assert_eq!(
            split_segments("Sold goods for $1,000.50. Bought a desk for $99.99"),
            vec!["Sold goods for $1,000.50", "Bought a desk for $99.99"]
        );
    }

    #[test]
    fn test_split_full_width() {
        assert_eq!(split_segments("A。B；C．D"), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_split_period_after_number() {
        assert_eq!(split_segments("Paid $5. Next"), vec!["Paid $5", "Next"]);
    }

    #[test]
    fn test_split_abbreviation_period() {
        assert_eq!(
            split_segments("Sold goods to Acme Inc. for $500 in cash"),
            vec!["Sold goods to Acme Inc", "for $500 in cash"]
        );
    }

    #[test]
    fn test_process_sale() -> anyhow::Result<()> {
        let processed = Processor::standard()?.process("Sold goods for $500, received in cash.");
        assert!(processed.diagnostics.is_empty());
        assert_eq!(processed.entries.len(), 1);
        assert_eq!(
            processed.entries[0].entry.to_string(),
            "{Debit_1: Cash 536.25, Credit_1: Sales Revenue 500, Credit_Tax_1: Sales Tax Payable 36.25}"
        );

        Ok(())
    }

    #[test]
    fn test_process_unpaid_purchase() -> anyhow::Result<()> {
        let processed =
            Processor::standard()?.process("Purchased inventory for $1000 from Texas, not paid yet.");
        assert_eq!(
            processed.entries[0].entry.to_string(),
            "{Debit_1: Inventory 1000, Credit_1: Accounts Payable 1000}"
        );

        Ok(())
    }

    #[test]
    fn test_process_multiple_amounts() -> anyhow::Result<()> {
        let processed =
            Processor::standard()?.process("Sold goods for $100 and $200, paid by cheque and cash");
        let entry = &processed.entries[0].entry;
        assert_eq!(entry.get("Debit_1"), Some("Cheque 107.25".to_owned()));
        assert_eq!(entry.get("Debit_2"), Some("Cash 214.5".to_owned()));
        assert_eq!(entry.lines().len(), 6);
        assert!(entry.is_balanced());

        Ok(())
    }

    #[test]
    fn test_unresolved_segment_is_reported_and_rest_processed() -> anyhow::Result<()> {
        let processed = Processor::standard()?
            .process("xyz random text; Purchased inventory for $1000 from Texas, not paid yet");

        assert_eq!(processed.diagnostics.len(), 1);
        assert_eq!(
            processed.diagnostics[0].to_string(),
            "Unable to process transaction: xyz random text"
        );
        assert_eq!(
            processed.diagnostics[0].error,
            PostingError::UnknownTransactionType("unknown".to_owned())
        );
        assert_eq!(processed.entries.len(), 1);
        assert_eq!(processed.entries[0].entry.transaction_type(), "purchase");

        Ok(())
    }

    #[test]
    fn test_unimplemented_rule_is_reported() -> anyhow::Result<()> {
        let processed = Processor::standard()?.process("Recorded an asset swap worth $300");
        assert!(processed.entries.is_empty());
        assert_eq!(
            processed.diagnostics[0].error,
            PostingError::NoRuleImplementation {
                type_id: "asset_swap".to_owned(),
                rule: "asset_swap".to_owned(),
            }
        );

        Ok(())
    }

    #[test]
    fn test_segment_order_is_preserved() -> anyhow::Result<()> {
        let processed = Processor::standard()?.process(
            "Sold goods for $10 in cash; Bought inventory for $20; Leased out a truck for $30",
        );
        let types = processed
            .entries
            .iter()
            .map(|p| p.entry.transaction_type())
            .collect::<Vec<_>>();
        assert_eq!(types, vec!["sales", "purchase", "lease_out"]);
        assert_eq!(processed.entries[2].segment, "Leased out a truck for $30");

        Ok(())
    }

    #[test]
    fn test_segment_without_amounts_gives_empty_entry() -> anyhow::Result<()> {
        let processed = Processor::standard()?.process("Sold some goods");
        assert!(processed.diagnostics.is_empty());
        assert!(processed.entries[0].entry.is_empty());

        Ok(())
    }

    #[test]
    fn test_processed_serializes() -> anyhow::Result<()> {
        let processed = Processor::standard()?.process("xyz random text");
        assert_eq!(
            serde_json::to_string(&processed)?,
            r#"{"entries":[],"diagnostics":[{"segment":"xyz random text","message":"Unable to process transaction: xyz random text","error":"Unknown transaction type: unknown"}]}"#
        );

        Ok(())
    }
}
