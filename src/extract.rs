use std::{str::FromStr, sync::Arc};

use bigdecimal::BigDecimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    lexicon::Lexicon,
    model::{round_cents, ExtractedEntities, PaymentMethod, UNKNOWN_TYPE},
    nlp::{Doc, Pipeline, Pos},
};

#[derive(Debug, Error, PartialEq)]
pub enum AmountError {
    #[error("Malformed amount: {0}")]
    Malformed(String),
}

/// Drops currency markers and thousands separators, keeping digits and the
/// decimal point.
pub fn parse_amount(text: &str) -> Result<BigDecimal, AmountError> {
    let digits = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect::<String>();

    BigDecimal::from_str(&digits).map_err(|_| AmountError::Malformed(text.to_owned()))
}

pub struct Extractor {
    lexicon: Arc<Lexicon>,
    pipeline: Arc<dyn Pipeline>,
}

impl Extractor {
    pub fn new(lexicon: Arc<Lexicon>, pipeline: Arc<dyn Pipeline>) -> Self {
        Self { lexicon, pipeline }
    }

    pub fn extract(&self, sentence: &str) -> ExtractedEntities {
        let doc = self.pipeline.analyze(sentence);
        let lower = sentence.to_lowercase();

        let mut entities = ExtractedEntities::new(self.lexicon.default_jurisdiction());
        entities.amounts = self.amounts(&doc);
        entities.payment_methods = self.payment_methods(&lower);
        if let Some(jurisdiction) = self.jurisdiction(sentence) {
            entities.jurisdiction = jurisdiction;
        }
        entities.not_received = is_negated(&doc, "receive");
        entities.not_paid = is_negated(&doc, "pay");
        entities.transaction_type = self.classify(&doc, sentence);

        debug!("extracted {:?}", entities);

        entities
    }

    fn amounts(&self, doc: &Doc) -> Vec<BigDecimal> {
        doc.money()
            .filter_map(|span| match parse_amount(&span.text) {
                Ok(amount) => Some(round_cents(&amount)),
                Err(e) => {
                    warn!("skipping amount: {}", e);
                    None
                }
            })
            .collect()
    }

    fn payment_methods(&self, lower: &str) -> Vec<PaymentMethod> {
        let mut found = self
            .lexicon
            .payment_methods()
            .iter()
            .filter_map(|(method, keywords)| {
                keywords
                    .iter()
                    .filter_map(|k| lower.find(k.as_str()))
                    .min()
                    .map(|position| (position, *method))
            })
            .collect::<Vec<_>>();

        found.sort_by_key(|(position, _)| *position);
        found.into_iter().map(|(_, method)| method).collect()
    }

    /// Earliest mention wins; at the same offset the longer name does.
    fn jurisdiction(&self, sentence: &str) -> Option<String> {
        let mut best: Option<(usize, usize, &str)> = None;
        for jurisdiction in self.lexicon.jurisdictions() {
            if let Some(position) = jurisdiction.find(sentence) {
                let length = jurisdiction.text.len();
                let better = match best {
                    Some((p, l, _)) => position < p || (position == p && length > l),
                    None => true,
                };
                if better {
                    best = Some((position, length, jurisdiction.text.as_str()));
                }
            }
        }

        best.map(|(_, _, text)| text.to_owned())
    }

    /// Primary verbs decide, the last one winning. Then keyword phrases for
    /// anything but settlement types, then settlement verbs (again the last
    /// one winning), then settlement keywords.
    fn classify(&self, doc: &Doc, sentence: &str) -> String {
        let mut primary = None;
        let mut settlement = None;

        for token in doc.tokens.iter().filter(|t| t.pos == Pos::Verb) {
            let found = self
                .lexicon
                .classify_lemma(&token.lemma)
                .or_else(|| self.lexicon.classify_lemma(&token.lower));
            match found {
                Some((type_id, false)) => primary = Some(type_id),
                Some((type_id, true)) => settlement = Some(type_id),
                None => {}
            }
        }

        primary
            .or_else(|| self.keyword(sentence, false))
            .or(settlement)
            .or_else(|| self.keyword(sentence, true))
            .unwrap_or(UNKNOWN_TYPE)
            .to_owned()
    }

    /// Longest matching phrase, ties going to the later mention and then to
    /// the earlier rule.
    fn keyword(&self, sentence: &str, settlement: bool) -> Option<&str> {
        let mut best: Option<(usize, usize, &str)> = None;
        for keyword in self
            .lexicon
            .keywords()
            .iter()
            .filter(|k| k.settlement == settlement)
        {
            if let Some(position) = keyword.phrase.find(sentence) {
                let length = keyword.phrase.text.len();
                let better = match best {
                    Some((l, p, _)) => (length, position) > (l, p),
                    None => true,
                };
                if better {
                    best = Some((length, position, keyword.type_id.as_str()));
                }
            }
        }

        best.map(|(_, _, type_id)| type_id)
    }
}

/// Whether a token lemmatized to `lemma` is negated by a literal "not",
/// either adjacent or reached by stepping back over auxiliaries and
/// particles ("has not yet been paid").
fn is_negated(doc: &Doc, lemma: &str) -> bool {
    let tokens = &doc.tokens;
    tokens.iter().enumerate().any(|(i, token)| {
        if token.lemma != lemma {
            return false;
        }
        if tokens.get(i + 1).map(|t| t.lower == "not").unwrap_or(false) {
            return true;
        }

        tokens[..i]
            .iter()
            .rev()
            .find(|t| t.lower == "not" || !matches!(t.pos, Pos::Aux | Pos::Part))
            .map(|t| t.lower == "not")
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::RulePipeline;

    fn extractor() -> anyhow::Result<Extractor> {
        Ok(Extractor::new(
            Arc::new(Lexicon::standard()?),
            Arc::new(RulePipeline::standard()?),
        ))
    }

    fn decimal(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,000.50"), Ok(decimal("1000.50")));
        assert_eq!(parse_amount("USD 250"), Ok(decimal("250")));
        assert_eq!(parse_amount("300 dollars"), Ok(decimal("300")));
    }

    #[test]
    fn test_parse_amount_malformed() {
        assert_eq!(
            parse_amount("$1.2.3"),
            Err(AmountError::Malformed("$1.2.3".to_owned()))
        );
    }

    #[test]
    fn test_extract_sale() -> anyhow::Result<()> {
        let entities = extractor()?.extract("Sold goods for $500, received in cash.");
        assert_eq!(entities.transaction_type, "sales");
        assert_eq!(entities.amounts, vec![decimal("500")]);
        assert_eq!(entities.payment_methods, vec![PaymentMethod::Cash]);
        assert_eq!(entities.jurisdiction, "california");
        assert!(!entities.not_received);
        assert!(!entities.not_paid);

        Ok(())
    }

    #[test]
    fn test_extract_unpaid_purchase() -> anyhow::Result<()> {
        let entities =
            extractor()?.extract("Purchased inventory for $1000 from Texas, not paid yet.");
        assert_eq!(entities.transaction_type, "purchase");
        assert_eq!(entities.amounts, vec![decimal("1000")]);
        assert!(entities.payment_methods.is_empty());
        assert_eq!(entities.jurisdiction, "texas");
        assert!(entities.not_paid);
        assert!(!entities.not_received);

        Ok(())
    }

    #[test]
    fn test_extract_defaults() -> anyhow::Result<()> {
        let entities = extractor()?.extract("xyz random text");
        assert_eq!(entities, ExtractedEntities::new("california"));

        Ok(())
    }

    #[test]
    fn test_payment_methods_in_order_of_mention() -> anyhow::Result<()> {
        let entities =
            extractor()?.extract("Sold goods for $100 and $200, paid by cheque and cash");
        assert_eq!(
            entities.payment_methods,
            vec![PaymentMethod::Cheque, PaymentMethod::Cash]
        );
        assert_eq!(entities.amounts, vec![decimal("100"), decimal("200")]);
        assert_eq!(entities.transaction_type, "sales");

        Ok(())
    }

    #[test]
    fn test_payment_method_mentioned_twice_counts_once() -> anyhow::Result<()> {
        let entities = extractor()?.extract("Paid $5 in cash and $6 in cash by credit card");
        assert_eq!(
            entities.payment_methods,
            vec![PaymentMethod::Cash, PaymentMethod::CreditCard]
        );

        Ok(())
    }

    #[test]
    fn test_jurisdiction_is_whole_word_and_earliest() -> anyhow::Result<()> {
        let extractor = extractor()?;
        assert_eq!(
            extractor.extract("Sold goods in arkansas").jurisdiction,
            "arkansas"
        );
        assert_eq!(
            extractor
                .extract("Sold goods in West Virginia and New York")
                .jurisdiction,
            "west virginia"
        );

        Ok(())
    }

    #[test]
    fn test_negation_adjacent() -> anyhow::Result<()> {
        let entities = extractor()?.extract("Sold goods for $80, payment not received");
        assert!(entities.not_received);
        assert_eq!(entities.transaction_type, "sales");

        Ok(())
    }

    #[test]
    fn test_negation_through_auxiliaries() -> anyhow::Result<()> {
        let entities = extractor()?.extract("Bought a laptop for $900 that has not yet been paid");
        assert!(entities.not_paid);

        Ok(())
    }

    #[test]
    fn test_negation_does_not_reach_across_words() -> anyhow::Result<()> {
        let entities = extractor()?.extract("It is not unusual that payment was received");
        assert!(!entities.not_received);

        Ok(())
    }

    #[test]
    fn test_last_primary_verb_wins() -> anyhow::Result<()> {
        let extractor = extractor()?;
        assert_eq!(
            extractor
                .extract("Sold old stock and bought inventory for $300")
                .transaction_type,
            "purchase"
        );
        assert_eq!(
            extractor
                .extract("Bought inventory and sold it for $300")
                .transaction_type,
            "sales"
        );

        Ok(())
    }

    #[test]
    fn test_settlement_verb_classifies_alone() -> anyhow::Result<()> {
        let extractor = extractor()?;
        assert_eq!(
            extractor
                .extract("Received payment of $300 from a customer")
                .transaction_type,
            "receipts"
        );
        assert_eq!(
            extractor
                .extract("Paid $200 to a supplier by cheque")
                .transaction_type,
            "payments"
        );

        Ok(())
    }

    #[test]
    fn test_keywords_beat_settlement_verbs() -> anyhow::Result<()> {
        let extractor = extractor()?;
        assert_eq!(
            extractor
                .extract("Received a loan of $5000 from the bank")
                .transaction_type,
            "fundraising"
        );
        assert_eq!(
            extractor
                .extract("Paid rent expense of $500")
                .transaction_type,
            "lease_in"
        );
        assert_eq!(
            extractor
                .extract("Sales of $250 in cash")
                .transaction_type,
            "sales"
        );

        Ok(())
    }

    #[test]
    fn test_longest_keyword_wins() -> anyhow::Result<()> {
        let entities = extractor()?.extract("Recorded a prepaid expenses entry of $1200");
        assert_eq!(entities.transaction_type, "prepaid_expenses");

        Ok(())
    }

    #[test]
    fn test_malformed_amount_is_skipped() -> anyhow::Result<()> {
        let entities = extractor()?.extract("Sold goods for $1.2.3 and $40");
        assert_eq!(entities.amounts, vec![decimal("40")]);

        Ok(())
    }

    #[test]
    fn test_amounts_are_rounded_to_cents() -> anyhow::Result<()> {
        let entities = extractor()?.extract("Sold goods for $10.005 and $1,000.995 in cash");
        assert_eq!(entities.amounts, vec![decimal("10"), decimal("1001")]);

        Ok(())
    }

    #[test]
    fn test_extract_is_idempotent() -> anyhow::Result<()> {
        let extractor = extractor()?;
        let sentence = "Leased out a truck for $700 via bank transfer in Texas";
        assert_eq!(extractor.extract(sentence), extractor.extract(sentence));

        Ok(())
    }
}
