use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use tracing::{error, info, span, Level};

use crate::{
    lexicon::{Lexicon, TransactionTypeRule},
    model::{ExtractedEntities, JournalEntry, Side},
    taxes::TaxTable,
};

mod rules;


#[derive(Debug, Error, Clone, PartialEq)]
pub enum PostingError {
    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(String),
    #[error("No rule implementation '{rule}' for transaction type {type_id}")]
    NoRuleImplementation { type_id: String, rule: String },
}

/// What a posting rule gets to look at. Rules are plain functions of this and
/// nothing else.
pub struct Context<'a> {
    pub entities: &'a ExtractedEntities,
    pub rule: &'a TransactionTypeRule,
    pub taxes: &'a TaxTable,
}

pub type RuleFn = fn(&Context<'_>) -> JournalEntry;

pub struct Engine {
    lexicon: Arc<Lexicon>,
    taxes: Arc<TaxTable>,
    registry: HashMap<&'static str, RuleFn>,
}

impl Engine {
    pub fn new(lexicon: Arc<Lexicon>, taxes: Arc<TaxTable>) -> Self {
        let engine = Self {
            lexicon,
            taxes,
            registry: rules::registry(),
        };

        for rule in engine.missing_rules() {
            info!(
                "{} has no posting rule '{}', its sentences will be reported",
                rule.type_id, rule.rule
            );
        }

        engine
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn taxes(&self) -> &TaxTable {
        &self.taxes
    }

    /// Lexicon entries whose rule reference has no implementation.
    pub fn missing_rules(&self) -> Vec<&TransactionTypeRule> {
        self.lexicon
            .rules()
            .filter(|r| !self.registry.contains_key(r.rule.as_str()))
            .collect()
    }

    pub fn is_implemented(&self, type_id: &str) -> bool {
        self.lexicon
            .rule(type_id)
            .map(|r| self.registry.contains_key(r.rule.as_str()))
            .unwrap_or(false)
    }

    pub fn post(
        &self,
        type_id: &str,
        entities: &ExtractedEntities,
    ) -> Result<JournalEntry, PostingError> {
        let _span = span!(Level::DEBUG, "post", type_id).entered();

        let rule = self
            .lexicon
            .rule(type_id)
            .ok_or_else(|| PostingError::UnknownTransactionType(type_id.to_owned()))?;

        let posting = self.registry.get(rule.rule.as_str()).ok_or_else(|| {
            PostingError::NoRuleImplementation {
                type_id: type_id.to_owned(),
                rule: rule.rule.clone(),
            }
        })?;

        let entities = entities.rounded();
        let entry = posting(&Context {
            entities: &entities,
            rule,
            taxes: &self.taxes,
        });

        if !entry.is_balanced() {
            error!(
                "unbalanced {} entry: debits {} credits {}",
                type_id,
                entry.total(Side::Debit),
                entry.total(Side::Credit)
            );
        }

        Ok(entry)
    }
}
