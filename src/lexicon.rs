use std::{
    collections::{HashMap, HashSet},
    fs::File,
    path::Path,
};

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::PaymentMethod;

const STANDARD: &str = include_str!("../data/lexicon.json");

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Duplicate transaction type: {0}")]
    DuplicateType(String),
    #[error("Verb mapping for {lemmas:?} names unknown transaction type: {type_id}")]
    UnknownVerbType { lemmas: Vec<String>, type_id: String },
    #[error("Transaction type {0} has no keywords")]
    NoKeywords(String),
    #[error("Payment method {0} has no keywords")]
    NoPaymentKeywords(PaymentMethod),
    #[error("Default jurisdiction {0} is not a listed jurisdiction")]
    UnlistedDefault(String),
    #[error("Invalid pattern for '{phrase}': {source}")]
    Pattern {
        phrase: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Debit,
    Credit,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Debit => f.pad("debit"),
            Polarity::Credit => f.pad("credit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransactionTypeRule {
    pub type_id: String,
    pub keywords: Vec<String>,
    pub main_account: String,
    pub counterpart_account: Option<String>,
    pub polarity: Polarity,
    pub taxable: bool,
    /// Name of the posting rule that produces this type's entries.
    pub rule: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VerbMapping {
    pub lemmas: Vec<String>,
    pub transaction_type: String,
    /// Receiving or paying describes how a transaction settled more often
    /// than what it was, so these only classify as a last resort.
    #[serde(default)]
    pub settlement: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaymentKeywords {
    pub method: PaymentMethod,
    pub keywords: Vec<String>,
}

/// The lexicon as written in configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LexiconDefinition {
    pub default_jurisdiction: String,
    pub jurisdictions: Vec<String>,
    pub payment_methods: Vec<PaymentKeywords>,
    pub verbs: Vec<VerbMapping>,
    pub rules: Vec<TransactionTypeRule>,
}

#[derive(Debug)]
pub(crate) struct Phrase {
    pub(crate) text: String,
    pattern: Regex,
}

impl Phrase {
    fn new(text: &str) -> Result<Self, LexiconError> {
        let text = text.trim().to_lowercase();
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&text))).map_err(
            |source| LexiconError::Pattern {
                phrase: text.clone(),
                source,
            },
        )?;

        Ok(Self { text, pattern })
    }

    /// Byte offset of the first whole-word occurrence.
    pub(crate) fn find(&self, sentence: &str) -> Option<usize> {
        self.pattern.find(sentence).map(|m| m.start())
    }
}

#[derive(Debug)]
pub(crate) struct Keyword {
    pub(crate) type_id: String,
    pub(crate) phrase: Phrase,
    pub(crate) settlement: bool,
}

/// Validated, compiled lexicon. Read-only once built.
#[derive(Debug)]
pub struct Lexicon {
    default_jurisdiction: String,
    rules: Vec<TransactionTypeRule>,
    by_type: HashMap<String, usize>,
    lemmas: HashMap<String, (String, bool)>,
    payment_methods: Vec<(PaymentMethod, Vec<String>)>,
    jurisdictions: Vec<Phrase>,
    keywords: Vec<Keyword>,
}

impl Lexicon {
    pub fn new(definition: LexiconDefinition) -> Result<Self, LexiconError> {
        let mut by_type = HashMap::new();
        for (index, rule) in definition.rules.iter().enumerate() {
            if rule.keywords.is_empty() {
                return Err(LexiconError::NoKeywords(rule.type_id.clone()));
            }
            if by_type.insert(rule.type_id.clone(), index).is_some() {
                return Err(LexiconError::DuplicateType(rule.type_id.clone()));
            }
        }

        let mut lemmas = HashMap::new();
        let mut settlement_types = HashSet::new();
        for verb in definition.verbs.iter() {
            if !by_type.contains_key(&verb.transaction_type) {
                return Err(LexiconError::UnknownVerbType {
                    lemmas: verb.lemmas.clone(),
                    type_id: verb.transaction_type.clone(),
                });
            }
            if verb.settlement {
                settlement_types.insert(verb.transaction_type.clone());
            }
            for lemma in verb.lemmas.iter() {
                lemmas.insert(
                    lemma.to_lowercase(),
                    (verb.transaction_type.clone(), verb.settlement),
                );
            }
        }

        let mut payment_methods = Vec::new();
        for entry in definition.payment_methods.into_iter() {
            if entry.keywords.is_empty() {
                return Err(LexiconError::NoPaymentKeywords(entry.method));
            }
            let keywords = entry.keywords.iter().map(|k| k.to_lowercase()).collect();
            payment_methods.push((entry.method, keywords));
        }

        let jurisdictions = definition
            .jurisdictions
            .iter()
            .map(|j| Phrase::new(j))
            .collect::<Result<Vec<_>, _>>()?;

        let default_jurisdiction = definition.default_jurisdiction.to_lowercase();
        if !jurisdictions.iter().any(|j| j.text == default_jurisdiction) {
            return Err(LexiconError::UnlistedDefault(default_jurisdiction));
        }

        let mut keywords = Vec::new();
        for rule in definition.rules.iter() {
            for keyword in rule.keywords.iter() {
                keywords.push(Keyword {
                    type_id: rule.type_id.clone(),
                    phrase: Phrase::new(keyword)?,
                    settlement: settlement_types.contains(&rule.type_id),
                });
            }
        }

        debug!(
            "lexicon: {} types, {} lemmas, {} keywords",
            definition.rules.len(),
            lemmas.len(),
            keywords.len()
        );

        Ok(Self {
            default_jurisdiction,
            rules: definition.rules,
            by_type,
            lemmas,
            payment_methods,
            jurisdictions,
            keywords,
        })
    }

    pub fn standard() -> anyhow::Result<Self> {
        let definition: LexiconDefinition = serde_json::from_str(STANDARD)?;
        Ok(Self::new(definition)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
        let definition: LexiconDefinition =
            serde_json::from_reader(file).with_context(|| format!("parsing {:?}", path))?;
        Ok(Self::new(definition).with_context(|| format!("validating {:?}", path))?)
    }

    pub fn rule(&self, type_id: &str) -> Option<&TransactionTypeRule> {
        self.by_type.get(type_id).map(|i| &self.rules[*i])
    }

    pub fn rules(&self) -> impl Iterator<Item = &TransactionTypeRule> {
        self.rules.iter()
    }

    pub fn default_jurisdiction(&self) -> &str {
        &self.default_jurisdiction
    }

    /// The type a verb lemma (or surface form) maps to, and whether it's a
    /// settlement verb.
    pub fn classify_lemma(&self, lemma: &str) -> Option<(&str, bool)> {
        self.lemmas
            .get(lemma)
            .map(|(type_id, settlement)| (type_id.as_str(), *settlement))
    }

    pub(crate) fn payment_methods(&self) -> &[(PaymentMethod, Vec<String>)] {
        &self.payment_methods
    }

    pub(crate) fn jurisdictions(&self) -> &[Phrase] {
        &self.jurisdictions
    }

    pub(crate) fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }
}
