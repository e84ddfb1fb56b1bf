//! A small rule-based language pipeline: tokens, lemmas, parts of speech
//! and `MONEY` spans for one sentence at a time.

use std::collections::HashSet;

use lazy_static::lazy_static;
use tracing::trace;

use self::tokenize::{tokenize, RawToken, Shape};
pub use self::vocabulary::Vocabulary;

mod tokenize;
mod vocabulary;


lazy_static! {
    static ref CURRENCY_CODES: HashSet<&'static str> = ["usd"].into_iter().collect();
    static ref CURRENCY_WORDS: HashSet<&'static str> =
        ["dollar", "dollars", "usd", "bucks"].into_iter().collect();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Verb,
    Aux,
    Noun,
    Propn,
    Num,
    Sym,
    Punct,
    Det,
    Pron,
    Adp,
    Conj,
    Part,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub lower: String,
    pub lemma: String,
    pub pos: Pos,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLabel {
    Money,
}

/// Covers tokens `start..end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub label: EntityLabel,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doc {
    pub text: String,
    pub tokens: Vec<Token>,
    pub ents: Vec<Span>,
}

impl Doc {
    pub fn money(&self) -> impl Iterator<Item = &Span> {
        self.ents.iter().filter(|s| s.label == EntityLabel::Money)
    }
}

pub trait Pipeline: Send + Sync {
    fn analyze(&self, text: &str) -> Doc;
}

#[derive(Debug, Clone)]
pub struct RulePipeline {
    vocabulary: Vocabulary,
}

impl RulePipeline {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn standard() -> anyhow::Result<Self> {
        Ok(Self::new(Vocabulary::standard()?))
    }

    fn tag(&self, raw: &[RawToken<'_>], lemmas: &[String], index: usize) -> Pos {
        let token = &raw[index];
        match token.shape {
            Shape::Number => return Pos::Num,
            Shape::Currency => return Pos::Sym,
            Shape::Punct => return Pos::Punct,
            Shape::Word => {}
        }

        let v = &self.vocabulary;
        let lower = token.text.to_lowercase();
        let lemma = lemmas[index].as_str();

        if v.particles.contains(&lower) {
            Pos::Part
        } else if v.determiners.contains(&lower) {
            Pos::Det
        } else if v.pronouns.contains(&lower) {
            Pos::Pron
        } else if v.adpositions.contains(&lower) {
            Pos::Adp
        } else if v.conjunctions.contains(&lower) {
            Pos::Conj
        } else if v.auxiliaries.contains(lemma) {
            Pos::Aux
        } else if v.verbs.contains(lemma) && !self.is_nominal(raw, lemmas, index) {
            Pos::Verb
        } else if v.nouns.contains(lemma) || v.verbs.contains(lemma) {
            Pos::Noun
        } else if index > 0 && token.text.starts_with(char::is_uppercase) {
            Pos::Propn
        } else {
            Pos::Other
        }
    }

    /// A verb-like word reads as a noun right after a determiner, a
    /// preposition or another verb ("the lease", "for rent", "paid rent"),
    /// or when it heads an "of" phrase and can be a noun ("Rent of $500").
    fn is_nominal(&self, raw: &[RawToken<'_>], lemmas: &[String], index: usize) -> bool {
        let v = &self.vocabulary;
        let lower_at = |i: usize| raw[i].text.to_lowercase();

        if index > 0 && raw[index - 1].shape == Shape::Word {
            let previous = lower_at(index - 1);
            if v.determiners.contains(&previous) || v.adpositions.contains(&previous) {
                return true;
            }
            let previous_lemma = lemmas[index - 1].as_str();
            if v.verbs.contains(previous_lemma) && !self.is_nominal(raw, lemmas, index - 1) {
                return true;
            }
        }

        v.nouns.contains(lemmas[index].as_str())
            && index + 1 < raw.len()
            && lower_at(index + 1) == "of"
    }

    fn money_spans(&self, text: &str, raw: &[RawToken<'_>]) -> Vec<Span> {
        let is_word_in = |i: usize, set: &HashSet<&'static str>| {
            raw.get(i)
                .map(|t| t.shape == Shape::Word && set.contains(t.text.to_lowercase().as_str()))
                .unwrap_or(false)
        };
        let is_number = |i: usize| raw.get(i).map(|t| t.shape == Shape::Number).unwrap_or(false);

        let mut spans = Vec::new();
        let mut i = 0;
        while i < raw.len() {
            let prefixed = raw[i].shape == Shape::Currency || is_word_in(i, &*CURRENCY_CODES);
            let (start, end) = if prefixed && is_number(i + 1) {
                let end = if is_word_in(i + 2, &*CURRENCY_WORDS) {
                    i + 3
                } else {
                    i + 2
                };
                (i, end)
            } else if is_number(i) && is_word_in(i + 1, &*CURRENCY_WORDS) {
                (i, i + 2)
            } else {
                i += 1;
                continue;
            };

            let span = Span {
                label: EntityLabel::Money,
                start,
                end,
                text: text[raw[start].start..raw[end - 1].end()].to_owned(),
            };
            trace!("money span {:?}", span);
            spans.push(span);
            i = end;
        }

        spans
    }
}

impl Pipeline for RulePipeline {
    fn analyze(&self, text: &str) -> Doc {
        let raw = tokenize(text);
        let lemmas = raw
            .iter()
            .map(|t| match t.shape {
                Shape::Word => self.vocabulary.lemmatize(&t.text.to_lowercase()),
                _ => t.text.to_owned(),
            })
            .collect::<Vec<_>>();

        let tokens = (0..raw.len())
            .map(|i| Token {
                text: raw[i].text.to_owned(),
                lower: raw[i].text.to_lowercase(),
                lemma: lemmas[i].clone(),
                pos: self.tag(&raw, &lemmas, i),
                start: raw[i].start,
                end: raw[i].end(),
            })
            .collect();

        Doc {
            text: text.to_owned(),
            tokens,
            ents: self.money_spans(text, &raw),
        }
    }
}
