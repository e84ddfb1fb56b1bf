use std::{
    collections::{HashMap, HashSet},
    fs::File,
    path::Path,
};

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

const STANDARD: &str = include_str!("../../data/vocabulary.json");

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Vocabulary has no verbs")]
    NoVerbs,
    #[error("Irregular form '{form}' maps to unknown lemma '{lemma}'")]
    UnknownLemma { form: String, lemma: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyDefinition {
    pub verbs: Vec<String>,
    pub nouns: Vec<String>,
    pub irregular: HashMap<String, String>,
    pub auxiliaries: Vec<String>,
    pub determiners: Vec<String>,
    pub pronouns: Vec<String>,
    pub adpositions: Vec<String>,
    pub conjunctions: Vec<String>,
    pub particles: Vec<String>,
}

fn lowercase_set(words: Vec<String>) -> HashSet<String> {
    words.into_iter().map(|w| w.to_lowercase()).collect()
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub(crate) verbs: HashSet<String>,
    pub(crate) nouns: HashSet<String>,
    pub(crate) irregular: HashMap<String, String>,
    pub(crate) auxiliaries: HashSet<String>,
    pub(crate) determiners: HashSet<String>,
    pub(crate) pronouns: HashSet<String>,
    pub(crate) adpositions: HashSet<String>,
    pub(crate) conjunctions: HashSet<String>,
    pub(crate) particles: HashSet<String>,
}

impl Vocabulary {
    pub fn new(definition: VocabularyDefinition) -> Result<Self, PipelineError> {
        if definition.verbs.is_empty() {
            return Err(PipelineError::NoVerbs);
        }

        let vocabulary = Self {
            verbs: lowercase_set(definition.verbs),
            nouns: lowercase_set(definition.nouns),
            irregular: definition
                .irregular
                .into_iter()
                .map(|(form, lemma)| (form.to_lowercase(), lemma.to_lowercase()))
                .collect(),
            auxiliaries: lowercase_set(definition.auxiliaries),
            determiners: lowercase_set(definition.determiners),
            pronouns: lowercase_set(definition.pronouns),
            adpositions: lowercase_set(definition.adpositions),
            conjunctions: lowercase_set(definition.conjunctions),
            particles: lowercase_set(definition.particles),
        };

        for (form, lemma) in vocabulary.irregular.iter() {
            if !vocabulary.is_known(lemma) {
                return Err(PipelineError::UnknownLemma {
                    form: form.clone(),
                    lemma: lemma.clone(),
                });
            }
        }

        Ok(vocabulary)
    }

    pub fn standard() -> anyhow::Result<Self> {
        let definition: VocabularyDefinition = serde_json::from_str(STANDARD)?;
        Ok(Self::new(definition)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
        let definition: VocabularyDefinition =
            serde_json::from_reader(file).with_context(|| format!("parsing {:?}", path))?;
        Ok(Self::new(definition)?)
    }

    fn is_known(&self, word: &str) -> bool {
        self.verbs.contains(word) || self.nouns.contains(word) || self.auxiliaries.contains(word)
    }

    /// Irregular forms first, then known words as-is, then the first suffix
    /// strip that lands on a known word. Unknown words are their own lemma.
    pub fn lemmatize(&self, lower: &str) -> String {
        if let Some(lemma) = self.irregular.get(lower) {
            return lemma.clone();
        }
        if self.is_known(lower) {
            return lower.to_owned();
        }

        candidates(lower)
            .into_iter()
            .find(|c| self.is_known(c))
            .unwrap_or_else(|| lower.to_owned())
    }
}

fn undouble(stem: &str) -> Option<String> {
    let mut chars = stem.chars().rev();
    match (chars.next(), chars.next()) {
        (Some(a), Some(b)) if a == b && !"aeiou".contains(a) => {
            Some(stem[..stem.len() - a.len_utf8()].to_owned())
        }
        _ => None,
    }
}

fn candidates(word: &str) -> Vec<String> {
    let mut found = Vec::new();

    if let Some(stem) = word
        .strip_suffix("ies")
        .or_else(|| word.strip_suffix("ied"))
    {
        found.push(format!("{}y", stem));
    }

    if let Some(stem) = word.strip_suffix("ing") {
        found.push(stem.to_owned());
        found.push(format!("{}e", stem));
        found.extend(undouble(stem));
    }

    if let Some(stem) = word.strip_suffix("ed") {
        found.push(stem.to_owned());
        found.push(format!("{}e", stem));
        found.extend(undouble(stem));
    }

    if let Some(stem) = word.strip_suffix("es") {
        found.push(stem.to_owned());
    }

    if let Some(stem) = word.strip_suffix('s') {
        found.push(stem.to_owned());
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lemmatize_irregular() -> anyhow::Result<()> {
        let vocabulary = Vocabulary::standard()?;
        assert_eq!(vocabulary.lemmatize("sold"), "sell");
        assert_eq!(vocabulary.lemmatize("paid"), "pay");
        assert_eq!(vocabulary.lemmatize("was"), "be");

        Ok(())
    }

    #[test]
    fn test_lemmatize_regular_suffixes() -> anyhow::Result<()> {
        let vocabulary = Vocabulary::standard()?;
        assert_eq!(vocabulary.lemmatize("purchased"), "purchase");
        assert_eq!(vocabulary.lemmatize("rented"), "rent");
        assert_eq!(vocabulary.lemmatize("received"), "receive");
        assert_eq!(vocabulary.lemmatize("leasing"), "lease");
        assert_eq!(vocabulary.lemmatize("shipped"), "ship");
        assert_eq!(vocabulary.lemmatize("subsidies"), "subsidy");
        assert_eq!(vocabulary.lemmatize("payments"), "payment");

        Ok(())
    }

    #[test]
    fn test_lemmatize_unknown_word_is_itself() -> anyhow::Result<()> {
        let vocabulary = Vocabulary::standard()?;
        assert_eq!(vocabulary.lemmatize("xyz"), "xyz");
        assert_eq!(vocabulary.lemmatize("texas"), "texas");

        Ok(())
    }

    #[test]
    fn test_rejects_irregular_to_unknown_lemma() {
        let mut definition: VocabularyDefinition = serde_json::from_str(STANDARD).unwrap();
        definition
            .irregular
            .insert("flew".to_owned(), "fly".to_owned());
        assert!(matches!(
            Vocabulary::new(definition),
            Err(PipelineError::UnknownLemma { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_verbs() {
        let mut definition: VocabularyDefinition = serde_json::from_str(STANDARD).unwrap();
        definition.verbs.clear();
        assert!(matches!(
            Vocabulary::new(definition),
            Err(PipelineError::NoVerbs)
        ));
    }
}
