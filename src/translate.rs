//! Display-label translation
//!
//! Data files keep their original (Spanish) labels, which remain the join and
//! grouping keys everywhere. The translator is only consulted when building
//! titles, axis labels and terminal tables.

use crate::config::TranslationConfig;
use std::collections::HashMap;

/// Lookup from data labels to display labels, falling back to the input label
#[derive(Debug, Clone, Default)]
pub struct LabelTranslator {
    categories: HashMap<String, String>,
    behaviors: HashMap<String, String>,
}

impl LabelTranslator {
    pub fn new(config: &TranslationConfig) -> Self {
        Self {
            categories: config
                .categories
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            behaviors: config
                .behaviors
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Translator that returns every label unchanged
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn category<'a>(&'a self, label: &'a str) -> &'a str {
        self.categories.get(label).map(String::as_str).unwrap_or(label)
    }

    pub fn behavior<'a>(&'a self, label: &'a str) -> &'a str {
        self.behaviors.get(label).map(String::as_str).unwrap_or(label)
    }

    /// Translate a list of category labels, preserving order
    pub fn categories(&self, labels: &[String]) -> Vec<String> {
        labels.iter().map(|l| self.category(l).to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_labels() {
        let translator = LabelTranslator::new(&TranslationConfig::default());
        assert_eq!(translator.category("Rumiación"), "Rumination");
        assert_eq!(translator.category("Agonista"), "Agonistic");
        assert_eq!(translator.category("Unclassified"), "Unclassified");
        assert_eq!(translator.behavior("Masticar 1"), "Masticar 1");
    }

    #[test]
    fn test_identity_translator() {
        let translator = LabelTranslator::identity();
        assert_eq!(translator.category("Comer"), "Comer");
        assert_eq!(
            translator.categories(&["Comer".to_string(), "Beber".to_string()]),
            vec!["Comer", "Beber"]
        );
    }
}
