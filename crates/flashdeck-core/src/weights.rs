// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Content-derived weights for entries that carry no explicit weight.
//!
//! Longer and more structured answers are harder to memorize, so they get a
//! larger weight and come up more often. The weight only depends on the back
//! text, so the same entry always gets the same weight.

use serde::Deserialize;

use crate::types::entry::Weight;

/// Adds `add` to the weight when a count is strictly greater than `above`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub above: usize,
    pub add: u32,
}

impl Step {
    const fn new(above: usize, add: u32) -> Self {
        Self { above, add }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WeightRules {
    pub base: u32,
    /// Steps on the number of characters in the back text. Every step whose
    /// threshold is exceeded applies.
    pub length_steps: Vec<Step>,
    /// Steps on the number of whitespace-separated words in the back text.
    pub word_steps: Vec<Step>,
    /// Enumerations and paragraph references, e.g. `1)` or `§`.
    pub structural_markers: Vec<String>,
    pub structural_bonus: u32,
    /// Terms that mark an entry as belonging to a dense subject area.
    pub domain_terms: Vec<String>,
    pub domain_bonus: u32,
}

impl Default for WeightRules {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            base: 100,
            length_steps: vec![Step::new(200, 50), Step::new(400, 100), Step::new(600, 150)],
            word_steps: vec![Step::new(20, 25), Step::new(40, 50)],
            structural_markers: strings(&[";", "1)", "2)", "3)", "4)", "5)", "§", "GG§", "StGB"]),
            structural_bonus: 100,
            domain_terms: strings(&[
                "StGB",
                "GG§",
                "Recht",
                "Gesetz",
                "Verfassung",
                "Staat",
                "Demokratie",
            ]),
            domain_bonus: 50,
        }
    }
}

pub struct DynamicWeightAssigner {
    rules: WeightRules,
}

impl DynamicWeightAssigner {
    pub fn new(rules: WeightRules) -> Self {
        Self { rules }
    }

    pub fn weight(&self, back: &str) -> Weight {
        let rules = &self.rules;
        let char_count = back.chars().count();
        let word_count = back.split_whitespace().count();
        let mut weight = rules.base;
        weight = weight.saturating_add(step_bonus(&rules.length_steps, char_count));
        if rules.structural_markers.iter().any(|m| back.contains(m.as_str())) {
            weight = weight.saturating_add(rules.structural_bonus);
        }
        if rules.domain_terms.iter().any(|t| back.contains(t.as_str())) {
            weight = weight.saturating_add(rules.domain_bonus);
        }
        weight = weight.saturating_add(step_bonus(&rules.word_steps, word_count));
        Weight::from(weight)
    }
}

fn step_bonus(steps: &[Step], count: usize) -> u32 {
    steps
        .iter()
        .filter(|step| count > step.above)
        .fold(0u32, |total, step| total.saturating_add(step.add))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weigh(back: &str) -> f64 {
        DynamicWeightAssigner::new(WeightRules::default())
            .weight(back)
            .value()
    }

    #[test]
    fn test_short_text_gets_base_weight() {
        assert_eq!(weigh("дом"), 100.0);
        assert_eq!(weigh(""), 100.0);
    }

    #[test]
    fn test_length_steps_accumulate() {
        assert_eq!(weigh(&"x".repeat(200)), 100.0);
        assert_eq!(weigh(&"x".repeat(201)), 150.0);
        assert_eq!(weigh(&"x".repeat(401)), 250.0);
        assert_eq!(weigh(&"x".repeat(601)), 400.0);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 150 Cyrillic characters are 300 bytes.
        assert_eq!(weigh(&"д".repeat(150)), 100.0);
    }

    #[test]
    fn test_structural_markers() {
        assert_eq!(weigh("a; b"), 200.0);
        assert_eq!(weigh("1) eins 2) zwei"), 200.0);
        assert_eq!(weigh("siehe § 5"), 200.0);
    }

    #[test]
    fn test_domain_terms() {
        assert_eq!(weigh("Verfassung"), 150.0);
        // `StGB` is both a structural marker and a domain term.
        assert_eq!(weigh("StGB"), 250.0);
    }

    #[test]
    fn test_word_steps() {
        let words = |n: usize| vec!["w"; n].join(" ");
        assert_eq!(weigh(&words(20)), 100.0);
        assert_eq!(weigh(&words(21)), 125.0);
        assert_eq!(weigh(&words(41)), 175.0);
    }

    #[test]
    fn test_deterministic() {
        let text = "Gesetz über 1) dies; 2) das";
        assert_eq!(weigh(text), weigh(text));
    }

    #[test]
    fn test_custom_rules() {
        let rules = WeightRules {
            base: 1,
            length_steps: vec![],
            word_steps: vec![Step::new(1, 9)],
            structural_markers: vec![],
            structural_bonus: 0,
            domain_terms: vec!["law".to_string()],
            domain_bonus: 5,
        };
        let assigner = DynamicWeightAssigner::new(rules);
        assert_eq!(assigner.weight("law school").value(), 15.0);
    }

    #[test]
    fn test_huge_bonuses_saturate() {
        let rules = WeightRules {
            base: u32::MAX - 1,
            length_steps: vec![Step::new(0, u32::MAX), Step::new(1, u32::MAX)],
            word_steps: vec![Step::new(0, u32::MAX)],
            structural_markers: vec![";".to_string()],
            structural_bonus: u32::MAX,
            domain_terms: vec!["law".to_string()],
            domain_bonus: u32::MAX,
        };
        let assigner = DynamicWeightAssigner::new(rules);
        assert_eq!(assigner.weight("law; order").value(), u32::MAX as f64);
    }
}
