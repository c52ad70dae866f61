//! Deep-exploration request detection
//!
//! Independent of escalation: a user asking to "go deeper" changes the model
//! choice, not the conversation mode.

use regex::{Regex, RegexBuilder};

pub struct DeepExplorationDetector {
    indicators: Vec<String>,
    patterns: Vec<Regex>,
}

impl DeepExplorationDetector {
    pub fn new(indicators: &[String], patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            indicators: indicators
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            patterns,
        })
    }

    pub fn detect(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.indicators.iter().any(|i| lowered.contains(i.as_str()))
            || self.patterns.iter().any(|p| p.is_match(message))
    }
}
