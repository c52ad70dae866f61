//! Rule-based keyword strategies

use super::{EscalationReason, EscalationStrategy};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

fn normalize(indicators: &[String]) -> Vec<String> {
    indicators
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn matching<'a>(lowered: &'a str, indicators: &'a [String]) -> impl Iterator<Item = &'a String> {
    indicators.iter().filter(move |i| lowered.contains(i.as_str()))
}

/// Escalates when the lower-cased message contains any indicator
pub struct KeywordStrategy {
    indicators: Vec<String>,
}

impl KeywordStrategy {
    pub fn new(indicators: &[String]) -> Self {
        Self {
            indicators: normalize(indicators),
        }
    }
}

#[async_trait]
impl EscalationStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn assess(&self, message: &str, _context: Option<&str>) -> Vec<EscalationReason> {
        let lowered = message.to_lowercase();
        matching(&lowered, &self.indicators)
            .map(|indicator| EscalationReason::Keyword {
                indicator: indicator.clone(),
            })
            .collect()
    }
}

/// Indicator sets keyed by context tag; only the current context's set is checked
pub struct ContextKeywordStrategy {
    by_context: HashMap<String, Vec<String>>,
}

impl ContextKeywordStrategy {
    pub fn new(by_context: &BTreeMap<String, Vec<String>>) -> Self {
        Self {
            by_context: by_context
                .iter()
                .map(|(context, indicators)| (context.clone(), normalize(indicators)))
                .collect(),
        }
    }
}

#[async_trait]
impl EscalationStrategy for ContextKeywordStrategy {
    fn name(&self) -> &'static str {
        "context_keyword"
    }

    async fn assess(&self, message: &str, context: Option<&str>) -> Vec<EscalationReason> {
        let Some((context, indicators)) = context.and_then(|c| self.by_context.get_key_value(c))
        else {
            return Vec::new();
        };

        let lowered = message.to_lowercase();
        matching(&lowered, indicators)
            .map(|indicator| EscalationReason::ContextKeyword {
                context: context.clone(),
                indicator: indicator.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_indicators_are_normalized() {
        let strategy = KeywordStrategy::new(&owned(&["  Not Working ", "", "ERROR"]));
        let reasons = strategy.assess("the build is not working", None).await;
        assert_eq!(
            reasons,
            vec![EscalationReason::Keyword {
                indicator: "not working".to_string()
            }]
        );

        assert!(strategy.assess("", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_matches_reported() {
        let strategy = KeywordStrategy::new(&owned(&["stuck", "failed", "debug"]));
        let reasons = strategy.assess("Stuck since the deploy FAILED", None).await;
        assert_eq!(reasons.len(), 2);
    }

    #[tokio::test]
    async fn test_non_ascii_indicators() {
        let strategy = KeywordStrategy::new(&owned(&["困って"]));
        assert_eq!(strategy.assess("とても困っています", None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_context_does_not_trigger() {
        let strategy = ContextKeywordStrategy::new(&BTreeMap::from([(
            "humanRelationship".to_string(),
            owned(&["conflict"]),
        )]));

        assert!(strategy.assess("a conflict at home", Some("career")).await.is_empty());
        assert!(strategy.assess("a conflict at home", None).await.is_empty());
        assert_eq!(
            strategy
                .assess("a Conflict at home", Some("humanRelationship"))
                .await
                .len(),
            1
        );
    }
}
