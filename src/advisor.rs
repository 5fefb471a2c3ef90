//! Keyword-driven city advisor.
//!
//! Answers free-text questions about the current projection by matching
//! topics in a fixed order (happiness, trees, air, factories) and reading
//! the latest prediction output as context.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::actions::{FactoryType, UserActions};
use crate::error::{TwinError, TwinResult, ValidationError};
use crate::timepoint::TimePoint;

/// Compiled once per process, in `Topic::ORDERED` order.
static TOPIC_MATCHERS: OnceLock<Result<Vec<(Topic, Regex)>, String>> = OnceLock::new();

fn topic_matchers() -> TwinResult<&'static [(Topic, Regex)]> {
    TOPIC_MATCHERS
        .get_or_init(|| {
            Topic::ORDERED
                .iter()
                .map(|&topic| {
                    Regex::new(topic.pattern())
                        .map(|re| (topic, re))
                        .map_err(|e| format!("invalid advisor pattern for {topic:?}: {e}"))
                })
                .collect()
        })
        .as_deref()
        .map_err(|message| TwinError::internal(message.clone()))
}

/// Question topics, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// "happiness"
    Happiness,
    /// "tree" or "plant"
    Trees,
    /// "aqi" or "air"
    Air,
    /// "factory"
    Factory,
}

impl Topic {
    /// Every topic, highest priority first.
    pub const ORDERED: [Self; 4] = [Self::Happiness, Self::Trees, Self::Air, Self::Factory];

    /// Case-insensitive substring pattern.
    const fn pattern(self) -> &'static str {
        match self {
            Self::Happiness => "(?i)happiness",
            Self::Trees => "(?i)tree|plant",
            Self::Air => "(?i)aqi|air",
            Self::Factory => "(?i)factory",
        }
    }
}

/// Read-only view of the latest prediction the question refers to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatContext {
    /// City or district the prediction was made for.
    pub locality: Option<String>,
    /// Final projected year.
    pub current_stats: Option<TimePoint>,
    /// Actions the prediction was run with.
    pub actions: Option<UserActions>,
    /// Remediation estimate from the prediction.
    pub trees_needed: u64,
}

/// Rule-based responder.
#[derive(Debug, Clone)]
pub struct CityAdvisor {
    /// Happiness below this is reported as low.
    pub low_happiness: f64,
    /// AQI above this is reported as dangerous.
    pub dangerous_aqi: f64,
}

impl Default for CityAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

impl CityAdvisor {
    /// Advisor with the default thresholds (happiness 50, AQI 100).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            low_happiness: 50.0,
            dangerous_aqi: 100.0,
        }
    }

    /// First topic mentioned in `message`, if any.
    pub fn classify(&self, message: &str) -> TwinResult<Option<Topic>> {
        Ok(topic_matchers()?
            .iter()
            .find(|(_, re)| re.is_match(message))
            .map(|&(topic, _)| topic))
    }

    /// Answers `message` using `context`.
    ///
    /// # Errors
    ///
    /// Happiness and air questions need `context.current_stats`; without it
    /// a `ValidationError::MissingField` is returned.
    pub fn respond(&self, message: &str, context: &ChatContext) -> TwinResult<String> {
        let reply = match self.classify(message)? {
            Some(Topic::Happiness) => {
                if current_stats(context)?.happiness_index < self.low_happiness {
                    "Happiness is low due to poor environmental conditions. Try planting more trees (at least 500) or enforcing green policies to improve air quality.".to_string()
                } else {
                    "The community is generally happy! Maintaining green cover and social equality is key to keeping this score high.".to_string()
                }
            }
            Some(Topic::Trees) => {
                if context.trees_needed > 0 {
                    format!(
                        "We've lost significant green cover. To restore balance and happiness, I recommend planting about {} trees immediately.",
                        context.trees_needed
                    )
                } else {
                    "Our green cover is healthy. Planting more trees is always beneficial for long-term carbon offsetting.".to_string()
                }
            }
            Some(Topic::Air) => {
                if current_stats(context)?.aqi > self.dangerous_aqi {
                    "Air quality is dangerous. If you have factories enabled, consider switching to 'Electronics' or 'None', or turn on 'Expand Public Transport'.".to_string()
                } else {
                    "Air quality is acceptable. Keep expanding renewable energy to maintain this.".to_string()
                }
            }
            Some(Topic::Factory) => {
                let factory = context
                    .actions
                    .as_ref()
                    .map_or(FactoryType::None, |a| a.factory_type);
                if factory == FactoryType::Chemical {
                    "The Chemical factory is causing severe water pollution. This lowers the Health Index drastically.".to_string()
                } else {
                    "Factories boost the economy but cost environment points. Ensure you offset their emissions with Solar infrastructure.".to_string()
                }
            }
            None => "I am the City Expert. You can ask me about Happiness, AQI, Trees, or how to improve the locality.".to_string(),
        };
        Ok(reply)
    }
}

fn current_stats(context: &ChatContext) -> Result<&TimePoint, ValidationError> {
    context
        .current_stats
        .as_ref()
        .ok_or_else(|| ValidationError::MissingField {
            field: "context.current_stats".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(aqi: f64, happiness: f64) -> TimePoint {
        TimePoint {
            year: 2030,
            aqi,
            water_quality: 50.0,
            pollution_index: aqi * 1.2,
            carbon_budget: 700.0,
            health_index: 40.0,
            respiratory_risk: 10.0,
            social_inequality: 50.0,
            happiness_index: happiness,
        }
    }

    fn context(aqi: f64, happiness: f64) -> ChatContext {
        ChatContext {
            locality: Some("Kochi".to_string()),
            current_stats: Some(stats(aqi, happiness)),
            actions: Some(UserActions::none()),
            trees_needed: 0,
        }
    }

    #[test]
    fn topics_match_case_insensitive_substrings_in_priority_order() {
        let advisor = CityAdvisor::new();
        assert_eq!(advisor.classify("HAPPINESS?").unwrap(), Some(Topic::Happiness));
        assert_eq!(advisor.classify("any plantation plans").unwrap(), Some(Topic::Trees));
        assert_eq!(advisor.classify("is the Air ok").unwrap(), Some(Topic::Air));
        assert_eq!(advisor.classify("what about the factory").unwrap(), Some(Topic::Factory));
        // Happiness wins over trees.
        assert_eq!(
            advisor.classify("will trees raise happiness").unwrap(),
            Some(Topic::Happiness)
        );
        assert_eq!(advisor.classify("hello").unwrap(), None);
    }

    #[test]
    fn every_topic_pattern_compiles_in_priority_order() {
        let matchers = topic_matchers().unwrap();
        let topics: Vec<Topic> = matchers.iter().map(|(t, _)| *t).collect();
        assert_eq!(topics, Topic::ORDERED.to_vec());
        // Repeated lookups reuse the same compiled set.
        assert!(std::ptr::eq(matchers, topic_matchers().unwrap()));
    }

    #[test]
    fn happiness_answers_depend_on_threshold() {
        let advisor = CityAdvisor::new();
        let low = advisor.respond("happiness", &context(80.0, 49.9)).unwrap();
        assert!(low.starts_with("Happiness is low"));
        let ok = advisor.respond("happiness", &context(80.0, 50.0)).unwrap();
        assert!(ok.starts_with("The community is generally happy"));
    }

    #[test]
    fn tree_answer_quotes_recommendation() {
        let advisor = CityAdvisor::new();
        let mut ctx = context(80.0, 40.0);
        ctx.trees_needed = 1234;
        let reply = advisor.respond("How many trees?", &ctx).unwrap();
        assert!(reply.contains("about 1234 trees"));

        ctx.trees_needed = 0;
        let reply = advisor.respond("trees?", &ctx).unwrap();
        assert!(reply.starts_with("Our green cover is healthy"));
    }

    #[test]
    fn air_answer_flags_dangerous_aqi() {
        let advisor = CityAdvisor::new();
        assert!(advisor
            .respond("aqi", &context(100.5, 60.0))
            .unwrap()
            .starts_with("Air quality is dangerous"));
        assert!(advisor
            .respond("aqi", &context(100.0, 60.0))
            .unwrap()
            .starts_with("Air quality is acceptable"));
    }

    #[test]
    fn factory_answer_singles_out_chemical() {
        let advisor = CityAdvisor::new();
        let mut ctx = context(80.0, 60.0);
        ctx.actions = Some(UserActions::none().with_factory(FactoryType::Chemical));
        assert!(advisor
            .respond("factory", &ctx)
            .unwrap()
            .starts_with("The Chemical factory"));

        ctx.actions = None;
        assert!(advisor
            .respond("factory", &ctx)
            .unwrap()
            .starts_with("Factories boost the economy"));
    }

    #[test]
    fn stat_questions_require_stats() {
        let advisor = CityAdvisor::new();
        let err = advisor.respond("air", &ChatContext::default()).unwrap_err();
        assert!(err.is_validation());

        // Tree and fallback answers work without stats.
        assert!(advisor.respond("plant", &ChatContext::default()).is_ok());
        assert!(advisor
            .respond("hi", &ChatContext::default())
            .unwrap()
            .starts_with("I am the City Expert"));
    }
}
