//! Declarative description of one scenario screen.
//!
//! A descriptor carries everything a screen needs besides drawing: the
//! question, the options, and for every option the canned feedback animation
//! and explanation. Animations are tagged per choice when content is
//! authored; option text is never inspected at runtime.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::model::{Choice, OptionKey, Scenario, ScenarioId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DescriptorError {
    #[error("scenario {0} has an empty question")]
    EmptyQuestion(ScenarioId),

    #[error("scenario {0} has fewer than two choices")]
    TooFewChoices(ScenarioId),

    #[error("scenario {scenario} repeats option {option}")]
    DuplicateOption { scenario: ScenarioId, option: OptionKey },

    #[error("scenario {scenario} must have exactly one correct choice, found {found}")]
    CorrectCount { scenario: ScenarioId, found: usize },

    #[error("scenario {scenario} has no option {option}")]
    UnknownOption { scenario: ScenarioId, option: OptionKey },

    #[error("scenario {0} is described more than once")]
    DuplicateScenario(ScenarioId),

    #[error("invalid content pack: {0}")]
    Parse(String),
}

//
// ─── ANIMATION ────────────────────────────────────────────────────────────────
//

/// Canned feedback animation played after an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationVariant {
    /// Player car continues through the scene.
    #[default]
    Proceed,
    /// Player car gives way to crossing traffic.
    Yield,
    /// Player car stops at the line.
    Stop,
    /// Player car waits for pedestrians to finish crossing.
    Wait,
    Overtake,
    Honk,
    Reverse,
    /// Collision overlay; used for unsafe choices.
    Collision,
}

impl AnimationVariant {
    /// Variant used when a choice arrives from the backend without authored content.
    #[must_use]
    pub fn fallback_for(is_correct: bool) -> Self {
        if is_correct {
            AnimationVariant::Proceed
        } else {
            AnimationVariant::Collision
        }
    }
}

//
// ─── SPRITES ──────────────────────────────────────────────────────────────────
//

fn default_fallback_sprite() -> String {
    "car_default".to_owned()
}

/// Sprite names keyed by direction or role ("north", "player", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSet {
    #[serde(default = "default_fallback_sprite")]
    pub fallback: String,
    #[serde(default)]
    pub by_key: BTreeMap<String, String>,
}

impl Default for SpriteSet {
    fn default() -> Self {
        Self {
            fallback: default_fallback_sprite(),
            by_key: BTreeMap::new(),
        }
    }
}

impl SpriteSet {
    /// Sprite for `key`, or the fallback sprite when the key is missing.
    #[must_use]
    pub fn resolve(&self, key: &str) -> &str {
        self.by_key
            .get(key)
            .map_or(self.fallback.as_str(), String::as_str)
    }
}

//
// ─── DESCRIPTORS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDescriptor {
    pub option: OptionKey,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub animation: AnimationVariant,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDescriptor {
    pub scenario_id: ScenarioId,
    pub question: String,
    #[serde(default)]
    pub intro: AnimationVariant,
    pub choices: Vec<ChoiceDescriptor>,
    #[serde(default)]
    pub sprites: SpriteSet,
}

/// Feedback for one selected option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub option: OptionKey,
    pub is_correct: bool,
    pub animation: AnimationVariant,
    pub explanation: String,
}

impl ScenarioDescriptor {
    /// Build a descriptor from backend records when no authored content exists.
    ///
    /// Choices keep backend order; animations use [`AnimationVariant::fallback_for`].
    #[must_use]
    pub fn from_backend(scenario: &Scenario, choices: &[Choice]) -> Self {
        Self {
            scenario_id: scenario.id,
            question: scenario.description.clone(),
            intro: AnimationVariant::default(),
            choices: choices
                .iter()
                .filter(|c| c.scenario_id == scenario.id)
                .map(|c| ChoiceDescriptor {
                    option: c.option.clone(),
                    text: c.text.clone(),
                    correct: c.is_correct,
                    animation: AnimationVariant::fallback_for(c.is_correct),
                    explanation: c.explanation.clone().unwrap_or_default(),
                })
                .collect(),
            sprites: SpriteSet::default(),
        }
    }

    /// # Errors
    ///
    /// Returns `DescriptorError` if the question is blank, there are fewer than
    /// two choices, an option repeats, or not exactly one choice is correct.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.question.trim().is_empty() {
            return Err(DescriptorError::EmptyQuestion(self.scenario_id));
        }
        if self.choices.len() < 2 {
            return Err(DescriptorError::TooFewChoices(self.scenario_id));
        }

        let mut seen = HashSet::new();
        for choice in &self.choices {
            if !seen.insert(&choice.option) {
                return Err(DescriptorError::DuplicateOption {
                    scenario: self.scenario_id,
                    option: choice.option.clone(),
                });
            }
        }

        let found = self.choices.iter().filter(|c| c.correct).count();
        if found != 1 {
            return Err(DescriptorError::CorrectCount {
                scenario: self.scenario_id,
                found,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn choice(&self, option: &OptionKey) -> Option<&ChoiceDescriptor> {
        self.choices.iter().find(|c| &c.option == option)
    }

    #[must_use]
    pub fn correct_choice(&self) -> Option<&ChoiceDescriptor> {
        self.choices.iter().find(|c| c.correct)
    }

    /// Resolve the feedback for a selected option.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::UnknownOption` if the option is not offered.
    pub fn evaluate(&self, option: &OptionKey) -> Result<Evaluation, DescriptorError> {
        let choice = self
            .choice(option)
            .ok_or_else(|| DescriptorError::UnknownOption {
                scenario: self.scenario_id,
                option: option.clone(),
            })?;
        Ok(Evaluation {
            option: choice.option.clone(),
            is_correct: choice.correct,
            animation: choice.animation,
            explanation: choice.explanation.clone(),
        })
    }
}

//
// ─── CONTENT PACK ─────────────────────────────────────────────────────────────
//

/// Authored descriptors indexed by scenario id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPack {
    descriptors: BTreeMap<ScenarioId, ScenarioDescriptor>,
}

impl ContentPack {
    /// # Errors
    ///
    /// Returns the first validation error, or `DescriptorError::DuplicateScenario`.
    pub fn new(descriptors: Vec<ScenarioDescriptor>) -> Result<Self, DescriptorError> {
        let mut map = BTreeMap::new();
        for descriptor in descriptors {
            descriptor.validate()?;
            let id = descriptor.scenario_id;
            if map.insert(id, descriptor).is_some() {
                return Err(DescriptorError::DuplicateScenario(id));
            }
        }
        Ok(Self { descriptors: map })
    }

    /// Parse a JSON array of descriptors.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::Parse` for malformed JSON, or any validation error.
    pub fn from_json(raw: &str) -> Result<Self, DescriptorError> {
        let descriptors: Vec<ScenarioDescriptor> =
            serde_json::from_str(raw).map_err(|err| DescriptorError::Parse(err.to_string()))?;
        Self::new(descriptors)
    }

    #[must_use]
    pub fn get(&self, id: ScenarioId) -> Option<&ScenarioDescriptor> {
        self.descriptors.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> OptionKey {
        OptionKey::parse(raw).unwrap()
    }

    fn yield_scenario() -> ScenarioDescriptor {
        ScenarioDescriptor {
            scenario_id: ScenarioId::new(61),
            question: "A car approaches from the right at an unmarked junction. What do you do?"
                .into(),
            intro: AnimationVariant::Proceed,
            choices: vec![
                ChoiceDescriptor {
                    option: key("A"),
                    text: "Give way to the car on the right".into(),
                    correct: true,
                    animation: AnimationVariant::Yield,
                    explanation: "Traffic from the right has priority.".into(),
                },
                ChoiceDescriptor {
                    option: key("B"),
                    text: "Overtake it before the junction".into(),
                    correct: false,
                    animation: AnimationVariant::Collision,
                    explanation: "Overtaking at a junction is prohibited.".into(),
                },
                ChoiceDescriptor {
                    option: key("C"),
                    text: "Honk and continue".into(),
                    correct: false,
                    animation: AnimationVariant::Honk,
                    explanation: "The horn does not grant priority.".into(),
                },
            ],
            sprites: SpriteSet::default(),
        }
    }

    #[test]
    fn evaluate_uses_authored_animation_tag() {
        let d = yield_scenario();
        d.validate().unwrap();

        let eval = d.evaluate(&key("b")).unwrap();
        assert!(!eval.is_correct);
        assert_eq!(eval.animation, AnimationVariant::Collision);

        let eval = d.evaluate(&key("A")).unwrap();
        assert!(eval.is_correct);
        assert_eq!(eval.animation, AnimationVariant::Yield);
    }

    #[test]
    fn evaluate_rejects_unknown_option() {
        let err = yield_scenario().evaluate(&key("D")).unwrap_err();
        assert!(matches!(err, DescriptorError::UnknownOption { .. }));
    }

    #[test]
    fn validate_requires_single_correct_choice() {
        let mut d = yield_scenario();
        d.choices[1].correct = true;
        assert_eq!(
            d.validate(),
            Err(DescriptorError::CorrectCount {
                scenario: ScenarioId::new(61),
                found: 2
            })
        );
    }

    #[test]
    fn validate_rejects_repeated_option() {
        let mut d = yield_scenario();
        d.choices[2].option = key("a");
        assert!(matches!(
            d.validate(),
            Err(DescriptorError::DuplicateOption { .. })
        ));
    }

    #[test]
    fn missing_sprite_key_falls_back() {
        let mut sprites = SpriteSet::default();
        sprites.by_key.insert("north".into(), "car_up".into());
        assert_eq!(sprites.resolve("north"), "car_up");
        assert_eq!(sprites.resolve("north-east"), "car_default");
    }

    #[test]
    fn from_backend_keeps_only_matching_choices() {
        let scenario = Scenario {
            id: ScenarioId::new(91),
            description: "A pedestrian waits at the zebra crossing.".into(),
            category: Some("Pedestrian".into()),
            phase: Some(1),
        };
        let choices = vec![
            Choice {
                scenario_id: ScenarioId::new(91),
                option: key("A"),
                text: "Stop".into(),
                is_correct: true,
                explanation: None,
            },
            Choice {
                scenario_id: ScenarioId::new(92),
                option: key("A"),
                text: "Unrelated".into(),
                is_correct: false,
                explanation: None,
            },
            Choice {
                scenario_id: ScenarioId::new(91),
                option: key("B"),
                text: "Accelerate".into(),
                is_correct: false,
                explanation: Some("Pedestrians have priority.".into()),
            },
        ];
        let d = ScenarioDescriptor::from_backend(&scenario, &choices);
        assert_eq!(d.choices.len(), 2);
        assert_eq!(d.choices[0].animation, AnimationVariant::Proceed);
        assert_eq!(d.choices[1].animation, AnimationVariant::Collision);
        d.validate().unwrap();
    }

    #[test]
    fn content_pack_parses_and_indexes() {
        let raw = r#"[{
            "scenario_id": 11,
            "question": "What does a solid white centre line mean?",
            "choices": [
                {"option": "A", "text": "Do not cross", "correct": true,
                 "animation": "stop", "explanation": "Solid lines must not be crossed."},
                {"option": "B", "text": "Overtake freely", "animation": "overtake"}
            ],
            "sprites": {"by_key": {"east": "car_right"}}
        }]"#;
        let pack = ContentPack::from_json(raw).unwrap();
        assert_eq!(pack.len(), 1);
        let d = pack.get(ScenarioId::new(11)).unwrap();
        assert_eq!(d.choices[1].animation, AnimationVariant::Overtake);
        assert_eq!(d.sprites.resolve("west"), "car_default");
    }

    #[test]
    fn content_pack_rejects_duplicates() {
        let err = ContentPack::new(vec![yield_scenario(), yield_scenario()]).unwrap_err();
        assert_eq!(err, DescriptorError::DuplicateScenario(ScenarioId::new(61)));
    }
}
