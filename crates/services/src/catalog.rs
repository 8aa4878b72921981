use std::sync::Arc;

use drive_core::descriptor::{ContentPack, ScenarioDescriptor};
use drive_core::model::{CategoryId, Choice, PhaseId, Scenario, ScenarioId};
use drive_core::scenario_ids::ScenarioIdScheme;

use crate::backend::ScenarioBackend;
use crate::error::SessionError;

/// Resolves what a scenario screen shows.
///
/// Authored descriptors from the content pack win. Otherwise the screen is
/// built from backend records; fetch failures are logged and degrade to an
/// empty list rather than failing the screen.
#[derive(Clone)]
pub struct ScenarioCatalog {
    backend: Arc<dyn ScenarioBackend>,
    content: Arc<ContentPack>,
    scheme: ScenarioIdScheme,
}

impl ScenarioCatalog {
    #[must_use]
    pub fn new(
        backend: Arc<dyn ScenarioBackend>,
        content: Arc<ContentPack>,
        scheme: ScenarioIdScheme,
    ) -> Self {
        Self {
            backend,
            content,
            scheme,
        }
    }

    #[must_use]
    pub fn content(&self) -> &ContentPack {
        &self.content
    }

    /// Scenarios of one phase, sorted by id. Empty on backend failure.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ScenarioId` if the phase does not fit the id layout.
    pub async fn phase_scenarios(
        &self,
        category: CategoryId,
        phase: PhaseId,
        count: usize,
    ) -> Result<Vec<Scenario>, SessionError> {
        let (first, last) = self.scheme.phase_range(category, phase, count)?;
        Ok(self.scenarios_in(first, last).await)
    }

    async fn scenarios_in(&self, first: ScenarioId, last: ScenarioId) -> Vec<Scenario> {
        let mut scenarios = match self.backend.list_scenarios(Some((first, last))).await {
            Ok(scenarios) => scenarios,
            Err(err) => {
                tracing::warn!(%first, %last, error = %err, "scenario listing failed");
                return Vec::new();
            }
        };
        // The backend may ignore the range filter.
        scenarios.retain(|s| s.id >= first && s.id <= last);
        scenarios.sort_by_key(|s| s.id);
        scenarios
    }

    /// Choices of one scenario. Empty on backend failure.
    pub async fn choices(&self, scenario_id: ScenarioId) -> Vec<Choice> {
        match self.backend.list_choices(scenario_id).await {
            Ok(choices) => choices,
            Err(err) => {
                tracing::warn!(%scenario_id, error = %err, "choice listing failed");
                Vec::new()
            }
        }
    }

    /// Descriptor for one screen.
    ///
    /// A descriptor built from a failed fetch has no choices; callers can
    /// detect that through `ScenarioDescriptor::validate`.
    pub async fn descriptor(&self, scenario_id: ScenarioId) -> ScenarioDescriptor {
        if let Some(authored) = self.content.get(scenario_id) {
            return authored.clone();
        }

        let scenario = self
            .scenarios_in(scenario_id, scenario_id)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| Scenario {
                id: scenario_id,
                description: format!("Scenario {scenario_id}"),
                category: None,
                phase: None,
            });
        let choices = self.choices(scenario_id).await;
        ScenarioDescriptor::from_backend(&scenario, &choices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthToken;
    use crate::backend::AttemptSubmission;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use drive_core::descriptor::{AnimationVariant, ChoiceDescriptor, SpriteSet};
    use drive_core::model::OptionKey;

    struct StubBackend {
        fail: bool,
    }

    fn scenario(id: u32) -> Scenario {
        Scenario {
            id: ScenarioId::new(id),
            description: format!("Question {id}"),
            category: None,
            phase: None,
        }
    }

    #[async_trait]
    impl ScenarioBackend for StubBackend {
        async fn list_scenarios(
            &self,
            _range: Option<(ScenarioId, ScenarioId)>,
        ) -> Result<Vec<Scenario>, BackendError> {
            if self.fail {
                return Err(BackendError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY));
            }
            // Ignores the range on purpose, unsorted.
            Ok(vec![scenario(63), scenario(12), scenario(61), scenario(62)])
        }

        async fn list_choices(&self, id: ScenarioId) -> Result<Vec<Choice>, BackendError> {
            if self.fail {
                return Err(BackendError::HttpStatus(reqwest::StatusCode::NOT_FOUND));
            }
            Ok(vec![
                Choice {
                    scenario_id: id,
                    option: OptionKey::parse("A").unwrap(),
                    text: "Yield".into(),
                    is_correct: true,
                    explanation: Some("Right before left.".into()),
                },
                Choice {
                    scenario_id: id,
                    option: OptionKey::parse("B").unwrap(),
                    text: "Go".into(),
                    is_correct: false,
                    explanation: None,
                },
            ])
        }

        async fn submit_attempt(
            &self,
            _token: &AuthToken,
            _submission: &AttemptSubmission,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn catalog(fail: bool, content: ContentPack) -> ScenarioCatalog {
        ScenarioCatalog::new(
            Arc::new(StubBackend { fail }),
            Arc::new(content),
            ScenarioIdScheme::default(),
        )
    }

    #[tokio::test]
    async fn phase_scenarios_are_filtered_and_sorted() {
        let scenarios = catalog(false, ContentPack::default())
            .phase_scenarios(CategoryId::new(3), PhaseId::new(1), 2)
            .await
            .unwrap();
        let ids: Vec<u32> = scenarios.iter().map(|s| s.id.value()).collect();
        assert_eq!(ids, vec![61, 62]);
    }

    #[tokio::test]
    async fn fetch_failures_degrade_to_empty_lists() {
        let c = catalog(true, ContentPack::default());
        assert!(c
            .phase_scenarios(CategoryId::new(3), PhaseId::new(1), 5)
            .await
            .unwrap()
            .is_empty());
        assert!(c.choices(ScenarioId::new(61)).await.is_empty());

        let d = c.descriptor(ScenarioId::new(61)).await;
        assert_eq!(d.question, "Scenario 61");
        assert!(d.choices.is_empty());
        assert!(d.validate().is_err());
    }

    #[tokio::test]
    async fn descriptor_is_built_from_backend_records() {
        let d = catalog(false, ContentPack::default())
            .descriptor(ScenarioId::new(62))
            .await;
        assert_eq!(d.question, "Question 62");
        assert_eq!(d.choices.len(), 2);
        assert_eq!(d.choices[0].explanation, "Right before left.");
        d.validate().unwrap();
    }

    #[tokio::test]
    async fn authored_descriptor_takes_precedence() {
        let authored = ScenarioDescriptor {
            scenario_id: ScenarioId::new(61),
            question: "Authored question".into(),
            intro: AnimationVariant::Stop,
            choices: vec![
                ChoiceDescriptor {
                    option: OptionKey::parse("A").unwrap(),
                    text: "Wait".into(),
                    correct: true,
                    animation: AnimationVariant::Wait,
                    explanation: String::new(),
                },
                ChoiceDescriptor {
                    option: OptionKey::parse("B").unwrap(),
                    text: "Honk".into(),
                    correct: false,
                    animation: AnimationVariant::Honk,
                    explanation: String::new(),
                },
            ],
            sprites: SpriteSet::default(),
        };
        let c = catalog(true, ContentPack::new(vec![authored.clone()]).unwrap());
        assert_eq!(c.descriptor(ScenarioId::new(61)).await, authored);
    }
}
