use std::fmt;

use drive_core::curriculum::{Curriculum, CurriculumError};
use drive_core::descriptor::{AnimationVariant, ChoiceDescriptor, Evaluation, ScenarioDescriptor};
use drive_core::model::{AttemptRecord, CategoryId, OptionKey, PhaseId, ScenarioId};

use super::tracker::{SessionCompletion, SessionTracker};
use crate::auth::AuthService;
use crate::catalog::ScenarioCatalog;
use crate::error::ScreenError;

/// Where the player goes after a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Next scenario of the same phase; `index` is zero-based.
    Scenario {
        category: CategoryId,
        phase: PhaseId,
        index: usize,
    },
    /// Start screen of the next phase or category.
    PhaseStart { category: CategoryId, phase: PhaseId },
    /// The curriculum is finished.
    Results,
    Login,
}

impl Route {
    /// Route taken once `(category, phase)` is complete.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` if the phase is not in the curriculum.
    pub fn after_phase(
        curriculum: &Curriculum,
        category: CategoryId,
        phase: PhaseId,
    ) -> Result<Self, CurriculumError> {
        Ok(match curriculum.next_phase(category, phase)? {
            Some((category, phase)) => Self::PhaseStart { category, phase },
            None => Self::Results,
        })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scenario {
                category,
                phase,
                index,
            } => write!(f, "/category/{category}/phase/{phase}/scenario/{index}"),
            Self::PhaseStart { category, phase } => {
                write!(f, "/category/{category}/phase/{phase}")
            }
            Self::Results => f.write_str("/results"),
            Self::Login => f.write_str("/login"),
        }
    }
}

/// Where a screen is in its flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    Intro,
    Question,
    Feedback(Evaluation),
    Finished(Route),
}

impl ScreenState {
    fn name(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Question => "question",
            Self::Feedback(_) => "feedback",
            Self::Finished(_) => "finished",
        }
    }
}

/// Result of mounting a screen.
#[derive(Debug)]
pub enum Mount {
    Ready(ScenarioScreen),
    Redirect(Route),
}

/// Headless flow of one scenario screen: intro, question, feedback, next.
///
/// Every scenario runs through this one type; what differs between screens
/// lives in the [`ScenarioDescriptor`].
#[derive(Debug)]
pub struct ScenarioScreen {
    descriptor: ScenarioDescriptor,
    state: ScreenState,
    record: Option<AttemptRecord>,
    completion: Option<SessionCompletion>,
}

impl ScenarioScreen {
    /// Mount the screen for the tracker's current scenario.
    ///
    /// Without a stored auth token the player is sent to login. A scenario
    /// whose descriptor does not validate still mounts; see [`Self::is_degraded`].
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::Session` if no session is active or the phase is
    /// already past its last scenario, and `ScreenError::Auth` if the device
    /// store cannot be read.
    pub async fn mount(
        tracker: &SessionTracker,
        auth: &AuthService,
        catalog: &ScenarioCatalog,
    ) -> Result<Mount, ScreenError> {
        if auth.token().await?.is_none() {
            tracing::info!("no auth token; redirecting to login");
            return Ok(Mount::Redirect(Route::Login));
        }
        let scenario_id = tracker.current_scenario_id()?;
        let descriptor = catalog.descriptor(scenario_id).await;
        if let Err(err) = descriptor.validate() {
            tracing::warn!(%scenario_id, error = %err, "scenario mounted in degraded state");
        }
        Ok(Mount::Ready(Self::new(descriptor)))
    }

    #[must_use]
    pub fn new(descriptor: ScenarioDescriptor) -> Self {
        Self {
            descriptor,
            state: ScreenState::Intro,
            record: None,
            completion: None,
        }
    }

    #[must_use]
    pub fn scenario_id(&self) -> ScenarioId {
        self.descriptor.scenario_id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.descriptor.question
    }

    #[must_use]
    pub fn intro(&self) -> AnimationVariant {
        self.descriptor.intro
    }

    #[must_use]
    pub fn choices(&self) -> &[ChoiceDescriptor] {
        &self.descriptor.choices
    }

    #[must_use]
    pub fn descriptor(&self) -> &ScenarioDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    /// True when the scenario has no usable question or choices, typically
    /// after the backend could not be reached.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.descriptor.validate().is_err()
    }

    /// The attempt recorded by [`Self::select`], with its submission status.
    #[must_use]
    pub fn record(&self) -> Option<&AttemptRecord> {
        self.record.as_ref()
    }

    /// Set when this screen closed the phase.
    #[must_use]
    pub fn completion(&self) -> Option<&SessionCompletion> {
        self.completion.as_ref()
    }

    fn invalid(&self, action: &'static str) -> ScreenError {
        ScreenError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    /// # Errors
    ///
    /// Returns `ScreenError::InvalidState` unless the intro is playing.
    pub fn finish_intro(&mut self) -> Result<(), ScreenError> {
        if self.state != ScreenState::Intro {
            return Err(self.invalid("finish_intro"));
        }
        self.state = ScreenState::Question;
        Ok(())
    }

    /// Evaluate the selected option and record it with the tracker.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::InvalidState` outside the question state,
    /// `ScreenError::Descriptor` for an option the screen does not offer, and
    /// `ScreenError::Session` if the tracker rejects the attempt.
    pub async fn select(
        &mut self,
        tracker: &mut SessionTracker,
        option: &OptionKey,
    ) -> Result<Evaluation, ScreenError> {
        if self.state != ScreenState::Question {
            return Err(self.invalid("select"));
        }
        let evaluation = self.descriptor.evaluate(option)?;
        let record = tracker
            .update_scenario_progress(
                self.descriptor.scenario_id,
                evaluation.option.clone(),
                evaluation.is_correct,
            )
            .await?;
        self.record = Some(record);
        self.state = ScreenState::Feedback(evaluation.clone());
        Ok(evaluation)
    }

    /// Leave the feedback state.
    ///
    /// Within a phase this advances the tracker. On the last scenario the
    /// session is completed and the route points at the next phase, or at
    /// the results once the curriculum is done.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::InvalidState` outside the feedback state and
    /// `ScreenError::Session` if the tracker fails.
    pub async fn next(&mut self, tracker: &mut SessionTracker) -> Result<Route, ScreenError> {
        if !matches!(self.state, ScreenState::Feedback(_)) {
            return Err(self.invalid("next"));
        }
        let session = tracker
            .session()
            .ok_or(crate::error::SessionError::NoActiveSession)?;
        let (category, phase) = (session.category_id(), session.phase_id());

        let route = if session.is_last_scenario() {
            match tracker.complete_session().await? {
                SessionCompletion::Incomplete { answered, total } => {
                    return Err(ScreenError::PhaseIncomplete { answered, total });
                }
                completion @ SessionCompletion::Complete(_) => {
                    self.completion = Some(completion);
                    Route::after_phase(tracker.curriculum(), category, phase)
                        .map_err(crate::error::SessionError::from)?
                }
            }
        } else {
            let index = tracker.move_to_next_scenario()?;
            Route::Scenario {
                category,
                phase,
                index,
            }
        };

        tracing::debug!(scenario_id = %self.scenario_id(), %route, "screen finished");
        self.state = ScreenState::Finished(route);
        Ok(route)
    }
}
