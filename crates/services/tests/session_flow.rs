use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drive_core::curriculum::Curriculum;
use drive_core::descriptor::{AnimationVariant, ContentPack};
use drive_core::model::{CategoryId, Choice, OptionKey, PhaseId, Scenario, ScenarioId};
use drive_core::time::fixed_clock;
use services::{
    AppServices, AttemptSubmission, AuthToken, BackendError, Mount, Route,
    ScenarioBackend, ScenarioScreen, ScreenError, ScreenState, SessionCompletion,
    SessionTracker,
};
use storage::repository::Storage;

/// Backend serving two choices per scenario; "A" is always correct.
#[derive(Default)]
struct FakeBackend {
    fail_submissions: AtomicBool,
    offline: AtomicBool,
    submitted: Mutex<Vec<(u32, String)>>,
}

impl FakeBackend {
    fn submitted(&self) -> Vec<(u32, String)> {
        self.submitted.lock().unwrap().clone()
    }

    fn offline_error() -> BackendError {
        BackendError::HttpStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[async_trait]
impl ScenarioBackend for FakeBackend {
    async fn list_scenarios(
        &self,
        range: Option<(ScenarioId, ScenarioId)>,
    ) -> Result<Vec<Scenario>, BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Self::offline_error());
        }
        let (first, last) = range.map_or((1, 120), |(a, b)| (a.value(), b.value()));
        Ok((first..=last)
            .map(|id| Scenario {
                id: ScenarioId::new(id),
                description: format!("What do you do at scene {id}?"),
                category: None,
                phase: None,
            })
            .collect())
    }

    async fn list_choices(&self, id: ScenarioId) -> Result<Vec<Choice>, BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Self::offline_error());
        }
        Ok(vec![
            Choice {
                scenario_id: id,
                option: OptionKey::parse("A").unwrap(),
                text: "Slow down and yield".into(),
                is_correct: true,
                explanation: Some("Yielding avoids the conflict.".into()),
            },
            Choice {
                scenario_id: id,
                option: OptionKey::parse("B").unwrap(),
                text: "Keep going".into(),
                is_correct: false,
                explanation: None,
            },
        ])
    }

    async fn submit_attempt(
        &self,
        _token: &AuthToken,
        submission: &AttemptSubmission,
    ) -> Result<(), BackendError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(BackendError::HttpStatus(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        self.submitted.lock().unwrap().push((
            submission.scenario_id.value(),
            submission.selected_option.to_string(),
        ));
        Ok(())
    }
}

async fn services(backend: Arc<FakeBackend>, logged_in: bool) -> AppServices {
    let services = AppServices::from_parts(
        fixed_clock(),
        Storage::in_memory(),
        backend,
        Curriculum::road_safety(),
        ContentPack::default(),
    )
    .unwrap();
    if logged_in {
        services.auth().store_token("player-token").await.unwrap();
    }
    services
}

async fn mount(services: &AppServices, tracker: &SessionTracker) -> ScenarioScreen {
    match ScenarioScreen::mount(tracker, services.auth(), services.catalog())
        .await
        .unwrap()
    {
        Mount::Ready(screen) => screen,
        Mount::Redirect(route) => panic!("unexpected redirect to {route}"),
    }
}

/// Plays the current phase to the end, answering with `answers` in order.
async fn play_phase(
    services: &AppServices,
    tracker: &mut SessionTracker,
    answers: &[&str],
) -> Route {
    let mut route = None;
    for answer in answers {
        let mut screen = mount(services, tracker).await;
        screen.finish_intro().unwrap();
        screen
            .select(tracker, &OptionKey::parse(answer).unwrap())
            .await
            .unwrap();
        route = Some(screen.next(tracker).await.unwrap());
    }
    route.unwrap()
}

#[tokio::test]
async fn intersection_phase_runs_screen_by_screen() {
    let backend = Arc::new(FakeBackend::default());
    let services = services(Arc::clone(&backend), true).await;
    let mut tracker = services.tracker().unwrap();
    tracker
        .start_session(CategoryId::new(3), PhaseId::new(1), "Intersection")
        .unwrap();

    let mut screen = mount(&services, &tracker).await;
    assert_eq!(screen.scenario_id(), ScenarioId::new(61));
    assert_eq!(screen.choices().len(), 2);
    screen.finish_intro().unwrap();

    let evaluation = screen
        .select(&mut tracker, &OptionKey::parse("a").unwrap())
        .await
        .unwrap();
    assert!(evaluation.is_correct);
    assert_eq!(evaluation.animation, AnimationVariant::Proceed);
    assert_eq!(evaluation.explanation, "Yielding avoids the conflict.");

    let route = screen.next(&mut tracker).await.unwrap();
    assert_eq!(
        route,
        Route::Scenario {
            category: CategoryId::new(3),
            phase: PhaseId::new(1),
            index: 1
        }
    );
    assert_eq!(screen.state(), &ScreenState::Finished(route));

    let mut screen = mount(&services, &tracker).await;
    assert_eq!(screen.scenario_id(), ScenarioId::new(62));
    screen.finish_intro().unwrap();
    let evaluation = screen
        .select(&mut tracker, &OptionKey::parse("B").unwrap())
        .await
        .unwrap();
    assert!(!evaluation.is_correct);
    assert_eq!(evaluation.animation, AnimationVariant::Collision);

    let attempts: Vec<(u32, bool)> = tracker
        .session()
        .unwrap()
        .attempts()
        .map(|a| (a.scenario_id().value(), a.is_correct()))
        .collect();
    assert_eq!(attempts, vec![(61, true), (62, false)]);
    assert_eq!(
        backend.submitted(),
        vec![(61, "A".to_owned()), (62, "B".to_owned())]
    );
}

#[tokio::test]
async fn finishing_a_phase_routes_to_the_next_and_stores_the_result() {
    let backend = Arc::new(FakeBackend::default());
    let services = services(Arc::clone(&backend), true).await;
    let mut tracker = services.tracker().unwrap();

    tracker
        .start_session(CategoryId::new(3), PhaseId::new(3), "")
        .unwrap();
    let route = play_phase(&services, &mut tracker, &["A", "B", "A", "A", "B"]).await;
    assert_eq!(
        route,
        Route::PhaseStart {
            category: CategoryId::new(4),
            phase: PhaseId::new(1)
        }
    );

    let results = services.results();
    let items = results.list_recent(None, 10).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].category_name, "Intersection");
    assert_eq!((items[0].score, items[0].total, items[0].unsynced), (3, 5, 0));
    assert_eq!(
        results
            .best_score(CategoryId::new(3), PhaseId::new(3))
            .await
            .unwrap(),
        Some(3)
    );

    tracker
        .start_session(CategoryId::new(4), PhaseId::new(3), "Pedestrian")
        .unwrap();
    let route = play_phase(&services, &mut tracker, &["A"; 5]).await;
    assert_eq!(route, Route::Results);
}

#[tokio::test]
async fn failed_submissions_still_complete_with_local_attempts() {
    let backend = Arc::new(FakeBackend::default());
    backend.fail_submissions.store(true, Ordering::SeqCst);
    let services = services(Arc::clone(&backend), true).await;
    let mut tracker = services.tracker().unwrap();
    tracker
        .start_session(CategoryId::new(1), PhaseId::new(1), "Road Markings")
        .unwrap();

    let mut last_screen = None;
    for _ in 0..5 {
        let mut screen = mount(&services, &tracker).await;
        screen.finish_intro().unwrap();
        screen
            .select(&mut tracker, &OptionKey::parse("A").unwrap())
            .await
            .unwrap();
        assert!(!screen.record().unwrap().submission().is_accepted());
        screen.next(&mut tracker).await.unwrap();
        last_screen = Some(screen);
    }

    let Some(SessionCompletion::Complete(done)) = last_screen.unwrap().completion().cloned()
    else {
        panic!("last screen should complete the session");
    };
    assert_eq!(done.summary.attempts().len(), 5);
    assert_eq!(done.summary.score(), 5);
    let unsynced: Vec<u32> = done.summary.unsynced().iter().map(|id| id.value()).collect();
    assert_eq!(unsynced, vec![1, 2, 3, 4, 5]);
    assert!(backend.submitted().is_empty());
}

#[tokio::test]
async fn missing_token_redirects_to_login() {
    let services = services(Arc::default(), false).await;
    let mut tracker = services.tracker().unwrap();
    tracker
        .start_session(CategoryId::new(2), PhaseId::new(1), "Traffic Signs")
        .unwrap();

    let mount = ScenarioScreen::mount(&tracker, services.auth(), services.catalog())
        .await
        .unwrap();
    assert!(matches!(mount, Mount::Redirect(Route::Login)));
}

#[tokio::test]
async fn offline_backend_mounts_a_degraded_screen() {
    let backend = Arc::new(FakeBackend::default());
    backend.offline.store(true, Ordering::SeqCst);
    let services = services(Arc::clone(&backend), true).await;
    let mut tracker = services.tracker().unwrap();
    tracker
        .start_session(CategoryId::new(2), PhaseId::new(2), "Traffic Signs")
        .unwrap();

    let mut screen = mount(&services, &tracker).await;
    assert!(screen.is_degraded());
    assert_eq!(screen.question(), "Scenario 41");
    screen.finish_intro().unwrap();
    assert!(matches!(
        screen
            .select(&mut tracker, &OptionKey::parse("A").unwrap())
            .await,
        Err(ScreenError::Descriptor(_))
    ));
    assert!(tracker.session().unwrap().records().is_empty());
}

#[tokio::test]
async fn actions_out_of_order_are_rejected() {
    let services = services(Arc::default(), true).await;
    let mut tracker = services.tracker().unwrap();
    tracker
        .start_session(CategoryId::new(1), PhaseId::new(2), "Road Markings")
        .unwrap();

    let mut screen = mount(&services, &tracker).await;
    assert!(matches!(
        screen
            .select(&mut tracker, &OptionKey::parse("A").unwrap())
            .await,
        Err(ScreenError::InvalidState {
            action: "select",
            state: "intro"
        })
    ));
    screen.finish_intro().unwrap();
    assert!(matches!(
        screen.next(&mut tracker).await,
        Err(ScreenError::InvalidState {
            action: "next",
            state: "question"
        })
    ));
}
