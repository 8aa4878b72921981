use std::path::Path;
use std::sync::Arc;

use drive_core::curriculum::Curriculum;
use drive_core::descriptor::ContentPack;
use drive_core::scenario_ids::ScenarioIdScheme;
use storage::repository::Storage;

use crate::Clock;
use crate::auth::AuthService;
use crate::backend::{HttpBackend, ScenarioBackend};
use crate::catalog::ScenarioCatalog;
use crate::config::AppConfig;
use crate::error::{AppServicesError, SessionError};
use crate::sessions::{SessionResultService, SessionTracker};

/// Assembles app-facing services from configuration.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    curriculum: Arc<Curriculum>,
    scheme: ScenarioIdScheme,
    storage: Storage,
    backend: Arc<dyn ScenarioBackend>,
    auth: AuthService,
    catalog: ScenarioCatalog,
    results: Arc<SessionResultService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails, or the
    /// curriculum or content pack cannot be loaded.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let backend: Arc<dyn ScenarioBackend> =
            Arc::new(HttpBackend::new(config.backend.clone())?);

        let curriculum = match &config.curriculum_path {
            Some(path) => Curriculum::from_json(&read_file(path)?)?,
            None => Curriculum::road_safety(),
        };
        let content = match &config.content_path {
            Some(path) => ContentPack::from_json(&read_file(path)?)?,
            None => ContentPack::default(),
        };
        tracing::info!(
            db_url = %config.db_url,
            backend = %config.backend.base_url(),
            categories = curriculum.categories().len(),
            authored_scenarios = content.len(),
            "app services configured"
        );

        Self::from_parts(clock, storage, backend, curriculum, content)
    }

    /// Wire services from already-built collaborators.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Curriculum` if the curriculum does not fit the id layout.
    pub fn from_parts(
        clock: Clock,
        storage: Storage,
        backend: Arc<dyn ScenarioBackend>,
        curriculum: Curriculum,
        content: ContentPack,
    ) -> Result<Self, AppServicesError> {
        let scheme = ScenarioIdScheme::default();
        curriculum.check_id_layout(&scheme)?;

        let auth = AuthService::new(Arc::clone(&storage.device));
        let catalog = ScenarioCatalog::new(Arc::clone(&backend), Arc::new(content), scheme);
        let results = Arc::new(SessionResultService::new(Arc::clone(&storage.results)));

        Ok(Self {
            clock,
            curriculum: Arc::new(curriculum),
            scheme,
            storage,
            backend,
            auth,
            catalog,
            results,
        })
    }

    /// A fresh tracker with no active session, owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Curriculum` if the curriculum does not fit the id layout.
    pub fn tracker(&self) -> Result<SessionTracker, SessionError> {
        SessionTracker::new(
            self.clock,
            Arc::clone(&self.curriculum),
            self.scheme,
            Arc::clone(&self.backend),
            self.auth.clone(),
            Arc::clone(&self.storage.results),
        )
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn results(&self) -> Arc<SessionResultService> {
        Arc::clone(&self.results)
    }
}

fn read_file(path: &Path) -> Result<String, AppServicesError> {
    std::fs::read_to_string(path).map_err(|source| AppServicesError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use drive_core::curriculum::{CategoryPlan, CurriculumError, PhasePlan};
    use drive_core::model::{CategoryId, PhaseId};
    use drive_core::time::fixed_clock;

    fn offline_backend() -> Arc<dyn ScenarioBackend> {
        let config = BackendConfig::new("http://127.0.0.1:9/api").unwrap();
        Arc::new(HttpBackend::new(config).unwrap())
    }

    #[test]
    fn from_parts_rejects_phase_larger_than_id_block() {
        let curriculum = Curriculum::new(vec![CategoryPlan {
            id: CategoryId::new(1),
            name: "Road Markings".into(),
            phases: vec![PhasePlan {
                id: PhaseId::new(1),
                scenario_count: 11,
            }],
        }])
        .unwrap();
        let result = AppServices::from_parts(
            fixed_clock(),
            Storage::in_memory(),
            offline_backend(),
            curriculum,
            ContentPack::default(),
        );
        assert!(matches!(
            result,
            Err(AppServicesError::Curriculum(CurriculumError::ExceedsIdLayout { .. }))
        ));
    }

    #[test]
    fn tracker_starts_without_session() {
        let services = AppServices::from_parts(
            fixed_clock(),
            Storage::in_memory(),
            offline_backend(),
            Curriculum::road_safety(),
            ContentPack::default(),
        )
        .unwrap();
        let tracker = services.tracker().unwrap();
        assert!(tracker.session().is_none());
        assert_eq!(services.curriculum().categories().len(), 4);
    }

    #[test]
    fn missing_content_file_is_reported_with_path() {
        let err = read_file(Path::new("/nonexistent/drive/content.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/drive/content.json"));
    }
}
