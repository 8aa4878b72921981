use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::{CategoryId, PhaseId};
use crate::scenario_ids::ScenarioIdScheme;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("curriculum has no categories")]
    Empty,

    #[error("category {0} is listed more than once")]
    DuplicateCategory(CategoryId),

    #[error("category {0} has no phases")]
    NoPhases(CategoryId),

    #[error("category {category} lists phase {phase} out of order")]
    PhaseOrder { category: CategoryId, phase: PhaseId },

    #[error("category {category} phase {phase} has no scenarios")]
    EmptyPhase { category: CategoryId, phase: PhaseId },

    #[error("unknown category {0}")]
    UnknownCategory(CategoryId),

    #[error("unknown phase {phase} in category {category}")]
    UnknownPhase { category: CategoryId, phase: PhaseId },

    #[error("category {category} phase {phase} does not fit the scenario id layout")]
    ExceedsIdLayout { category: CategoryId, phase: PhaseId },

    #[error("invalid curriculum document: {0}")]
    Parse(String),
}

//
// ─── PLANS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePlan {
    pub id: PhaseId,
    pub scenario_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPlan {
    pub id: CategoryId,
    pub name: String,
    pub phases: Vec<PhasePlan>,
}

impl CategoryPlan {
    fn uniform(id: u32, name: &str, phases: u32, scenario_count: usize) -> Self {
        Self {
            id: CategoryId::new(id),
            name: name.to_owned(),
            phases: (1..=phases)
                .map(|phase| PhasePlan {
                    id: PhaseId::new(phase),
                    scenario_count,
                })
                .collect(),
        }
    }
}

/// A phase resolved against its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRef<'a> {
    pub category: &'a CategoryPlan,
    pub phase: &'a PhasePlan,
}

//
// ─── CURRICULUM ───────────────────────────────────────────────────────────────
//

/// Ordered categories and their phases.
///
/// Phases are numbered 1..=n inside each category; categories keep the order
/// they are listed in, which is also the play order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Curriculum {
    categories: Vec<CategoryPlan>,
}

impl Curriculum {
    /// # Errors
    ///
    /// Returns `CurriculumError` if the plan is empty, repeats a category,
    /// numbers phases out of order or has an empty phase.
    pub fn new(categories: Vec<CategoryPlan>) -> Result<Self, CurriculumError> {
        if categories.is_empty() {
            return Err(CurriculumError::Empty);
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if !seen.insert(category.id) {
                return Err(CurriculumError::DuplicateCategory(category.id));
            }
            if category.phases.is_empty() {
                return Err(CurriculumError::NoPhases(category.id));
            }
            for (expected, phase) in (1_u32..).zip(&category.phases) {
                if phase.id.value() != expected {
                    return Err(CurriculumError::PhaseOrder {
                        category: category.id,
                        phase: phase.id,
                    });
                }
                if phase.scenario_count == 0 {
                    return Err(CurriculumError::EmptyPhase {
                        category: category.id,
                        phase: phase.id,
                    });
                }
            }
        }

        Ok(Self { categories })
    }

    /// The four road-safety categories, three phases of five scenarios each.
    #[must_use]
    pub fn road_safety() -> Self {
        Self {
            categories: vec![
                CategoryPlan::uniform(1, "Road Markings", 3, 5),
                CategoryPlan::uniform(2, "Traffic Signs", 3, 5),
                CategoryPlan::uniform(3, "Intersection", 3, 5),
                CategoryPlan::uniform(4, "Pedestrian", 3, 5),
            ],
        }
    }

    /// Parse a JSON list of categories.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::Parse` for malformed JSON, or any validation error from [`Self::new`].
    pub fn from_json(raw: &str) -> Result<Self, CurriculumError> {
        let categories: Vec<CategoryPlan> =
            serde_json::from_str(raw).map_err(|err| CurriculumError::Parse(err.to_string()))?;
        Self::new(categories)
    }

    /// Check that every phase fits its block in the id layout.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::ExceedsIdLayout` naming the first phase that does not fit.
    pub fn check_id_layout(&self, scheme: &ScenarioIdScheme) -> Result<(), CurriculumError> {
        for category in &self.categories {
            for phase in &category.phases {
                if scheme
                    .phase_range(category.id, phase.id, phase.scenario_count)
                    .is_err()
                {
                    return Err(CurriculumError::ExceedsIdLayout {
                        category: category.id,
                        phase: phase.id,
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn categories(&self) -> &[CategoryPlan] {
        &self.categories
    }

    /// # Errors
    ///
    /// Returns `CurriculumError::UnknownCategory` if the category is not listed.
    pub fn category(&self, id: CategoryId) -> Result<&CategoryPlan, CurriculumError> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or(CurriculumError::UnknownCategory(id))
    }

    /// # Errors
    ///
    /// Returns `CurriculumError` if the category or phase is not listed.
    pub fn phase(
        &self,
        category: CategoryId,
        phase: PhaseId,
    ) -> Result<PhaseRef<'_>, CurriculumError> {
        let plan = self.category(category)?;
        let phase_plan = plan
            .phases
            .iter()
            .find(|p| p.id == phase)
            .ok_or(CurriculumError::UnknownPhase { category, phase })?;
        Ok(PhaseRef {
            category: plan,
            phase: phase_plan,
        })
    }

    /// The phase played after `(category, phase)`.
    ///
    /// Returns the next phase of the same category, else the first phase of
    /// the next category, else `None` when the curriculum is finished.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` if the starting point is not listed.
    pub fn next_phase(
        &self,
        category: CategoryId,
        phase: PhaseId,
    ) -> Result<Option<(CategoryId, PhaseId)>, CurriculumError> {
        self.phase(category, phase)?;
        let position = self
            .categories
            .iter()
            .position(|c| c.id == category)
            .ok_or(CurriculumError::UnknownCategory(category))?;
        let current = &self.categories[position];

        if let Some(next) = current.phases.iter().find(|p| p.id > phase) {
            return Ok(Some((category, next.id)));
        }

        Ok(self
            .categories
            .get(position + 1)
            .and_then(|next| next.phases.first().map(|p| (next.id, p.id))))
    }
}

impl Default for Curriculum {
    fn default() -> Self {
        Self::road_safety()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_safety_curriculum_is_valid_and_fits_default_layout() {
        let curriculum = Curriculum::road_safety();
        let rebuilt = Curriculum::new(curriculum.categories().to_vec()).unwrap();
        assert_eq!(rebuilt, curriculum);
        curriculum
            .check_id_layout(&ScenarioIdScheme::default())
            .unwrap();
    }

    #[test]
    fn next_phase_walks_phases_then_categories() {
        let c = Curriculum::road_safety();
        assert_eq!(
            c.next_phase(CategoryId::new(3), PhaseId::new(1)).unwrap(),
            Some((CategoryId::new(3), PhaseId::new(2)))
        );
        assert_eq!(
            c.next_phase(CategoryId::new(3), PhaseId::new(3)).unwrap(),
            Some((CategoryId::new(4), PhaseId::new(1)))
        );
        assert_eq!(c.next_phase(CategoryId::new(4), PhaseId::new(3)).unwrap(), None);
    }

    #[test]
    fn unknown_phase_is_reported() {
        let c = Curriculum::road_safety();
        let err = c.phase(CategoryId::new(2), PhaseId::new(9)).unwrap_err();
        assert_eq!(
            err,
            CurriculumError::UnknownPhase {
                category: CategoryId::new(2),
                phase: PhaseId::new(9)
            }
        );
        assert_eq!(
            c.category(CategoryId::new(7)).unwrap_err(),
            CurriculumError::UnknownCategory(CategoryId::new(7))
        );
    }

    #[test]
    fn from_json_validates_phase_numbering() {
        let raw = r#"[{"id": 1, "name": "Road Markings",
                       "phases": [{"id": 2, "scenario_count": 4}]}]"#;
        let err = Curriculum::from_json(raw).unwrap_err();
        assert_eq!(
            err,
            CurriculumError::PhaseOrder {
                category: CategoryId::new(1),
                phase: PhaseId::new(2)
            }
        );
    }

    #[test]
    fn layout_check_rejects_oversized_phase() {
        let c = Curriculum::new(vec![CategoryPlan {
            id: CategoryId::new(1),
            name: "Road Markings".into(),
            phases: vec![PhasePlan {
                id: PhaseId::new(1),
                scenario_count: 11,
            }],
        }])
        .unwrap();
        assert!(matches!(
            c.check_id_layout(&ScenarioIdScheme::default()),
            Err(CurriculumError::ExceedsIdLayout { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_and_empty_plans() {
        assert_eq!(Curriculum::new(Vec::new()), Err(CurriculumError::Empty));
        let dup = vec![
            CategoryPlan::uniform(1, "A", 1, 1),
            CategoryPlan::uniform(1, "B", 1, 1),
        ];
        assert_eq!(
            Curriculum::new(dup),
            Err(CurriculumError::DuplicateCategory(CategoryId::new(1)))
        );
    }
}
