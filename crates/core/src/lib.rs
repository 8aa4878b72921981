#![forbid(unsafe_code)]

pub mod curriculum;
pub mod descriptor;
pub mod model;
pub mod scenario_ids;
pub mod time;

pub use curriculum::{CategoryPlan, Curriculum, CurriculumError, PhasePlan};
pub use descriptor::{AnimationVariant, ContentPack, Evaluation, ScenarioDescriptor};
pub use scenario_ids::{ScenarioIdError, ScenarioIdScheme, ScenarioLocation};
pub use time::Clock;
