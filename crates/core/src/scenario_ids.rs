//! Mapping between (category, phase, index) and backend scenario ids.
//!
//! Every phase owns a contiguous block of ids. With the default layout
//! (three phases per category, blocks of ten) Road Markings phase 1 covers
//! ids 1..=10, Traffic Signs phase 2 covers 41..=50 and Intersection phase 1
//! covers 61..=70.

use thiserror::Error;

use crate::model::{CategoryId, PhaseId, ScenarioId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScenarioIdError {
    #[error("category ids start at 1")]
    ZeroCategory,

    #[error("phase ids start at 1")]
    ZeroPhase,

    #[error("phase {phase} exceeds the {max} phases per category")]
    PhaseOutOfRange { phase: u32, max: u32 },

    #[error("scenario index {index} does not fit a block of {block_size}")]
    IndexOutOfRange { index: usize, block_size: u32 },

    #[error("scenario id 0 is not assigned")]
    ZeroScenario,

    #[error("scenario id arithmetic overflowed")]
    Overflow,

    #[error("id layout needs at least one phase per category and one id per block")]
    InvalidLayout,
}

/// Position of a scenario inside the curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioLocation {
    pub category_id: CategoryId,
    pub phase_id: PhaseId,
    /// Zero-based index within the phase.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioIdScheme {
    phases_per_category: u32,
    block_size: u32,
}

impl Default for ScenarioIdScheme {
    fn default() -> Self {
        Self {
            phases_per_category: 3,
            block_size: 10,
        }
    }
}

impl ScenarioIdScheme {
    /// # Errors
    ///
    /// Returns `ScenarioIdError::InvalidLayout` if either dimension is zero.
    pub fn new(phases_per_category: u32, block_size: u32) -> Result<Self, ScenarioIdError> {
        if phases_per_category == 0 || block_size == 0 {
            return Err(ScenarioIdError::InvalidLayout);
        }
        Ok(Self {
            phases_per_category,
            block_size,
        })
    }

    #[must_use]
    pub fn phases_per_category(&self) -> u32 {
        self.phases_per_category
    }

    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Offset that precedes the first scenario of a phase.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioIdError` for zero ids, phases beyond the layout or overflow.
    pub fn base(&self, category: CategoryId, phase: PhaseId) -> Result<u32, ScenarioIdError> {
        let category = category
            .value()
            .checked_sub(1)
            .ok_or(ScenarioIdError::ZeroCategory)?;
        let phase_offset = phase
            .value()
            .checked_sub(1)
            .ok_or(ScenarioIdError::ZeroPhase)?;
        if phase_offset >= self.phases_per_category {
            return Err(ScenarioIdError::PhaseOutOfRange {
                phase: phase.value(),
                max: self.phases_per_category,
            });
        }

        category
            .checked_mul(self.phases_per_category)
            .and_then(|blocks| blocks.checked_add(phase_offset))
            .and_then(|block| block.checked_mul(self.block_size))
            .ok_or(ScenarioIdError::Overflow)
    }

    /// Scenario id for the zero-based `index` within a phase.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioIdError::IndexOutOfRange` when the index leaves the phase block.
    pub fn scenario_id(
        &self,
        category: CategoryId,
        phase: PhaseId,
        index: usize,
    ) -> Result<ScenarioId, ScenarioIdError> {
        let in_block = u32::try_from(index)
            .ok()
            .filter(|i| *i < self.block_size)
            .ok_or(ScenarioIdError::IndexOutOfRange {
                index,
                block_size: self.block_size,
            })?;
        let base = self.base(category, phase)?;
        base.checked_add(in_block)
            .and_then(|id| id.checked_add(1))
            .map(ScenarioId::new)
            .ok_or(ScenarioIdError::Overflow)
    }

    /// Inverse of [`Self::scenario_id`].
    ///
    /// # Errors
    ///
    /// Returns `ScenarioIdError::ZeroScenario` for id 0.
    pub fn locate(&self, id: ScenarioId) -> Result<ScenarioLocation, ScenarioIdError> {
        let offset = id
            .value()
            .checked_sub(1)
            .ok_or(ScenarioIdError::ZeroScenario)?;
        let block = offset / self.block_size;
        let index = offset % self.block_size;

        Ok(ScenarioLocation {
            category_id: CategoryId::new(block / self.phases_per_category + 1),
            phase_id: PhaseId::new(block % self.phases_per_category + 1),
            index: usize::try_from(index).unwrap_or(usize::MAX),
        })
    }

    /// First and last scenario id of a phase holding `count` scenarios.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioIdError` if the phase is invalid or `count` is 0 or too large.
    pub fn phase_range(
        &self,
        category: CategoryId,
        phase: PhaseId,
        count: usize,
    ) -> Result<(ScenarioId, ScenarioId), ScenarioIdError> {
        let last_index = count.checked_sub(1).ok_or(ScenarioIdError::IndexOutOfRange {
            index: 0,
            block_size: self.block_size,
        })?;
        let first = self.scenario_id(category, phase, 0)?;
        let last = self.scenario_id(category, phase, last_index)?;
        Ok((first, last))
    }
}
