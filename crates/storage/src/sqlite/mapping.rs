use drive_core::model::{CategoryId, PhaseId, ScenarioId};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn category_id_from_i64(v: i64) -> Result<CategoryId, StorageError> {
    Ok(CategoryId::new(i64_to_u32("category_id", v)?))
}

pub(crate) fn phase_id_from_i64(v: i64) -> Result<PhaseId, StorageError> {
    Ok(PhaseId::new(i64_to_u32("phase_id", v)?))
}

pub(crate) fn scenario_id_from_i64(v: i64) -> Result<ScenarioId, StorageError> {
    Ok(ScenarioId::new(i64_to_u32("scenario_id", v)?))
}

pub(crate) fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    i64_to_u32(field, v)
}

pub(crate) fn bool_from_i64(field: &'static str, v: i64) -> Result<bool, StorageError> {
    match v {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(StorageError::Serialization(format!("invalid {field}: {v}"))),
    }
}
