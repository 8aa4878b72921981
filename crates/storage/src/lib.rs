#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AUTH_TOKEN_KEY, DeviceStore, InMemoryRepository, SessionResultRepository, SessionResultRow,
    Storage, StorageError,
};
