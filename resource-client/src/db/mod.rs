pub mod kv_store;
pub mod repository;

pub use kv_store::{DynStore, JsonFileStore, KeyValueStore, MemoryStore};
pub use repository::{Repository, SeedData};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store not initialised: missing '{0}'")]
    NotInitialized(&'static str),
}
