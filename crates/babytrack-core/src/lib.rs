pub mod checklist;
pub mod db;
pub mod error;
pub mod memory;
pub mod model;
pub mod notes;
pub mod report;
pub mod schema;
pub mod store;
pub mod time;
pub mod wire;

pub use db::{DynamoStore, TableNames};
pub use error::CoreError;
pub use memory::MemoryStore;
pub use model::{
    BabyProfile, ChecklistRecord, Id, IdError, TrackerEntry, TrackerType, UserRecord, WriteMode,
};
pub use store::TrackerStore;
pub use time::TimeRange;
