mod model;
mod repository;

pub use model::Record;
pub use repository::{RecordRepository, SqliteRecordRepository};
