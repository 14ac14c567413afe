mod model;
mod repository;

pub use model::{Entry, EntryKind, NewEntry};
pub use repository::{EntryRepository, SqliteEntryRepository};
