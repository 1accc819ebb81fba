// Storage module
// LanceDB holds vectors + record fields; SQLite mirrors rows for aggregates

pub mod records;
pub mod sqlite;
pub mod vectors;

pub use records::{Article, PatientCase};
pub use sqlite::Database;
pub use vectors::{ArticleRetriever, CaseRetriever, VectorStore};
