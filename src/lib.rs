pub mod cache;
pub mod cli;
pub mod core;
pub mod error;
pub mod explorer;
pub mod models;
pub mod persist;
pub mod session;
pub mod source;

pub use error::SourceError;
pub use explorer::{Explorer, RemoteEndpoints};
pub use models::{ContentRef, Entry, EntryKind};
pub use session::{Phase, Session};
pub use source::{Source, SourceKind};
