pub mod document;
pub mod error;
pub mod firestore;
pub mod history;
pub mod listener;
pub mod logger;
pub mod memory;
pub mod reconciler;
pub mod store;

pub use document::{DocTimestamp, ReadingDocument};
pub use error::{Result, SnapshotError};
pub use firestore::FirestoreStore;
pub use history::{history_by_kind, history_from_documents};
pub use listener::{ListenerOptions, SnapshotListener};
pub use logger::ReadingLogger;
pub use memory::MemoryStore;
pub use reconciler::reconcile;
pub use store::{open_store, DocumentStore, WindowSubscription};
