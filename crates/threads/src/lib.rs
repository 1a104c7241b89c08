mod listeners;
mod manager;
mod state;
mod stores;
mod traits;

pub use listeners::CommentCounter;
pub use manager::ThreadManager;
pub use state::{ExpansionState, RepliesState};
pub use stores::{DbStore, HttpStore};
pub use traits::{AuthorDirectory, ContentStore, ThreadListener};
