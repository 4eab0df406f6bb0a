mod memory;
mod storage;

pub use memory::InMemorySessionStore;
pub use storage::{SessionStore, SharedSession};
