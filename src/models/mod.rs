mod message;
mod session;

pub use message::{Message, Role};
pub use session::{Session, SessionId, REVIEW_CONTEXT_PREFIX};
