//! Authentication: JWT claims decoding, the process-wide session and its
//! persisted record.

pub mod session;
pub mod storage;
pub mod token;

pub use session::{Authenticator, Session, SessionPhase, SessionStore};
pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage};
