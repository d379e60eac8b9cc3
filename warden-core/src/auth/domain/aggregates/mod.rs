// Authentication aggregates
// Records owned by the session and user stores, plus the issued session
// handed back to callers.

mod refresh_session;
mod user;

pub use refresh_session::{RefreshSession, RefreshSessionRecord};
pub use user::UserRecord;
