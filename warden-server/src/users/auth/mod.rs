pub mod fingerprint;
pub mod handlers;
pub mod middleware;
pub mod requests;

pub use fingerprint::RequestFingerprint;
pub use middleware::{AuthenticatedUser, auth_middleware};
pub use requests::ValidatedJson;
