// Authentication domain services
// The session manager owns the refresh-session lifecycle; the orchestrator
// composes it with the token signer and user store into use cases.

mod auth_orchestrator;
mod session_manager;
mod token_signer;

pub use auth_orchestrator::{AuthError, AuthOrchestrator, TokenPair};
pub use session_manager::{SessionError, SessionManager, SessionSettings};
pub use token_signer::{Claims, IssuedToken, TokenClass, TokenError, TokenSigner};
