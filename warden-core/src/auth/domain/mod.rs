pub mod aggregates;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use aggregates::{RefreshSession, RefreshSessionRecord, UserRecord};
pub use repositories::{SessionStore, StoreError, UserStore};
pub use value_objects::{ClientFingerprint, RefreshToken};
