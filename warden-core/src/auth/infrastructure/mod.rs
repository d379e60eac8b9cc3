//! Concrete session and user stores.

pub mod repositories;
