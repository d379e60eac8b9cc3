pub mod app_state;
pub mod errors;
pub mod session_sweeper;
pub mod startup;
