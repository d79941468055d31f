pub mod analysis;
pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod model;
pub mod overview;
pub mod partition;
pub mod session;
