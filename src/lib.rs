pub mod beacon;
pub mod cli;
pub mod config;
pub mod identity;
pub mod supervisor;

// Public API
pub use beacon::BeaconClient;
pub use config::BeaconConfig;
pub use identity::BeaconKey;
pub use supervisor::{Supervisor, SupervisorError};
