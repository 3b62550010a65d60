pub mod loader;

pub use loader::{BeaconConfig, ConfigFile, EnvOverrides};
