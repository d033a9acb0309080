pub mod config;
pub mod execution;
pub(crate) mod fs_utils;
pub mod history;
pub mod installers;
pub mod integration;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod persistence;
pub mod sqlite;

pub use config::{InstallerConfig, InstallerLayout};
pub use orchestration::{InstallEvent, InstallerService};
