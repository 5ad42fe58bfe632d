pub mod backup_service;
pub mod configurator;
pub mod locator;
pub mod registry_writer;
pub mod verifier;

#[cfg(test)]
pub(crate) mod fakes;

pub use backup_service::BackupService;
pub use configurator::{ConfigureReport, ConfigureService};
pub use locator::{LocateResult, Locator, LocatorConfig, SearchPhase};
pub use registry_writer::{MutationOutcome, PathUpdate, RegistryWriter, WriteError};
pub use verifier::{FixReport, Verifier};
