//! Locates Windows development tools and writes their environment into the
//! registry.
//!
//! The layers are re-exported as-is: [`domain`] holds the catalog, profiles
//! and port traits, [`infrastructure`] the registry and OS adapters, and
//! [`application`] the services the CLI drives.

pub use application;
pub use domain;
pub use infrastructure;
