pub mod context;
pub mod error;
pub mod selection;
pub mod settings;
