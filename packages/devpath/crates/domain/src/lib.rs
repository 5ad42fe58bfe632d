pub mod entities;
pub mod ports;
pub mod system;

pub use entities::catalog::Catalog;
pub use entities::mutation::{EnvironmentMutation, Scope, WriteMode};
pub use entities::profile::{ToolEnvironment, ToolProfile};
pub use entities::tool::ToolDescriptor;
