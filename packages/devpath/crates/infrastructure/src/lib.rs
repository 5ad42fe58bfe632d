pub mod adapters;
pub mod system;

pub use adapters::PlatformAdapters;
