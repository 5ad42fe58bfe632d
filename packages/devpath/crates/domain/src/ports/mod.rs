pub mod discovery;
pub mod environment_store;
pub mod process_env;
pub mod system;
