pub mod command;
pub mod notify;
pub mod power;
pub mod privilege;
