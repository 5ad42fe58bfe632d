pub mod backup;
pub mod catalog;
pub mod env;
pub mod menu;
pub mod search;
pub mod verify;
