pub mod backup;
pub mod catalog;
pub mod issue;
pub mod mutation;
pub mod profile;
pub mod settings;
pub mod tool;
