use indicatif::MultiProgress;
use std::sync::OnceLock;

pub mod components;
pub mod diagnostic;
pub mod table;
pub mod theme;

pub use theme::{Icon, Theme};

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

pub fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(MultiProgress::new)
}

pub fn println(message: impl AsRef<str>) {
    if multi_progress().println(message.as_ref()).is_err() {
        println!("{}", message.as_ref());
    }
}
