use std::path::PathBuf;

use domain::ports::discovery::VolumeSource;

/// Mounted drive roots. `A:\` through `Z:\` on Windows, `/` elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriveLetters;

impl DriveLetters {
    pub fn new() -> Self {
        Self
    }
}

impl VolumeSource for DriveLetters {
    #[cfg(windows)]
    fn roots(&self) -> Vec<PathBuf> {
        (b'A'..=b'Z')
            .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
            .filter(|root| root.exists())
            .collect()
    }

    #[cfg(not(windows))]
    fn roots(&self) -> Vec<PathBuf> {
        vec![PathBuf::from("/")]
    }
}
