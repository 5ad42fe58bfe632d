use std::path::PathBuf;

use domain::ports::discovery::ExecutableLookup;

/// Search-path lookup via the `which` crate, which honours `PATHEXT` on
/// Windows the same way `where` does.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhichLookup;

impl WhichLookup {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutableLookup for WhichLookup {
    fn lookup(&self, executable: &str) -> Vec<PathBuf> {
        match which::which_all(executable) {
            Ok(found) => found.collect(),
            Err(err) => {
                tracing::debug!("No search-path hit for {}: {}", executable, err);
                Vec::new()
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn finds_a_shell_on_the_search_path() {
        let found = WhichLookup::new().lookup("sh");
        assert!(!found.is_empty());
    }

    #[test]
    fn unknown_program_yields_nothing() {
        assert!(WhichLookup::new()
            .lookup("devpath-definitely-not-installed")
            .is_empty());
    }
}
