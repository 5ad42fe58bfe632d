use domain::ports::system::PrivilegeProbe;

/// Checks for administrator rights.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdminProbe;

impl AdminProbe {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl PrivilegeProbe for AdminProbe {
    fn is_elevated(&self) -> bool {
        use windows::Win32::UI::Shell::IsUserAnAdmin;

        if unsafe { IsUserAnAdmin().as_bool() } {
            return true;
        }
        // Raw disk access is only granted to elevated tokens.
        std::fs::File::open(r"\\.\PHYSICALDRIVE0").is_ok()
    }
}

#[cfg(not(windows))]
impl PrivilegeProbe for AdminProbe {
    fn is_elevated(&self) -> bool {
        false
    }
}
