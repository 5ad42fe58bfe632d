use std::time::Duration;

use domain::ports::system::{ChangeNotifier, NotifyError};

/// Broadcasts `WM_SETTINGCHANGE("Environment")` to every top-level window.
#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastNotifier;

impl BroadcastNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl ChangeNotifier for BroadcastNotifier {
    fn broadcast(&self, timeout: Duration) -> Result<(), NotifyError> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;

        use windows::Win32::Foundation::{GetLastError, ERROR_TIMEOUT, LPARAM, WPARAM};
        use windows::Win32::UI::WindowsAndMessaging::{
            SendMessageTimeoutW, HWND_BROADCAST, SMTO_ABORTIFHUNG, WM_SETTINGCHANGE,
        };

        let area: Vec<u16> = OsStr::new("Environment")
            .encode_wide()
            .chain(Some(0))
            .collect();
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let mut result = 0usize;

        let sent = unsafe {
            SendMessageTimeoutW(
                HWND_BROADCAST,
                WM_SETTINGCHANGE,
                WPARAM(0),
                LPARAM(area.as_ptr() as isize),
                SMTO_ABORTIFHUNG,
                millis,
                Some(&mut result as *mut usize),
            )
        };

        if sent.0 != 0 {
            return Ok(());
        }
        let last = unsafe { GetLastError() };
        if last == ERROR_TIMEOUT {
            Err(NotifyError::TimedOut(timeout))
        } else {
            Err(NotifyError::Failed(format!("SendMessageTimeoutW error {}", last.0)))
        }
    }
}

#[cfg(not(windows))]
impl ChangeNotifier for BroadcastNotifier {
    fn broadcast(&self, _timeout: Duration) -> Result<(), NotifyError> {
        tracing::debug!("No environment broadcast on this platform");
        Ok(())
    }
}
