pub mod install_records;
pub mod lookup;
pub mod native;
pub mod process_env;
pub mod reg_exe;
pub mod volumes;

use std::sync::Arc;
use std::time::Duration;

use domain::entities::settings::{RegistryBackend, Settings};
use domain::ports::discovery::{ExecutableLookup, InstallIndex, VolumeSource};
use domain::ports::environment_store::{EnvironmentStore, RegistrySnapshot};
use domain::ports::process_env::ProcessEnvironment;
use domain::ports::system::{ChangeNotifier, PrivilegeProbe};

use crate::system::notify::BroadcastNotifier;
use crate::system::privilege::AdminProbe;

use self::lookup::WhichLookup;
use self::process_env::OsProcessEnvironment;
use self::reg_exe::{RegExeInstallIndex, RegExeSnapshot, RegExeStore};
use self::volumes::DriveLetters;

/// Every port implementation the services need, chosen for this machine.
#[derive(Clone)]
pub struct PlatformAdapters {
    pub store: Arc<dyn EnvironmentStore>,
    pub snapshot: Arc<dyn RegistrySnapshot>,
    pub probe: Arc<dyn PrivilegeProbe>,
    pub notifier: Arc<dyn ChangeNotifier>,
    pub lookup: Arc<dyn ExecutableLookup>,
    pub index: Arc<dyn InstallIndex>,
    pub volumes: Arc<dyn VolumeSource>,
    pub process_env: Arc<dyn ProcessEnvironment>,
}

impl PlatformAdapters {
    pub fn for_settings(settings: &Settings) -> Self {
        let timeout = Duration::from_secs(settings.search.registry_query_timeout_secs);
        let (store, index) = registry_backend(settings.registry_backend, timeout);
        tracing::debug!("Using {:?} registry backend", settings.registry_backend);

        Self {
            store,
            snapshot: Arc::new(RegExeSnapshot::new()),
            probe: Arc::new(AdminProbe::new()),
            notifier: Arc::new(BroadcastNotifier::new()),
            lookup: Arc::new(WhichLookup::new()),
            index,
            volumes: Arc::new(DriveLetters::new()),
            process_env: Arc::new(OsProcessEnvironment::new()),
        }
    }
}

#[cfg(windows)]
fn registry_backend(
    backend: RegistryBackend,
    timeout: Duration,
) -> (Arc<dyn EnvironmentStore>, Arc<dyn InstallIndex>) {
    match backend {
        RegistryBackend::Native => (
            Arc::new(native::NativeStore::new()),
            Arc::new(native::NativeInstallIndex::new()),
        ),
        RegistryBackend::RegExe => (
            Arc::new(RegExeStore::new()),
            Arc::new(RegExeInstallIndex::new(timeout)),
        ),
    }
}

#[cfg(not(windows))]
fn registry_backend(
    backend: RegistryBackend,
    timeout: Duration,
) -> (Arc<dyn EnvironmentStore>, Arc<dyn InstallIndex>) {
    if backend == RegistryBackend::Native {
        tracing::debug!("Native registry backend unavailable, falling back to reg.exe");
    }
    (
        Arc::new(RegExeStore::new()),
        Arc::new(RegExeInstallIndex::new(timeout)),
    )
}
