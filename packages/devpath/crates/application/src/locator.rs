//! Escalating executable search: catalog candidates, then the system
//! lookup, then (on a total miss) every mounted volume.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use domain::entities::settings::SearchSettings;
use domain::entities::tool::ToolDescriptor;
use domain::ports::discovery::{ExecutableLookup, InstallIndex, VolumeSource};
use domain::ports::process_env::ProcessEnvironment;
use domain::system::path_list::PathSet;
use domain::system::scan::{
    expand_candidate, scan_for_executable, scan_streaming, ScanOutcome, SearchIssue,
    DEFAULT_SKIP_DIRS,
};
use infrastructure::PlatformAdapters;

const VOLUME_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct LocatorConfig {
    pub max_parallel_walks: usize,
    pub full_volume_fallback: bool,
    pub skip_dirs: Vec<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_parallel_walks: 8,
            full_volume_fallback: true,
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&SearchSettings> for LocatorConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            max_parallel_walks: settings.max_parallel_walks.max(1),
            full_volume_fallback: settings.full_volume_fallback,
            skip_dirs: settings.skip_dirs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Candidates,
    System,
    Volumes,
}

#[derive(Debug, Default)]
pub struct LocateResult {
    pub paths: Vec<PathBuf>,
    pub issues: Vec<SearchIssue>,
    pub phases: Vec<SearchPhase>,
}

impl LocateResult {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn ran(&self, phase: SearchPhase) -> bool {
        self.phases.contains(&phase)
    }

    fn absorb(&mut self, other: LocateResult) {
        let mut set = PathSet::new();
        set.extend(self.paths.drain(..));
        set.extend(other.paths);
        self.paths = set.into_vec();
        self.issues.extend(other.issues);
        self.phases.extend(other.phases);
    }
}

enum VolumeEvent {
    Found(PathBuf),
    Issue(SearchIssue),
}

/// Read-only: nothing here writes to the registry or the filesystem.
pub struct Locator {
    lookup: Arc<dyn ExecutableLookup>,
    index: Arc<dyn InstallIndex>,
    volumes: Arc<dyn VolumeSource>,
    env: Arc<dyn ProcessEnvironment>,
    config: LocatorConfig,
    permits: Arc<Semaphore>,
}

impl Locator {
    pub fn new(
        lookup: Arc<dyn ExecutableLookup>,
        index: Arc<dyn InstallIndex>,
        volumes: Arc<dyn VolumeSource>,
        env: Arc<dyn ProcessEnvironment>,
        config: LocatorConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_parallel_walks.max(1)));
        Self {
            lookup,
            index,
            volumes,
            env,
            config,
            permits,
        }
    }

    pub fn from_adapters(adapters: &PlatformAdapters, settings: &SearchSettings) -> Self {
        Self::new(
            adapters.lookup.clone(),
            adapters.index.clone(),
            adapters.volumes.clone(),
            adapters.process_env.clone(),
            LocatorConfig::from(settings),
        )
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Full search: candidates and system lookup, then every volume when
    /// both came back empty and the fallback is enabled.
    pub async fn locate(&self, tool: &ToolDescriptor) -> LocateResult {
        let mut result = self.locate_targeted(tool).await;
        if result.is_empty() && self.config.full_volume_fallback {
            tracing::debug!("{} not found in known locations, searching all volumes", tool.name);
            let everywhere = self.locate_everywhere(tool).await;
            result.absorb(everywhere);
        }
        result
    }

    /// Candidate scan followed by the system lookup.
    pub async fn locate_targeted(&self, tool: &ToolDescriptor) -> LocateResult {
        let mut found = PathSet::new();
        let mut issues = Vec::new();

        let candidates = self.scan_candidates(tool).await;
        tracing::debug!(
            "{}: {} candidate match(es)",
            tool.name,
            candidates.matches.len()
        );
        found.extend(candidates.matches);
        issues.extend(candidates.issues);

        let system = self.system_lookup(tool).await;
        tracing::debug!("{}: {} system match(es)", tool.name, system.matches.len());
        found.extend(system.matches);
        issues.extend(system.issues);

        LocateResult {
            paths: found.into_vec(),
            issues,
            phases: vec![SearchPhase::Candidates, SearchPhase::System],
        }
    }

    /// Walks every mounted volume. Results arrive in whatever order the
    /// drive workers report them.
    pub async fn locate_everywhere(&self, tool: &ToolDescriptor) -> LocateResult {
        let roots = self.volumes.roots();
        let (tx, mut rx) = mpsc::channel(VOLUME_CHANNEL_CAPACITY);
        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(roots.len());

        for root in roots {
            let tx = tx.clone();
            let permits = self.permits.clone();
            let executable = tool.executable.clone();
            let skip_dirs = self.config.skip_dirs.clone();

            workers.push(tokio::spawn(async move {
                let Ok(permit) = permits.acquire_owned().await else {
                    return;
                };
                let walk = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    tracing::debug!("Searching {}", root.display());
                    let issues = scan_streaming(&root, &executable, &skip_dirs, |path| {
                        let _ = tx.blocking_send(VolumeEvent::Found(path));
                    });
                    for issue in issues {
                        let _ = tx.blocking_send(VolumeEvent::Issue(issue));
                    }
                });
                if let Err(err) = walk.await {
                    tracing::warn!("Volume walk aborted: {}", err);
                }
            }));
        }
        drop(tx);

        let mut found = PathSet::new();
        let mut issues = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                VolumeEvent::Found(path) => {
                    found.insert(path);
                }
                VolumeEvent::Issue(issue) => issues.push(issue),
            }
        }
        for worker in workers {
            if let Err(err) = worker.await {
                issues.push(SearchIssue::new(&tool.name, format!("volume worker failed: {err}")));
            }
        }

        LocateResult {
            paths: found.into_vec(),
            issues,
            phases: vec![SearchPhase::Volumes],
        }
    }

    async fn scan_candidates(&self, tool: &ToolDescriptor) -> ScanOutcome {
        let mut bases = PathSet::new();
        for pattern in &tool.candidate_paths {
            bases.extend(expand_candidate(pattern, |name| self.env.get(name)));
        }

        let accumulator: Arc<Mutex<Vec<(usize, ScanOutcome)>>> = Arc::new(Mutex::new(Vec::new()));
        let mut walks = Vec::new();

        for (order, base) in bases.into_vec().into_iter().enumerate() {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                break;
            };
            let accumulator = accumulator.clone();
            let executable = tool.executable.clone();

            // Install trees are walked in full; the skip list is for volume roots.
            walks.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let outcome = scan_for_executable(&base, &executable, &[]);
                accumulator
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((order, outcome));
            }));
        }

        let mut merged = ScanOutcome::default();
        for walk in walks {
            if let Err(err) = walk.await {
                merged
                    .issues
                    .push(SearchIssue::new(&tool.name, format!("candidate walk failed: {err}")));
            }
        }

        let mut outcomes =
            std::mem::take(&mut *accumulator.lock().unwrap_or_else(PoisonError::into_inner));
        outcomes.sort_by_key(|(order, _)| *order);
        for (_, outcome) in outcomes {
            merged.matches.extend(outcome.matches);
            merged.issues.extend(outcome.issues);
        }
        merged
    }

    async fn system_lookup(&self, tool: &ToolDescriptor) -> ScanOutcome {
        let lookup = self.lookup.clone();
        let index = self.index.clone();
        let tool = tool.clone();
        let name = tool.name.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut outcome = ScanOutcome {
                matches: lookup.lookup(&tool.executable),
                issues: Vec::new(),
            };
            let report = index.locations(&tool);
            for location in report.locations {
                outcome.matches.extend(resolve_location(location, &tool));
            }
            outcome.issues.extend(report.issues);
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(err) => ScanOutcome {
                matches: Vec::new(),
                issues: vec![SearchIssue::new(name, format!("system lookup failed: {err}"))],
            },
        }
    }
}

/// Index entries name either the executable itself or an install directory.
fn resolve_location(location: PathBuf, tool: &ToolDescriptor) -> Vec<PathBuf> {
    if location.is_dir() {
        return [
            location.join(&tool.executable),
            location.join("bin").join(&tool.executable),
        ]
        .into_iter()
        .filter(|candidate| candidate.is_file())
        .collect();
    }

    let matches_name = location
        .file_name()
        .map(|name| tool.matches_file_name(&name.to_string_lossy()))
        .unwrap_or(false);
    if matches_name && location.is_file() {
        vec![location]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{CountingVolumes, FakeProcessEnv, StaticIndex, StaticLookup};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    struct Harness {
        lookup: Arc<StaticLookup>,
        volumes: Arc<CountingVolumes>,
        locator: Locator,
    }

    fn harness(lookup: StaticLookup, index: StaticIndex, volumes: CountingVolumes) -> Harness {
        let lookup = Arc::new(lookup);
        let volumes = Arc::new(volumes);
        let locator = Locator::new(
            lookup.clone(),
            Arc::new(index),
            volumes.clone(),
            FakeProcessEnv::from_pairs(&[]),
            LocatorConfig::default(),
        );
        Harness {
            lookup,
            volumes,
            locator,
        }
    }

    #[tokio::test]
    async fn sample_tool_is_found_under_its_first_candidate() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        touch(&a.join("bin/sample.exe"));

        let tool = ToolDescriptor::new("Sample", "sample.exe").with_candidates([
            a.to_string_lossy().to_string(),
            b.to_string_lossy().to_string(),
        ]);
        let h = harness(
            StaticLookup::default(),
            StaticIndex::default(),
            CountingVolumes::default(),
        );

        let result = h.locator.locate(&tool).await;

        assert_eq!(result.paths, vec![a.join("bin/sample.exe")]);
        assert!(result.issues.is_empty());
        assert!(result.ran(SearchPhase::System));
        assert!(!result.ran(SearchPhase::Volumes));
        assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.volumes.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_candidates_fall_through_to_system_lookup() {
        let dir = tempdir().unwrap();
        let on_path = dir.path().join("usr/bin/tool.exe");
        touch(&on_path);

        let tool = ToolDescriptor::new("Tool", "tool.exe")
            .with_candidates([dir.path().join("nope").to_string_lossy().to_string()]);
        let h = harness(
            StaticLookup {
                found: vec![on_path.clone()],
                ..Default::default()
            },
            StaticIndex::default(),
            CountingVolumes::default(),
        );

        let result = h.locator.locate(&tool).await;
        assert_eq!(result.paths, vec![on_path]);
        assert!(result.issues.is_empty());
        assert_eq!(h.volumes.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn candidate_matches_keep_pattern_order() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("zeta");
        let second = dir.path().join("alpha");
        touch(&first.join("x/tool.exe"));
        touch(&second.join("tool.exe"));
        touch(&second.join("nested/tool.exe"));

        let tool = ToolDescriptor::new("Tool", "tool.exe").with_candidates([
            first.to_string_lossy().to_string(),
            second.to_string_lossy().to_string(),
        ]);
        let h = harness(
            StaticLookup::default(),
            StaticIndex::default(),
            CountingVolumes::default(),
        );

        let result = h.locator.locate_targeted(&tool).await;
        assert_eq!(
            result.paths,
            vec![
                first.join("x/tool.exe"),
                second.join("nested/tool.exe"),
                second.join("tool.exe"),
            ]
        );
    }

    #[tokio::test]
    async fn candidate_walk_descends_into_cache_directories() {
        let dir = tempdir().unwrap();
        let flutter = dir.path().join("flutter");
        let dart = flutter.join("bin/cache/dart-sdk/bin/dart.exe");
        touch(&dart);

        let tool = ToolDescriptor::new("Dart", "dart.exe")
            .with_candidates([flutter.to_string_lossy().to_string()]);
        let h = harness(
            StaticLookup::default(),
            StaticIndex::default(),
            CountingVolumes::default(),
        );

        let result = h.locator.locate_targeted(&tool).await;
        assert_eq!(result.paths, vec![dart]);
    }

    #[tokio::test]
    async fn system_results_supplement_without_duplicates() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("Go");
        let exe = base.join("bin/go.exe");
        touch(&exe);

        let tool = ToolDescriptor::new("Go", "go.exe")
            .with_candidates([base.to_string_lossy().to_string()]);
        let h = harness(
            StaticLookup {
                found: vec![exe.clone()],
                ..Default::default()
            },
            StaticIndex {
                locations: vec![base.clone()],
            },
            CountingVolumes::default(),
        );

        let result = h.locator.locate(&tool).await;
        assert_eq!(result.paths, vec![exe]);
    }

    #[tokio::test]
    async fn index_directories_are_probed_for_the_executable() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("Git");
        touch(&install.join("bin/git.exe"));
        let stray = dir.path().join("other.exe");
        touch(&stray);

        let tool = ToolDescriptor::new("Git", "git.exe");
        let h = harness(
            StaticLookup::default(),
            StaticIndex {
                locations: vec![install.clone(), stray],
            },
            CountingVolumes::default(),
        );

        let result = h.locator.locate_targeted(&tool).await;
        assert_eq!(result.paths, vec![install.join("bin/git.exe")]);
    }

    #[tokio::test]
    async fn total_miss_searches_every_volume_once() {
        let one = tempdir().unwrap();
        let two = tempdir().unwrap();
        touch(&one.path().join("apps/rare.exe"));
        touch(&one.path().join("Temp/rare.exe"));
        touch(&two.path().join("deep/down/RARE.EXE"));

        let tool = ToolDescriptor::new("Rare", "rare.exe");
        let h = harness(
            StaticLookup::default(),
            StaticIndex::default(),
            CountingVolumes {
                roots: vec![
                    one.path().to_path_buf(),
                    two.path().to_path_buf(),
                    one.path().to_path_buf(),
                ],
                ..Default::default()
            },
        );

        let mut result = h.locator.locate(&tool).await;
        result.paths.sort();

        let mut expected = vec![
            one.path().join("apps/rare.exe"),
            two.path().join("deep/down/RARE.EXE"),
        ];
        expected.sort();
        assert_eq!(result.paths, expected);
        assert!(result.ran(SearchPhase::Volumes));
        assert_eq!(h.volumes.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallback_can_be_disabled() {
        let tool = ToolDescriptor::new("Rare", "rare.exe");
        let volumes = Arc::new(CountingVolumes::default());
        let locator = Locator::new(
            Arc::new(StaticLookup::default()),
            Arc::new(StaticIndex::default()),
            volumes.clone(),
            FakeProcessEnv::from_pairs(&[]),
            LocatorConfig {
                full_volume_fallback: false,
                ..Default::default()
            },
        );

        let result = locator.locate(&tool).await;
        assert!(result.is_empty());
        assert_eq!(volumes.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn candidate_patterns_expand_process_variables() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Python312/python.exe"));
        let root = dir.path().to_string_lossy().to_string();

        let tool = ToolDescriptor::new("Python", "python.exe").with_candidates(["%DEV_ROOT%/Python3*"]);
        let locator = Locator::new(
            Arc::new(StaticLookup::default()),
            Arc::new(StaticIndex::default()),
            Arc::new(CountingVolumes::default()),
            FakeProcessEnv::from_pairs(&[("DEV_ROOT", root.as_str())]),
            LocatorConfig {
                max_parallel_walks: 1,
                ..Default::default()
            },
        );

        let result = locator.locate_targeted(&tool).await;
        assert_eq!(result.paths, vec![dir.path().join("Python312/python.exe")]);
    }
}
