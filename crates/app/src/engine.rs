//! Trigger engine — one full pass over all configured sections per cycle.
//!
//! The engine owns the persisted snapshot exclusively for the whole cycle:
//! load, evaluate every section in declaration order, flush, then reap the
//! commands it dispatched. Neighbor listings are cached per device so
//! sections sharing a device do not repeat the external query; the cache is
//! created fresh each cycle and discarded with it.
//!
//! Dispatch is the only concurrent part of a cycle: launching never blocks
//! the section loop, and stderr inspection happens after all sections have
//! been evaluated, in declaration order. A command that reports errors (for
//! an error-sensitive section) rolls the stored command back, which is then
//! flushed again so the next cycle retries.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use whoshome_domain::debounce::{Presence, Transition};
use whoshome_domain::error::WatchError;
use whoshome_domain::filter::{FilterReport, MatchResult};
use whoshome_domain::machines::KnownMachines;
use whoshome_domain::time::Timestamp;

use crate::ports::{
    CommandLauncher, CycleGate, DispatchHandle, NameResolver, NeighborSource, StateStore,
};
use crate::section::Section;

/// Per-cycle orchestrator over the five ports.
pub struct TriggerEngine<N, R, L, S, G> {
    neighbors: N,
    resolver: R,
    launcher: L,
    store: S,
    gate: G,
}

/// What happened to one section during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionStatus {
    /// Section is disabled in configuration.
    Disabled,
    /// The section's cron window does not cover this cycle.
    Gated,
    /// The neighbor listing failed; history was left untouched.
    SourceFailed,
    /// The section was classified and the debounce machine advanced.
    Evaluated {
        /// Cycle result from the filter pipeline.
        result: Presence,
        /// Debounce transition taken.
        transition: Transition,
        /// Whether a command was launched this cycle.
        dispatched: bool,
        /// Whether the stored command was rolled back after stderr output.
        rolled_back: bool,
    },
}

/// One section's outcome, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOutcome {
    pub name: String,
    pub status: SectionStatus,
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub sections: Vec<SectionOutcome>,
}

impl CycleReport {
    /// Number of sections that launched a command this cycle.
    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.sections
            .iter()
            .filter(|outcome| {
                matches!(
                    outcome.status,
                    SectionStatus::Evaluated {
                        dispatched: true,
                        ..
                    }
                )
            })
            .count()
    }
}

struct PendingDispatch<H> {
    section: String,
    outcome_idx: usize,
    handle: H,
}

impl<N, R, L, S, G> TriggerEngine<N, R, L, S, G>
where
    N: NeighborSource,
    R: NameResolver,
    L: CommandLauncher,
    S: StateStore,
    G: CycleGate,
{
    /// Create a new engine over the given ports.
    pub fn new(neighbors: N, resolver: R, launcher: L, store: S, gate: G) -> Self {
        Self {
            neighbors,
            resolver,
            launcher,
            store,
            gate,
        }
    }

    /// Run one full cycle over `sections`, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::StateStore`] when the snapshot cannot be loaded
    /// or saved; the cycle aborts without flushing so the on-disk copy keeps
    /// its last good value. Neighbor-source and dispatch failures are logged
    /// and never abort the cycle.
    pub async fn run_cycle(
        &self,
        sections: &[Section],
        machines: Option<&KnownMachines>,
        now: Timestamp,
    ) -> Result<CycleReport, WatchError> {
        let mut snapshot = self.store.load().await?;
        let mut neighbor_cache: HashMap<Option<String>, Vec<_>> = HashMap::new();
        let mut resolve_cache: HashMap<String, Option<String>> = HashMap::new();
        let mut outcomes: Vec<SectionOutcome> = Vec::with_capacity(sections.len());
        let mut pending: Vec<PendingDispatch<L::Handle>> = Vec::new();

        for section in sections {
            if !section.enabled {
                tracing::debug!(section = %section.name, "section not enabled");
                outcomes.push(SectionOutcome {
                    name: section.name.clone(),
                    status: SectionStatus::Disabled,
                });
                continue;
            }
            if let Some(expression) = &section.cron {
                if !self.gate.permits(expression, now) {
                    tracing::debug!(section = %section.name, "section gated off for now");
                    outcomes.push(SectionOutcome {
                        name: section.name.clone(),
                        status: SectionStatus::Gated,
                    });
                    continue;
                }
            }
            tracing::debug!(section = %section.name, "processing section");

            let records = match neighbor_cache.entry(section.device.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    match self.neighbors.list_neighbors(section.device.as_deref()).await {
                        Ok(records) => entry.insert(records),
                        Err(err) => {
                            tracing::error!(
                                section = %section.name,
                                device = section.device.as_deref().unwrap_or("all"),
                                error = %err,
                                "neighbor listing failed, skipping section this cycle"
                            );
                            outcomes.push(SectionOutcome {
                                name: section.name.clone(),
                                status: SectionStatus::SourceFailed,
                            });
                            continue;
                        }
                    }
                }
            };

            let report = section.criteria.resolve(machines).classify_all(records);
            self.log_classification(section, &report, machines, &mut resolve_cache)
                .await;

            let result = Presence::from_present(report.present());
            let command = section.command_for(result);
            let state = snapshot.section_mut(&section.name);
            let transition = state.apply(result, command, section.threshold);
            tracing::debug!(
                section = %section.name,
                history = ?state.results(),
                "recorded cycle result"
            );

            let mut dispatched = false;
            match &transition {
                Transition::Observing { count, threshold } => {
                    tracing::info!(
                        section = %section.name,
                        result = %result,
                        count,
                        threshold,
                        "threshold not reached yet"
                    );
                }
                Transition::AlreadyFired => {
                    tracing::info!(
                        section = %section.name,
                        result = %result,
                        "command already dispatched for this state"
                    );
                }
                Transition::Fire => {
                    if let Some(command) = command {
                        tracing::warn!(
                            section = %section.name,
                            command = %command,
                            "launching command"
                        );
                        match self.launcher.launch(command) {
                            Ok(handle) => {
                                dispatched = true;
                                if section.error_on_stderr {
                                    pending.push(PendingDispatch {
                                        section: section.name.clone(),
                                        outcome_idx: outcomes.len(),
                                        handle,
                                    });
                                }
                            }
                            Err(err) => {
                                tracing::error!(
                                    section = %section.name,
                                    command = %command,
                                    error = %err,
                                    "failed to launch command"
                                );
                            }
                        }
                    } else {
                        tracing::info!(section = %section.name, "no command to launch");
                    }
                }
            }
            outcomes.push(SectionOutcome {
                name: section.name.clone(),
                status: SectionStatus::Evaluated {
                    result,
                    transition,
                    dispatched,
                    rolled_back: false,
                },
            });
        }

        self.store.save(&snapshot).await?;

        // Reap dispatched commands, declaration order. Only error-sensitive
        // sections ever land in `pending`; the rest are fire-and-forget.
        let mut rolled_back_any = false;
        for dispatch in pending {
            match dispatch.handle.wait().await {
                Ok(stderr) if !stderr.is_empty() => {
                    tracing::error!(
                        section = %dispatch.section,
                        "command reported errors, forgetting stored command"
                    );
                    tracing::error!(
                        section = %dispatch.section,
                        stderr = %stderr.trim_end(),
                        "command stderr"
                    );
                    snapshot.section_mut(&dispatch.section).clear_last_command();
                    rolled_back_any = true;
                    if let Some(SectionOutcome {
                        status: SectionStatus::Evaluated { rolled_back, .. },
                        ..
                    }) = outcomes.get_mut(dispatch.outcome_idx)
                    {
                        *rolled_back = true;
                    }
                }
                Ok(_) => {
                    tracing::debug!(section = %dispatch.section, "command completed cleanly");
                }
                Err(err) => {
                    tracing::error!(
                        section = %dispatch.section,
                        error = %err,
                        "could not collect command outcome"
                    );
                }
            }
        }
        if rolled_back_any {
            self.store.save(&snapshot).await?;
        }

        Ok(CycleReport { sections: outcomes })
    }

    /// Log the diagnostic grouping for one section. Reverse-name resolution
    /// is attempted at most once per unique address per cycle and only for
    /// matched records without a known alias.
    async fn log_classification(
        &self,
        section: &Section,
        report: &FilterReport,
        machines: Option<&KnownMachines>,
        resolve_cache: &mut HashMap<String, Option<String>>,
    ) {
        for (mac, addrs) in report.group(MatchResult::Matched) {
            let alias = machines.and_then(|table| table.name_for_mac(mac));
            let mut label = alias.map(str::to_owned);
            if label.is_none() && section.nslookup {
                for addr in addrs {
                    let resolved = match resolve_cache.get(addr) {
                        Some(cached) => cached.clone(),
                        None => {
                            let resolved = self.resolver.resolve(addr).await;
                            resolve_cache.insert(addr.clone(), resolved.clone());
                            resolved
                        }
                    };
                    if resolved.is_some() {
                        label = resolved;
                        break;
                    }
                }
            }
            match label {
                Some(name) => tracing::info!(
                    section = %section.name,
                    mac = %mac,
                    machine = %name,
                    "matched neighbor"
                ),
                None => tracing::info!(
                    section = %section.name,
                    mac = %mac,
                    addrs = ?addrs,
                    "matched neighbor"
                ),
            }
        }
        for (mac, addrs) in report.group(MatchResult::Excluded) {
            tracing::debug!(section = %section.name, mac = %mac, addrs = ?addrs, "record excluded");
        }
        for (mac, addrs) in report.group(MatchResult::NoMatch) {
            tracing::debug!(section = %section.name, mac = %mac, addrs = ?addrs, "record did not match");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    use whoshome_domain::neighbor::NeighborRecord;
    use whoshome_domain::state::StateSnapshot;

    fn present_records() -> Vec<NeighborRecord> {
        vec![
            NeighborRecord::parse("192.168.0.2 dev eth0 lladdr aa:bb:cc:00:00:02 REACHABLE"),
            NeighborRecord::parse("192.168.0.3 dev eth0 lladdr aa:bb:cc:00:00:03 STALE"),
        ]
    }

    fn absent_records() -> Vec<NeighborRecord> {
        vec![NeighborRecord::parse(
            "192.168.0.9 dev eth0 lladdr aa:bb:cc:00:00:09 FAILED",
        )]
    }

    // ── Scripted neighbor source ───────────────────────────────────

    struct ScriptedSource {
        responses: Mutex<VecDeque<Vec<NeighborRecord>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSource {
        fn always(records: Vec<NeighborRecord>) -> Self {
            Self::sequence(vec![records])
        }

        fn sequence(script: Vec<Vec<NeighborRecord>>) -> Self {
            Self {
                responses: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl NeighborSource for ScriptedSource {
        fn list_neighbors(
            &self,
            _device: Option<&str>,
        ) -> impl Future<Output = Result<Vec<NeighborRecord>, WatchError>> + Send {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            let records = if responses.len() > 1 {
                responses.pop_front().unwrap_or_default()
            } else {
                responses.front().cloned().unwrap_or_default()
            };
            async move { Ok(records) }
        }
    }

    struct FailingSource;

    impl NeighborSource for FailingSource {
        fn list_neighbors(
            &self,
            _device: Option<&str>,
        ) -> impl Future<Output = Result<Vec<NeighborRecord>, WatchError>> + Send {
            async {
                Err(WatchError::Neighbors(Box::new(std::io::Error::other(
                    "listing failed",
                ))))
            }
        }
    }

    // ── Null resolver ──────────────────────────────────────────────

    struct NoResolver;

    impl NameResolver for NoResolver {
        fn resolve(&self, _address: &str) -> impl Future<Output = Option<String>> + Send {
            async { None }
        }
    }

    // ── Spy launcher ───────────────────────────────────────────────

    struct SpyLauncher {
        launched: Mutex<Vec<String>>,
        stderr: String,
    }

    impl SpyLauncher {
        fn silent() -> Self {
            Self::with_stderr("")
        }

        fn with_stderr(stderr: &str) -> Self {
            Self {
                launched: Mutex::new(Vec::new()),
                stderr: stderr.to_string(),
            }
        }

        fn launched(&self) -> Vec<String> {
            self.launched.lock().unwrap().clone()
        }
    }

    struct StubHandle {
        stderr: String,
    }

    impl DispatchHandle for StubHandle {
        fn wait(self) -> impl Future<Output = Result<String, WatchError>> + Send {
            async move { Ok(self.stderr) }
        }
    }

    impl CommandLauncher for SpyLauncher {
        type Handle = StubHandle;

        fn launch(&self, command: &str) -> Result<StubHandle, WatchError> {
            self.launched.lock().unwrap().push(command.to_owned());
            Ok(StubHandle {
                stderr: self.stderr.clone(),
            })
        }
    }

    // ── In-memory store ────────────────────────────────────────────

    #[derive(Default)]
    struct InMemoryStore {
        snapshot: Mutex<StateSnapshot>,
        saves: Mutex<usize>,
        fail_load: bool,
        fail_save: bool,
    }

    impl InMemoryStore {
        fn saves(&self) -> usize {
            *self.saves.lock().unwrap()
        }

        fn snapshot(&self) -> StateSnapshot {
            self.snapshot.lock().unwrap().clone()
        }
    }

    impl StateStore for InMemoryStore {
        fn load(&self) -> impl Future<Output = Result<StateSnapshot, WatchError>> + Send {
            let result = if self.fail_load {
                Err(WatchError::StateStore(Box::new(std::io::Error::other(
                    "load failed",
                ))))
            } else {
                Ok(self.snapshot.lock().unwrap().clone())
            };
            async move { result }
        }

        fn save(
            &self,
            snapshot: &StateSnapshot,
        ) -> impl Future<Output = Result<(), WatchError>> + Send {
            let result = if self.fail_save {
                Err(WatchError::StateStore(Box::new(std::io::Error::other(
                    "save failed",
                ))))
            } else {
                *self.snapshot.lock().unwrap() = snapshot.clone();
                *self.saves.lock().unwrap() += 1;
                Ok(())
            };
            async move { result }
        }
    }

    // ── Gates ──────────────────────────────────────────────────────

    struct OpenGate;

    impl CycleGate for OpenGate {
        fn permits(&self, _expression: &str, _now: Timestamp) -> bool {
            true
        }
    }

    struct ClosedGate;

    impl CycleGate for ClosedGate {
        fn permits(&self, _expression: &str, _now: Timestamp) -> bool {
            false
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn section() -> Section {
        Section::builder("den")
            .threshold(3)
            .command_neighbor("lights on")
            .command_no_neighbor("lights off")
            .build()
            .unwrap()
    }

    fn engine<N: NeighborSource, L: CommandLauncher>(
        source: N,
        launcher: L,
    ) -> TriggerEngine<N, NoResolver, L, InMemoryStore, OpenGate> {
        TriggerEngine::new(
            source,
            NoResolver,
            launcher,
            InMemoryStore::default(),
            OpenGate,
        )
    }

    async fn run(
        engine: &TriggerEngine<
            impl NeighborSource,
            impl NameResolver,
            impl CommandLauncher,
            impl StateStore,
            impl CycleGate,
        >,
        sections: &[Section],
    ) -> CycleReport {
        engine
            .run_cycle(sections, None, whoshome_domain::time::now())
            .await
            .unwrap()
    }

    // ── Threshold and idempotence ──────────────────────────────────

    #[tokio::test]
    async fn should_not_dispatch_before_threshold() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let sections = vec![section()];
        run(&engine, &sections).await;
        run(&engine, &sections).await;
        assert!(engine.launcher.launched().is_empty());
        let snapshot = engine.store.snapshot();
        assert_eq!(snapshot.section("den").unwrap().results().len(), 2);
        assert!(snapshot.section("den").unwrap().last_command().is_none());
    }

    #[tokio::test]
    async fn should_dispatch_exactly_once_at_threshold() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let sections = vec![section()];
        for _ in 0..3 {
            run(&engine, &sections).await;
        }
        assert_eq!(engine.launcher.launched(), vec!["lights on".to_string()]);
        let snapshot = engine.store.snapshot();
        let state = snapshot.section("den").unwrap();
        assert_eq!(
            state.results(),
            &[Presence::Neighbor, Presence::Neighbor, Presence::Neighbor]
        );
        assert_eq!(state.last_command(), Some("lights on"));
    }

    #[tokio::test]
    async fn should_not_redispatch_on_steady_state() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let sections = vec![section()];
        for _ in 0..6 {
            run(&engine, &sections).await;
        }
        assert_eq!(engine.launcher.launched().len(), 1);
    }

    #[tokio::test]
    async fn should_dispatch_opposite_command_after_flip_settles() {
        let script = vec![
            present_records(),
            present_records(),
            present_records(),
            absent_records(),
            absent_records(),
            absent_records(),
        ];
        let engine = engine(ScriptedSource::sequence(script), SpyLauncher::silent());
        let sections = vec![section()];
        for _ in 0..6 {
            run(&engine, &sections).await;
        }
        assert_eq!(
            engine.launcher.launched(),
            vec!["lights on".to_string(), "lights off".to_string()]
        );
        let snapshot = engine.store.snapshot();
        let state = snapshot.section("den").unwrap();
        assert_eq!(
            state.results(),
            &[
                Presence::NoNeighbor,
                Presence::NoNeighbor,
                Presence::NoNeighbor
            ]
        );
        assert_eq!(state.last_command(), Some("lights off"));
    }

    #[tokio::test]
    async fn should_fire_once_when_command_changes_in_steady_state() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let sections = vec![section()];
        for _ in 0..3 {
            run(&engine, &sections).await;
        }
        let mut changed = section();
        changed.command_neighbor = Some("dim lights".to_string());
        let changed = vec![changed];
        run(&engine, &changed).await;
        run(&engine, &changed).await;
        assert_eq!(
            engine.launcher.launched(),
            vec!["lights on".to_string(), "dim lights".to_string()]
        );
    }

    #[tokio::test]
    async fn should_not_launch_when_no_command_configured() {
        let source = ScriptedSource::always(present_records());
        let engine = engine(source, SpyLauncher::silent());
        let sections = vec![Section::builder("den").threshold(1).build().unwrap()];
        let report = run(&engine, &sections).await;
        assert!(engine.launcher.launched().is_empty());
        // Unset command compares equal to the initial "no command dispatched"
        // state, so the section settles without ever firing.
        assert!(matches!(
            report.sections[0].status,
            SectionStatus::Evaluated {
                transition: Transition::AlreadyFired,
                dispatched: false,
                ..
            }
        ));
    }

    // ── Rollback ───────────────────────────────────────────────────

    #[tokio::test]
    async fn should_roll_back_stored_command_on_stderr() {
        let engine = engine(
            ScriptedSource::always(present_records()),
            SpyLauncher::with_stderr("boom\n"),
        );
        let sections = vec![section()];
        for _ in 0..3 {
            run(&engine, &sections).await;
        }
        assert_eq!(engine.launcher.launched().len(), 1);
        let snapshot = engine.store.snapshot();
        let state = snapshot.section("den").unwrap();
        assert!(state.last_command().is_none());
        assert_eq!(state.results().len(), 3);
        // Next cycle with the unchanged result retries the same command.
        run(&engine, &sections).await;
        assert_eq!(
            engine.launcher.launched(),
            vec!["lights on".to_string(), "lights on".to_string()]
        );
    }

    #[tokio::test]
    async fn should_flush_again_after_rollback() {
        let engine = engine(
            ScriptedSource::always(present_records()),
            SpyLauncher::with_stderr("boom"),
        );
        let sections = vec![Section::builder("den")
            .threshold(1)
            .command_neighbor("lights on")
            .build()
            .unwrap()];
        let report = run(&engine, &sections).await;
        // Normal flush plus the post-rollback flush.
        assert_eq!(engine.store.saves(), 2);
        assert!(matches!(
            report.sections[0].status,
            SectionStatus::Evaluated {
                rolled_back: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn should_ignore_stderr_when_not_error_sensitive() {
        let engine = engine(
            ScriptedSource::always(present_records()),
            SpyLauncher::with_stderr("boom"),
        );
        let sections = vec![Section::builder("den")
            .threshold(1)
            .command_neighbor("lights on")
            .error_on_stderr(false)
            .build()
            .unwrap()];
        run(&engine, &sections).await;
        assert_eq!(engine.store.saves(), 1);
        let snapshot = engine.store.snapshot();
        assert_eq!(
            snapshot.section("den").unwrap().last_command(),
            Some("lights on")
        );
    }

    // ── Persistence failures ───────────────────────────────────────

    #[tokio::test]
    async fn should_abort_cycle_when_load_fails() {
        let store = InMemoryStore {
            fail_load: true,
            ..InMemoryStore::default()
        };
        let engine = TriggerEngine::new(
            ScriptedSource::always(present_records()),
            NoResolver,
            SpyLauncher::silent(),
            store,
            OpenGate,
        );
        let result = engine
            .run_cycle(&[section()], None, whoshome_domain::time::now())
            .await;
        assert!(matches!(result, Err(WatchError::StateStore(_))));
        assert_eq!(engine.store.saves(), 0);
        assert!(engine.launcher.launched().is_empty());
    }

    #[tokio::test]
    async fn should_propagate_save_failure() {
        let store = InMemoryStore {
            fail_save: true,
            ..InMemoryStore::default()
        };
        let engine = TriggerEngine::new(
            ScriptedSource::always(present_records()),
            NoResolver,
            SpyLauncher::silent(),
            store,
            OpenGate,
        );
        let result = engine
            .run_cycle(&[section()], None, whoshome_domain::time::now())
            .await;
        assert!(matches!(result, Err(WatchError::StateStore(_))));
    }

    // ── Skipping ───────────────────────────────────────────────────

    #[tokio::test]
    async fn should_skip_disabled_sections() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let mut disabled = section();
        disabled.enabled = false;
        let report = run(&engine, &[disabled]).await;
        assert_eq!(report.sections[0].status, SectionStatus::Disabled);
        assert_eq!(engine.neighbors.calls(), 0);
        assert!(engine.store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn should_skip_sections_outside_their_cron_window() {
        let engine = TriggerEngine::new(
            ScriptedSource::always(present_records()),
            NoResolver,
            SpyLauncher::silent(),
            InMemoryStore::default(),
            ClosedGate,
        );
        let gated = Section::builder("den")
            .cron("0 9 * * *")
            .command_neighbor("lights on")
            .build()
            .unwrap();
        let report = engine
            .run_cycle(&[gated], None, whoshome_domain::time::now())
            .await
            .unwrap();
        assert_eq!(report.sections[0].status, SectionStatus::Gated);
        assert!(engine.store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn should_evaluate_sections_without_cron_even_when_gate_is_closed() {
        let engine = TriggerEngine::new(
            ScriptedSource::always(present_records()),
            NoResolver,
            SpyLauncher::silent(),
            InMemoryStore::default(),
            ClosedGate,
        );
        let report = engine
            .run_cycle(&[section()], None, whoshome_domain::time::now())
            .await
            .unwrap();
        assert!(matches!(
            report.sections[0].status,
            SectionStatus::Evaluated { .. }
        ));
    }

    #[tokio::test]
    async fn should_keep_cycle_alive_when_source_fails() {
        let engine = engine(FailingSource, SpyLauncher::silent());
        let sections = vec![section()];
        let report = run(&engine, &sections).await;
        assert_eq!(report.sections[0].status, SectionStatus::SourceFailed);
        // History untouched, snapshot still flushed.
        assert!(engine.store.snapshot().is_empty());
        assert_eq!(engine.store.saves(), 1);
    }

    // ── Per-cycle neighbor cache ───────────────────────────────────

    #[tokio::test]
    async fn should_query_source_once_per_device_per_cycle() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let first = Section::builder("den").device("eth0").build().unwrap();
        let second = Section::builder("porch").device("eth0").build().unwrap();
        run(&engine, &[first, second]).await;
        assert_eq!(engine.neighbors.calls(), 1);
    }

    #[tokio::test]
    async fn should_query_source_per_distinct_device() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let first = Section::builder("den").device("eth0").build().unwrap();
        let second = Section::builder("porch").device("eth1").build().unwrap();
        run(&engine, &[first, second]).await;
        assert_eq!(engine.neighbors.calls(), 2);
    }

    #[tokio::test]
    async fn should_not_cache_across_cycles() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let sections = vec![section()];
        run(&engine, &sections).await;
        run(&engine, &sections).await;
        assert_eq!(engine.neighbors.calls(), 2);
    }

    // ── Report ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_count_dispatches_in_report() {
        let engine = engine(ScriptedSource::always(present_records()), SpyLauncher::silent());
        let sections = vec![Section::builder("den")
            .threshold(1)
            .command_neighbor("lights on")
            .build()
            .unwrap()];
        let report = run(&engine, &sections).await;
        assert_eq!(report.dispatched(), 1);
        assert_eq!(report.sections.len(), 1);
    }
}
