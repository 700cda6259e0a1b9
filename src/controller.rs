//! Band sweep orchestration
//!
//! A sweep runs every [`BandTrial`] in order. Each trial switches the active
//! profile to one band, waits for the link to come back and measures it.
//! Whatever happens inside the loop (a degraded trial, a panic, an interrupt)
//! the profile is returned to automatic band selection exactly once before
//! [`BandController::run`] returns.

use crate::connectivity::ConnectivityWaiter;
use crate::error::AppError;
use crate::logging::{ErrorEventLogger, LogLevel, Logger, TrialLogger};
use crate::models::{BandTrial, Measurement, NetworkIdentity};
use crate::report::MeasurementSink;
use crate::tools::ThroughputMeter;
use crate::types::TrialStatus;
use crate::wifi::{BandSwitcher, LinkInspector};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Where a trial currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Idle,
    Switching,
    Waiting,
    Measuring,
    Recorded,
    Restoring,
    Done,
}

/// How the trial loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed,
    Interrupted,
}

/// Everything a sweep produced
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// One entry per finished trial, in trial order
    pub measurements: Vec<Measurement>,
    pub outcome: SweepOutcome,
    /// Whether the automatic band was put back without error
    pub restored: bool,
}

impl SweepReport {
    pub fn is_interrupted(&self) -> bool {
        self.outcome == SweepOutcome::Interrupted
    }

    /// Trial with the highest non-zero speed
    pub fn fastest(&self) -> Option<&Measurement> {
        self.measurements
            .iter()
            .filter(|m| m.speed_mbps > 0.0)
            .max_by(|a, b| a.speed_mbps.total_cmp(&b.speed_mbps))
    }
}

/// The band preference change held for the duration of a sweep.
///
/// Released through [`BandOverride::release`]. If it is dropped unreleased
/// (the sweep future itself was dropped) a restore is spawned on the current
/// runtime instead.
pub struct BandOverride {
    switcher: Arc<dyn BandSwitcher>,
    profile: String,
    released: bool,
}

impl BandOverride {
    pub fn engage(switcher: Arc<dyn BandSwitcher>, profile: impl Into<String>) -> Self {
        Self {
            switcher,
            profile: profile.into(),
            released: false,
        }
    }

    /// Restore automatic band selection; failures are logged, never raised
    pub async fn release(mut self, trial_logger: &TrialLogger, error_logger: &ErrorEventLogger, cid: &str) -> bool {
        self.released = true;
        trial_logger.log_transition(&self.profile, TrialState::Restoring, cid).await;

        let restored = match self.switcher.restore(&self.profile).await {
            Ok(()) => true,
            Err(e) => {
                error_logger.log_error(&e, Some("restoring automatic band"), Some(cid)).await;
                false
            }
        };

        trial_logger.log_restore(&self.profile, restored, cid).await;
        restored
    }
}

impl Drop for BandOverride {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        eprintln!("warning: band override on '{}' dropped before restore", self.profile);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let switcher = self.switcher.clone();
            let profile = std::mem::take(&mut self.profile);
            handle.spawn(async move {
                if let Err(e) = switcher.restore(&profile).await {
                    eprintln!("warning: restoring automatic band on '{}' failed: {}", profile, e);
                }
            });
        }
    }
}

/// Runs the band trial sequence against one network identity
pub struct BandController {
    switcher: Arc<dyn BandSwitcher>,
    waiter: ConnectivityWaiter,
    inspector: Arc<dyn LinkInspector>,
    meter: Arc<dyn ThroughputMeter>,
    sink: Option<Arc<dyn MeasurementSink>>,
    trials: Vec<BandTrial>,
    settle: Duration,
    target: String,
    trial_logger: TrialLogger,
    error_logger: ErrorEventLogger,
}

impl BandController {
    pub fn new(
        switcher: Arc<dyn BandSwitcher>,
        waiter: ConnectivityWaiter,
        inspector: Arc<dyn LinkInspector>,
        meter: Arc<dyn ThroughputMeter>,
        target: impl Into<String>,
    ) -> Self {
        let quiet = Logger::new("WST").with_level(LogLevel::Warn);
        Self {
            switcher,
            waiter,
            inspector,
            meter,
            sink: None,
            trials: BandTrial::sequence(),
            settle: crate::defaults::DEFAULT_SETTLE_DELAY,
            target: target.into(),
            trial_logger: TrialLogger::new(quiet.clone()),
            error_logger: ErrorEventLogger::new(quiet),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn MeasurementSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_trials(mut self, trials: Vec<BandTrial>) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_loggers(mut self, trial_logger: TrialLogger, error_logger: ErrorEventLogger) -> Self {
        self.trial_logger = trial_logger;
        self.error_logger = error_logger;
        self
    }

    /// Run every trial until done or until `cancel` resolves, then restore.
    ///
    /// A panic inside a trial is re-raised after the restore has run.
    pub async fn run<F>(&self, identity: &NetworkIdentity, cancel: F) -> SweepReport
    where
        F: Future<Output = ()>,
    {
        let cid = Uuid::new_v4().simple().to_string();
        self.trial_logger.log_sweep_start(identity, self.meter.tool_name(), &cid).await;
        self.trial_logger.log_transition("sweep", TrialState::Idle, &cid).await;

        let collected = Mutex::new(Vec::with_capacity(self.trials.len()));
        let guard = BandOverride::engage(self.switcher.clone(), identity.profile_name.clone());

        let outcome = {
            let trials = AssertUnwindSafe(self.run_trials(identity, &collected, &cid)).catch_unwind();
            tokio::select! {
                biased;
                _ = cancel => Ok(SweepOutcome::Interrupted),
                result = trials => result.map(|_| SweepOutcome::Completed),
            }
        };

        if let Ok(SweepOutcome::Interrupted) = outcome {
            let err = AppError::interrupted("band sweep interrupted; remaining trials skipped");
            self.error_logger.log_error(&err, None, Some(&cid)).await;
        }

        let restored = guard.release(&self.trial_logger, &self.error_logger, &cid).await;
        self.trial_logger.log_transition("sweep", TrialState::Done, &cid).await;

        let measurements = collected.into_inner().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(outcome) => SweepReport {
                measurements,
                outcome,
                restored,
            },
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn run_trials(&self, identity: &NetworkIdentity, collected: &Mutex<Vec<Measurement>>, cid: &str) {
        for trial in &self.trials {
            let measurement = self.run_trial(identity, trial, cid).await;
            self.trial_logger.log_measurement(&measurement, cid).await;

            if let Some(sink) = &self.sink {
                if let Err(e) = sink.record(identity, &measurement).await {
                    self.error_logger.log_error(&e, Some("recording measurement"), Some(cid)).await;
                }
            }

            self.trial_logger.log_transition(&trial.label, TrialState::Recorded, cid).await;
            collected.lock().unwrap_or_else(PoisonError::into_inner).push(measurement);
        }
    }

    /// Always yields exactly one measurement
    async fn run_trial(&self, identity: &NetworkIdentity, trial: &BandTrial, cid: &str) -> Measurement {
        let tool = self.meter.tool_name();

        self.trial_logger.log_transition(&trial.label, TrialState::Switching, cid).await;
        if let Err(e) = self.switcher.switch_band(&identity.profile_name, trial.band).await {
            self.error_logger.log_degraded(&trial.label, &e, cid).await;
            return Measurement::sentinel(&trial.label, tool, TrialStatus::SwitchFailed);
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        self.trial_logger.log_transition(&trial.label, TrialState::Waiting, cid).await;
        if !self.waiter.wait_for_connection(&self.target).await {
            let e = AppError::connectivity_timeout(format!(
                "{} unreachable after {} attempts",
                self.target,
                self.waiter.max_attempts()
            ));
            self.error_logger.log_degraded(&trial.label, &e, cid).await;
            return Measurement::sentinel(&trial.label, tool, TrialStatus::ConnectivityTimeout);
        }

        self.trial_logger.log_transition(&trial.label, TrialState::Measuring, cid).await;
        let link = self.inspector.inspect(&identity.interface).await;
        let speed = self.meter.measure(&identity.interface).await;
        Measurement::measured(&trial.label, link, speed, tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::fake::CountingProbe;
    use crate::error::Result;
    use crate::models::LinkInfo;
    use crate::types::Band;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: Duration = Duration::from_millis(1);

    #[derive(Default)]
    struct FakeSwitcher {
        switches: Mutex<Vec<Band>>,
        restores: AtomicU32,
        fail_on: Option<Band>,
        fail_restore: bool,
    }

    impl FakeSwitcher {
        fn restores(&self) -> u32 {
            self.restores.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BandSwitcher for FakeSwitcher {
        async fn switch_band(&self, _profile: &str, band: Band) -> Result<()> {
            self.switches.lock().unwrap().push(band);
            if self.fail_on == Some(band) {
                return Err(AppError::band_switch(format!("{} not supported", band)));
            }
            Ok(())
        }

        async fn restore(&self, _profile: &str) -> Result<()> {
            self.restores.fetch_add(1, Ordering::SeqCst);
            if self.fail_restore {
                return Err(AppError::band_switch("nmcli: connection activation failed"));
            }
            Ok(())
        }

        fn describe(&self) -> &'static str {
            "fake"
        }
    }

    struct FixedInspector;

    #[async_trait]
    impl LinkInspector for FixedInspector {
        async fn inspect(&self, _interface: &str) -> LinkInfo {
            LinkInfo {
                frequency_mhz: Some(5180),
                width_mhz: Some(80),
            }
        }
    }

    #[derive(Default)]
    struct ScriptedMeter {
        calls: AtomicU32,
        hang_from: Option<u32>,
        panic_on: Option<u32>,
    }

    impl ScriptedMeter {
        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ThroughputMeter for ScriptedMeter {
        fn tool_name(&self) -> &str {
            "Fake Tool"
        }

        async fn measure(&self, _interface: &str) -> f64 {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic_on == Some(n) {
                panic!("meter exploded");
            }
            if self.hang_from.is_some_and(|h| n >= h) {
                std::future::pending::<()>().await;
            }
            100.0 + n as f64
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<(String, f64)>>,
    }

    #[async_trait]
    impl MeasurementSink for RecordingSink {
        async fn record(&self, identity: &NetworkIdentity, measurement: &Measurement) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .push((identity.profile_name.clone(), measurement.speed_mbps));
            Ok(())
        }
    }

    fn identity() -> NetworkIdentity {
        NetworkIdentity::new("wlan0", "HomeNet")
    }

    fn controller(
        switcher: Arc<FakeSwitcher>,
        probe: CountingProbe,
        meter: Arc<ScriptedMeter>,
    ) -> BandController {
        let waiter = ConnectivityWaiter::new(Arc::new(probe), 3, FAST);
        BandController::new(switcher, waiter, Arc::new(FixedInspector), meter, "8.8.8.8")
            .with_settle_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_full_sweep_measures_every_band_and_restores_once() {
        let switcher = Arc::new(FakeSwitcher::default());
        let meter = Arc::new(ScriptedMeter::default());
        let sink = Arc::new(RecordingSink::default());
        let controller = controller(switcher.clone(), CountingProbe::succeeding_on(1), meter.clone())
            .with_sink(sink.clone());

        let report = controller.run(&identity(), std::future::pending()).await;

        assert_eq!(report.outcome, SweepOutcome::Completed);
        assert!(report.restored);
        assert_eq!(report.measurements.len(), 3);
        assert_eq!(switcher.restores(), 1);
        assert_eq!(*switcher.switches.lock().unwrap(), vec![Band::Ghz2_4, Band::Ghz5, Band::Ghz6]);
        assert_eq!(meter.calls(), 3);
        assert!(report.measurements.iter().all(|m| m.status == TrialStatus::Measured));
        assert_eq!(report.measurements[0].frequency_mhz, Some(5180));
        assert_eq!(report.fastest().unwrap().speed_mbps, 103.0);
        assert_eq!(sink.records.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_connectivity_timeout_never_invokes_tool() {
        let switcher = Arc::new(FakeSwitcher::default());
        let meter = Arc::new(ScriptedMeter::default());
        let controller = controller(switcher.clone(), CountingProbe::never(), meter.clone());

        let report = controller.run(&identity(), std::future::pending()).await;

        assert_eq!(report.measurements.len(), 3);
        assert_eq!(meter.calls(), 0);
        for m in &report.measurements {
            assert_eq!(m.speed_mbps, 0.0);
            assert_eq!(m.frequency_mhz, None);
            assert_eq!(m.status, TrialStatus::ConnectivityTimeout);
        }
        assert!(report.fastest().is_none());
        assert_eq!(switcher.restores(), 1);
    }

    #[tokio::test]
    async fn test_switch_failure_is_isolated() {
        let switcher = Arc::new(FakeSwitcher {
            fail_on: Some(Band::Ghz6),
            ..Default::default()
        });
        let meter = Arc::new(ScriptedMeter::default());
        let controller = controller(switcher.clone(), CountingProbe::succeeding_on(1), meter.clone());

        let report = controller.run(&identity(), std::future::pending()).await;

        let statuses: Vec<_> = report.measurements.iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![TrialStatus::Measured, TrialStatus::Measured, TrialStatus::SwitchFailed]
        );
        assert_eq!(report.measurements[2].band, "6GHz");
        assert_eq!(meter.calls(), 2);
        assert_eq!(switcher.restores(), 1);
    }

    #[tokio::test]
    async fn test_failed_restore_is_reported_not_raised() {
        let switcher = Arc::new(FakeSwitcher {
            fail_restore: true,
            ..Default::default()
        });
        let meter = Arc::new(ScriptedMeter::default());
        let controller = controller(switcher.clone(), CountingProbe::succeeding_on(1), meter);

        let report = controller.run(&identity(), std::future::pending()).await;

        assert!(!report.restored);
        assert_eq!(report.measurements.len(), 3);
        assert_eq!(switcher.restores(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_mid_trial_keeps_results_and_restores() {
        let switcher = Arc::new(FakeSwitcher::default());
        let meter = Arc::new(ScriptedMeter {
            hang_from: Some(2),
            ..Default::default()
        });
        let controller = controller(switcher.clone(), CountingProbe::succeeding_on(1), meter.clone());

        let cancel = tokio::time::sleep(Duration::from_millis(100));
        let report = controller.run(&identity(), cancel).await;

        assert!(report.is_interrupted());
        assert_eq!(report.measurements.len(), 1);
        assert_eq!(meter.calls(), 2);
        assert_eq!(switcher.restores(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_while_waiting_is_not_a_timeout() {
        let switcher = Arc::new(FakeSwitcher::default());
        let meter = Arc::new(ScriptedMeter::default());
        let probe = Arc::new(CountingProbe::never());
        let waiter = ConnectivityWaiter::new(probe.clone(), 300, Duration::from_millis(10));
        let controller = BandController::new(switcher.clone(), waiter, Arc::new(FixedInspector), meter.clone(), "8.8.8.8")
            .with_settle_delay(Duration::ZERO);

        let cancel = tokio::time::sleep(Duration::from_millis(50));
        let report = controller.run(&identity(), cancel).await;

        assert_eq!(report.outcome, SweepOutcome::Interrupted);
        assert!(probe.calls() > 0 && probe.calls() < 300);
        assert!(report
            .measurements
            .iter()
            .all(|m| m.status != TrialStatus::ConnectivityTimeout));
        assert!(report.measurements.is_empty());
        assert_eq!(meter.calls(), 0);
        assert_eq!(*switcher.switches.lock().unwrap(), vec![Band::Ghz2_4]);
        assert_eq!(switcher.restores(), 1);
    }

    #[tokio::test]
    async fn test_panic_in_trial_still_restores() {
        let switcher = Arc::new(FakeSwitcher::default());
        let meter = Arc::new(ScriptedMeter {
            panic_on: Some(2),
            ..Default::default()
        });
        let controller = Arc::new(controller(switcher.clone(), CountingProbe::succeeding_on(1), meter));

        let handle = tokio::spawn(async move {
            controller.run(&identity(), std::future::pending()).await
        });
        let err = handle.await.unwrap_err();

        assert!(err.is_panic());
        assert_eq!(switcher.restores(), 1);
    }

    #[tokio::test]
    async fn test_dropped_override_spawns_restore() {
        let switcher = Arc::new(FakeSwitcher::default());
        drop(BandOverride::engage(switcher.clone(), "HomeNet"));
        tokio::task::yield_now().await;
        assert_eq!(switcher.restores(), 1);
    }

    #[test]
    fn test_fastest_ignores_zero_speed() {
        let report = SweepReport {
            measurements: vec![
                Measurement::sentinel("2.4GHz", "Fake Tool", TrialStatus::ConnectivityTimeout),
                Measurement::measured("5GHz", LinkInfo::unavailable(), 42.5, "Fake Tool"),
            ],
            outcome: SweepOutcome::Completed,
            restored: true,
        };
        assert_eq!(report.fastest().unwrap().band, "5GHz");
    }
}
