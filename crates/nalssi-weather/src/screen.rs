//! Mount lifecycle for the weather screen.
//!
//! Mounting starts exactly one pipeline run. Mounting again while mounted does
//! nothing; `remount` cancels an unfinished run and waits for it to stop
//! before starting the next, so two runs never write the state at once.
//!
//! The task handle stays with the mount until unmount. Waiters only watch the
//! run's outcome channel, so dropping a waiter can't detach the run.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::date::{date_label, Clock};
use crate::pipeline::{AcquisitionPipeline, DisplayState, PipelineStage};

struct Mount {
    task: JoinHandle<()>,
    /// `Some` once the run reached a terminal stage; closed if the run was aborted
    outcome: watch::Receiver<Option<PipelineStage>>,
}

pub struct Screen {
    pipeline: Arc<AcquisitionPipeline>,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    state: Arc<watch::Sender<DisplayState>>,
    mount: Mutex<Option<Mount>>,
}

impl Screen {
    /// Runs are spawned on `runtime`, so `mount` works from any thread.
    pub fn new(pipeline: AcquisitionPipeline, clock: Arc<dyn Clock>, runtime: Handle) -> Self {
        let (state, _) = watch::channel(DisplayState::new(date_label(clock.today())));
        Self {
            pipeline: Arc::new(pipeline),
            clock,
            runtime,
            state: Arc::new(state),
            mount: Mutex::new(None),
        }
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> DisplayState {
        self.state.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.lock().is_some()
    }

    /// Start the pipeline. Returns false if already mounted.
    pub fn mount(&self) -> bool {
        let mut mount = self.mount.lock();
        if mount.is_some() {
            tracing::debug!("Screen already mounted, not starting another run");
            return false;
        }

        self.state
            .send_replace(DisplayState::new(date_label(self.clock.today())));

        let (done, outcome) = watch::channel(None);
        let pipeline = self.pipeline.clone();
        let state = self.state.clone();
        let task = self.runtime.spawn(async move {
            let stage = pipeline.run(&state).await;
            done.send_replace(Some(stage));
        });

        *mount = Some(Mount { task, outcome });
        tracing::info!("Screen mounted");
        true
    }

    /// Wait for the current run to finish. `None` if not mounted or the run was cancelled.
    ///
    /// Any number of callers may wait at once; dropping a wait has no effect on the run.
    pub async fn wait(&self) -> Option<PipelineStage> {
        let mut outcome = self.mount.lock().as_ref()?.outcome.clone();

        if let Some(stage) = *outcome.borrow_and_update() {
            return Some(stage);
        }

        let result = match outcome.wait_for(Option::is_some).await {
            Ok(stage) => *stage,
            Err(_) => {
                tracing::debug!("Pipeline run was cancelled before finishing");
                None
            }
        };
        result
    }

    /// Stop any unfinished run and forget the mount.
    pub async fn unmount(&self) {
        let previous = self.mount.lock().take();
        if let Some(mount) = previous {
            mount.task.abort();
            // Make sure the old run can no longer publish
            let _ = mount.task.await;
        }
        tracing::info!("Screen unmounted");
    }

    /// Unmount, then mount again with fresh state.
    pub async fn remount(&self) -> bool {
        self.unmount().await;
        self.mount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::FixedClock;
    use crate::geocode::{GeocodeOptions, ReverseGeocoder};
    use crate::location::LocationService;
    use crate::provider::WeatherSource;
    use crate::types::{
        Accuracy, Coordinates, GeocodeError, LocationError, LocationPermissionStatus, Place,
        WeatherError, WeatherReading,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Counts runs and how many overlap. The first run waits on `release`.
    #[derive(Default)]
    struct RunCounter {
        runs: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
        hold_first: AtomicBool,
        release: Notify,
    }

    struct ActiveGuard(Arc<RunCounter>);

    impl Drop for ActiveGuard {
        fn drop(&mut self) {
            self.0.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct CountingLocation(Arc<RunCounter>);

    #[async_trait]
    impl LocationService for CountingLocation {
        async fn request_permission(&self) -> Result<LocationPermissionStatus, LocationError> {
            self.0.runs.fetch_add(1, Ordering::SeqCst);
            Ok(LocationPermissionStatus::Granted)
        }

        async fn current_coordinates(
            &self,
            accuracy: Accuracy,
        ) -> Result<Coordinates, LocationError> {
            let now = self.0.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.0.max_active.fetch_max(now, Ordering::SeqCst);
            let _guard = ActiveGuard(self.0.clone());

            if self.0.hold_first.swap(false, Ordering::SeqCst) {
                self.0.release.notified().await;
            }
            Ok(Coordinates {
                latitude: 37.5665,
                longitude: 126.9780,
                accuracy,
            })
        }
    }

    struct SeoulGeocoder;

    #[async_trait]
    impl ReverseGeocoder for SeoulGeocoder {
        async fn reverse_geocode(
            &self,
            _coordinates: &Coordinates,
            _options: GeocodeOptions,
        ) -> Result<Vec<Place>, GeocodeError> {
            Ok(vec![Place {
                city: Some("Seoul".into()),
                ..Place::default()
            }])
        }
    }

    struct ClearSky;

    #[async_trait]
    impl WeatherSource for ClearSky {
        async fn current(&self, _coordinates: &Coordinates) -> Result<WeatherReading, WeatherError> {
            Ok(WeatherReading {
                temperature_celsius: 22,
                category: "Clear".into(),
            })
        }
    }

    fn screen(counter: Arc<RunCounter>) -> Screen {
        let pipeline = AcquisitionPipeline::new(
            Arc::new(CountingLocation(counter)),
            Arc::new(SeoulGeocoder),
            Arc::new(ClearSky),
        );
        let clock = FixedClock(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        Screen::new(pipeline, Arc::new(clock), Handle::current())
    }

    #[tokio::test]
    async fn test_mount_runs_once() {
        let counter = Arc::new(RunCounter::default());
        let screen = screen(counter.clone());

        assert!(screen.mount());
        assert!(!screen.mount());
        assert_eq!(screen.wait().await, Some(PipelineStage::WeatherPublished));
        assert!(!screen.mount());

        assert_eq!(counter.runs.load(Ordering::SeqCst), 1);
        let state = screen.state();
        assert_eq!(state.city, "Seoul");
        assert_eq!(state.temperature, Some(22));
        assert_eq!(state.date_label, "2026년 10월 19일 월요일");
    }

    #[tokio::test]
    async fn test_wait_is_repeatable() {
        let screen = screen(Arc::new(RunCounter::default()));
        screen.mount();
        let first = screen.wait().await;
        let second = screen.wait().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_wait_without_mount() {
        let screen = screen(Arc::new(RunCounter::default()));
        assert_eq!(screen.wait().await, None);
        assert!(!screen.is_mounted());
    }

    #[tokio::test]
    async fn test_remount_starts_exactly_one_new_run() {
        let counter = Arc::new(RunCounter::default());
        let screen = screen(counter.clone());

        screen.mount();
        screen.wait().await;
        assert!(screen.remount().await);
        screen.wait().await;

        assert_eq!(counter.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remount_cancels_incomplete_run_without_overlap() {
        let counter = Arc::new(RunCounter::default());
        counter.hold_first.store(true, Ordering::SeqCst);
        let screen = screen(counter.clone());

        screen.mount();
        // Let the first run reach the held location fix
        while counter.active.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(screen.remount().await);
        assert_eq!(screen.wait().await, Some(PipelineStage::WeatherPublished));
        // Waking the cancelled run must not change anything
        counter.release.notify_waiters();

        assert_eq!(counter.runs.load(Ordering::SeqCst), 2);
        assert_eq!(counter.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(screen.state().city, "Seoul");
    }

    #[tokio::test]
    async fn test_remount_resets_state() {
        let screen = screen(Arc::new(RunCounter::default()));
        screen.mount();
        screen.wait().await;
        assert_eq!(screen.state().temperature, Some(22));

        screen.unmount().await;
        screen.mount();
        // Current-thread runtime: the new run hasn't been polled yet
        let fresh = screen.state();
        assert_eq!(fresh.temperature, None);
        assert_eq!(fresh.city, crate::pipeline::LOADING_PLACEHOLDER);
        assert_eq!(fresh.stage, PipelineStage::Idle);

        screen.wait().await;
        assert_eq!(screen.state().temperature, Some(22));
    }

    #[tokio::test]
    async fn test_abandoned_wait_keeps_run_attached() {
        let counter = Arc::new(RunCounter::default());
        counter.hold_first.store(true, Ordering::SeqCst);
        let screen = screen(counter.clone());

        screen.mount();
        let waited = tokio::time::timeout(Duration::from_millis(20), screen.wait()).await;
        assert!(waited.is_err());
        assert!(screen.is_mounted());

        // The held run must still be cancelled here
        assert!(screen.remount().await);
        let (first, second) = tokio::join!(screen.wait(), screen.wait());
        assert_eq!(first, Some(PipelineStage::WeatherPublished));
        assert_eq!(second, Some(PipelineStage::WeatherPublished));
        counter.release.notify_waiters();
        tokio::task::yield_now().await;

        assert_eq!(counter.runs.load(Ordering::SeqCst), 2);
        assert_eq!(counter.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_waits_all_see_outcome() {
        let counter = Arc::new(RunCounter::default());
        counter.hold_first.store(true, Ordering::SeqCst);
        let screen = screen(counter.clone());
        screen.mount();

        let release = async {
            while counter.active.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            counter.release.notify_one();
        };
        let (first, second, _) = tokio::join!(screen.wait(), screen.wait(), release);

        assert_eq!(first, Some(PipelineStage::WeatherPublished));
        assert_eq!(second, Some(PipelineStage::WeatherPublished));
        assert_eq!(counter.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pending_wait_sees_cancellation() {
        let counter = Arc::new(RunCounter::default());
        counter.hold_first.store(true, Ordering::SeqCst);
        let screen = screen(counter.clone());
        screen.mount();

        let cancel = async {
            while counter.active.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            screen.unmount().await;
        };
        let (outcome, _) = tokio::join!(screen.wait(), cancel);

        assert_eq!(outcome, None);
        assert!(!screen.is_mounted());
        assert_eq!(counter.active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mount_from_thread_without_runtime() {
        let screen = Arc::new(screen(Arc::new(RunCounter::default())));

        let mounted = {
            let screen = screen.clone();
            std::thread::spawn(move || screen.mount()).join().unwrap()
        };
        assert!(mounted);
        assert_eq!(screen.wait().await, Some(PipelineStage::WeatherPublished));
    }
}
