use std::sync::Arc;
use std::time::Duration;

use neuramail_client::ClientError;
use neuramail_core::ProfileLookup;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use uuid::Uuid;

use crate::backend::AutomationBackend;
use crate::notify::{AutomationEvent, Notifier};
use crate::status::{AutomationStatus, CyclePhase, Operation};

/// Loop cadence. Polling is start-to-start: a slow cycle eats into the next
/// interval instead of shifting the schedule, and a cycle that overruns the
/// whole interval skips a beat rather than overlapping.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    pub idle_reset: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            idle_reset: Duration::from_secs(3),
        }
    }
}

/// The two profile switches that arm automated replies. Fetch runs
/// regardless; only the reply call is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoReplyGate {
    pub auto_reply: bool,
    pub has_assistant_token: bool,
}

impl AutoReplyGate {
    pub fn closed() -> Self {
        Self {
            auto_reply: false,
            has_assistant_token: false,
        }
    }

    pub fn permits_reply(&self) -> bool {
        self.auto_reply && self.has_assistant_token
    }
}

/// Derives the gate from a profile lookup. Evaluated from scratch every
/// cycle; profile settings can change between polls.
pub fn evaluate_gate(lookup: &ProfileLookup) -> AutoReplyGate {
    match lookup {
        ProfileLookup::Found(profile) => AutoReplyGate {
            auto_reply: profile.auto_reply,
            has_assistant_token: profile.has_assistant_token(),
        },
        ProfileLookup::NotFound | ProfileLookup::Error(_) => AutoReplyGate::closed(),
    }
}

/// What one cycle did, separated from how it gets presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub phase: CyclePhase,
    pub fetched: usize,
    pub replied: usize,
    /// Set when the credential is gone; the loop stops scheduling.
    pub halt: bool,
}

impl CycleReport {
    fn halted() -> Self {
        Self {
            phase: CyclePhase::Error,
            fetched: 0,
            replied: 0,
            halt: true,
        }
    }
}

/// The polling state machine: `idle -> running -> {success, error} -> idle`,
/// one cycle at a time.
pub struct AutomationLoop<B> {
    backend: Arc<B>,
    notifier: Arc<dyn Notifier>,
    settings: LoopSettings,
    status: watch::Sender<AutomationStatus>,
    cancel: watch::Receiver<bool>,
}

/// Owning handle for a spawned loop. Dropping it stops the loop too, since
/// the cancel channel closes with it.
pub struct AutomationHandle {
    cancel: watch::Sender<bool>,
    status: watch::Receiver<AutomationStatus>,
    task: JoinHandle<()>,
}

impl AutomationHandle {
    pub fn status(&self) -> watch::Receiver<AutomationStatus> {
        self.status.clone()
    }

    /// Waits for the loop to stop on its own, which only happens on a
    /// missing-credential halt.
    pub async fn wait(&mut self) {
        let _ = (&mut self.task).await;
    }

    /// Signals teardown and waits for the loop to wind down. The current
    /// step is allowed to finish; nothing runs after it.
    pub async fn shutdown(self) {
        let _ = self.cancel.send(true);
        let _ = self.task.await;
    }
}

impl<B: AutomationBackend + 'static> AutomationLoop<B> {
    /// Spawns the polling loop. The first cycle runs immediately.
    pub fn spawn(
        backend: Arc<B>,
        notifier: Arc<dyn Notifier>,
        settings: LoopSettings,
    ) -> AutomationHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(AutomationStatus::default());

        let mut driver = AutomationLoop {
            backend,
            notifier,
            settings,
            status: status_tx,
            cancel: cancel_rx,
        };
        let task = tokio::spawn(async move { driver.run().await });

        AutomationHandle {
            cancel: cancel_tx,
            status: status_rx,
            task,
        }
    }

    async fn run(&mut self) {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.changed() => break,
                _ = ticker.tick() => {}
            }
            if self.cancelled() {
                break;
            }

            let Some(report) = self.run_cycle().await else {
                break;
            };
            if report.halt {
                tracing::warn!("automation loop halted, sign-in required");
                break;
            }

            tokio::select! {
                _ = self.cancel.changed() => break,
                _ = sleep(self.settings.idle_reset) => {}
            }
            self.set_status(CyclePhase::Idle, Operation::Fetch);
        }
    }

    /// One fetch-then-maybe-reply pass. Returns `None` when teardown
    /// interrupted the cycle; results of an in-flight call are discarded at
    /// that point and nothing further is notified.
    async fn run_cycle(&mut self) -> Option<CycleReport> {
        let cycle = Uuid::new_v4();
        self.set_status(CyclePhase::Running, Operation::Fetch);
        tracing::debug!(%cycle, "automation cycle started");

        let looked_up = self.backend.check_profile().await;
        if self.cancelled() {
            return None;
        }
        let gate = match looked_up {
            Ok(lookup) => evaluate_gate(&lookup),
            Err(ClientError::MissingCredential) => {
                return self.credential_halt(Operation::Fetch);
            }
            Err(err) => {
                tracing::warn!(%cycle, "profile gate unavailable: {err}");
                AutoReplyGate::closed()
            }
        };

        let fetch_result = self.backend.fetch_emails().await;
        if self.cancelled() {
            return None;
        }
        let fetched = match fetch_result {
            Ok(outcome) => {
                let count = outcome.count();
                if count > 0 {
                    self.notifier
                        .notify(AutomationEvent::EmailsFetched { count });
                } else {
                    self.notifier.notify(AutomationEvent::NoNewEmails);
                }
                Some(count)
            }
            Err(ClientError::MissingCredential) => {
                return self.credential_halt(Operation::Fetch);
            }
            Err(err) => {
                tracing::warn!(%cycle, "email fetch failed: {err}");
                self.notifier.notify(AutomationEvent::FetchFailed {
                    reason: err.to_string(),
                });
                None
            }
        };

        let mut operation = Operation::Fetch;
        let mut failed = fetched.is_none();
        let mut replied = 0;
        if let Some(count) = fetched {
            if gate.permits_reply() && count > 0 {
                operation = Operation::Reply;
                self.set_status(CyclePhase::Running, operation);

                let reply_result = self.backend.send_automated_reply().await;
                if self.cancelled() {
                    return None;
                }
                match reply_result {
                    Ok(()) => {
                        self.notifier.notify(AutomationEvent::AutoReplied { count });
                        replied = count;
                    }
                    Err(ClientError::MissingCredential) => {
                        return self.credential_halt(operation);
                    }
                    Err(err) => {
                        tracing::warn!(%cycle, "automated reply failed: {err}");
                        self.notifier.notify(AutomationEvent::AutoReplyFailed {
                            reason: err.to_string(),
                        });
                        failed = true;
                    }
                }
            }
        }

        let phase = if failed {
            CyclePhase::Error
        } else {
            CyclePhase::Success
        };
        self.set_status(phase, operation);
        tracing::debug!(%cycle, %phase, replied, "automation cycle settled");
        Some(CycleReport {
            phase,
            fetched: fetched.unwrap_or(0),
            replied,
            halt: false,
        })
    }

    fn credential_halt(&self, operation: Operation) -> Option<CycleReport> {
        self.notifier.notify(AutomationEvent::SessionMissing);
        self.set_status(CyclePhase::Error, operation);
        Some(CycleReport::halted())
    }

    fn set_status(&self, phase: CyclePhase, operation: Operation) {
        self.status.send_replace(AutomationStatus { phase, operation });
    }

    fn cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neuramail_core::{FetchOutcome, FetchedEmail, Profile};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn profile(auto_reply: bool, token: Option<&str>) -> Profile {
        Profile {
            profile_name: "Ada".to_string(),
            profile_email: "ada@example.com".to_string(),
            auto_reply,
            assistant_id: None,
            assistant_token: token.map(str::to_string),
            phone: None,
        }
    }

    struct FakeBackend {
        lookup: ProfileLookup,
        emails_per_fetch: usize,
        fail_fetch: bool,
        fail_reply: bool,
        missing_credential: bool,
        fetch_delay: Duration,
        profile_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
        reply_calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeBackend {
        fn with_lookup(lookup: ProfileLookup, emails: usize) -> Self {
            Self {
                lookup,
                emails_per_fetch: emails,
                fail_fetch: false,
                fail_reply: false,
                missing_credential: false,
                fetch_delay: Duration::ZERO,
                profile_calls: AtomicUsize::new(0),
                fetch_calls: AtomicUsize::new(0),
                reply_calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn armed(emails: usize) -> Self {
            Self::with_lookup(ProfileLookup::Found(profile(true, Some("asst-1"))), emails)
        }

        fn disarmed(emails: usize) -> Self {
            Self::with_lookup(ProfileLookup::Found(profile(false, Some("asst-1"))), emails)
        }

        fn without_session(mut self) -> Self {
            self.missing_credential = true;
            self
        }

        fn failing_fetch(mut self) -> Self {
            self.fail_fetch = true;
            self
        }

        fn failing_reply(mut self) -> Self {
            self.fail_reply = true;
            self
        }

        fn with_fetch_delay(mut self, delay: Duration) -> Self {
            self.fetch_delay = delay;
            self
        }

        fn track(&self) -> InFlight<'_> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            InFlight(self)
        }

        fn profile_calls(&self) -> usize {
            self.profile_calls.load(Ordering::SeqCst)
        }

        fn fetch_calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }

        fn reply_calls(&self) -> usize {
            self.reply_calls.load(Ordering::SeqCst)
        }

        fn total_calls(&self) -> usize {
            self.profile_calls() + self.fetch_calls() + self.reply_calls()
        }

        fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    struct InFlight<'a>(&'a FakeBackend);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl AutomationBackend for FakeBackend {
        async fn check_profile(&self) -> Result<ProfileLookup, ClientError> {
            let _guard = self.track();
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if self.missing_credential {
                return Err(ClientError::MissingCredential);
            }
            Ok(self.lookup.clone())
        }

        async fn fetch_emails(&self) -> Result<FetchOutcome, ClientError> {
            let _guard = self.track();
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if !self.fetch_delay.is_zero() {
                sleep(self.fetch_delay).await;
            }
            if self.fail_fetch {
                return Err(ClientError::Decode("fetch wire mismatch".into()));
            }
            Ok(FetchOutcome {
                emails: vec![FetchedEmail::default(); self.emails_per_fetch],
            })
        }

        async fn send_automated_reply(&self) -> Result<(), ClientError> {
            let _guard = self.track();
            self.reply_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_reply {
                return Err(ClientError::Backend {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    message: "assistant unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<AutomationEvent>>,
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<AutomationEvent> {
            self.events.lock().expect("events lock").clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: AutomationEvent) {
            self.events.lock().expect("events lock").push(event);
        }
    }

    fn fast_settings() -> LoopSettings {
        LoopSettings {
            poll_interval: Duration::from_millis(15),
            idle_reset: Duration::from_millis(1),
        }
    }

    fn driver_for(
        backend: Arc<FakeBackend>,
        notifier: Arc<RecordingNotifier>,
    ) -> (
        AutomationLoop<FakeBackend>,
        watch::Sender<bool>,
        watch::Receiver<AutomationStatus>,
    ) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(AutomationStatus::default());
        let driver = AutomationLoop {
            backend,
            notifier,
            settings: fast_settings(),
            status: status_tx,
            cancel: cancel_rx,
        };
        (driver, cancel_tx, status_rx)
    }

    #[test]
    fn gate_requires_both_flag_and_token() {
        let armed = ProfileLookup::Found(profile(true, Some("asst-1")));
        assert!(evaluate_gate(&armed).permits_reply());

        let flag_only = ProfileLookup::Found(profile(true, None));
        assert!(!evaluate_gate(&flag_only).permits_reply());

        let blank_token = ProfileLookup::Found(profile(true, Some("   ")));
        assert!(!evaluate_gate(&blank_token).permits_reply());

        let token_only = ProfileLookup::Found(profile(false, Some("asst-1")));
        assert!(!evaluate_gate(&token_only).permits_reply());

        assert!(!evaluate_gate(&ProfileLookup::NotFound).permits_reply());
        assert!(!evaluate_gate(&ProfileLookup::Error("backend down".into())).permits_reply());
    }

    #[tokio::test]
    async fn armed_gate_replies_exactly_once_per_cycle() {
        let backend = Arc::new(FakeBackend::armed(3));
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut driver, _cancel, _status) = driver_for(backend.clone(), notifier.clone());

        let report = driver.run_cycle().await.expect("cycle completes");
        assert_eq!(report.phase, CyclePhase::Success);
        assert_eq!(report.replied, 3);
        assert_eq!(backend.reply_calls(), 1);

        let report = driver.run_cycle().await.expect("cycle completes");
        assert!(!report.halt);
        assert_eq!(backend.reply_calls(), 2);
        assert!(notifier
            .events()
            .contains(&AutomationEvent::AutoReplied { count: 3 }));
    }

    #[tokio::test]
    async fn closed_gate_fetches_but_never_replies() {
        let backend = Arc::new(FakeBackend::disarmed(2));
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut driver, _cancel, _status) = driver_for(backend.clone(), notifier.clone());

        for _ in 0..3 {
            let report = driver.run_cycle().await.expect("cycle completes");
            assert_eq!(report.phase, CyclePhase::Success);
        }

        assert_eq!(backend.fetch_calls(), 3);
        assert_eq!(backend.reply_calls(), 0);
        assert!(notifier
            .events()
            .contains(&AutomationEvent::EmailsFetched { count: 2 }));
    }

    #[tokio::test]
    async fn zero_new_emails_skip_the_reply() {
        let backend = Arc::new(FakeBackend::armed(0));
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut driver, _cancel, status) = driver_for(backend.clone(), notifier.clone());

        let report = driver.run_cycle().await.expect("cycle completes");
        assert_eq!(report.phase, CyclePhase::Success);
        assert_eq!(report.replied, 0);
        assert_eq!(backend.reply_calls(), 0);
        assert!(notifier.events().contains(&AutomationEvent::NoNewEmails));
        assert_eq!(
            *status.borrow(),
            AutomationStatus {
                phase: CyclePhase::Success,
                operation: Operation::Fetch,
            }
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_but_not_fatal() {
        let backend = Arc::new(FakeBackend::armed(5).failing_fetch());
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut driver, _cancel, _status) = driver_for(backend.clone(), notifier.clone());

        let report = driver.run_cycle().await.expect("cycle completes");
        assert_eq!(report.phase, CyclePhase::Error);
        assert!(!report.halt);
        assert_eq!(backend.reply_calls(), 0);
        assert!(notifier
            .events()
            .iter()
            .any(|event| matches!(event, AutomationEvent::FetchFailed { .. })));

        let report = driver.run_cycle().await.expect("loop keeps cycling");
        assert!(!report.halt);
        assert_eq!(backend.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn reply_failure_keeps_the_loop_alive() {
        let backend = Arc::new(FakeBackend::armed(1).failing_reply());
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut driver, _cancel, status) = driver_for(backend.clone(), notifier.clone());

        let report = driver.run_cycle().await.expect("cycle completes");
        assert_eq!(report.phase, CyclePhase::Error);
        assert!(!report.halt);
        assert!(notifier.events().iter().any(|event| matches!(
            event,
            AutomationEvent::AutoReplyFailed { reason } if reason.contains("assistant unavailable")
        )));
        assert_eq!(status.borrow().operation, Operation::Reply);
    }

    #[tokio::test]
    async fn missing_credential_halts_scheduling() {
        let backend = Arc::new(FakeBackend::armed(1).without_session());
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut driver, _cancel, status) = driver_for(backend.clone(), notifier.clone());

        let report = driver.run_cycle().await.expect("cycle completes");
        assert!(report.halt);
        assert_eq!(report.phase, CyclePhase::Error);
        assert!(notifier.events().contains(&AutomationEvent::SessionMissing));
        assert_eq!(status.borrow().phase, CyclePhase::Error);
        assert_eq!(backend.fetch_calls(), 0);

        let backend = Arc::new(FakeBackend::armed(1).without_session());
        let mut handle = AutomationLoop::spawn(
            backend.clone(),
            Arc::new(RecordingNotifier::default()),
            fast_settings(),
        );
        tokio::time::timeout(Duration::from_secs(2), handle.wait())
            .await
            .expect("loop halts on its own");
        assert_eq!(backend.profile_calls(), 1);
    }

    #[tokio::test]
    async fn first_cycle_runs_immediately_after_spawn() {
        let backend = Arc::new(FakeBackend::armed(0));
        let handle = AutomationLoop::spawn(
            backend.clone(),
            Arc::new(RecordingNotifier::default()),
            LoopSettings {
                poll_interval: Duration::from_secs(120),
                idle_reset: Duration::from_millis(1),
            },
        );

        sleep(Duration::from_millis(80)).await;
        assert_eq!(backend.fetch_calls(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn teardown_stops_all_backend_traffic() {
        let backend = Arc::new(FakeBackend::armed(1));
        let handle = AutomationLoop::spawn(
            backend.clone(),
            Arc::new(RecordingNotifier::default()),
            fast_settings(),
        );

        sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;
        let after_shutdown = backend.total_calls();
        assert!(after_shutdown > 0);

        sleep(Duration::from_millis(80)).await;
        assert_eq!(backend.total_calls(), after_shutdown);
    }

    #[tokio::test]
    async fn cycles_never_overlap_even_when_slow() {
        let backend =
            Arc::new(FakeBackend::armed(0).with_fetch_delay(Duration::from_millis(40)));
        let handle = AutomationLoop::spawn(
            backend.clone(),
            Arc::new(RecordingNotifier::default()),
            LoopSettings {
                poll_interval: Duration::from_millis(10),
                idle_reset: Duration::from_millis(1),
            },
        );

        sleep(Duration::from_millis(160)).await;
        handle.shutdown().await;

        assert!(backend.fetch_calls() >= 2);
        assert_eq!(backend.max_in_flight(), 1);
    }
}
