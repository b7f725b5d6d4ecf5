//! The session controller: the only writer of [`SessionState`].
//!
//! # Lifecycle
//!
//! ```text
//!             login / check ok / restore
//!  [Anonymous] ─────────────────────────→ [Authenticated] ──┐ activity:
//!       ▲                                   │   │    ▲      │ touch clock,
//!       │ logout (explicit / silent)        │   │    └──────┘ re-arm timer
//!       ├───────────────────────────────────┘   │
//!       │                                       │ inactivity (scheduler or
//!       │                                       ▼ watchdog, or force_logout)
//!       │ LoggedOut, then redirect        [LogoutPending]
//!       └────────────────────────────────────────┘
//! ```
//!
//! Entering `Authenticated` is the resource acquisition: the controller
//! attaches the activity listeners, arms the scheduler, and starts the
//! watchdog. Every transition out of it (any action that flips
//! `is_authenticated` to false) releases all three.
//!
//! # Epochs
//!
//! Each authenticated session gets an epoch number, bumped on entry and on
//! explicit or silent logout. Timers and in-flight forced logouts remember
//! the epoch they were started under and stand down once it moves on, so
//! an explicit logout (or a fresh login) always wins over a stale expiry.
//! Epoch checks and the state changes they guard happen under one
//! transition lock, which is never held across an `.await`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use railpass_protocol::{Credentials, Principal, Registration};
use railpass_timer::{
    ActivityClock, ExpiryHook, LogoutLatch, SchedulerState, TimeoutScheduler, Watchdog, hook,
    millis,
};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::auth::DynAuthBackend;
use crate::{
    ActivityHub, ActivityTracker, AuthBackend, HistoryNavigator, MemoryStorage, Navigator,
    REDIRECT_DELAY, SessionAction, SessionConfig, SessionError, SessionState, SignalStorage,
    TimeoutSignal, lock,
};

/// The host-side collaborators a controller needs besides the backend.
#[derive(Clone)]
pub struct Environment {
    /// Where the timeout notice is persisted.
    pub storage: Arc<dyn SignalStorage>,
    /// Performs the post-logout redirect.
    pub navigator: Arc<dyn Navigator>,
    /// The event target the activity listeners attach to.
    pub activity: ActivityHub,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            navigator: Arc::new(HistoryNavigator::new()),
            activity: ActivityHub::new(),
        }
    }
}

/// What started a forced logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutTrigger {
    Scheduler,
    Watchdog,
    Manual,
}

impl fmt::Display for LogoutTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scheduler => "scheduler",
            Self::Watchdog => "watchdog",
            Self::Manual => "manual",
        })
    }
}

/// Outcome of a forced-logout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedLogout {
    /// This call ran the whole procedure, redirect included.
    Completed,
    /// Another forced logout already holds the latch for this session.
    AlreadyTriggered,
    /// The session changed underneath (explicit logout, fresh login), so
    /// the procedure stopped at its next checkpoint.
    Superseded,
}

struct Inner {
    backend: Arc<dyn DynAuthBackend>,
    config: SessionConfig,
    storage: Arc<dyn SignalStorage>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
    clock: ActivityClock,
    latch: LogoutLatch,
    scheduler: TimeoutScheduler,
    watchdog: Watchdog,
    tracker: ActivityTracker,
    epoch: AtomicU64,
    /// Set while a forced logout's notice is in storage and its redirect
    /// has not happened yet.
    notice_pending: AtomicBool,
    torn_down: AtomicBool,
    transitions: Mutex<()>,
}

/// Owns one client's authenticated session.
///
/// Cheap to clone; clones drive the same session. Timer and listener
/// callbacks hold only weak references, so dropping the last clone tears
/// everything down.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Builds a controller whose timers run on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime. Use
    /// [`with_runtime`](Self::with_runtime) to pass a handle explicitly.
    pub fn new(backend: impl AuthBackend, config: SessionConfig, env: Environment) -> Self {
        Self::with_runtime(backend, config, env, Handle::current())
    }

    pub fn with_runtime(
        backend: impl AuthBackend,
        config: SessionConfig,
        env: Environment,
        runtime: Handle,
    ) -> Self {
        let config = config.validated();
        let timeout = config.session_timeout();
        let clock = ActivityClock::new();
        let latch = LogoutLatch::new();
        let (state, _) = watch::channel(SessionState::default());

        let inner = Inner {
            backend: Arc::new(backend),
            scheduler: TimeoutScheduler::new(timeout, runtime.clone()),
            watchdog: Watchdog::new(timeout, clock.clone(), latch.clone(), runtime),
            tracker: ActivityTracker::new(env.activity),
            storage: env.storage,
            navigator: env.navigator,
            config,
            state,
            clock,
            latch,
            epoch: AtomicU64::new(0),
            notice_pending: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            transitions: Mutex::new(()),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    // ---------------------------------------------------------------------
    // Auth operations
    // ---------------------------------------------------------------------

    /// Signs in with a phone number and password.
    ///
    /// # Errors
    /// Whatever the backend returned. The message is also stored in
    /// [`SessionState::error`] for the form to render.
    pub async fn login(&self, credentials: &Credentials) -> Result<Principal, SessionError> {
        self.dispatch(SessionAction::Request);
        let result = self
            .inner
            .backend
            .login(&credentials.phone_number, &credentials.password)
            .await;

        match result {
            Ok(user) => {
                info!(user = ?user.id(), "login succeeded");
                self.establish(user.clone());
                Ok(user)
            }
            Err(error) => {
                warn!(phone_number = %credentials.phone_number, %error, "login failed");
                self.dispatch(SessionAction::Failed(error.to_string()));
                Err(error)
            }
        }
    }

    /// Explicit, user-initiated logout.
    ///
    /// Marks the session unauthenticated and releases the detectors before
    /// the backend call, so a forced logout already in flight stands down
    /// at its next checkpoint. The backend
    /// call is best-effort: local state is cleared either way. Never leaves
    /// a timeout notice behind.
    pub async fn logout(&self) {
        let epoch = {
            let _guard = lock(&self.inner.transitions);
            let epoch = self.bump_epoch();
            // A forced logout that wrote its notice but has not redirected
            // yet is being overridden. Its notice must not survive.
            if self.inner.notice_pending.swap(false, Ordering::SeqCst) {
                TimeoutSignal::clear(&*self.inner.storage);
            }
            self.inner.latch.release();
            self.stop_monitoring();
            self.apply_locked(SessionAction::LogoutPending);
            epoch
        };
        info!(epoch, "logging out");

        if let Err(error) = self.inner.backend.logout().await {
            warn!(%error, "backend logout failed, clearing local session anyway");
        }

        // A login that completed while the backend call was pending owns
        // the state now.
        let cleared = self.if_current(epoch, |this| {
            this.apply_locked(SessionAction::LoggedOut);
        });
        if cleared.is_none() {
            debug!(epoch, "newer session started during logout, leaving it alone");
        }
    }

    /// Creates an account. The caller stays signed out.
    ///
    /// # Errors
    /// The backend's rejection (duplicate phone number or email), also
    /// stored in [`SessionState::error`].
    pub async fn register(&self, registration: &Registration) -> Result<Principal, SessionError> {
        self.dispatch(SessionAction::Request);
        match self.inner.backend.register(registration).await {
            Ok(user) => {
                info!(user = ?user.id(), "registration succeeded");
                self.dispatch(SessionAction::Registered);
                Ok(user)
            }
            Err(error) => {
                warn!(%error, "registration failed");
                self.dispatch(SessionAction::Failed(error.to_string()));
                Err(error)
            }
        }
    }

    /// Shallow-merges `partial` into the signed-in user's record. Counts as
    /// activity.
    ///
    /// # Errors
    /// [`SessionError::NotAuthenticated`] if there is no user to update.
    pub fn update_user(&self, partial: Map<String, Value>) -> Result<Principal, SessionError> {
        let _guard = lock(&self.inner.transitions);
        let (mut user, authenticated) = {
            let state = self.inner.state.borrow();
            match &state.user {
                Some(user) => (user.clone(), state.is_authenticated),
                None => return Err(SessionError::NotAuthenticated),
            }
        };

        user.merge(partial);
        self.apply_locked(SessionAction::UserUpdated(user.clone()));
        if authenticated {
            self.inner.clock.touch();
            self.arm_scheduler_locked();
        }
        debug!(user = ?user.id(), "user record updated");
        Ok(user)
    }

    /// Asks the backend who is signed in and syncs local state with the
    /// answer.
    ///
    /// Never fails. Any error (unreachable backend, expired session,
    /// malformed reply) becomes a silent local logout: no backend logout
    /// call and no timeout notice.
    pub async fn check_current_user(&self) -> Option<Principal> {
        self.update_last_activity();
        self.dispatch(SessionAction::Request);

        match self.inner.backend.current_user().await {
            Ok(Some(user)) => {
                debug!(user = ?user.id(), "session check confirmed user");
                self.establish(user.clone());
                Some(user)
            }
            Ok(None) => {
                info!("session check found no active session");
                self.clear_locally();
                None
            }
            Err(error) => {
                warn!(%error, "session check failed, treating as signed out");
                self.clear_locally();
                None
            }
        }
    }

    /// [`check_current_user`](Self::check_current_user), after extending
    /// the local session. Returns whether a user is signed in.
    pub async fn check_session(&self) -> bool {
        self.update_last_activity();
        self.reset_session_timer();
        self.check_current_user().await.is_some()
    }

    /// Signs in with a record obtained elsewhere (a rehydrated principal)
    /// without calling the backend.
    pub fn restore(&self, user: Principal) {
        info!(user = ?user.id(), "session restored");
        self.establish(user);
    }

    // ---------------------------------------------------------------------
    // Inactivity
    // ---------------------------------------------------------------------

    /// Runs the forced-logout procedure for the current session.
    pub async fn force_logout(&self) -> ForcedLogout {
        let epoch = self.epoch();
        self.try_trigger_logout(LogoutTrigger::Manual, epoch).await
    }

    /// Records activity now. Ignored while signed out.
    pub fn update_last_activity(&self) {
        if self.is_authenticated() {
            self.inner.clock.touch();
            trace!("activity recorded");
        }
    }

    /// Cancels the inactivity timer and, if signed in, arms a fresh one
    /// for the full timeout.
    pub fn reset_session_timer(&self) {
        let _guard = lock(&self.inner.transitions);
        self.inner.scheduler.cancel();
        if self.is_authenticated() {
            self.arm_scheduler_locked();
        }
    }

    /// The single entry point for every forced logout, whichever detector
    /// noticed the expiry.
    async fn try_trigger_logout(&self, trigger: LogoutTrigger, epoch: u64) -> ForcedLogout {
        {
            let _guard = lock(&self.inner.transitions);
            if self.is_torn_down() {
                debug!(%trigger, epoch, "controller torn down, ignoring expiry");
                return ForcedLogout::Superseded;
            }
            if self.epoch() != epoch {
                debug!(%trigger, epoch, "expiry from a finished session, ignoring");
                return ForcedLogout::Superseded;
            }
            if !self.inner.latch.try_acquire() {
                debug!(%trigger, epoch, "forced logout already triggered");
                return ForcedLogout::AlreadyTriggered;
            }
        }
        self.run_forced_logout(trigger, epoch).await
    }

    async fn run_forced_logout(&self, trigger: LogoutTrigger, epoch: u64) -> ForcedLogout {
        info!(
            %trigger,
            epoch,
            idle_ms = millis(self.inner.clock.elapsed()),
            timeout_ms = self.inner.config.session_timeout_ms,
            "forcing logout after inactivity"
        );

        let marked = self.if_current(epoch, |this| {
            this.stop_monitoring();
            this.apply_locked(SessionAction::LogoutPending);
            TimeoutSignal::write(&*this.inner.storage, Utc::now());
            this.inner.notice_pending.store(true, Ordering::SeqCst);
        });
        if marked.is_none() {
            return ForcedLogout::Superseded;
        }

        if let Err(error) = self.inner.backend.logout().await {
            warn!(%error, "backend logout failed during forced logout, continuing");
        }

        let cleared = self.if_current(epoch, |this| {
            this.apply_locked(SessionAction::LoggedOut);
        });
        if cleared.is_none() {
            debug!(epoch, "forced logout superseded before clearing state");
            return ForcedLogout::Superseded;
        }

        tokio::time::sleep(REDIRECT_DELAY).await;
        let redirect = self.if_current(epoch, |this| {
            this.inner.notice_pending.store(false, Ordering::SeqCst);
        });
        if redirect.is_none() {
            debug!(epoch, "forced logout superseded before redirect");
            return ForcedLogout::Superseded;
        }
        let path = &self.inner.config.login_path;
        self.inner.navigator.navigate(path);
        info!(path = %path, "redirected to login after forced logout");
        ForcedLogout::Completed
    }

    // ---------------------------------------------------------------------
    // Observers
    // ---------------------------------------------------------------------

    /// A snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// A receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    pub fn user(&self) -> Option<Principal> {
        self.inner.state.borrow().user.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The hub the activity listeners are attached to. UI input goes here.
    pub fn activity(&self) -> ActivityHub {
        self.inner.tracker.hub().clone()
    }

    /// Reads and deletes the timeout notice, for the login view.
    pub fn take_timeout_notice(&self) -> Option<TimeoutSignal> {
        TimeoutSignal::take(&*self.inner.storage)
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.inner.clock.elapsed()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.scheduler.state()
    }

    pub fn is_watchdog_running(&self) -> bool {
        self.inner.watchdog.is_running()
    }

    pub fn is_tracking_activity(&self) -> bool {
        self.inner.tracker.is_attached()
    }

    /// Stops the detectors and detaches the listeners without touching the
    /// state. Called when the owning provider goes away.
    ///
    /// Permanent: clones that outlive the provider can still read and
    /// update the state, but nothing re-arms a detector afterwards.
    pub fn teardown(&self) {
        let _guard = lock(&self.inner.transitions);
        self.inner.torn_down.store(true, Ordering::SeqCst);
        self.bump_epoch();
        self.stop_monitoring();
        debug!("session controller torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// Caller holds the transition lock.
    fn bump_epoch(&self) -> u64 {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Runs `f` under the transition lock if `epoch` is still current.
    fn if_current<R>(&self, epoch: u64, f: impl FnOnce(&Self) -> R) -> Option<R> {
        let _guard = lock(&self.inner.transitions);
        (self.epoch() == epoch).then(|| f(self))
    }

    fn dispatch(&self, action: SessionAction) {
        let _guard = lock(&self.inner.transitions);
        self.apply_locked(action);
    }

    /// Applies `action` and acquires or releases the session's resources
    /// when `is_authenticated` flips. Caller holds the transition lock.
    fn apply_locked(&self, action: SessionAction) {
        let name = action.name();
        let mut entered = false;
        let mut left = false;
        self.inner.state.send_modify(|state| {
            let was = state.is_authenticated;
            state.apply(action);
            entered = !was && state.is_authenticated;
            left = was && !state.is_authenticated;
        });
        trace!(action = name, "session state updated");

        if entered {
            self.start_monitoring();
        } else if left {
            self.stop_monitoring();
        }
    }

    /// Signs `user` in, or refreshes the record and the timer if a user is
    /// already signed in.
    fn establish(&self, user: Principal) {
        let _guard = lock(&self.inner.transitions);
        let already = self.is_authenticated();
        self.inner.clock.touch();
        self.apply_locked(SessionAction::Succeeded(user));
        if already {
            self.arm_scheduler_locked();
        }
    }

    /// Silent logout after a failed session check.
    fn clear_locally(&self) {
        let _guard = lock(&self.inner.transitions);
        self.bump_epoch();
        self.inner.latch.release();
        self.inner.notice_pending.store(false, Ordering::SeqCst);
        self.stop_monitoring();
        self.apply_locked(SessionAction::LoggedOut);
    }

    /// Acquires the per-session resources. Caller holds the transition lock.
    fn start_monitoring(&self) {
        if self.is_torn_down() {
            debug!("controller torn down, not starting monitoring");
            return;
        }
        let epoch = self.bump_epoch();
        if self.inner.latch.is_set() {
            // The notice belongs to the session that just ended.
            TimeoutSignal::clear(&*self.inner.storage);
        }
        self.inner.latch.release();
        self.inner.notice_pending.store(false, Ordering::SeqCst);
        self.inner.clock.touch();

        let weak = Arc::downgrade(&self.inner);
        self.inner.tracker.attach(move |event| {
            if let Some(controller) = upgrade(&weak) {
                trace!(%event, "user activity");
                controller.update_last_activity();
                controller.reset_session_timer();
            }
        });
        self.arm_scheduler_locked();
        self.inner
            .watchdog
            .start(self.expiry_hook(LogoutTrigger::Watchdog, epoch));

        info!(
            epoch,
            timeout_ms = self.inner.config.session_timeout_ms,
            "session monitoring started"
        );
    }

    /// Releases the per-session resources. Idempotent.
    fn stop_monitoring(&self) {
        let detached = self.inner.tracker.detach();
        let cancelled = self.inner.scheduler.cancel();
        let stopped = self.inner.watchdog.stop();
        if detached || cancelled || stopped {
            info!(epoch = self.epoch(), "session monitoring stopped");
        }
    }

    fn arm_scheduler_locked(&self) {
        if self.is_torn_down() {
            return;
        }
        let hook = self.expiry_hook(LogoutTrigger::Scheduler, self.epoch());
        self.inner.scheduler.arm(hook);
    }

    fn expiry_hook(&self, trigger: LogoutTrigger, epoch: u64) -> ExpiryHook {
        let weak = Arc::downgrade(&self.inner);
        hook(move || {
            let controller = upgrade(&weak);
            async move {
                if let Some(controller) = controller {
                    controller.try_trigger_logout(trigger, epoch).await;
                }
            }
        })
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<SessionController> {
    weak.upgrade().map(|inner| SessionController { inner })
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &*self.inner.state.borrow())
            .field("epoch", &self.epoch())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
