//! The state-synchronization engine.
//!
//! A single actor task owns the timer state and the tag history. Polls and
//! commands both run inside that task, one at a time, so the external tool
//! never sees overlapping invocations. Commands queue on an unbounded FIFO
//! channel; the poll timer lives in the same `select!`, and every poll
//! (scheduled or forced) pushes the next scheduled poll a full interval
//! into the future.
//!
//! Collaborators only see snapshots: [`EngineStatus`] and the tag history
//! are republished through `watch` channels, and changes are announced
//! through the [`EventPublisher`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::domain::{
    dedup_tags, CommandKind, CommandOutcome, CommandRequest, EngineConfig, EngineStatus,
    ErrorKind, Event, TagHistoryEntry, TimerState,
};
use crate::infrastructure::{CommandRunner, TimewProfile};

use super::events::{EventPublisher, EventSubscription};
use super::parser;
use super::tag_history::{validate_tags, TagHistory};

/// Work item for the engine task.
enum Request {
    Command {
        request: CommandRequest,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Refresh {
        reply: oneshot::Sender<EngineStatus>,
    },
}

impl Request {
    fn reject(self, error: ErrorKind) {
        match self {
            Self::Command { reply, .. } => {
                let _ = reply.send(CommandOutcome::failed(error));
            }
            // Dropping the reply tells the caller the engine is gone.
            Self::Refresh { .. } => {}
        }
    }
}

/// Handle to a running engine. Cheap to clone; all clones drive the same task.
#[derive(Clone)]
pub struct SyncEngine {
    requests: mpsc::UnboundedSender<Request>,
    shutdown: Arc<Notify>,
    status: watch::Receiver<EngineStatus>,
    history: watch::Receiver<Vec<TagHistoryEntry>>,
    events: EventPublisher,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SyncEngine {
    /// Start the engine task. The first poll runs immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<R>(config: EngineConfig, profile: TimewProfile, runner: R) -> Self
    where
        R: CommandRunner + 'static,
    {
        let (requests, receiver) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(EngineStatus::Uninitialized);
        let (history_tx, history) = watch::channel(Vec::new());
        let events = EventPublisher::new(config.event_buffer);
        let shutdown = Arc::new(Notify::new());

        let actor = EngineActor {
            runner,
            profile,
            history: TagHistory::new(config.history_capacity),
            config,
            status: EngineStatus::Uninitialized,
            status_tx,
            history_tx,
            events: events.clone(),
            last_poll: Instant::now(),
        };
        let task = tokio::spawn(actor.run(receiver, Arc::clone(&shutdown)));

        Self {
            requests,
            shutdown,
            status,
            history,
            events,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Start a timer with `tags`. Fails with `AlreadyActive` if one is running.
    pub async fn start_timer(&self, tags: Vec<String>) -> CommandOutcome {
        self.submit(CommandRequest::start_timer(tags)).await
    }

    /// Stop the running timer. Fails with `NotActive` if none is running.
    pub async fn stop_timer(&self) -> CommandOutcome {
        self.submit(CommandRequest::stop_timer()).await
    }

    /// Stop the running timer, or start one with the most recent tag-set.
    pub async fn start_or_stop(&self) -> CommandOutcome {
        self.submit(CommandRequest::start_or_stop()).await
    }

    /// Replace the running timer's tags, keeping its start time.
    pub async fn edit_tags(&self, tags: Vec<String>) -> CommandOutcome {
        self.submit(CommandRequest::edit_tags(tags)).await
    }

    /// Queue `request` behind any in-flight work and wait for its outcome.
    pub async fn submit(&self, request: CommandRequest) -> CommandOutcome {
        match self.enqueue(request).await {
            Ok(outcome) => outcome,
            Err(_) => CommandOutcome::failed(ErrorKind::ShuttingDown),
        }
    }

    /// Queue `request` now; the returned receiver resolves with its outcome.
    fn enqueue(&self, request: CommandRequest) -> oneshot::Receiver<CommandOutcome> {
        let (reply, receiver) = oneshot::channel();
        if let Err(mpsc::error::SendError(request)) =
            self.requests.send(Request::Command { request, reply })
        {
            request.reject(ErrorKind::ShuttingDown);
        }
        receiver
    }

    /// Poll the tool now, through the same queue as commands.
    pub async fn refresh(&self) -> EngineStatus {
        let (reply, receiver) = oneshot::channel();
        if self.requests.send(Request::Refresh { reply }).is_err() {
            return self.status();
        }
        match receiver.await {
            Ok(status) => status,
            Err(_) => self.status(),
        }
    }

    /// Current engine status snapshot.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    /// Freshest known timer state, possibly stale when degraded.
    #[must_use]
    pub fn current_state(&self) -> Option<TimerState> {
        self.status.borrow().last_known().cloned()
    }

    /// Remembered tag-sets, most recently used first.
    #[must_use]
    pub fn tag_history(&self) -> Vec<TagHistoryEntry> {
        self.history.borrow().clone()
    }

    /// Subscribe to engine events from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    /// Wait until the first poll has completed.
    pub async fn wait_until_initialized(&self) -> EngineStatus {
        let mut status = self.status.clone();
        let ready = status
            .wait_for(|s| !matches!(s, EngineStatus::Uninitialized))
            .await
            .map(|s| s.clone());
        ready.unwrap_or_else(|_| self.status())
    }

    /// Stop polling, fail queued commands with `ShuttingDown`, and wait for
    /// the task to finish. An in-flight invocation is allowed to complete.
    pub async fn shutdown(&self) {
        self.request_shutdown();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Sync engine task failed");
            }
        }
    }

    /// Signal shutdown without waiting for the task.
    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// State owned by the engine task.
struct EngineActor<R> {
    runner: R,
    profile: TimewProfile,
    config: EngineConfig,
    status: EngineStatus,
    status_tx: watch::Sender<EngineStatus>,
    history: TagHistory,
    history_tx: watch::Sender<Vec<TagHistoryEntry>>,
    events: EventPublisher,
    last_poll: Instant,
}

impl<R: CommandRunner> EngineActor<R> {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>, shutdown: Arc<Notify>) {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval_ms,
            command_timeout_ms = self.config.command_timeout_ms,
            "Sync engine started"
        );

        let _ = self.poll().await;

        let next_poll = tokio::time::sleep_until(self.next_poll_at());
        tokio::pin!(next_poll);

        loop {
            tokio::select! {
                biased;
                () = shutdown.notified() => break,
                request = requests.recv() => {
                    let Some(request) = request else {
                        tracing::debug!("All engine handles dropped");
                        break;
                    };
                    self.handle(request).await;
                }
                () = &mut next_poll => {
                    let _ = self.poll().await;
                }
            }
            next_poll.as_mut().reset(self.next_poll_at());
        }

        requests.close();
        let mut rejected = 0_usize;
        while let Ok(request) = requests.try_recv() {
            if matches!(request, Request::Command { .. }) {
                self.events
                    .publish(Event::CommandFailed(ErrorKind::ShuttingDown));
            }
            request.reject(ErrorKind::ShuttingDown);
            rejected += 1;
        }

        tracing::info!(rejected, "Sync engine stopped");
    }

    fn next_poll_at(&self) -> Instant {
        self.last_poll + self.config.poll_interval()
    }

    async fn handle(&mut self, request: Request) {
        match request {
            Request::Command { request, reply } => {
                let outcome = self.execute(request).await;
                if let Some(error) = &outcome.error {
                    self.events.publish(Event::CommandFailed(error.clone()));
                }
                let _ = reply.send(outcome);
            }
            Request::Refresh { reply } => {
                let _ = self.poll().await;
                let _ = reply.send(self.status.clone());
            }
        }
    }

    async fn execute(&mut self, request: CommandRequest) -> CommandOutcome {
        let kind = request.kind;
        let tags = request.payload_tags.unwrap_or_default();

        let result = match kind {
            CommandKind::StartTimer => self.start_timer(tags).await,
            CommandKind::StopTimer => self.stop_timer().await,
            CommandKind::EditTags => self.edit_tags(tags).await,
            CommandKind::StartOrStop => self.start_or_stop().await,
        };

        match result {
            Ok(state) => {
                tracing::info!(command = %kind, "Command applied");
                CommandOutcome::succeeded(state)
            }
            Err(error) => {
                tracing::warn!(command = %kind, %error, "Command failed");
                CommandOutcome::failed(error)
            }
        }
    }

    async fn start_timer(&mut self, tags: Vec<String>) -> Result<Option<TimerState>, ErrorKind> {
        let tags = dedup_tags(tags);
        validate_tags(&tags)?;
        if self.ground_truth().await?.is_active() {
            return Err(ErrorKind::AlreadyActive);
        }
        self.apply_start(&tags).await
    }

    async fn stop_timer(&mut self) -> Result<Option<TimerState>, ErrorKind> {
        if !self.ground_truth().await?.is_active() {
            return Err(ErrorKind::NotActive);
        }
        self.apply_stop().await
    }

    async fn start_or_stop(&mut self) -> Result<Option<TimerState>, ErrorKind> {
        if self.ground_truth().await?.is_active() {
            self.apply_stop().await
        } else {
            let tags = self.history.most_recent().map(<[String]>::to_vec).unwrap_or_default();
            self.apply_start(&tags).await
        }
    }

    async fn edit_tags(&mut self, tags: Vec<String>) -> Result<Option<TimerState>, ErrorKind> {
        let tags = dedup_tags(tags);
        validate_tags(&tags)?;
        if !self.ground_truth().await?.is_active() {
            return Err(ErrorKind::NotActive);
        }
        let args = self.profile.retag(&tags);
        self.invoke(&args).await?;
        self.remember(&tags);
        Ok(self.refresh_after_command().await)
    }

    async fn apply_start(&mut self, tags: &[String]) -> Result<Option<TimerState>, ErrorKind> {
        let args = self.profile.start(tags);
        self.invoke(&args).await?;
        self.remember(tags);
        Ok(self.refresh_after_command().await)
    }

    async fn apply_stop(&mut self) -> Result<Option<TimerState>, ErrorKind> {
        let args = self.profile.stop();
        self.invoke(&args).await?;
        Ok(self.refresh_after_command().await)
    }

    /// State to check preconditions against. Polls first unless synced.
    async fn ground_truth(&mut self) -> Result<TimerState, ErrorKind> {
        match &self.status {
            EngineStatus::Synced { state } => Ok(state.clone()),
            _ => self.poll().await,
        }
    }

    async fn invoke(&self, args: &[String]) -> Result<(), ErrorKind> {
        self.runner
            .run(args, self.config.command_timeout())
            .await
            .map(|_| ())
            .map_err(ErrorKind::from)
    }

    /// Poll right after a command so the caller sees its effect.
    async fn refresh_after_command(&mut self) -> Option<TimerState> {
        match self.poll().await {
            Ok(state) => Some(state),
            Err(error) => {
                tracing::warn!(%error, "Command applied but the follow-up poll failed");
                None
            }
        }
    }

    fn remember(&mut self, tags: &[String]) {
        match self.history.record(tags) {
            Ok(true) => {
                self.history_tx.send_replace(self.history.list());
                self.events.publish(Event::TagsHistoryUpdated);
            }
            Ok(false) => {}
            Err(error) => tracing::warn!(%error, "Tag-set not recorded"),
        }
    }

    async fn poll(&mut self) -> Result<TimerState, ErrorKind> {
        let result = self.fetch().await;
        self.last_poll = Instant::now();
        match result {
            Ok(state) => {
                self.mark_synced(state.clone());
                Ok(state)
            }
            Err(reason) => {
                self.mark_degraded(reason.clone());
                Err(reason)
            }
        }
    }

    async fn fetch(&self) -> Result<TimerState, ErrorKind> {
        let args = self.profile.export();
        let output = self
            .runner
            .run(&args, self.config.command_timeout())
            .await?;
        Ok(parser::parse(&output.stdout)?)
    }

    fn mark_synced(&mut self, state: TimerState) {
        let changed = self.status.last_known() != Some(&state);
        let recovered = self.status.is_degraded();

        self.set_status(EngineStatus::Synced {
            state: state.clone(),
        });

        if recovered {
            tracing::info!("Polling recovered");
            self.events.publish(Event::Recovered);
        }
        if changed {
            tracing::info!(active = state.is_active(), tags = ?state.tags(), "Timer state changed");
            self.events.publish(Event::StateChanged(state));
        }
    }

    fn mark_degraded(&mut self, reason: ErrorKind) {
        let announce = match &self.status {
            EngineStatus::Degraded { reason: previous, .. } => previous != &reason,
            _ => true,
        };
        let last_known = self.status.last_known().cloned();

        self.set_status(EngineStatus::Degraded {
            last_known,
            reason: reason.clone(),
        });

        if announce {
            tracing::warn!(%reason, "Poll failed, serving last known state");
            self.events.publish(Event::Degraded(reason));
        } else {
            tracing::debug!(%reason, "Poll still failing");
        }
    }

    fn set_status(&mut self, status: EngineStatus) {
        self.status_tx.send_replace(status.clone());
        self.status = status;
    }
}
