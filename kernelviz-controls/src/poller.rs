use crate::{
    GridReceiver, Result, StatusReceiver,
    error::Error,
    notification::{Notification, NotificationBroadcast},
    service::ConvolutionService,
};
use kernelviz_models::{GridSnapshot, PlaybackState, StepResult};
use std::{fmt, sync::Arc, time::Duration};
use tokio::{
    select,
    sync::{Mutex, watch},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// What `pause` does to a running chain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PauseMode {
    /// Only flip the server flag. The chain ends once a step reports
    /// `playing == false`, so one more step may run after pausing.
    #[default]
    #[value(name = "server")]
    ServerDriven,
    /// Also cancel the chain once the server confirms the pause.
    Immediate,
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    pub pause_mode: PauseMode,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            pause_mode: PauseMode::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PollerStatus {
    #[default]
    Idle,
    Polling,
}

impl fmt::Display for PollerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PollerStatus::Idle => write!(f, "Idle"),
            PollerStatus::Polling => write!(f, "Polling"),
        }
    }
}

struct Chain {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct ChainContext<S> {
    service: Arc<S>,
    status: Arc<watch::Sender<PollerStatus>>,
    grid: Arc<watch::Sender<Option<GridSnapshot>>>,
    broadcast: Arc<NotificationBroadcast>,
}

impl<S> Clone for ChainContext<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            status: self.status.clone(),
            grid: self.grid.clone(),
            broadcast: self.broadcast.clone(),
        }
    }
}

impl<S: ConvolutionService> ChainContext<S> {
    async fn refresh(&self) -> Result<GridSnapshot> {
        let snapshot = self.service.grid().await?;
        self.grid.send_replace(Some(snapshot.clone()));
        Ok(snapshot)
    }
}

/// Drives "advance one step" requests at a fixed cadence while the server
/// reports playback active. At most one chain runs at a time.
pub struct Poller<S> {
    context: ChainContext<S>,
    config: PollerConfig,
    chain: Mutex<Option<Chain>>,
}

impl<S: ConvolutionService> Poller<S> {
    pub fn new(service: Arc<S>, config: PollerConfig, broadcast: Arc<NotificationBroadcast>) -> Self {
        let (status, _) = watch::channel(PollerStatus::Idle);
        let (grid, _) = watch::channel(None);

        Self {
            context: ChainContext {
                service,
                status: Arc::new(status),
                grid: Arc::new(grid),
                broadcast,
            },
            config,
            chain: Mutex::new(None),
        }
    }

    pub fn status(&self) -> PollerStatus {
        *self.context.status.borrow()
    }

    pub fn is_polling(&self) -> bool {
        self.status() == PollerStatus::Polling
    }

    pub fn status_receiver(&self) -> StatusReceiver {
        self.context.status.subscribe()
    }

    pub fn grid_receiver(&self) -> GridReceiver {
        self.context.grid.subscribe()
    }

    /// Toggle play on the server and, if it now reports playing, start the
    /// chain.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<PlaybackState> {
        let mut chain = self.chain.lock().await;

        if self.is_polling() {
            return Err(Error::ChainActive);
        }

        let state = self.context.service.toggle_play().await?;

        if state.playing {
            info!("server is playing, starting polling chain");

            let token = CancellationToken::new();
            self.context.status.send_replace(PollerStatus::Polling);

            let handle = tokio::spawn(run_chain(
                self.context.clone(),
                self.config.interval,
                token.clone(),
            ));

            *chain = Some(Chain { token, handle });
        } else {
            debug!("server reports not playing, no chain started");
        }

        Ok(state)
    }

    /// Toggle play on the server. In server-driven mode the chain keeps
    /// running until a step reports `playing == false`.
    ///
    /// When no chain is live the server was already stopped, so a toggle
    /// that turned playback on is undone.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<PlaybackState> {
        let chain = self.chain.lock().await;
        let live = chain
            .as_ref()
            .is_some_and(|chain| !chain.token.is_cancelled());

        let mut state = self.context.service.toggle_play().await?;

        if state.playing {
            if live {
                warn!("server reports playing after pause");
            } else {
                debug!("no live chain, pause started playback; toggling back");
                state = self.context.service.toggle_play().await?;
            }
        } else if self.config.pause_mode == PauseMode::Immediate
            && let Some(chain) = chain.as_ref()
        {
            debug!("cancelling polling chain");
            chain.token.cancel();
        }

        Ok(state)
    }

    /// Advance one step outside of the chain.
    #[instrument(skip(self))]
    pub async fn process_step_once(&self) -> Result<StepResult> {
        let step = self.context.service.process_step().await?;
        self.context.refresh().await?;
        Ok(step)
    }

    pub async fn refresh(&self) -> Result<GridSnapshot> {
        self.context.refresh().await
    }

    /// Stop the local chain without telling the server.
    pub async fn shutdown(&self) {
        if let Some(chain) = self.chain.lock().await.take() {
            chain.token.cancel();
            chain.handle.abort();
        }

        self.context.status.send_replace(PollerStatus::Idle);
    }
}

async fn run_chain<S: ConvolutionService>(
    context: ChainContext<S>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut steps: usize = 0;

    loop {
        let step = match context.service.process_step().await {
            Ok(step) => step,
            Err(error) => {
                token.cancel();
                context
                    .broadcast
                    .send_message(Notification::Error(format!("Automatic step failed: {error}")));
                break;
            }
        };
        steps += 1;

        let reschedule = step.playing && !token.is_cancelled();
        if !reschedule {
            // A pause arriving from here on finds no live chain.
            token.cancel();
        }
        let deadline = Instant::now() + interval;

        if let Err(error) = context.refresh().await {
            context
                .broadcast
                .send_message(Notification::Warning(format!("Unable to refresh grid: {error}")));
        }

        if !reschedule {
            break;
        }

        select! {
            _ = token.cancelled() => {
                debug!("polling chain cancelled");
                break;
            }
            _ = sleep_until(deadline) => {}
        }
    }

    debug!(steps, "polling chain finished");
    context.status.send_replace(PollerStatus::Idle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeService};
    use tokio::sync::Semaphore;

    fn poller(service: Arc<FakeService>, pause_mode: PauseMode) -> Poller<FakeService> {
        Poller::new(
            service,
            PollerConfig {
                interval: DEFAULT_INTERVAL,
                pause_mode,
            },
            Arc::new(NotificationBroadcast::new()),
        )
    }

    async fn wait_until_idle(status: &mut StatusReceiver) {
        tokio::time::timeout(
            Duration::from_secs(60),
            status.wait_for(|status| *status == PollerStatus::Idle),
        )
        .await
        .expect("chain did not stop")
        .expect("status sender dropped");
    }

    async fn wait_for_steps(service: &FakeService, steps: usize) {
        while service.step_count() < steps {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn chain_runs_until_server_stops_playing() {
        let service = Arc::new(FakeService::new().with_steps_until_done(2));
        let poller = poller(service.clone(), PauseMode::ServerDriven);
        let mut status = poller.status_receiver();

        let state = poller.start().await.unwrap();
        assert!(state.playing);
        assert_eq!(poller.status(), PollerStatus::Polling);

        wait_until_idle(&mut status).await;

        let times = service.step_times();
        assert_eq!(times.len(), 2);
        let gap = times[1] - times[0];
        assert!(gap >= DEFAULT_INTERVAL && gap < DEFAULT_INTERVAL + Duration::from_millis(5));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            service.calls(),
            vec![
                Call::TogglePlay,
                Call::ProcessStep,
                Call::Grid,
                Call::ProcessStep,
                Call::Grid,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_playing_sends_no_steps() {
        let service = Arc::new(FakeService::new().with_playing(true));
        let poller = poller(service.clone(), PauseMode::ServerDriven);

        let state = poller.start().await.unwrap();

        assert!(!state.playing);
        assert_eq!(poller.status(), PollerStatus::Idle);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.step_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn each_playing_response_schedules_exactly_one_step() {
        let service = Arc::new(FakeService::new().with_steps_until_done(5));
        let poller = poller(service.clone(), PauseMode::ServerDriven);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_until_idle(&mut status).await;

        let times = service.step_times();
        assert_eq!(times.len(), 5);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_polling_is_rejected() {
        let gate = Arc::new(Semaphore::new(0));
        let service = Arc::new(FakeService::new().with_step_gate(gate.clone()));
        let poller = poller(service.clone(), PauseMode::ServerDriven);

        poller.start().await.unwrap();
        wait_for_steps(&service, 1).await;

        let error = poller.start().await.unwrap_err();

        assert!(matches!(error, Error::ChainActive));
        assert_eq!(service.count(&Call::TogglePlay), 1);
        assert!(service.playing());

        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn pause_with_step_in_flight_allows_one_more_step() {
        let gate = Arc::new(Semaphore::new(0));
        let service = Arc::new(FakeService::new().with_step_gate(gate.clone()));
        let poller = poller(service.clone(), PauseMode::ServerDriven);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_for_steps(&service, 1).await;

        let state = poller.pause().await.unwrap();
        assert!(!state.playing);
        assert_eq!(poller.status(), PollerStatus::Polling);

        gate.add_permits(10);
        wait_until_idle(&mut status).await;

        assert_eq!(service.step_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_pause_with_step_in_flight_stops_after_it() {
        let gate = Arc::new(Semaphore::new(0));
        let service = Arc::new(FakeService::new().with_step_gate(gate.clone()));
        let poller = poller(service.clone(), PauseMode::Immediate);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_for_steps(&service, 1).await;

        poller.pause().await.unwrap();
        gate.add_permits(10);
        wait_until_idle(&mut status).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.step_count(), 1);
        // the in-flight step still refreshes the display
        assert_eq!(service.count(&Call::Grid), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_pause_cancels_pending_step() {
        let service = Arc::new(FakeService::new());
        let poller = poller(service.clone(), PauseMode::Immediate);

        poller.start().await.unwrap();
        wait_for_steps(&service, 1).await;

        poller.pause().await.unwrap();
        let mut status = poller.status_receiver();
        wait_until_idle(&mut status).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.step_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_driven_pause_lets_pending_step_observe_pause() {
        let service = Arc::new(FakeService::new());
        let poller = poller(service.clone(), PauseMode::ServerDriven);

        poller.start().await.unwrap();
        wait_for_steps(&service, 1).await;

        poller.pause().await.unwrap();
        let mut status = poller.status_receiver();
        wait_until_idle(&mut status).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.step_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_step_stops_chain_and_notifies() {
        let service = Arc::new(FakeService::new().failing_steps());
        let broadcast = Arc::new(NotificationBroadcast::new());
        let mut notifications = broadcast.subscribe();
        let poller = Poller::new(service.clone(), PollerConfig::default(), broadcast);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_until_idle(&mut status).await;

        let notification = notifications.recv().await.unwrap();
        assert!(matches!(notification, Notification::Error(_)));
        assert!(notification.message().contains("connection refused"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.step_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_chain_running() {
        let service = Arc::new(FakeService::new().with_steps_until_done(3).failing_grid());
        let broadcast = Arc::new(NotificationBroadcast::new());
        let mut notifications = broadcast.subscribe();
        let poller = Poller::new(service.clone(), PollerConfig::default(), broadcast);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_until_idle(&mut status).await;

        assert_eq!(service.step_count(), 3);
        for _ in 0..3 {
            assert!(matches!(
                notifications.recv().await.unwrap(),
                Notification::Warning(_)
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn chain_can_restart_after_stopping() {
        let service = Arc::new(FakeService::new().with_steps_until_done(1));
        let poller = poller(service.clone(), PauseMode::ServerDriven);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_until_idle(&mut status).await;
        assert_eq!(service.step_count(), 1);

        let state = poller.start().await.unwrap();
        assert!(state.playing);
        poller.shutdown().await;
        assert_eq!(poller.status(), PollerStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn single_step_publishes_grid_without_polling() {
        let service = Arc::new(FakeService::new());
        let poller = poller(service.clone(), PauseMode::ServerDriven);
        let grid = poller.grid_receiver();
        assert!(grid.borrow().is_none());

        let step = poller.process_step_once().await.unwrap();

        assert!(!step.playing);
        assert_eq!(poller.status(), PollerStatus::Idle);
        assert_eq!(grid.borrow().as_ref().map(GridSnapshot::grid_size), Some(10));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.calls(), vec![Call::ProcessStep, Call::Grid]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_after_chain_ended_leaves_server_stopped() {
        let service = Arc::new(FakeService::new().with_steps_until_done(1));
        let poller = poller(service.clone(), PauseMode::ServerDriven);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_until_idle(&mut status).await;

        let state = poller.pause().await.unwrap();

        assert!(!state.playing);
        assert!(!service.playing());
        assert_eq!(service.count(&Call::TogglePlay), 3);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.step_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_immediate_pause_does_not_resume_playback() {
        let service = Arc::new(FakeService::new());
        let poller = poller(service.clone(), PauseMode::Immediate);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_for_steps(&service, 1).await;

        assert!(!poller.pause().await.unwrap().playing);
        assert!(!poller.pause().await.unwrap().playing);
        wait_until_idle(&mut status).await;

        assert!(!service.playing());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.step_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_racing_chain_end_leaves_server_stopped() {
        let gate = Arc::new(Semaphore::new(0));
        let service = Arc::new(
            FakeService::new()
                .with_steps_until_done(1)
                .with_step_gate(gate.clone()),
        );
        let poller = poller(service.clone(), PauseMode::ServerDriven);
        let mut status = poller.status_receiver();

        poller.start().await.unwrap();
        wait_for_steps(&service, 1).await;
        gate.add_permits(1);
        while service.count(&Call::Grid) < 1 {
            tokio::task::yield_now().await;
        }

        let state = poller.pause().await.unwrap();
        wait_until_idle(&mut status).await;

        assert!(!state.playing);
        assert!(!service.playing());
    }
}
