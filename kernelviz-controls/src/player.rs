use crate::{
    GridReceiver, Result, StatusReceiver,
    controls::{ControlCommand, Controls},
    error::Error,
    notification::{Notification, NotificationBroadcast},
    poller::{Poller, PollerConfig},
    service::ConvolutionService,
};
use kernelviz_models::{GridSize, UpdateResponse};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, instrument};

pub struct Player<S> {
    service: Arc<S>,
    poller: Poller<S>,
    broadcast: Arc<NotificationBroadcast>,
    controls: Controls,
    rx: UnboundedReceiver<ControlCommand>,
}

impl<S: ConvolutionService> Player<S> {
    pub fn new(service: Arc<S>, config: PollerConfig) -> Self {
        let broadcast = Arc::new(NotificationBroadcast::new());
        let poller = Poller::new(service.clone(), config, broadcast.clone());
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            service,
            poller,
            broadcast,
            controls: Controls::new(tx),
            rx,
        }
    }

    pub fn controls(&self) -> Controls {
        self.controls.clone()
    }

    pub fn status(&self) -> StatusReceiver {
        self.poller.status_receiver()
    }

    pub fn grid(&self) -> GridReceiver {
        self.poller.grid_receiver()
    }

    pub fn broadcast(&self) -> Arc<NotificationBroadcast> {
        self.broadcast.clone()
    }

    async fn play(&self) -> Result<()> {
        let state = self.poller.start().await?;

        if !state.playing {
            self.broadcast.send_message(Notification::Info(
                "Server reports playback stopped".to_string(),
            ));
        }

        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.poller.pause().await?;
        Ok(())
    }

    async fn play_pause(&self) -> Result<()> {
        if self.poller.is_polling() {
            self.pause().await
        } else {
            self.play().await
        }
    }

    async fn toggle_display_mode(&self) -> Result<()> {
        let response = self.service.toggle_display_mode().await?;
        debug!(display_mode = ?response.display_mode, "display mode toggled");
        self.refresh().await
    }

    async fn refresh(&self) -> Result<()> {
        self.poller.refresh().await?;
        Ok(())
    }

    /// Report an update and re-render from the server's new state.
    async fn apply_update(&self, response: Result<UpdateResponse>, fallback: &str) -> Result<()> {
        let response = response?;

        self.broadcast.send_message(Notification::Success(
            response.message.unwrap_or_else(|| fallback.to_string()),
        ));

        self.refresh().await
    }

    #[instrument(skip(self))]
    async fn handle_command(&self, command: ControlCommand) -> bool {
        let result = match command {
            ControlCommand::Play => self.play().await,
            ControlCommand::Pause => self.pause().await,
            ControlCommand::PlayPause => self.play_pause().await,
            ControlCommand::Step => self.poller.process_step_once().await.map(|_| ()),
            ControlCommand::SetGridSize { grid_size } => {
                self.apply_update(
                    self.service.update_grid_size(grid_size).await,
                    "Grid size updated",
                )
                .await
            }
            ControlCommand::SetKernelSize { kernel_size } => {
                self.apply_update(
                    self.service.update_kernel_size(kernel_size).await,
                    "Kernel size updated",
                )
                .await
            }
            ControlCommand::ApplyExpression { expression } => {
                self.apply_update(
                    self.service.apply_expression(&expression).await,
                    "Kernel updated from expression",
                )
                .await
            }
            ControlCommand::ToggleDisplayMode => self.toggle_display_mode().await,
            ControlCommand::Reset => {
                self.apply_update(
                    self.service.update_grid_size(GridSize::DEFAULT).await,
                    "Grid reset",
                )
                .await
            }
            ControlCommand::Refresh => self.refresh().await,
            ControlCommand::Quit => {
                self.poller.shutdown().await;
                return true;
            }
        };

        if let Err(error) = result {
            let notification = match error {
                Error::ChainActive => Notification::Warning(error.to_string()),
                _ => Notification::Error(error.to_string()),
            };
            self.broadcast.send_message(notification);
        }

        false
    }

    pub async fn player_loop(&mut self) -> Result<()> {
        if let Err(error) = self.refresh().await {
            self.broadcast
                .send_message(Notification::Error(error.to_string()));
        }

        while let Some(command) = self.rx.recv().await {
            if self.handle_command(command).await {
                debug!("quit received, leaving player loop");
                break;
            }
        }

        Ok(())
    }
}
