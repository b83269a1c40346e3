use kernelviz_models::{Expression, GridSize, KernelSize, ValidationError};

#[derive(Debug)]
pub enum ControlCommand {
    Play,
    Pause,
    PlayPause,
    Step,
    SetGridSize { grid_size: GridSize },
    SetKernelSize { kernel_size: KernelSize },
    ApplyExpression { expression: Expression },
    ToggleDisplayMode,
    Reset,
    Refresh,
    Quit,
}

#[derive(Debug, Clone)]
pub struct Controls {
    tx: tokio::sync::mpsc::UnboundedSender<ControlCommand>,
}

impl Controls {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<ControlCommand>) -> Self {
        Self { tx }
    }

    pub fn play(&self) {
        self.send(ControlCommand::Play);
    }

    pub fn pause(&self) {
        self.send(ControlCommand::Pause);
    }

    pub fn play_pause(&self) {
        self.send(ControlCommand::PlayPause);
    }

    pub fn step(&self) {
        self.send(ControlCommand::Step);
    }

    /// Nothing is sent when the input is rejected.
    pub fn set_grid_size(&self, input: &str) -> Result<GridSize, ValidationError> {
        let grid_size: GridSize = input.parse()?;
        self.send(ControlCommand::SetGridSize { grid_size });
        Ok(grid_size)
    }

    pub fn set_kernel_size(&self, input: &str) -> Result<KernelSize, ValidationError> {
        let kernel_size: KernelSize = input.parse()?;
        self.send(ControlCommand::SetKernelSize { kernel_size });
        Ok(kernel_size)
    }

    pub fn apply_expression(&self, input: &str) -> Result<(), ValidationError> {
        let expression = Expression::new(input)?;
        self.send(ControlCommand::ApplyExpression { expression });
        Ok(())
    }

    pub fn toggle_display_mode(&self) {
        self.send(ControlCommand::ToggleDisplayMode);
    }

    pub fn reset(&self) {
        self.send(ControlCommand::Reset);
    }

    pub fn refresh(&self) {
        self.send(ControlCommand::Refresh);
    }

    pub fn quit(&self) {
        self.send(ControlCommand::Quit);
    }

    fn send(&self, command: ControlCommand) {
        if let Err(error) = self.tx.send(command) {
            tracing::warn!("player loop has stopped, dropping {:?}", error.0);
        }
    }
}
