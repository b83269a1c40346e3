use crate::{Error, Result, service::ConvolutionService};
use async_trait::async_trait;
use kernelviz_models::{
    DisplayMode, Expression, GridSize, GridSnapshot, KernelSize, PlaybackState, StepResult,
    UpdateResponse,
};
use std::sync::{Arc, Mutex};
use tokio::{sync::Semaphore, time::Instant};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Grid,
    UpdateGridSize(u32),
    UpdateKernelSize(u32),
    ApplyExpression(String),
    ProcessStep,
    TogglePlay,
    ToggleDisplayMode,
}

struct FakeState {
    playing: bool,
    steps_until_done: Option<usize>,
    fail_steps: bool,
    fail_grid: bool,
    grid_size: usize,
    kernel_size: usize,
    step_col: usize,
    display_mode: DisplayMode,
    calls: Vec<Call>,
    step_times: Vec<Instant>,
}

/// In-memory stand-in for the backend. Each step moves the kernel one
/// column to the right and only a step moves it. Steps report the playing flag as it
/// was when the request arrived, even if the response is held back by the
/// step gate.
pub(crate) struct FakeService {
    state: Mutex<FakeState>,
    step_gate: Option<Arc<Semaphore>>,
}

impl FakeService {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                playing: false,
                steps_until_done: None,
                fail_steps: false,
                fail_grid: false,
                grid_size: 10,
                kernel_size: 3,
                step_col: 0,
                display_mode: DisplayMode::Numbers,
                calls: Vec::new(),
                step_times: Vec::new(),
            }),
            step_gate: None,
        }
    }

    pub(crate) fn with_playing(self, playing: bool) -> Self {
        self.state.lock().unwrap().playing = playing;
        self
    }

    /// The server stops playing on its own after this many steps.
    pub(crate) fn with_steps_until_done(self, steps: usize) -> Self {
        self.state.lock().unwrap().steps_until_done = Some(steps);
        self
    }

    pub(crate) fn with_step_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.step_gate = Some(gate);
        self
    }

    pub(crate) fn failing_steps(self) -> Self {
        self.state.lock().unwrap().fail_steps = true;
        self
    }

    pub(crate) fn failing_grid(self) -> Self {
        self.state.lock().unwrap().fail_grid = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, call: &Call) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    pub(crate) fn step_count(&self) -> usize {
        self.count(&Call::ProcessStep)
    }

    pub(crate) fn step_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().step_times.clone()
    }

    pub(crate) fn playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}

#[async_trait]
impl ConvolutionService for FakeService {
    async fn grid(&self) -> Result<GridSnapshot> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Grid);

        if state.fail_grid {
            return Err(Error::Client {
                message: "get_grid unavailable".into(),
            });
        }

        Ok(GridSnapshot {
            number_grid: vec![vec![0.0; state.grid_size]; state.grid_size],
            processed_grid: vec![vec![0.0; state.grid_size]; state.grid_size],
            step_row: 0,
            step_col: state.step_col,
            kernel_size: state.kernel_size,
            kernel: vec![vec![1.0; state.kernel_size]; state.kernel_size],
            display_mode: state.display_mode,
        })
    }

    async fn update_grid_size(&self, grid_size: GridSize) -> Result<UpdateResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdateGridSize(grid_size.get()));
        state.grid_size = grid_size.get() as usize;

        Ok(UpdateResponse {
            message: Some("Grid size updated".into()),
            grid_size: Some(state.grid_size),
            ..Default::default()
        })
    }

    async fn update_kernel_size(&self, kernel_size: KernelSize) -> Result<UpdateResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdateKernelSize(kernel_size.get()));
        state.kernel_size = kernel_size.get() as usize;

        Ok(UpdateResponse {
            message: Some("Kernel size updated".into()),
            kernel_size: Some(state.kernel_size),
            ..Default::default()
        })
    }

    async fn apply_expression(&self, expression: &Expression) -> Result<UpdateResponse> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::ApplyExpression(expression.as_str().to_string()));

        Ok(UpdateResponse {
            message: Some("Kernel updated from expression".into()),
            ..Default::default()
        })
    }

    async fn process_step(&self) -> Result<StepResult> {
        let playing = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::ProcessStep);
            state.step_times.push(Instant::now());

            if state.fail_steps {
                return Err(Error::Client {
                    message: "connection refused".into(),
                });
            }
            state.step_col += 1;

            if state.playing
                && let Some(remaining) = state.steps_until_done.as_mut()
            {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    state.playing = false;
                }
            }

            state.playing
        };

        if let Some(gate) = &self.step_gate {
            gate.acquire().await.expect("step gate closed").forget();
        }

        Ok(StepResult {
            playing,
            ..Default::default()
        })
    }

    async fn toggle_play(&self) -> Result<PlaybackState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::TogglePlay);
        state.playing = !state.playing;

        Ok(PlaybackState {
            playing: state.playing,
        })
    }

    async fn toggle_display_mode(&self) -> Result<UpdateResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ToggleDisplayMode);
        state.display_mode = state.display_mode.toggled();

        Ok(UpdateResponse {
            display_mode: Some(state.display_mode),
            ..Default::default()
        })
    }
}
