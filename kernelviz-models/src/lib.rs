use std::fmt;

mod input;

pub use input::{Expression, GridSize, KernelSize, ValidationError};

pub type Grid = Vec<Vec<f64>>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Numbers,
    Grayscale,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Numbers => DisplayMode::Grayscale,
            DisplayMode::Grayscale => DisplayMode::Numbers,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisplayMode::Numbers => write!(f, "numbers"),
            DisplayMode::Grayscale => write!(f, "grayscale"),
        }
    }
}

/// Everything `/get_grid` reports about the server session.
#[derive(Default, Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct GridSnapshot {
    pub number_grid: Grid,
    pub processed_grid: Grid,
    pub step_row: usize,
    pub step_col: usize,
    pub kernel_size: usize,
    pub kernel: Grid,
    pub display_mode: DisplayMode,
}

impl GridSnapshot {
    pub fn grid_size(&self) -> usize {
        self.number_grid.len()
    }
}

/// Server-owned playback flag. Always taken from the latest response.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PlaybackState {
    pub playing: bool,
}

/// Body of `/process_step`. Only `playing` matters to the poller; the rest
/// is handed to whoever renders.
#[derive(Default, Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StepResult {
    pub playing: bool,
    #[serde(default)]
    pub processed_grid: Option<Grid>,
    #[serde(default)]
    pub step_row: Option<usize>,
    #[serde(default)]
    pub step_col: Option<usize>,
}

/// Union of the bodies returned by the update endpoints.
#[derive(Default, Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UpdateResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub grid_size: Option<usize>,
    #[serde(default)]
    pub kernel_size: Option<usize>,
    #[serde(default)]
    pub kernel: Option<Grid>,
    #[serde(default)]
    pub display_mode: Option<DisplayMode>,
}
