use std::{fmt::Write as _, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use kernelviz_client::{Client, ClientConfig};
use kernelviz_controls::{
    PauseMode, Poller, PollerConfig, PollerStatus, notification::NotificationBroadcast,
    player::Player,
};
use kernelviz_models::{
    Expression, GridSize, GridSnapshot, KernelSize, UpdateResponse, ValidationError,
};
use kernelviz_tui::{ExpressionEditor, grid};
use snafu::prelude::*;
use tracing::info;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, env = "KERNELVIZ_URL", default_value = kernelviz_client::DEFAULT_BASE_URL)]
    /// Base URL of the convolution server.
    url: String,

    #[clap(long, env = "KERNELVIZ_INTERVAL_MS", default_value_t = 100)]
    /// Delay between automatic steps while playing.
    interval_ms: u64,

    #[clap(long, env = "KERNELVIZ_PAUSE_MODE", value_enum, default_value = "server")]
    /// `server` lets the next step notice the pause, `immediate` stops the chain right away.
    pause_mode: PauseMode,

    #[clap(long, env = "KERNELVIZ_REQUEST_TIMEOUT_SECS")]
    /// Give up on a request after this many seconds. No timeout by default.
    request_timeout_secs: Option<u64>,

    #[clap(short, long)]
    /// Log level
    verbosity: Option<tracing::Level>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Open the terminal UI.
    Open {
        #[clap(long, default_value = ExpressionEditor::DEFAULT_EXPRESSION)]
        /// Text the expression editor starts with.
        expression: String,
    },
    /// Print the current grid, kernel and equation.
    Show,
    /// Advance a single step.
    Step,
    /// Start playback and print every refreshed grid until the server stops.
    /// Ctrl-C pauses.
    Play {
        #[clap(long)]
        /// Pause after this many refreshed grids.
        max_steps: Option<usize>,
    },
    /// Stop server playback.
    Pause,
    /// Set the grid size (1 to 20).
    GridSize {
        #[clap(allow_hyphen_values = true)]
        size: String,
    },
    /// Set the kernel size.
    KernelSize {
        #[clap(allow_hyphen_values = true)]
        size: String,
    },
    /// Build the kernel from an expression in x and y.
    Expression {
        #[clap(allow_hyphen_values = true)]
        expression: String,
    },
    /// Switch between numbers and grayscale.
    ToggleDisplay,
    /// Restore the default grid size.
    Reset,
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{error}"))]
    ClientError { error: String },
    #[snafu(display("{error}"))]
    PlayerError { error: String },
    #[snafu(display("{error}"))]
    TerminalError { error: String },
    #[snafu(display("{error}"))]
    InvalidInput { error: String },
}

impl From<kernelviz_client::Error> for Error {
    fn from(error: kernelviz_client::Error) -> Self {
        Error::ClientError {
            error: error.to_string(),
        }
    }
}

impl From<kernelviz_controls::Error> for Error {
    fn from(error: kernelviz_controls::Error) -> Self {
        Error::PlayerError {
            error: error.to_string(),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Error::InvalidInput {
            error: error.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::TerminalError {
            error: error.to_string(),
        }
    }
}

pub async fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_target(false)
        .compact()
        .init();

    let client = kernelviz_client::new(ClientConfig {
        base_url: cli.url,
        request_timeout: cli.request_timeout_secs.map(Duration::from_secs),
    })?;

    let config = PollerConfig {
        interval: Duration::from_millis(cli.interval_ms),
        pause_mode: cli.pause_mode,
    };

    match cli.command {
        Commands::Open { expression } => open(client, config, &expression).await,
        Commands::Show => {
            let snapshot = client.grid().await?;
            print!("{}", render_snapshot(&snapshot));
            Ok(())
        }
        Commands::Step => {
            let step = client.process_step().await?;
            if let (Some(row), Some(col)) = (step.step_row, step.step_col) {
                println!("Stepped to ({row}, {col})");
            }
            println!("Playing: {}", step.playing);
            Ok(())
        }
        Commands::Play { max_steps } => play(client, config, max_steps).await,
        Commands::Pause => pause(&client).await,
        Commands::GridSize { size } => {
            let grid_size: GridSize = size.parse()?;
            report(client.update_grid_size(grid_size).await?, "Grid size updated");
            Ok(())
        }
        Commands::KernelSize { size } => {
            let kernel_size: KernelSize = size.parse()?;
            report(
                client.update_kernel_size(kernel_size).await?,
                "Kernel size updated",
            );
            Ok(())
        }
        Commands::Expression { expression } => {
            let expression = Expression::new(&expression)?;
            report(
                client.apply_expression(&expression).await?,
                "Kernel updated from expression",
            );
            Ok(())
        }
        Commands::ToggleDisplay => {
            let response = client.toggle_display_mode().await?;
            match response.display_mode {
                Some(mode) => println!("Display mode: {mode}"),
                None => report(response, "Display mode toggled"),
            }
            Ok(())
        }
        Commands::Reset => {
            report(
                client.update_grid_size(GridSize::DEFAULT).await?,
                "Grid reset",
            );
            Ok(())
        }
    }
}

async fn open(client: Client, config: PollerConfig, expression: &str) -> Result<(), Error> {
    let mut player = Player::new(Arc::new(client), config);

    let controls = player.controls();
    let grid = player.grid();
    let status = player.status();
    let broadcast = player.broadcast();

    let player_task = tokio::spawn(async move { player.player_loop().await });

    let tui = kernelviz_tui::init(
        broadcast,
        controls.clone(),
        grid,
        status,
        ExpressionEditor::new(expression),
    )
    .await;

    if tui.is_err() {
        controls.quit();
    }

    player_task.await.map_err(|error| Error::PlayerError {
        error: error.to_string(),
    })??;

    Ok(tui?)
}

/// Runs the chain without a UI. In server-driven mode a pause may still let
/// one more step through, so `max_steps` can be exceeded by one.
async fn play(client: Client, config: PollerConfig, max_steps: Option<usize>) -> Result<(), Error> {
    let broadcast = Arc::new(NotificationBroadcast::new());
    let poller = Poller::new(Arc::new(client), config, broadcast.clone());

    let mut grid = poller.grid_receiver();
    let mut status = poller.status_receiver();
    let mut notifications = broadcast.subscribe();

    let state = poller.start().await?;
    if !state.playing {
        println!("Server reports playback stopped");
        return Ok(());
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut shown = 0;
    let mut pausing = false;

    loop {
        tokio::select! {
            biased;

            Ok(_) = grid.changed() => {
                if let Some(snapshot) = grid.borrow_and_update().clone() {
                    shown += 1;
                    println!("{}", render_snapshot(&snapshot));
                }

                if !pausing && poller.is_polling() && max_steps.is_some_and(|max| shown >= max) {
                    info!(shown, "step limit reached, pausing");
                    pausing = true;
                    poller.pause().await?;
                }
            }
            Ok(notification) = notifications.recv() => eprintln!("{notification}"),
            result = &mut ctrl_c, if !pausing => {
                result?;
                info!("interrupted, pausing");
                pausing = true;
                if poller.is_polling() {
                    poller.pause().await?;
                }
            }
            Ok(_) = status.changed() => {
                if *status.borrow_and_update() == PollerStatus::Idle {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// The server only offers a toggle, so a toggle that started playback is
/// undone.
async fn pause(client: &Client) -> Result<(), Error> {
    let state = client.toggle_play().await?;

    if state.playing {
        let state = client.toggle_play().await?;
        info!(playing = state.playing, "playback was not running");
        println!("Playback was not running");
    } else {
        println!("Playback paused");
    }

    Ok(())
}

fn report(response: UpdateResponse, fallback: &str) {
    println!("{}", response.message.as_deref().unwrap_or(fallback));
}

fn render_rows(out: &mut String, title: &str, rows: &[Vec<f64>]) {
    let _ = writeln!(out, "{title}");
    for row in rows {
        let cells: Vec<_> = row
            .iter()
            .map(|value| format!("{:>7}", grid::format_cell(*value)))
            .collect();
        let _ = writeln!(out, "{}", cells.join(""));
    }
}

fn render_snapshot(snapshot: &GridSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Step ({}, {}) | kernel {} | {}",
        snapshot.step_row, snapshot.step_col, snapshot.kernel_size, snapshot.display_mode
    );
    render_rows(&mut out, "Number grid", &snapshot.number_grid);
    render_rows(&mut out, "Processed grid", &snapshot.processed_grid);
    render_rows(&mut out, "Kernel", &snapshot.kernel);

    if let Some(equation) = grid::equation(snapshot) {
        let _ = writeln!(out, "Equation: {equation}");
    }

    out
}
