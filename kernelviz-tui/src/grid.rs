//! Text and colour mapping of fetched grid values.

use kernelviz_models::{DisplayMode, Grid, GridSnapshot};
use ratatui::prelude::*;

const CELL_WIDTH: usize = 7;

pub fn format_cell(value: f64) -> String {
    format!("{value:.2}")
}

/// Grayscale level for a value in `0.0..=1.0`; anything outside saturates.
pub fn intensity(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Whether `(row, col)` is covered by the kernel at the current step.
pub fn in_kernel_window(snapshot: &GridSnapshot, row: usize, col: usize) -> bool {
    let size = snapshot.grid_size();

    row < size
        && col < size
        && (snapshot.step_row..snapshot.step_row.saturating_add(snapshot.kernel_size))
            .contains(&row)
        && (snapshot.step_col..snapshot.step_col.saturating_add(snapshot.kernel_size))
            .contains(&col)
}

/// `a x k + b x l + ...` over the kernel window, or `None` when the window
/// does not fit inside the grid.
pub fn equation(snapshot: &GridSnapshot) -> Option<String> {
    let mut terms = Vec::new();

    for i in 0..snapshot.kernel_size {
        for j in 0..snapshot.kernel_size {
            let number = snapshot
                .number_grid
                .get(snapshot.step_row.checked_add(i)?)?
                .get(snapshot.step_col.checked_add(j)?)?;
            let weight = snapshot.kernel.get(i)?.get(j)?;

            terms.push(format!("{} x {}", format_cell(*number), format_cell(*weight)));
        }
    }

    (!terms.is_empty()).then(|| terms.join(" + "))
}

fn cell_span(value: f64, mode: DisplayMode, highlighted: bool) -> Span<'static> {
    let span = match mode {
        DisplayMode::Numbers => Span::from(format!(
            "{:>width$}",
            format_cell(value),
            width = CELL_WIDTH
        )),
        DisplayMode::Grayscale => {
            let level = intensity(value);
            Span::from(" ".repeat(CELL_WIDTH)).bg(Color::Rgb(level, level, level))
        }
    };

    if highlighted {
        span.fg(Color::Blue).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        span
    }
}

/// One line per grid row. `overlay` marks the kernel window on the grid.
pub fn grid_lines(
    grid: &Grid,
    mode: DisplayMode,
    overlay: Option<&GridSnapshot>,
) -> Vec<Line<'static>> {
    grid.iter()
        .enumerate()
        .map(|(row, values)| {
            Line::from(
                values
                    .iter()
                    .enumerate()
                    .map(|(col, value)| {
                        let highlighted =
                            overlay.is_some_and(|snapshot| in_kernel_window(snapshot, row, col));
                        cell_span(*value, mode, highlighted)
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}
