use kernelviz_models::GridSnapshot;
use ratatui::{layout::Flex, prelude::*, widgets::*};
use tui_input::Input;

use crate::{
    app::{App, AppState},
    grid,
};

impl App {
    pub(crate) fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let kernel_height = self
            .snapshot
            .as_ref()
            .map_or(3, |snapshot| {
                u16::try_from(snapshot.kernel.len())
                    .unwrap_or(u16::MAX)
                    .saturating_add(2)
            });

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(kernel_height),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        match &self.snapshot {
            Some(snapshot) => {
                render_grids(frame, chunks[0], snapshot);
                render_kernel(frame, chunks[1], snapshot);
                render_equation(frame, chunks[2], snapshot);
            }
            None => {
                let waiting = Paragraph::new("Waiting for grid…")
                    .alignment(Alignment::Center)
                    .block(block("Grid"));
                frame.render_widget(waiting, chunks[0].union(chunks[2]));
            }
        }

        self.render_status(frame, chunks[3]);

        if let AppState::Popup(popup) = &self.app_state {
            popup.render(frame, &self.editor);
        }

        if matches!(self.app_state, AppState::Help) {
            render_help(frame);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::from(self.poller_status.to_string()).bold(),
            Span::from(" | "),
        ];

        if let Some(snapshot) = &self.snapshot {
            spans.push(Span::from(snapshot.display_mode.to_string()));
            spans.push(Span::from(" | "));
        }

        if let Some(notification) = &self.last_notification {
            spans.push(Span::from(notification.to_string()));
        }

        let status = Paragraph::new(Line::from(spans)).block(
            block("Status").title_bottom(Line::from(" h: help ").right_aligned()),
        );
        frame.render_widget(status, area);
    }
}

fn render_grids(frame: &mut Frame, area: Rect, snapshot: &GridSnapshot) {
    let [numbers, processed] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);

    let number_grid = Paragraph::new(grid::grid_lines(
        &snapshot.number_grid,
        snapshot.display_mode,
        Some(snapshot),
    ))
    .block(block("Number grid"));

    let processed_grid = Paragraph::new(grid::grid_lines(
        &snapshot.processed_grid,
        snapshot.display_mode,
        None,
    ))
    .block(block("Processed grid"));

    frame.render_widget(number_grid, numbers);
    frame.render_widget(processed_grid, processed);
}

fn render_kernel(frame: &mut Frame, area: Rect, snapshot: &GridSnapshot) {
    let kernel = Paragraph::new(grid::grid_lines(
        &snapshot.kernel,
        snapshot.display_mode,
        None,
    ))
    .block(block("Kernel"));

    frame.render_widget(kernel, area);
}

fn render_equation(frame: &mut Frame, area: Rect, snapshot: &GridSnapshot) {
    let text = grid::equation(snapshot).unwrap_or_default();
    let equation = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(block("Equation"));

    frame.render_widget(equation, area);
}

pub(crate) fn center(area: Rect, horizontal: Constraint, vertical: Constraint) -> Rect {
    let [area] = Layout::horizontal([horizontal])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([vertical]).flex(Flex::Center).areas(area);
    area
}

fn render_help(frame: &mut Frame) {
    let rows = [
        ["space", "Play/pause"],
        ["s", "Single step"],
        ["d", "Toggle display mode"],
        ["g", "Set grid size"],
        ["k", "Set kernel size"],
        ["e", "Edit kernel expression"],
        ["Up/Down", "Expression history"],
        ["r", "Reset grid"],
        ["esc", "Close popup"],
        ["q", "Exit"],
    ];

    let max_left = rows.iter().map(|x| x[0].len()).max().unwrap_or(0);
    let max_right = rows.iter().map(|x| x[1].len()).max().unwrap_or(0);
    let max = max_left + max_right;

    let rows: Vec<_> = rows.into_iter().map(Row::new).collect();

    let area = center(
        frame.area(),
        Constraint::Length(max as u16 + 2 + 9),
        Constraint::Length(rows.len() as u16 + 2),
    );

    let table = Table::new(
        rows,
        [Constraint::Length(max_left as u16 + 2), Constraint::Min(1)],
    )
    .block(block("Help"));

    frame.render_widget(Clear, area);
    frame.render_widget(table, area);
}

pub(crate) fn render_input(input: &Input, area: Rect, frame: &mut Frame, title: &str) {
    let width = area.width.max(3) - 3;
    let scroll = input.visual_scroll(width as usize);

    let input_paragraph = Paragraph::new(input.value())
        .style(Color::Blue)
        .scroll((0, scroll as u16))
        .block(block(title));

    frame.render_widget(input_paragraph, area);

    let x = input.visual_cursor().max(scroll) - scroll + 1;
    frame.set_cursor_position((area.x + x as u16, area.y + 1))
}

pub(crate) fn block(title: &str) -> Block<'_> {
    Block::bordered()
        .title(format!(" {title} "))
        .title_alignment(Alignment::Center)
        .border_type(BorderType::Rounded)
}
