use kernelviz_controls::notification::Notification;
use ratatui::{
    crossterm::event::KeyCode,
    prelude::*,
    symbols::border,
    widgets::*,
};
use tui_input::{Input, InputRequest};

use crate::{
    editor::ExpressionEditor,
    ui::{center, render_input},
};

#[derive(Debug, PartialEq)]
pub(crate) enum SizeField {
    Grid,
    Kernel,
}

impl SizeField {
    fn title(&self) -> &'static str {
        match self {
            SizeField::Grid => "Grid size",
            SizeField::Kernel => "Kernel size",
        }
    }
}

pub(crate) enum Popup {
    Size { field: SizeField, input: Input },
    Expression,
    Message(Notification),
}

pub(crate) enum PopupOutcome {
    Submit,
    Close,
}

pub(crate) fn input_request(code: KeyCode) -> Option<InputRequest> {
    match code {
        KeyCode::Char(c) => Some(InputRequest::InsertChar(c)),
        KeyCode::Backspace => Some(InputRequest::DeletePrevChar),
        KeyCode::Delete => Some(InputRequest::DeleteNextChar),
        KeyCode::Left => Some(InputRequest::GoToPrevChar),
        KeyCode::Right => Some(InputRequest::GoToNextChar),
        KeyCode::Home => Some(InputRequest::GoToStart),
        KeyCode::End => Some(InputRequest::GoToEnd),
        _ => None,
    }
}

impl Popup {
    pub(crate) fn size(field: SizeField, current: Option<usize>) -> Self {
        let value = current.map(|size| size.to_string()).unwrap_or_default();
        Popup::Size {
            field,
            input: Input::new(value),
        }
    }

    pub(crate) fn handle_event(
        &mut self,
        code: KeyCode,
        editor: &mut ExpressionEditor,
    ) -> Option<PopupOutcome> {
        match self {
            Popup::Message(_) => Some(PopupOutcome::Close),
            _ if code == KeyCode::Esc => Some(PopupOutcome::Close),
            _ if code == KeyCode::Enter => Some(PopupOutcome::Submit),
            Popup::Size { input, .. } => {
                if let Some(request) = input_request(code) {
                    input.handle(request);
                }
                None
            }
            Popup::Expression => {
                match code {
                    KeyCode::Up => editor.previous(),
                    KeyCode::Down => editor.next(),
                    code => {
                        if let Some(request) = input_request(code) {
                            editor.handle(request);
                        }
                    }
                }
                None
            }
        }
    }

    pub(crate) fn render(&self, frame: &mut Frame, editor: &ExpressionEditor) {
        match self {
            Popup::Size { field, input } => {
                let area = center(frame.area(), Constraint::Length(24), Constraint::Length(3));
                frame.render_widget(Clear, area);
                render_input(input, area, frame, field.title());
            }
            Popup::Expression => {
                let area = center(
                    frame.area(),
                    Constraint::Percentage(60),
                    Constraint::Length(3),
                );
                frame.render_widget(Clear, area);
                render_input(editor.input(), area, frame, "Expression f(x, y)");
            }
            Popup::Message(notification) => {
                let (title, color) = match notification {
                    Notification::Error(_) => ("Error", Color::Red),
                    Notification::Warning(_) => ("Warning", Color::Yellow),
                    Notification::Success(_) => ("Success", Color::Green),
                    Notification::Info(_) => ("Info", Color::Blue),
                };
                let message = notification.message();
                let width = u16::try_from(message.len())
                    .unwrap_or(u16::MAX)
                    .saturating_add(4)
                    .max(20)
                    .min(frame.area().width);
                let area = center(frame.area(), Constraint::Length(width), Constraint::Length(4));

                let block = Block::bordered()
                    .title(format!(" {title} "))
                    .title_alignment(Alignment::Center)
                    .border_set(border::ROUNDED)
                    .border_style(Style::default().fg(color));

                let paragraph = Paragraph::new(message)
                    .wrap(Wrap { trim: true })
                    .block(block);

                frame.render_widget(Clear, area);
                frame.render_widget(paragraph, area);
            }
        }
    }
}
