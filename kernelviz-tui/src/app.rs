use crate::{
    editor::ExpressionEditor,
    popup::{Popup, PopupOutcome, SizeField},
};
use kernelviz_controls::{
    GridReceiver, PollerStatus, StatusReceiver, controls::Controls, notification::Notification,
};
use kernelviz_models::GridSnapshot;
use ratatui::{
    DefaultTerminal,
    crossterm::event::{self, Event, KeyCode, KeyEventKind},
};
use std::io;
use tokio::{
    sync::broadcast,
    time::{self, Duration},
};

pub(crate) struct App {
    pub(crate) controls: Controls,
    pub(crate) grid: GridReceiver,
    pub(crate) status: StatusReceiver,
    pub(crate) notifications: broadcast::Receiver<Notification>,
    pub(crate) editor: ExpressionEditor,
    pub(crate) snapshot: Option<GridSnapshot>,
    pub(crate) poller_status: PollerStatus,
    pub(crate) last_notification: Option<Notification>,
    pub(crate) exit: bool,
    pub(crate) should_draw: bool,
    pub(crate) app_state: AppState,
}

#[derive(Default)]
pub(crate) enum AppState {
    #[default]
    Normal,
    Popup(Popup),
    Help,
}

impl App {
    pub(crate) fn new(
        controls: Controls,
        grid: GridReceiver,
        status: StatusReceiver,
        notifications: broadcast::Receiver<Notification>,
        editor: ExpressionEditor,
    ) -> Self {
        let snapshot = grid.borrow().clone();
        let poller_status = *status.borrow();

        Self {
            controls,
            grid,
            status,
            notifications,
            editor,
            snapshot,
            poller_status,
            last_notification: None,
            exit: false,
            should_draw: true,
            app_state: Default::default(),
        }
    }

    pub(crate) async fn run(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        let mut tick_interval = time::interval(Duration::from_millis(10));

        while !self.exit {
            tokio::select! {
                Ok(_) = self.grid.changed() => {
                    self.snapshot = self.grid.borrow_and_update().clone();
                    self.should_draw = true;
                },
                Ok(_) = self.status.changed() => {
                    self.poller_status = *self.status.borrow_and_update();
                    self.should_draw = true;
                },
                Ok(notification) = self.notifications.recv() => {
                    self.handle_notification(notification);
                },
                _ = tick_interval.tick() => {
                    if event::poll(Duration::from_millis(0))? {
                        self.handle_events()?;
                    }
                }
            }

            if self.should_draw {
                terminal.draw(|frame| self.render(frame))?;
                self.should_draw = false;
            }
        }

        Ok(())
    }

    fn handle_events(&mut self) -> io::Result<()> {
        match event::read()? {
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                self.handle_key(key_event.code);
            }
            Event::Resize(_, _) => self.should_draw = true,
            _ => {}
        };
        Ok(())
    }

    pub(crate) fn handle_notification(&mut self, notification: Notification) {
        if matches!(notification, Notification::Error(_))
            && matches!(self.app_state, AppState::Normal)
        {
            self.app_state = AppState::Popup(Popup::Message(notification.clone()));
        }

        self.last_notification = Some(notification);
        self.should_draw = true;
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode) {
        self.should_draw = true;

        match &mut self.app_state {
            AppState::Help => {
                self.app_state = AppState::Normal;
                return;
            }
            AppState::Popup(popup) => {
                match popup.handle_event(code, &mut self.editor) {
                    Some(PopupOutcome::Close) => self.app_state = AppState::Normal,
                    Some(PopupOutcome::Submit) => self.submit_popup(),
                    None => {}
                }
                return;
            }
            AppState::Normal => {}
        }

        match code {
            KeyCode::Char(' ') => self.controls.play_pause(),
            KeyCode::Char('s') => self.controls.step(),
            KeyCode::Char('d') => self.controls.toggle_display_mode(),
            KeyCode::Char('r') => self.controls.reset(),
            KeyCode::Char('g') => {
                let current = self.snapshot.as_ref().map(GridSnapshot::grid_size);
                self.app_state = AppState::Popup(Popup::size(SizeField::Grid, current));
            }
            KeyCode::Char('k') => {
                let current = self.snapshot.as_ref().map(|snapshot| snapshot.kernel_size);
                self.app_state = AppState::Popup(Popup::size(SizeField::Kernel, current));
            }
            KeyCode::Char('e') => self.app_state = AppState::Popup(Popup::Expression),
            KeyCode::Char('h') => self.app_state = AppState::Help,
            KeyCode::Char('q') => self.exit(),
            _ => self.should_draw = false,
        }
    }

    /// Rejected input replaces the popup with the validation message.
    fn submit_popup(&mut self) {
        let AppState::Popup(popup) = std::mem::take(&mut self.app_state) else {
            return;
        };

        let result = match &popup {
            Popup::Size {
                field: SizeField::Grid,
                input,
            } => self.controls.set_grid_size(input.value()).map(|_| ()),
            Popup::Size {
                field: SizeField::Kernel,
                input,
            } => self.controls.set_kernel_size(input.value()).map(|_| ()),
            Popup::Expression => self
                .controls
                .apply_expression(self.editor.value())
                .inspect(|_| self.editor.commit()),
            Popup::Message(_) => Ok(()),
        };

        if let Err(error) = result {
            tracing::debug!(%error, "input rejected");
            self.app_state = AppState::Popup(Popup::Message(Notification::Error(error.to_string())));
        }
    }

    fn exit(&mut self) {
        self.controls.quit();
        self.exit = true;
    }
}
