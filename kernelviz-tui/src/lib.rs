use std::{io, sync::Arc};

use app::App;
use kernelviz_controls::{
    GridReceiver, StatusReceiver, controls::Controls, notification::NotificationBroadcast,
};

pub use editor::ExpressionEditor;

mod app;
mod editor;
pub mod grid;
mod popup;
mod ui;

/// Run the terminal UI until the user quits. Quitting also stops the
/// player loop behind `controls`.
pub async fn init(
    broadcast: Arc<NotificationBroadcast>,
    controls: Controls,
    grid_receiver: GridReceiver,
    status_receiver: StatusReceiver,
    editor: ExpressionEditor,
) -> io::Result<()> {
    let mut terminal = ratatui::init();

    let mut app = App::new(
        controls,
        grid_receiver,
        status_receiver,
        broadcast.subscribe(),
        editor,
    );

    let result = app.run(&mut terminal).await;
    ratatui::restore();
    result
}
