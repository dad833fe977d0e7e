use crate::shutdown::{select_stream_or_shutdown, Shutdown};
use crate::types::GenericBoxedStream;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use tracing::{info, warn};

/// Quit keys: `q`, `Esc`, and `Ctrl+C` (raw mode swallows the interrupt signal).
pub fn is_quit(event: &Event) -> bool {
    match event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) => match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
            KeyCode::Char('c') => modifiers.contains(KeyModifiers::CONTROL),
            _ => false,
        },
        _ => false,
    }
}

/// Watch terminal input until a quit key arrives or shutdown is triggered elsewhere.
pub async fn watch_keys(shutdown: Shutdown) {
    let mut events: GenericBoxedStream<io::Result<Event>> = Box::pin(EventStream::new());
    loop {
        match select_stream_or_shutdown(events.as_mut(), &shutdown).await {
            Ok(Some(Ok(event))) => {
                if is_quit(&event) {
                    info!("Quit key pressed");
                    shutdown.trigger();
                    break;
                }
            }
            Ok(Some(Err(e))) => {
                warn!("Terminal input error, keyboard quit disabled: {}", e);
                break;
            }
            Ok(None) => break,
            Err(()) => break,
        }
    }
}
