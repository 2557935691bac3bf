use crate::config::Variant;
use crate::sim::PlayerAction;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use std::time::Duration;

pub(crate) fn map_key(variant: Variant, key: KeyEvent) -> Option<PlayerAction> {
    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return None;
    }
    match key.code {
        KeyCode::Left => Some(PlayerAction::MoveLeft),
        KeyCode::Right => Some(PlayerAction::MoveRight),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(PlayerAction::Quit),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(PlayerAction::Restart),
        KeyCode::Char(' ') if variant.launch_gated() => Some(PlayerAction::Launch),
        KeyCode::Char('f') if variant == Variant::Classic => Some(PlayerAction::Faster),
        KeyCode::Char('s') if variant == Variant::Classic => Some(PlayerAction::Slower),
        _ => None,
    }
}

/// Wait up to `timeout` for one key and map it. `Ok(None)` means nothing
/// usable arrived.
pub(crate) fn next_action(variant: Variant, timeout: Duration) -> anyhow::Result<Option<PlayerAction>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(k) => Ok(map_key(variant, k)),
        _ => Ok(None),
    }
}

/// Drain everything pending without blocking.
pub(crate) fn pending_actions(variant: Variant) -> anyhow::Result<Vec<PlayerAction>> {
    let mut out = Vec::new();
    while event::poll(Duration::ZERO)? {
        if let Event::Key(k) = event::read()? {
            if let Some(action) = map_key(variant, k) {
                out.push(action);
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}
