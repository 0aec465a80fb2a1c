use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Quit,
    Submit,
    Insert(char),
    Backspace,
    ScrollUp(usize),
    ScrollDown(usize),
    JumpToBottom,
    NextTheme,
    Pointer { col: u16, row: u16 },
    Resize { cols: u16, rows: u16 },
}

const PAGE: usize = 5;
const WHEEL: usize = 2;

/// Drains whatever the terminal has queued without waiting.
pub(crate) fn collect_events() -> anyhow::Result<Vec<Event>> {
    let mut out = Vec::new();
    while event::poll(Duration::ZERO)? {
        out.push(event::read()?);
        if out.len() >= 64 {
            break;
        }
    }
    Ok(out)
}

pub(crate) fn map_event(ev: &Event) -> Option<Action> {
    match ev {
        Event::Key(k) => map_key(k),
        Event::Mouse(m) => map_mouse(m),
        Event::Resize(cols, rows) => Some(Action::Resize {
            cols: *cols,
            rows: *rows,
        }),
        _ => None,
    }
}

fn map_key(k: &KeyEvent) -> Option<Action> {
    if !matches!(k.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return None;
    }
    if k.modifiers.contains(KeyModifiers::CONTROL) {
        return match k.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::Quit),
            KeyCode::Char('t') | KeyCode::Char('T') => Some(Action::NextTheme),
            _ => None,
        };
    }
    match k.code {
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Up => Some(Action::ScrollUp(1)),
        KeyCode::Down => Some(Action::ScrollDown(1)),
        KeyCode::PageUp => Some(Action::ScrollUp(PAGE)),
        KeyCode::PageDown => Some(Action::ScrollDown(PAGE)),
        KeyCode::End => Some(Action::JumpToBottom),
        KeyCode::Char(ch) if !ch.is_control() => Some(Action::Insert(ch)),
        _ => None,
    }
}

fn map_mouse(m: &MouseEvent) -> Option<Action> {
    match m.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(Action::Pointer {
            col: m.column,
            row: m.row,
        }),
        MouseEventKind::ScrollUp => Some(Action::ScrollUp(WHEEL)),
        MouseEventKind::ScrollDown => Some(Action::ScrollDown(WHEEL)),
        _ => None,
    }
}
