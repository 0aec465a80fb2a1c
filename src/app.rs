use crate::canvas::PixelCanvas;
use crate::chat::{ChatController, ControllerOptions, HttpTransport};
use crate::config::{self, Cli, Settings};
use crate::frame_loop::FrameLoop;
use crate::input::{self, Action};
use crate::logging;
use crate::particles::{ParticleField, Pointer, Viewport};
use crate::ui::{self, View};
use anyhow::Result;
use clap::Parser;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{
        self, BeginSynchronizedUpdate, DisableLineWrap, EnableLineWrap, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const TITLE: &str = "AI ChatBot";

struct App {
    settings: Settings,
    chat: ChatController<HttpTransport>,
    field: ParticleField,
    canvas: PixelCanvas,
    pointer: Option<Pointer>,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    cancel: CancellationToken,
    started: Instant,
}

impl App {
    fn tick(&mut self, dt: Duration) -> Result<()> {
        for ev in input::collect_events()? {
            if let Some(action) = input::map_event(&ev) {
                self.dispatch(action);
            }
        }

        self.chat.poll();
        self.chat.toasts_mut().prune(Instant::now());

        self.field.step(dt, self.pointer);
        self.field.render(&mut self.canvas);

        let layout = ui::card_layout(self.terminal.size()?);
        let elapsed = self.started.elapsed();
        let lines = ui::transcript_lines(
            self.chat.transcript().entries(),
            layout.transcript.width,
            &self.settings.bot_name,
            elapsed,
            self.settings.theme.style(),
        );
        self.chat
            .scroll_mut()
            .sync(lines.len(), layout.transcript.height as usize);

        let view = View {
            canvas: &self.canvas,
            theme: self.settings.theme,
            title: TITLE,
            lines,
            first_visible: self.chat.scroll().first_visible(),
            show_jump: self.chat.scroll().shows_jump(),
            input: self.chat.input(),
            busy: self.chat.is_busy(),
            can_send: self.chat.can_submit(),
            toasts: self.chat.toasts().iter().collect(),
            elapsed,
        };
        self.terminal.draw(|f| ui::draw(f, view))?;
        Ok(())
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => {
                info!("quit requested");
                self.cancel.cancel();
            }
            Action::Submit => {
                self.chat.submit();
            }
            Action::Insert(ch) => self.chat.insert_char(ch),
            Action::Backspace => self.chat.backspace(),
            Action::ScrollUp(n) => self.chat.scroll_mut().scroll_up(n),
            Action::ScrollDown(n) => self.chat.scroll_mut().scroll_down(n),
            Action::JumpToBottom => self.chat.scroll_mut().jump_to_bottom(),
            Action::NextTheme => {
                let theme = self.settings.theme.next();
                self.settings.theme = theme;
                self.field.set_theme(theme);
                info!(theme = theme.style().name, "theme changed");
            }
            Action::Pointer { col, row } => self.pointer = Some(Pointer::from_cell(col, row)),
            Action::Resize { cols, rows } => {
                debug!(cols, rows, "terminal resized");
                self.canvas = PixelCanvas::for_cells(cols, rows);
                self.field.resize(Viewport::from_cells(cols, rows));
            }
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode()?;
    let entered = (|| -> Result<_> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            DisableLineWrap,
            cursor::Hide
        )?;
        let backend = CrosstermBackend::new(out);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(terminal)
    })();
    restore_on_err(entered, || {
        let _ = leave_terminal();
    })
}

/// Hands `res` back unchanged, running `restore` first if it failed.
fn restore_on_err<T>(res: Result<T>, restore: impl FnOnce()) -> Result<T> {
    if res.is_err() {
        restore();
    }
    res
}

fn leave_terminal() -> Result<()> {
    let mut out = io::stdout();
    execute!(
        out,
        BeginSynchronizedUpdate,
        DisableMouseCapture,
        cursor::Show,
        EnableLineWrap,
        LeaveAlternateScreen,
        EndSynchronizedUpdate
    )?;
    terminal::disable_raw_mode()?;
    Ok(())
}

fn restore_terminal(term: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    leave_terminal()?;
    term.show_cursor()?;
    Ok(())
}

pub(crate) async fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = config::project_paths()?;
    let mut settings = config::load_settings(&paths.settings_path);
    settings.apply_cli(&cli);
    logging::init(&paths.log_path)?;

    let transport = HttpTransport::new(&settings.endpoint);
    info!(
        url = transport.url(),
        theme = settings.theme.style().name,
        fps = settings.fps_cap,
        "starting"
    );
    let chat = ChatController::new(
        transport,
        ControllerOptions {
            request_timeout: settings.request_timeout(),
            scroll_threshold: settings.scroll_threshold_lines,
            toast_ttl: settings.toast_ttl(),
        },
    );

    let mut terminal = setup_terminal()?;
    let size = restore_on_err(terminal.size().map_err(Into::into), || {
        let _ = restore_terminal(&mut terminal);
    })?;
    let mut field = ParticleField::new(settings.theme, settings.seed);
    field.initialize(Some(Viewport::from_cells(size.width, size.height)));

    let cancel = CancellationToken::new();
    let frame_loop = FrameLoop::new(settings.fps_cap, cancel.clone());
    let mut app = App {
        settings,
        chat,
        field,
        canvas: PixelCanvas::for_cells(size.width, size.height),
        pointer: None,
        terminal,
        cancel,
        started: Instant::now(),
    };

    let frames = frame_loop.run(|dt| app.tick(dt)).await;

    // terminal comes back even if the loop failed
    let restored = restore_terminal(&mut app.terminal);
    app.chat.shutdown();
    if let Err(e) = config::save_settings_atomic(&paths.settings_path, &app.settings) {
        warn!(error = %e, "could not save settings");
    }

    let frames = frames?;
    restored?;
    info!(frames, "shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn failed_setup_restores_before_reporting() {
        let restored = Cell::new(false);
        let res: Result<u8> = restore_on_err(Err(anyhow::anyhow!("no tty")), || restored.set(true));
        assert!(restored.get());
        assert_eq!(res.unwrap_err().to_string(), "no tty");
    }

    #[test]
    fn successful_setup_leaves_the_terminal_alone() {
        let restored = Cell::new(false);
        let res = restore_on_err(Ok(7u8), || restored.set(true));
        assert!(!restored.get());
        assert_eq!(res.unwrap(), 7);
    }
}
