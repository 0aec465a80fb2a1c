use crate::canvas::{BrailleLayer, PixelCanvas};
use crate::chat::toast::Toast;
use crate::chat::{Message, Sender};
use crate::theme::{Theme, ThemeStyle};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::*,
    Frame,
};
use std::time::Duration;

const CARD_MAX_W: u16 = 64;
const CARD_MAX_H: u16 = 30;
const INPUT_H: u16 = 3;
// dots below this alpha are left blank
const INK_THRESHOLD: u8 = 20;
const EMPTY_HINT: &str = "Start a conversation with the AI...";

/// Where the chat card and its parts sit for a given screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CardLayout {
    pub(crate) card: Rect,
    pub(crate) transcript: Rect,
    pub(crate) input: Rect,
    pub(crate) footer: Rect,
}

pub(crate) fn card_layout(screen: Rect) -> CardLayout {
    // bottom row is the key hint footer
    let avail = screen.height.saturating_sub(1);
    let w = screen.width.saturating_sub(4).min(CARD_MAX_W);
    let h = avail.saturating_sub(1).min(CARD_MAX_H);
    let card = Rect {
        x: screen.x + (screen.width - w) / 2,
        y: screen.y + (avail - h) / 2,
        width: w,
        height: h,
    };
    let inner = card.inner(Margin {
        horizontal: 1,
        vertical: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(INPUT_H)])
        .split(inner);
    let footer = Rect {
        x: screen.x,
        y: screen.y + screen.height.saturating_sub(1),
        width: screen.width,
        height: screen.height.min(1),
    };
    CardLayout {
        card,
        transcript: rows[0].inner(Margin {
            horizontal: 1,
            vertical: 0,
        }),
        input: rows[1],
        footer,
    }
}

/// Greedy word wrap on char counts. Words longer than `width` are split.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for para in text.split('\n') {
        let mut line = String::new();
        let mut len = 0usize;
        for word in para.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if len > 0 {
                    out.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = word.split_off(width);
                out.push(word.into_iter().collect());
                word = rest;
            }
            let wl = word.len();
            if len > 0 && len + 1 + wl > width {
                out.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            line.extend(word);
            len += wl;
        }
        out.push(line);
    }
    out
}

fn typing_dots(elapsed: Duration) -> &'static str {
    match (elapsed.as_millis() / 350) % 3 {
        0 => "●∙∙",
        1 => "∙●∙",
        _ => "∙∙●",
    }
}

/// Every transcript line for a view `width` columns wide.
pub(crate) fn transcript_lines(
    messages: &[Message],
    width: u16,
    bot_name: &str,
    elapsed: Duration,
    style: &ThemeStyle,
) -> Vec<Line<'static>> {
    if messages.is_empty() {
        return Vec::new();
    }
    // bubbles take at most 80% of the row
    let bubble = ((width as usize * 4) / 5).max(8);
    let mut lines = Vec::new();
    for (i, msg) in messages.iter().enumerate() {
        if i > 0 {
            lines.push(Line::raw(""));
        }
        let (label, fg, align) = match msg.sender {
            Sender::You => ("You".to_string(), style.user_bubble, Alignment::Right),
            Sender::Bot => (bot_name.to_string(), style.bot_text, Alignment::Left),
        };
        if msg.is_typing {
            lines.push(
                Line::from(Span::styled(
                    typing_dots(elapsed),
                    Style::default().fg(style.muted.color()),
                ))
                .alignment(align),
            );
            continue;
        }
        lines.push(
            Line::from(Span::styled(
                label,
                Style::default().fg(fg.color()).add_modifier(Modifier::BOLD),
            ))
            .alignment(align),
        );
        for l in wrap_text(&msg.text, bubble) {
            lines.push(Line::from(Span::styled(l, Style::default().fg(fg.color()))).alignment(align));
        }
    }
    lines
}

pub(crate) struct View<'a> {
    pub(crate) canvas: &'a PixelCanvas,
    pub(crate) theme: Theme,
    pub(crate) title: &'a str,
    pub(crate) lines: Vec<Line<'static>>,
    pub(crate) first_visible: usize,
    pub(crate) show_jump: bool,
    pub(crate) input: &'a str,
    pub(crate) busy: bool,
    pub(crate) can_send: bool,
    pub(crate) toasts: Vec<&'a Toast>,
    pub(crate) elapsed: Duration,
}

pub(crate) fn draw(f: &mut Frame, view: View<'_>) {
    let style = view.theme.style();
    let screen = f.size();
    let layout = card_layout(screen);

    f.render_widget(
        BrailleLayer {
            canvas: view.canvas,
            bg: style.background,
            ink_threshold: INK_THRESHOLD,
        },
        screen,
    );

    draw_card(f, &layout, &view, style);
    draw_footer(f, layout.footer, view.theme, style);
    draw_toasts(f, screen, &view.toasts, style);
}

fn logo_color(style: &ThemeStyle, elapsed: Duration) -> ratatui::style::Color {
    let t = (elapsed.as_secs_f32() * 2.0).sin() * 0.5 + 0.5;
    style.header.mix(style.bot_text, t * 0.6).color()
}

fn draw_card(f: &mut Frame, layout: &CardLayout, view: &View<'_>, style: &ThemeStyle) {
    if layout.card.width < 4 || layout.card.height < INPUT_H + 3 {
        return;
    }
    let card_style = Style::default().bg(style.card_bg.color());
    let title = Line::from(vec![
        Span::styled(" ♈ ", Style::default().fg(logo_color(style, view.elapsed))),
        Span::styled(
            format!("{} ", view.title),
            Style::default()
                .fg(style.header.color())
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(style.card_border.color()))
        .title(title)
        .title_alignment(Alignment::Center)
        .style(card_style);
    f.render_widget(Clear, layout.card);
    f.render_widget(block, layout.card);

    // transcript
    let area = layout.transcript;
    if view.lines.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            EMPTY_HINT,
            Style::default().fg(style.muted.color()),
        )))
        .alignment(Alignment::Center);
        let mid = Rect {
            y: area.y + area.height / 2,
            height: area.height.min(1),
            ..area
        };
        f.render_widget(hint, mid);
    } else {
        let visible: Vec<Line> = view
            .lines
            .iter()
            .skip(view.first_visible)
            .take(area.height as usize)
            .cloned()
            .collect();
        f.render_widget(Paragraph::new(visible).style(card_style), area);
    }

    if view.show_jump && area.height > 0 {
        let label = " ↓ new messages · End ";
        let w = (label.chars().count() as u16).min(area.width);
        let r = Rect {
            x: area.x + area.width - w,
            y: area.y + area.height - 1,
            width: w,
            height: 1,
        };
        f.render_widget(Clear, r);
        f.render_widget(
            Paragraph::new(label).style(
                Style::default()
                    .fg(style.card_bg.color())
                    .bg(style.header.color())
                    .add_modifier(Modifier::BOLD),
            ),
            r,
        );
    }

    draw_input(f, layout.input, view, style);
}

fn draw_input(f: &mut Frame, area: Rect, view: &View<'_>, style: &ThemeStyle) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(style.card_border.color()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(8)])
        .split(inner);

    let field = if view.busy {
        Line::from(Span::styled(
            "waiting for reply…",
            Style::default()
                .fg(style.muted.color())
                .add_modifier(Modifier::ITALIC),
        ))
    } else if view.input.is_empty() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(style.header.color())),
            Span::styled("Type a message...", Style::default().fg(style.muted.color())),
        ])
    } else {
        // keep the tail (and the cursor) visible
        let room = (cols[0].width as usize).saturating_sub(3);
        let chars: Vec<char> = view.input.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(room)..].iter().collect();
        Line::from(vec![
            Span::styled("> ", Style::default().fg(style.header.color())),
            Span::styled(tail, Style::default().fg(style.bot_text.color())),
            Span::styled("▏", Style::default().fg(style.header.color())),
        ])
    };
    f.render_widget(Paragraph::new(field), cols[0]);

    let send_style = if view.can_send {
        Style::default()
            .fg(style.header.color())
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(style.muted.color())
    };
    f.render_widget(
        Paragraph::new(Span::styled("[ Send ]", send_style)).alignment(Alignment::Right),
        cols[1],
    );
}

fn draw_footer(f: &mut Frame, area: Rect, theme: Theme, style: &ThemeStyle) {
    if area.height == 0 {
        return;
    }
    let key = Style::default()
        .fg(style.header.color())
        .add_modifier(Modifier::BOLD);
    let txt = Style::default().fg(style.muted.color());
    let spans = vec![
        Span::styled("Enter", key),
        Span::styled(" send  ", txt),
        Span::styled("PgUp/PgDn", key),
        Span::styled(" scroll  ", txt),
        Span::styled("End", key),
        Span::styled(" bottom  ", txt),
        Span::styled("Ctrl-T", key),
        Span::styled(format!(" theme ({})  ", theme.style().name), txt),
        Span::styled("Esc", key),
        Span::styled(" quit", txt),
    ];
    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

fn draw_toasts(f: &mut Frame, screen: Rect, toasts: &[&Toast], style: &ThemeStyle) {
    let w = screen.width.min(44);
    let mut y = screen.y + 1;
    for toast in toasts.iter().rev() {
        let body = wrap_text(&toast.body, w.saturating_sub(4) as usize);
        let h = body.len() as u16 + 2;
        if y + h > screen.y + screen.height || w < 6 {
            break;
        }
        let margin = u16::from(screen.width > w);
        let r = Rect {
            x: screen.x + screen.width - w - margin,
            y,
            width: w,
            height: h,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(style.error.color()))
            .title(Span::styled(
                format!(" {} ", toast.title),
                Style::default()
                    .fg(style.error.color())
                    .add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().bg(style.card_bg.color()));
        let lines: Vec<Line> = body
            .into_iter()
            .map(|l| Line::from(Span::styled(l, Style::default().fg(style.bot_text.color()))))
            .collect();
        f.render_widget(Clear, r);
        f.render_widget(Paragraph::new(lines).block(block), r);
        y += h;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(term: &Terminal<TestBackend>) -> String {
        let buf = term.backend().buffer();
        let mut s = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                s.push_str(buf.get(x, y).symbol());
            }
            s.push('\n');
        }
        s
    }

    fn render(view: View<'_>) -> String {
        let mut term = Terminal::new(TestBackend::new(80, 24)).unwrap();
        term.draw(|f| draw(f, view)).unwrap();
        buffer_text(&term)
    }

    fn base<'a>(canvas: &'a PixelCanvas) -> View<'a> {
        View {
            canvas,
            theme: Theme::Nebula,
            title: "AI ChatBot",
            lines: Vec::new(),
            first_visible: 0,
            show_jump: false,
            input: "",
            busy: false,
            can_send: false,
            toasts: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(wrap_text("the quick brown fox", 9), ["the quick", "brown fox"]);
        assert_eq!(wrap_text("", 5), [""]);
        assert_eq!(wrap_text("a\nb", 5), ["a", "b"]);
    }

    #[test]
    fn wrap_splits_long_words() {
        assert_eq!(wrap_text("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("hi abcdefgh", 4), ["hi", "abcd", "efgh"]);
        for l in wrap_text("αβγδεζηθικλμ and more words", 5) {
            assert!(l.chars().count() <= 5, "{l}");
        }
    }

    #[test]
    fn layout_fits_inside_the_screen() {
        for (w, h) in [(80, 24), (200, 60), (30, 12), (10, 5)] {
            let screen = Rect::new(0, 0, w, h);
            let l = card_layout(screen);
            assert!(l.card.right() <= screen.right());
            assert!(l.card.bottom() <= screen.bottom());
            assert!(l.card.width <= CARD_MAX_W);
            assert_eq!(l.footer.y, h - 1);
        }
    }

    #[test]
    fn transcript_lines_label_each_sender() {
        let style = Theme::Nebula.style();
        let msgs = [Message::user("hello"), Message::bot("hi there")];
        let lines = transcript_lines(&msgs, 40, "Aries", Duration::ZERO, style);
        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(text, ["You", "hello", "", "Aries", "hi there"]);
        assert_eq!(lines[0].alignment, Some(Alignment::Right));
        assert_eq!(lines[3].alignment, Some(Alignment::Left));
    }

    #[test]
    fn typing_placeholder_is_a_dot_row() {
        let style = Theme::Nebula.style();
        let mut t = crate::chat::transcript::Transcript::default();
        t.push(Message::user("hello"));
        t.push_placeholder();
        let lines = transcript_lines(t.entries(), 40, "Bot", Duration::from_millis(400), style);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3].to_string(), "∙●∙");
    }

    #[test]
    fn empty_transcript_shows_hint() {
        let canvas = PixelCanvas::for_cells(80, 24);
        let out = render(base(&canvas));
        assert!(out.contains(EMPTY_HINT));
        assert!(out.contains("AI ChatBot"));
        assert!(out.contains("Type a message..."));
    }

    #[test]
    fn busy_input_says_waiting() {
        let canvas = PixelCanvas::for_cells(80, 24);
        let out = render(View {
            busy: true,
            lines: transcript_lines(&[Message::user("hey")], 60, "Bot", Duration::ZERO, Theme::Nebula.style()),
            ..base(&canvas)
        });
        assert!(out.contains("waiting for reply"));
        assert!(!out.contains(EMPTY_HINT));
        assert!(out.contains("hey"));
    }

    #[test]
    fn jump_affordance_and_toasts_render() {
        let toast = Toast {
            title: "Connection Error".into(),
            body: "Failed to reach the AI assistant. Please try again later.".into(),
            raised_at: std::time::Instant::now(),
        };
        let canvas = PixelCanvas::for_cells(80, 24);
        let out = render(View {
            show_jump: true,
            lines: vec![Line::raw("x"); 50],
            first_visible: 10,
            toasts: vec![&toast],
            ..base(&canvas)
        });
        assert!(out.contains("new messages"));
        assert!(out.contains("Connection Error"));
    }
}
