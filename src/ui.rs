use crate::app::{App, SetChooser};
use crate::shell::NoticeLevel;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

const APP_TITLE: &str = "Pieces  ";
const UP_NEXT_LIMIT: usize = 12;
const KEY_HINT: &str = "Space play/pause, n/p next/prev, 1-9 movement, +/- volume, m mute, ,/. seek, l loop, a/x after current, o sets, h history, q quit";

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    error: Color,
    selected_bg: Color,
    popup_bg: Color,
    popup_selected_bg: Color,
}

const COLORS: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    panel_alt_bg: Color::Rgb(24, 38, 58),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
    error: Color::Rgb(255, 109, 109),
    selected_bg: Color::Rgb(34, 55, 82),
    popup_bg: Color::Rgb(22, 33, 51),
    popup_selected_bg: Color::Rgb(45, 70, 99),
};

pub fn draw(frame: &mut Frame, app: &App) {
    let colors = COLORS;
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, app, vertical[0], &colors);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(66), Constraint::Percentage(34)])
        .split(vertical[1]);
    draw_movements(frame, app, body[0], &colors);
    draw_up_next(frame, app, body[1], &colors);

    let timeline = Paragraph::new(Span::styled(
        timeline_line(app, 30, 12),
        Style::default().fg(colors.text),
    ))
    .block(panel_block(
        "Timeline",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(timeline, vertical[2]);

    let notice = app.transport().shell().notice.as_ref();
    let notice_span = match notice {
        Some(notice) if notice.level == NoticeLevel::Error => {
            Span::styled(notice.message.as_str(), Style::default().fg(colors.error))
        }
        Some(notice) => Span::styled(notice.message.as_str(), Style::default().fg(colors.text)),
        None => Span::raw(""),
    };
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(KEY_HINT, Style::default().fg(colors.muted)),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        notice_span,
    ]))
    .block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(footer, vertical[3]);

    if let Some(chooser) = app.chooser() {
        draw_chooser(frame, chooser, &colors);
    } else if app.show_history() {
        draw_history(frame, app, &colors);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect, colors: &Palette) {
    let transport = app.transport();
    let shell = transport.shell();

    let mut spans = vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(shell.play_pause.as_str(), Style::default().fg(colors.text)),
    ];
    if !shell.position.is_empty() {
        spans.push(Span::styled("  |  ", Style::default().fg(colors.muted)));
        spans.push(Span::styled(
            format!("Piece {}", shell.position),
            Style::default().fg(colors.alert),
        ));
    }
    if transport.is_looping() {
        spans.push(Span::styled("  |  ", Style::default().fg(colors.muted)));
        spans.push(Span::styled("Loop", Style::default().fg(colors.accent)));
    }
    if shell.pause_after_current {
        spans.push(Span::styled("  |  ", Style::default().fg(colors.muted)));
        spans.push(Span::styled(
            "Pause after current",
            Style::default().fg(colors.alert),
        ));
    }
    if shell.exit_after_current {
        spans.push(Span::styled("  |  ", Style::default().fg(colors.muted)));
        spans.push(Span::styled(
            "Exit after current",
            Style::default().fg(colors.alert),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(panel_block(
        "Status",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(header, area);
}

fn draw_movements(frame: &mut Frame, app: &App, area: Rect, colors: &Palette) {
    let current = app.transport().current();
    let playing = current.current_index();

    let items: Vec<ListItem> = current
        .movement_labels()
        .into_iter()
        .enumerate()
        .map(|(index, label)| {
            let marker = if playing == Some(index) { "  > " } else { "    " };
            let style = if playing == Some(index) {
                Style::default().fg(colors.accent)
            } else {
                Style::default().fg(colors.text)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(colors.muted)),
                Span::styled(format!("{}. ", index + 1), Style::default().fg(colors.muted)),
                Span::styled(label, style),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!items.is_empty()).then_some(app.movement_cursor()));

    let title = if current.is_empty() {
        String::from("No piece loaded")
    } else {
        current.description.clone()
    };

    let list = List::new(items)
        .block(panel_block(
            &title,
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_up_next(frame: &mut Frame, app: &App, area: Rect, colors: &Palette) {
    let queue = app.transport().queue();
    let mut lines: Vec<Line> = queue
        .iter()
        .take(UP_NEXT_LIMIT)
        .map(|name| Line::from(Span::styled(name, Style::default().fg(colors.text))))
        .collect();
    if queue.len() > UP_NEXT_LIMIT {
        lines.push(Line::from(Span::styled(
            format!("... {} more", queue.len() - UP_NEXT_LIMIT),
            Style::default().fg(colors.muted),
        )));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "-",
            Style::default().fg(colors.muted),
        )));
    }

    let title = if queue.is_shuffled() {
        "Up Next (shuffled)"
    } else {
        "Up Next"
    };
    let block = Paragraph::new(lines)
        .block(panel_block(
            title,
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(block, area);
}

fn draw_chooser(frame: &mut Frame, chooser: &SetChooser, colors: &Palette) {
    let popup = centered_rect(frame.area(), 62, 58);
    frame.render_widget(Clear, popup);

    let items: Vec<ListItem> = chooser
        .sets
        .iter()
        .zip(&chooser.chosen)
        .map(|(name, chosen)| {
            let mark = if *chosen { "[x] " } else { "[ ] " };
            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(colors.accent)),
                Span::styled(name.as_str(), Style::default().fg(colors.text)),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    if !chooser.sets.is_empty() {
        state.select(Some(chooser.selected.min(chooser.sets.len() - 1)));
    }

    let title = format!(
        "Directory sets  (shuffle {})",
        if chooser.shuffle { "on" } else { "off" }
    );
    let list = List::new(items)
        .block(panel_block(
            &title,
            colors.popup_bg,
            colors.text,
            colors.border,
        ))
        .highlight_style(
            Style::default()
                .bg(colors.popup_selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, popup, &mut state);

    let hint_area = Rect {
        x: popup.x.saturating_add(2),
        y: popup.y.saturating_add(popup.height.saturating_sub(2)),
        width: popup.width.saturating_sub(4),
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Space mark, s shuffle, Enter load, Esc close",
            Style::default().fg(colors.muted),
        )),
        hint_area,
    );
}

fn draw_history(frame: &mut Frame, app: &App, colors: &Palette) {
    let popup = centered_rect(frame.area(), 70, 60);
    frame.render_widget(Clear, popup);

    let history = Paragraph::new(app.transport().history().render())
        .style(Style::default().fg(colors.text))
        .block(panel_block(
            "History",
            colors.popup_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: false });
    frame.render_widget(history, popup);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn progress_bar(percent: u16, width: usize) -> String {
    let ratio = f64::from(percent.min(100)) / 100.0;
    let filled = (ratio * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(app: &App, timeline_bar_width: usize, volume_bar_width: usize) -> String {
    let clock = app.clock();
    let volume = app.transport().volume();
    format!(
        "{} {} {}  |  Vol {} {:>3}%",
        clock.elapsed,
        progress_bar(clock.progress, timeline_bar_width),
        clock.remaining,
        progress_bar(u16::from(volume), volume_bar_width),
        volume
    )
}
