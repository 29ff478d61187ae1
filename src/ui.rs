use image::RgbImage;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use crate::app::{App, InputMode, Phase, PreviewCache};
use crate::conversation::{Sender, MAX_FOLLOW_UP_QUESTIONS};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.phase {
        Phase::Interview => render_interview(app, frame, body_area),
        // While the chain runs the input is gone and the chat takes the
        // whole body.
        Phase::Generating => render_chat(app, frame, body_area),
        Phase::Complete => render_complete(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let progress = format!(" [{}/{}]", app.follow_up_count, MAX_FOLLOW_UP_QUESTIONS);

    let title = Line::from(vec![
        Span::styled(" Atelier ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("ornament design studio", Style::default().fg(Color::White)),
        Span::styled(progress, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.phase {
        Phase::Interview => " INTERVIEW ",
        Phase::Generating => " GENERATING ",
        Phase::Complete => " DESIGN ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.input_mode == InputMode::Editing && app.input_visible() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ]
    } else {
        let mut hints = Vec::new();
        if app.input_visible() {
            hints.extend(vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
            ]);
        }
        hints.extend(vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
        ]);
        if app.image.is_some() {
            hints.extend(vec![
                Span::styled(" s ", key_style),
                Span::styled(" save ", label_style),
                Span::styled(" o ", key_style),
                Span::styled(" open ", label_style),
            ]);
        }
        hints.extend(vec![
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]);
        hints
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    spans.extend(hints);

    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!("  {}", status),
            Style::default().bg(Color::Black).fg(Color::DarkGray),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_interview(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
}

fn render_complete(app: &mut App, frame: &mut Frame, area: Rect) {
    // The transcript stays reviewable next to the finished design.
    let [chat_area, design_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(area);

    render_chat(app, frame, chat_area);
    render_design(app, frame, design_area);
}

fn sender_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Sender::Assistant => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        Sender::Ai => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner dimensions for scroll
    // calculations (minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let border_color = if app.input_mode == InputMode::Editing {
        Color::DarkGray
    } else {
        Color::Cyan
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let mut lines: Vec<Line> = Vec::new();

    if app.transcript.is_empty() && !app.thinking_visible() {
        lines.push(Line::from(Span::styled(
            "Describe the ornament you have in mind...",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for msg in app.transcript.messages() {
            lines.push(Line::from(Span::styled(
                format!("{}:", msg.sender.label()),
                sender_style(msg.sender),
            )));
            for line in msg.text.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines.push(Line::default());
        }

        if app.thinking_visible() {
            lines.push(Line::from(Span::styled(
                format!("{}:", Sender::Assistant.label()),
                sender_style(Sender::Assistant),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
    }

    app.chat_lines = lines.len() as u16;

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);

    // Render scrollbar
    if app.chat_lines > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state =
            ScrollbarState::new(app.chat_lines as usize).position(app.chat_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.is_final_round() {
        " You (final answer) "
    } else {
        " You "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_design(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Your Design ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    // Status and prompt text on top, the image preview below. The text
    // height is computed from wrapped line counts so the preview gets the
    // rest.
    let prompt = app.t2i_prompt.clone().unwrap_or_default();
    let wrap_width = inner.width as usize;
    let mut text_height: u16 = 2; // status line + blank line
    for line in prompt.lines() {
        let char_count = line.chars().count();
        if char_count == 0 {
            text_height += 1;
        } else {
            text_height += ((char_count / wrap_width) + 1) as u16;
        }
    }
    text_height = text_height.min(inner.height);

    let [text_area, image_area] = Layout::vertical([
        Constraint::Length(text_height),
        Constraint::Min(0),
    ])
    .areas(inner);

    let dots = if app.pending {
        ".".repeat((app.animation_frame as usize) + 1)
    } else {
        "...".to_string()
    };
    let mut text_lines: Vec<Line> = vec![
        Line::from(Span::styled(
            format!("Creating your ornament designs {}", dots),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for line in prompt.lines() {
        text_lines.push(Line::from(line.to_string()));
    }

    let text = Paragraph::new(Text::from(text_lines)).wrap(Wrap { trim: true });
    frame.render_widget(text, text_area);

    if image_area.height == 0 {
        return;
    }

    // Rebuild the downscaled preview only when the panel size changed.
    if let Some(image) = &app.image {
        let needs_rebuild = match &app.preview {
            Some(cache) => cache.cols != image_area.width || cache.rows != image_area.height,
            None => true,
        };
        if needs_rebuild {
            app.preview = Some(PreviewCache {
                cols: image_area.width,
                rows: image_area.height,
                pixels: image.preview(image_area.width, image_area.height),
            });
        }
    }

    if let Some(cache) = &app.preview {
        let pad_left = image_area.width.saturating_sub(cache.pixels.width() as u16) / 2;
        let preview = Paragraph::new(Text::from(half_block_lines(&cache.pixels, pad_left)));
        frame.render_widget(preview, image_area);
    }
}

/// Render pixels as rows of upper-half-block glyphs. Each terminal row
/// carries two pixel rows: the upper pixel is the glyph foreground, the
/// lower one the background.
fn half_block_lines(pixels: &RgbImage, pad_left: u16) -> Vec<Line<'static>> {
    let (width, height) = pixels.dimensions();
    let mut lines = Vec::with_capacity(((height + 1) / 2) as usize);

    for y in (0..height).step_by(2) {
        let mut spans: Vec<Span<'static>> = Vec::with_capacity(width as usize + 1);
        if pad_left > 0 {
            spans.push(Span::raw(" ".repeat(pad_left as usize)));
        }
        for x in 0..width {
            let top = pixels.get_pixel(x, y).0;
            let style = if y + 1 < height {
                let bottom = pixels.get_pixel(x, y + 1).0;
                Style::default()
                    .fg(Color::Rgb(top[0], top[1], top[2]))
                    .bg(Color::Rgb(bottom[0], bottom[1], bottom[2]))
            } else {
                Style::default().fg(Color::Rgb(top[0], top[1], top[2]))
            };
            spans.push(Span::styled("▀", style));
        }
        lines.push(Line::from(spans));
    }

    lines
}
