use crate::app::App;
use crate::braille::BrailleCanvas;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into globe area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Globe
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_globe(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_globe(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Surface Tiles ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        // Convert braille pixels to character position
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        if cx < inner.width && cy < inner.height {
            Some((cx, cy))
        } else {
            None
        }
    });

    frame.render_widget(
        GlobeWidget {
            canvas: &app.canvas,
            cursor_pos,
        },
        inner,
    );
}

/// Draws the braille canvas with per-cell colors
struct GlobeWidget<'a> {
    canvas: &'a BrailleCanvas,
    cursor_pos: Option<(u16, u16)>,
}

impl Widget for GlobeWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..self.canvas.height().min(area.height as usize) {
            let y = area.y + row as u16;
            for (col, (ch, color)) in self.canvas.cells(row).into_iter().enumerate() {
                if col >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                let Some(color) = color else {
                    continue;
                };
                let x = area.x + col as u16;
                buf[(x, y)].set_char(ch).set_fg(Color::Rgb(color.r, color.g, color.b));
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn toggle_span(on: bool, on_label: &'static str, off_label: &'static str) -> Span<'static> {
    Span::styled(
        if on { on_label } else { off_label },
        Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
    )
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let config = app.renderer.config();

    let mut spans = vec![
        Span::styled(" Alt: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.altitude_label(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", Style::default().fg(Color::DarkGray)),
        Span::styled(app.tile_summary(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", Style::default().fg(Color::DarkGray)),
        toggle_span(config.draw_bounding_sectors, "[B]ounds ", "[b]ounds "),
        toggle_span(config.show_tile_outlines, "[T]iles ", "[t]iles "),
        toggle_span(config.pick_enabled, "[P]ick ", "[p]ick "),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(message) = &app.pick_message {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(message.clone(), Style::default().fg(Color::White)));
    }
    spans.push(Span::styled(
        " | hjkl:pan +/-:zoom click:pick r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
