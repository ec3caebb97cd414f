use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

use crate::app::App;
use crate::map::annotation::group_digits;
use crate::map::MapScene;
use crate::region::StatKind;

const PANEL_WIDTH: u16 = 30;

/// Split the terminal into the map block, the detail panel and the status
/// bar. Shared with the event loop so mouse hits can be mapped back into
/// map cells.
pub fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(PANEL_WIDTH)])
        .split(rows[0]);

    (cols[0], cols[1], rows[1])
}

/// Interior of the map block (inside the border) where the scene draws.
pub fn map_interior(area: Rect) -> Rect {
    let (map_block, _, _) = layout(area);
    Block::default().borders(Borders::ALL).inner(map_block)
}

pub fn render(frame: &mut Frame, app: &App, scene: &MapScene) {
    let (map_block, panel, status) = layout(frame.area());
    render_map(frame, scene, map_block);
    render_panel(frame, app, panel);
    render_status_bar(frame, app, status);
}

fn render_map(frame: &mut Frame, scene: &MapScene, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Epidemic Map ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(SceneWidget { scene }, inner);
}

/// Draws the coastline raster, then the markers back-to-front.
struct SceneWidget<'a> {
    scene: &'a MapScene,
}

impl Widget for SceneWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for (row_idx, row) in self.scene.coastlines.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;
            for (col_idx, ch) in row.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Blank braille cells would erase markers under them.
                if ch == '\u{2800}' {
                    continue;
                }
                buf[(area.x + col_idx as u16, y)].set_char(ch).set_fg(Color::Cyan);
            }
        }

        for marker in &self.scene.markers {
            draw_marker(marker, area, buf);
        }
    }
}

fn draw_marker(marker: &crate::map::renderer::Marker, area: Rect, buf: &mut Buffer) {
    let (r, g, b) = marker.color;
    let fill = Style::default().fg(Color::Rgb(r, g, b));
    let ring = Style::default().fg(Color::White);

    let rc = marker.radius_cells;
    let rr = marker.radius_rows();

    for dr in -rr..=rr {
        for dc in -rc..=rc {
            let nx = dc as f64 / rc as f64;
            let ny = dr as f64 / rr as f64;
            let d2 = nx * nx + ny * ny;
            if d2 > 1.0 {
                continue;
            }

            let col = marker.col + dc;
            let row = marker.row + dr;
            if col < 0 || row < 0 || col >= area.width as i32 || row >= area.height as i32 {
                continue;
            }

            let style = if marker.selected && d2 > 0.55 { ring } else { fill };
            buf[(area.x + col as u16, area.y + row as u16)]
                .set_char('█')
                .set_style(style);
        }
    }

    if !marker.label.is_empty() {
        let label_style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        let start = marker.col - marker.label.len() as i32 / 2;
        for (i, ch) in marker.label.chars().enumerate() {
            let col = start + i as i32;
            if col < 0 || col >= area.width as i32 || marker.row < 0 || marker.row >= area.height as i32 {
                continue;
            }
            buf[(area.x + col as u16, area.y + marker.row as u16)]
                .set_char(ch)
                .set_style(label_style);
        }
    }
}

fn render_panel(frame: &mut Frame, app: &App, area: Rect) {
    let region = app.selection.detail_region();
    let stat = region.report.as_ref().map(|r| r.stat).unwrap_or_default();

    let count_or_dash = |n: u64| {
        if region.report.is_some() {
            group_digits(n)
        } else {
            "-".to_string()
        }
    };

    let percent = |f: f64| format!("{:.1}%", f * 100.0);

    let recovered_text = if app.show_percents {
        percent(stat.recovered_fraction())
    } else {
        count_or_dash(stat.recovered)
    };
    let deaths_text = if app.show_percents {
        percent(stat.deaths_fraction())
    } else {
        count_or_dash(stat.deaths)
    };

    let updated_text = match region.report.as_ref() {
        Some(report) => format!("Updated {}h ago", report.hours_old()),
        None => "No report yet".to_string(),
    };

    let row = |label: &str, value: String, color: Color| {
        Line::from(vec![
            Span::styled(format!(" {:<10}", label), Style::default().fg(Color::Gray)),
            Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ])
    };

    let lines = vec![
        Line::from(Span::styled(
            format!(" {}", region.name),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        row("Confirmed", count_or_dash(stat.confirmed), Color::Rgb(255, 149, 0)),
        row("Active", count_or_dash(stat.active()), Color::Rgb(255, 204, 0)),
        row("Recovered", recovered_text, Color::Rgb(52, 199, 89)),
        row("Deaths", deaths_text, Color::Rgb(255, 59, 48)),
        Line::default(),
        Line::from(Span::styled(
            format!(" {}", updated_text),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Details ", Style::default().fg(Color::Cyan)));
    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let kind_color = |kind: StatKind| {
        let (r, g, b) = crate::map::annotation::color(kind, 100).to_u8();
        Color::Rgb(r, g, b)
    };

    let center = format!(
        "{:.1}°{}, {:.1}°{}",
        app.viewport.center_lat.abs(),
        if app.viewport.center_lat >= 0.0 { "N" } else { "S" },
        app.viewport.center_lon.abs(),
        if app.viewport.center_lon >= 0.0 { "E" } else { "W" },
    );

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}x", app.viewport.zoom),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!(" ({}) ", app.selector.active_tier().label()),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!("[{}] ", app.stat_kind.title()),
            Style::default().fg(kind_color(app.stat_kind)),
        ),
        Span::styled(
            if app.is_refreshing() { "updating… " } else { "" },
            Style::default().fg(Color::Green),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(center, Style::default().fg(Color::Cyan)),
        Span::styled(
            " | hjkl:pan +/-:zoom m:stat p:% f:focus r:reload 0:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
