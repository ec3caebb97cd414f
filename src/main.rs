use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use log::warn;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;

use epimap::app::App;
use epimap::data;
use epimap::ui;

fn main() -> Result<()> {
    // Logs go to stderr and stay silent unless RUST_LOG is set; redirect
    // stderr to a file to watch them without disturbing the TUI.
    pretty_env_logger::init();

    let snapshot_path = env::args().nth(1).map(PathBuf::from);

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, snapshot_path);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Load the region snapshot from the given file, falling back to the
/// bundled sample so the map is never empty.
fn load_initial_snapshot(path: Option<&Path>) -> Result<epimap::region::RegionSnapshot> {
    match path {
        Some(path) => match data::load_snapshot(path) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                warn!("falling back to sample data: {:#}", err);
                data::sample_snapshot()
            }
        },
        None => data::sample_snapshot(),
    }
}

fn run(terminal: &mut DefaultTerminal, snapshot_path: Option<PathBuf>) -> Result<()> {
    let snapshot = load_initial_snapshot(snapshot_path.as_deref())?;
    let mut app = App::new(snapshot, snapshot_path);

    // Coastline background: Natural Earth files if present, rough built-in
    // outlines otherwise.
    let data_dir = Path::new("data");
    if data_dir.exists() {
        let _ = data::load_coastlines(&mut app.map_renderer, data_dir);
    }
    if !app.map_renderer.has_data() {
        data::builtin_world(&mut app.map_renderer);
    }

    loop {
        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        let inner = ui::map_interior(area);

        app.sync_viewport(inner.width, inner.height);
        app.tick();

        let scene = app.build_scene(inner.width, inner.height);
        terminal.draw(|frame| ui::render(frame, &app, &scene))?;

        // ~60fps event poll keeps camera flights smooth.
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') => app.quit(),
                    KeyCode::Esc => {
                        if app.selection.selected().is_some() {
                            app.on_marker_deselected();
                        } else {
                            app.quit();
                        }
                    }

                    KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                    KeyCode::Char('m') | KeyCode::Tab => app.cycle_stat_kind(),
                    KeyCode::Char('p') => app.show_percents = !app.show_percents,
                    KeyCode::Char('f') => app.focus_hotspot(),
                    KeyCode::Char('r') => app.request_refresh(),
                    KeyCode::Char('0') => app.reset_view(),

                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse, inner, &scene),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Mouse events arrive in terminal coordinates; translate into map-area
/// cells before zooming or hit-testing markers.
fn handle_mouse(app: &mut App, mouse: MouseEvent, map_area: Rect, scene: &epimap::map::MapScene) {
    let local = || {
        if mouse.column >= map_area.x
            && mouse.column < map_area.x + map_area.width
            && mouse.row >= map_area.y
            && mouse.row < map_area.y + map_area.height
        {
            Some((mouse.column - map_area.x, mouse.row - map_area.y))
        } else {
            None
        }
    };

    match mouse.kind {
        MouseEventKind::ScrollUp => {
            if let Some((col, row)) = local() {
                app.zoom_in_at(col, row);
            }
        }
        MouseEventKind::ScrollDown => {
            if let Some((col, row)) = local() {
                app.zoom_out_at(col, row);
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
            if let Some((col, row)) = local() {
                match scene.marker_at(col as i32, row as i32) {
                    Some(marker) => {
                        let key = marker.key.clone();
                        app.on_marker_selected(&key);
                    }
                    None => app.on_marker_deselected(),
                }
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some((last_col, last_row)) = app.last_mouse {
                let dx = (last_col as i32 - mouse.column as i32) * 2;
                let dy = (last_row as i32 - mouse.row as i32) * 4;
                app.pan(dx, dy);
            }
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.last_mouse = None;
        }
        _ => {}
    }
}
