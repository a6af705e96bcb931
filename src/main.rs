mod app;
mod braille;
mod data;
mod ui;

use anyhow::Result;
use app::App;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::path::Path;
use std::time::Duration;
use surface_tiles::SharedObject;

fn main() -> Result<()> {
    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Graticule first, then GeoJSON from `data/`, or the sample scene when
/// nothing loads.
fn load_scene(data_dir: &Path) -> Result<Vec<SharedObject>> {
    let mut objects = data::graticule()?;
    let mut loaded = Vec::new();
    if data_dir.exists() {
        match data::load_all_geojson(data_dir) {
            Ok(found) => loaded = found,
            Err(e) => log::warn!("cannot read {}: {}", data_dir.display(), e),
        }
    }
    if loaded.is_empty() {
        loaded = data::generate_sample_scene()?;
    }
    objects.extend(loaded);
    Ok(objects)
}

/// Handle mouse events for panning, zooming and picking
fn handle_mouse(app: &mut App, mouse: MouseEvent) -> Result<()> {
    // Always track mouse position for cursor marker
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in()?,
        MouseEventKind::ScrollDown => app.zoom_out()?,
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-1, 0)?,
        MouseEventKind::ScrollRight => app.pan(1, 0)?,
        // Click picks, drag pans
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
            app.pick_at(mouse.column, mouse.row);
        }
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row)?,
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
    Ok(())
}

fn run(terminal: &mut DefaultTerminal) -> Result<()> {
    let size = terminal.size()?;
    let objects = load_scene(Path::new("data"))?;
    let mut app = App::new(size.width as usize, size.height as usize, objects)?;

    // Main loop
    loop {
        app.redraw_if_dirty();
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-1, 0)?,
                            KeyCode::Right | KeyCode::Char('l') => app.pan(1, 0)?,
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -1)?,
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 1)?,

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in()?,
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out()?,

                            // Diagnostics
                            KeyCode::Char('b') | KeyCode::Char('B') => app.toggle_bounding_sectors(),
                            KeyCode::Char('t') | KeyCode::Char('T') => app.toggle_tile_outlines(),
                            KeyCode::Char('p') | KeyCode::Char('P') => app.toggle_picking(),

                            // Reset view
                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset()?,

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse)?,
                Event::Resize(width, height) => app.resize(width as usize, height as usize)?,
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
