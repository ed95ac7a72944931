//! satori-demo
//!
//! Opens one surface, listens for every event kind and draws a small scene
//! on each expose. Escape is the only clean exit: WM_DELETE_WINDOW is not
//! handled, so closing the window ends the demo with a connection error.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use satori::{
    Config, Event, EventKind, GraphicsContext, Key, LazyDisplay, Line, Point, Rect, Rgba, Style,
    Surface, SurfaceOptions,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pixels allocated for the scene
struct Palette {
    background: u32,
    accent: u32,
    text: u32,
}

impl Palette {
    fn pixels(&self) -> [u32; 3] {
        [self.background, self.accent, self.text]
    }
}

fn draw_scene(gc: &mut GraphicsContext, palette: &Palette, width: u32, height: u32) -> Result<()> {
    gc.set_foreground(palette.background)?;
    gc.draw_rects(true, &[Rect::new(0, 0, width, height)])?;

    gc.set_foreground(palette.accent)?;
    gc.draw_rects(false, &[Rect::new(20, 20, width.saturating_sub(40), height.saturating_sub(40))])?;
    gc.draw_lines(
        true,
        &[Line::new(40, 60, 40, 0), Line::new(0, 20, -40, 0)],
    )?;
    gc.draw_points(false, &[Point::new(30, 30), Point::new(32, 30), Point::new(34, 30)])?;

    gc.set_foreground(palette.text)?;
    gc.draw_text(40, 130, "Press Escape to quit")?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "satori=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|arg| arg == "--config" || arg == "-c")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    let poll_interval = Duration::from_millis(config.demo.poll_interval_ms);

    info!("Starting satori demo");

    let lazy = LazyDisplay::from_config(config.clone());
    let mut surface = Surface::open(
        &lazy,
        &SurfaceOptions {
            x: 100,
            y: 100,
            width: config.surface.default_width,
            height: config.surface.default_height,
            ..Default::default()
        },
    )
    .context("Failed to create surface")?;
    let display = lazy.ensure_connected()?;

    surface.set_title(&config.surface.title)?;
    for kind in EventKind::ALL {
        surface.listen_event(kind)?;
    }

    let palette = Palette {
        background: surface.allocate_color(Rgba::from_packed(0x2e34_40ff))?,
        accent: surface.allocate_color(Rgba::from_packed(0x88c0_d0ff))?,
        text: surface.allocate_color(Rgba::from_packed(0xeceff4ff))?,
    };

    let font = display.font("fixed").context("Failed to open font")?;
    let mut gc = GraphicsContext::new(
        &surface,
        &Style {
            foreground: Some(palette.accent),
            line_width: Some(2),
            font: Some(font),
            ..Default::default()
        },
    )?;

    surface.set_visible(true)?;
    display.flush()?;

    loop {
        let Some(event) = display.poll()? else {
            std::thread::sleep(poll_interval);
            continue;
        };
        debug!("Event: {:?}", event);

        match event {
            Event::WindowDraw { .. } => {
                let (width, height) = surface.size()?;
                draw_scene(&mut gc, &palette, width, height)?;
            }
            Event::KeyPress {
                logical: Key::Escape,
                state: true,
                ..
            } => {
                info!("Escape pressed, exiting");
                break;
            }
            Event::KeyPress {
                logical,
                state: true,
                ..
            } => {
                info!("Key {:?} (code {})", logical, logical.code());
            }
            _ => {}
        }

        display.flush()?;
    }

    gc.close()?;
    surface.release_colors(&palette.pixels())?;
    display.close_font(font)?;
    surface.close()?;
    display.flush()?;

    info!("Bye");
    Ok(())
}
