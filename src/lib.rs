//! Satori
//!
//! A small windowing and input layer over X11: surfaces, graphics contexts,
//! color allocation and a normalized event stream. Attribute changes are
//! coalesced client-side and sent on [`Display::flush`]; events are pulled
//! one at a time with [`Display::poll`].

pub mod backend;
pub mod color;
pub mod config;
pub mod dirty;
pub mod display;
pub mod error;
pub mod event;
pub mod graphics;
pub mod keymap;
pub mod shared;
pub mod surface;

pub use color::{ColorAllocator, Rgba};
pub use config::Config;
pub use display::{Display, LazyDisplay};
pub use error::{Error, Result, describe};
pub use event::{Event, EventKind, Key, MouseButton};
pub use graphics::{GraphicsContext, Style};
pub use shared::{Ellipse, Geometry, Line, Point, Rect};
pub use surface::{Surface, SurfaceOptions};
