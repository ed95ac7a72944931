//! Display Module
//!
//! The connection object: one session to the display server, its root
//! screen, keymap and interned atoms, plus the registry of live surfaces and
//! graphics contexts that a global [`Display::flush`] visits.

use std::cell::{RefCell, RefMut};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use tracing::{debug, info};
use x11rb::protocol::xproto::{Atom, Font, Gcontext, Window};

use crate::backend::{Backend, ScreenInfo, X11Backend};
use crate::config::{Config, SurfaceConfig};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::event::decode::decode;
use crate::graphics::ContextState;
use crate::keymap::Keymap;
use crate::surface::SurfaceState;

/// Atoms interned once per connection
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    pub fn new<B: Backend>(backend: &B) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            backend
                .intern_atom(name)
                .map_err(|e| Error::Connection(format!("failed to intern {}: {}", name, e)))
        };

        Ok(Self {
            net_wm_name: intern("_NET_WM_NAME")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }
}

/// Live objects and the ones with unsent attribute changes
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) surfaces: HashMap<Window, SurfaceState>,
    pub(crate) contexts: HashMap<Gcontext, ContextState>,
    pub(crate) dirty_surfaces: BTreeSet<Window>,
    pub(crate) dirty_contexts: BTreeSet<Gcontext>,
}

impl Registry {
    /// Mutate a live surface's caches, tracking whether it now needs a flush
    pub(crate) fn update_surface(
        &mut self,
        id: Window,
        f: impl FnOnce(&mut SurfaceState),
    ) -> Result<()> {
        let state = self.surfaces.get_mut(&id).ok_or(Error::Closed("surface"))?;
        f(state);
        if state.is_dirty() {
            self.dirty_surfaces.insert(id);
        }
        Ok(())
    }

    pub(crate) fn update_context(
        &mut self,
        id: Gcontext,
        f: impl FnOnce(&mut ContextState),
    ) -> Result<()> {
        let state = self
            .contexts
            .get_mut(&id)
            .ok_or(Error::Closed("graphics context"))?;
        f(state);
        if state.is_dirty() {
            self.dirty_contexts.insert(id);
        }
        Ok(())
    }

    pub(crate) fn remove_surface(&mut self, id: Window) {
        self.surfaces.remove(&id);
        self.dirty_surfaces.remove(&id);
    }

    pub(crate) fn remove_context(&mut self, id: Gcontext) {
        self.contexts.remove(&id);
        self.dirty_contexts.remove(&id);
    }
}

/// Connection to the display server
pub struct Display<B: Backend = X11Backend> {
    keymap: Keymap,
    atoms: Atoms,
    surface_config: SurfaceConfig,
    registry: RefCell<Registry>,
    fonts: RefCell<HashMap<String, Font>>,
    backend: B,
}

impl Display<X11Backend> {
    /// Connect using the `[display]` section of `config`
    pub fn connect(config: &Config) -> Result<Self> {
        let backend = X11Backend::connect(config.display.name.as_deref())?;
        Self::with_backend(backend, config)
    }
}

impl<B: Backend> Display<B> {
    /// Finish connection setup over an already-open backend: load the keymap
    /// and intern atoms. Either failing is fatal.
    pub fn with_backend(backend: B, config: &Config) -> Result<Self> {
        let screen = backend.screen();
        let keymap = Keymap::load(&backend, screen.min_keycode, screen.max_keycode)?;
        let atoms = Atoms::new(&backend)?;

        info!("Display ready (root {:#x})", screen.root);

        Ok(Self {
            keymap,
            atoms,
            surface_config: config.surface.clone(),
            registry: RefCell::new(Registry::default()),
            fonts: RefCell::new(HashMap::new()),
            backend,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn screen(&self) -> &ScreenInfo {
        self.backend.screen()
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    pub fn surface_config(&self) -> &SurfaceConfig {
        &self.surface_config
    }

    /// Background used for surfaces created with background 0
    pub fn default_background(&self) -> u32 {
        self.surface_config
            .default_background
            .unwrap_or(self.screen().white_pixel)
    }

    pub(crate) fn registry(&self) -> RefMut<'_, Registry> {
        self.registry.borrow_mut()
    }

    /// Number of open surfaces
    pub fn live_surfaces(&self) -> usize {
        self.registry.borrow().surfaces.len()
    }

    /// Number of open graphics contexts
    pub fn live_contexts(&self) -> usize {
        self.registry.borrow().contexts.len()
    }

    /// Take one event off the queue without blocking
    pub fn poll(&self) -> Result<Option<Event>> {
        Ok(self
            .backend
            .poll_for_event()?
            .map(|raw| decode(&raw, &self.keymap)))
    }

    /// Send every pending surface and context change, then push the request
    /// queue to the server
    pub fn flush(&self) -> Result<()> {
        {
            let mut registry = self.registry.borrow_mut();
            let registry = &mut *registry;

            let surfaces: Vec<Window> = registry.dirty_surfaces.iter().copied().collect();
            for id in surfaces {
                if let Some(state) = registry.surfaces.get_mut(&id) {
                    state.flush(&self.backend, id)?;
                }
                registry.dirty_surfaces.remove(&id);
            }

            let contexts: Vec<Gcontext> = registry.dirty_contexts.iter().copied().collect();
            for id in contexts {
                if let Some(state) = registry.contexts.get_mut(&id) {
                    state.flush(&self.backend, id)?;
                }
                registry.dirty_contexts.remove(&id);
            }
        }

        self.backend.flush()
    }

    /// Open a server font. Checked.
    pub fn open_font(&self, name: &str) -> Result<Font> {
        let font = self.backend.generate_id()?;
        self.backend.open_font(font, name)?;
        debug!("Opened font {:?} as {:#x}", name, font);
        Ok(font)
    }

    pub fn close_font(&self, font: Font) -> Result<()> {
        self.fonts.borrow_mut().retain(|_, cached| *cached != font);
        self.backend.close_font(font)?;
        debug!("Closed font {:#x}", font);
        Ok(())
    }

    /// Font id for `name`, opening it on first use. Names are case-insensitive.
    pub fn font(&self, name: &str) -> Result<Font> {
        let key = name.to_lowercase();
        if let Some(&font) = self.fonts.borrow().get(&key) {
            return Ok(font);
        }

        let font = self.open_font(name)?;
        self.fonts.borrow_mut().insert(key, font);
        Ok(font)
    }
}

impl<B: Backend> Drop for Display<B> {
    fn drop(&mut self) {
        // keymap first, the connection closes when `backend` drops after this
        self.keymap.release();
        info!("Closing display connection");
    }
}

type Connector<B> = Box<dyn Fn() -> Result<Display<B>>>;

/// A display that connects on first use
pub struct LazyDisplay<B: Backend = X11Backend> {
    connect: Connector<B>,
    display: RefCell<Option<Rc<Display<B>>>>,
}

impl LazyDisplay<X11Backend> {
    pub fn from_config(config: Config) -> Self {
        Self::new(move || Display::connect(&config))
    }
}

impl<B: Backend> LazyDisplay<B> {
    pub fn new(connect: impl Fn() -> Result<Display<B>> + 'static) -> Self {
        Self {
            connect: Box::new(connect),
            display: RefCell::new(None),
        }
    }

    /// The shared display, connecting if this is the first call. A failed
    /// attempt leaves the display unconnected so a later call can retry.
    pub fn ensure_connected(&self) -> Result<Rc<Display<B>>> {
        if let Some(display) = self.display.borrow().as_ref() {
            return Ok(Rc::clone(display));
        }

        let display = Rc::new((self.connect)()?);
        *self.display.borrow_mut() = Some(Rc::clone(&display));
        Ok(display)
    }

    /// The display if already connected
    pub fn get(&self) -> Option<Rc<Display<B>>> {
        self.display.borrow().clone()
    }
}

#[cfg(test)]
pub(crate) fn test_display() -> Rc<Display<crate::backend::recording::RecordingBackend>> {
    use crate::backend::recording::RecordingBackend;

    match Display::with_backend(RecordingBackend::new(), &Config::default()) {
        Ok(display) => Rc::new(display),
        Err(e) => panic!("test display: {}", e),
    }
}
