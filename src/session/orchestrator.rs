//! Per-monitor overlay windows
//!
//! The orchestrator opens one overlay window per screen. Every window gets its
//! own bus, dispatch queue, session and coordinator; nothing is shared between
//! windows except the capture strategy and the action handler.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::stream::{FuturesUnordered, StreamExt};

use super::actions::{ActionHandler, OverlayHost};
use super::coordinator::EventCoordinator;
use super::state::OverlaySession;
use crate::annotations::AnnotationLayer;
use crate::capture::{CaptureService, CaptureStrategy};
use crate::config::EngineConfig;
use crate::domain::{OverlayMode, Point, ScreenDescriptor, Size};
use crate::events::{DispatchHandle, DispatchQueue, EventBus};
use crate::placement::{ToolbarPlacement, screen_from_point};
use crate::render::{AnnotationRenderer, DirtyRegionRenderer};

/// Builds the renderer for a new window's canvas
pub type RendererFactory = Box<dyn Fn(&ScreenDescriptor) -> Box<dyn AnnotationRenderer>>;

/// One transient overlay window covering a screen
pub struct OverlayWindow {
    screen: String,
    bus: Rc<EventBus>,
    queue: DispatchQueue,
    coordinator: EventCoordinator,
}

impl OverlayWindow {
    pub fn screen(&self) -> &str {
        &self.screen
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn coordinator(&self) -> &EventCoordinator {
        &self.coordinator
    }

    /// Handle for posting events to this window from other threads
    pub fn dispatch_handle(&self) -> DispatchHandle {
        self.queue.handle()
    }

    /// Publish events queued from other threads
    pub fn pump(&self) -> usize {
        self.queue.pump(&self.bus)
    }
}

pub struct OverlayOrchestrator {
    config: EngineConfig,
    strategy: Rc<dyn CaptureStrategy>,
    actions: Rc<dyn ActionHandler>,
    renderers: RendererFactory,
    screens: RefCell<Vec<ScreenDescriptor>>,
    windows: RefCell<Vec<Rc<OverlayWindow>>>,
    ime_enabled: Cell<bool>,
    this: Weak<OverlayOrchestrator>,
}

impl OverlayOrchestrator {
    pub fn new(
        config: EngineConfig,
        strategy: Rc<dyn CaptureStrategy>,
        actions: Rc<dyn ActionHandler>,
    ) -> Rc<Self> {
        Self::with_renderers(
            config,
            strategy,
            actions,
            Box::new(|_: &ScreenDescriptor| {
                Box::new(DirtyRegionRenderer::new()) as Box<dyn AnnotationRenderer>
            }),
        )
    }

    pub fn with_renderers(
        config: EngineConfig,
        strategy: Rc<dyn CaptureStrategy>,
        actions: Rc<dyn ActionHandler>,
        renderers: RendererFactory,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            config,
            strategy,
            actions,
            renderers,
            screens: RefCell::new(Vec::new()),
            windows: RefCell::new(Vec::new()),
            ime_enabled: Cell::new(false),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn screens(&self) -> Vec<ScreenDescriptor> {
        self.screens.borrow().clone()
    }

    pub fn is_ime_enabled(&self) -> bool {
        self.ime_enabled.get()
    }

    /// Open a window on every screen, replacing any open windows.
    ///
    /// Each window starts selecting with its screen frozen. Returns the number
    /// of windows opened.
    pub fn open(&self, screens: Vec<ScreenDescriptor>) -> usize {
        self.teardown();
        let windows: Vec<Rc<OverlayWindow>> = screens.iter().map(|s| self.open_window(s)).collect();
        log::debug!("Opened {} overlay window(s)", windows.len());
        let count = windows.len();
        *self.screens.borrow_mut() = screens;
        *self.windows.borrow_mut() = windows;
        count
    }

    fn open_window(&self, screen: &ScreenDescriptor) -> Rc<OverlayWindow> {
        let bus = Rc::new(EventBus::new());
        let layer = AnnotationLayer::new(&self.config, (self.renderers)(screen));
        let mut session = OverlaySession::new(screen.clone());
        if let Err(err) = session.switch_mode(OverlayMode::Selecting) {
            log::error!("New session for {} cannot start selecting: {}", screen.name, err);
        }
        let coordinator = EventCoordinator::new(
            bus.clone(),
            session,
            layer,
            CaptureService::new(self.strategy.clone()),
            self.actions.clone(),
        );
        let host: Weak<dyn OverlayHost> = self.this.clone();
        coordinator.set_orchestrator(host);
        if !coordinator.freeze_background() {
            log::warn!("Could not freeze {}, captures will be live", screen.name);
        }
        Rc::new(OverlayWindow {
            screen: screen.name.clone(),
            bus,
            queue: DispatchQueue::new(),
            coordinator,
        })
    }

    pub fn windows(&self) -> Vec<Rc<OverlayWindow>> {
        self.windows.borrow().clone()
    }

    pub fn window(&self, screen: &str) -> Option<Rc<OverlayWindow>> {
        self.windows
            .borrow()
            .iter()
            .find(|w| w.screen == screen)
            .cloned()
    }

    /// Window under a global logical point
    pub fn window_at(&self, point: Point) -> Option<Rc<OverlayWindow>> {
        let name = screen_from_point(point, &self.screens.borrow())?.name.clone();
        self.window(&name)
    }

    /// Apply a new screen layout from the host.
    ///
    /// Windows of vanished screens are cancelled and closed, windows of changed
    /// screens follow the new geometry, and new screens get a window.
    pub fn refresh_screens(&self, screens: Vec<ScreenDescriptor>) {
        let previous = std::mem::take(&mut *self.windows.borrow_mut());
        let mut kept = Vec::with_capacity(screens.len());
        for window in previous {
            match screens.iter().find(|s| s.name == window.screen) {
                Some(screen) => {
                    window.coordinator.set_screen(screen.clone());
                    kept.push(window);
                }
                None => {
                    log::debug!("Screen {} disconnected, closing its overlay", window.screen);
                    close_window(&window, "screen disconnected");
                }
            }
        }
        for screen in &screens {
            if !kept.iter().any(|w| w.screen == screen.name) {
                log::debug!("Screen {} connected, opening an overlay", screen.name);
                kept.push(self.open_window(screen));
            }
        }
        *self.windows.borrow_mut() = kept;
        *self.screens.borrow_mut() = screens;
    }

    /// Publish events queued from other threads on every window
    pub fn pump_all(&self) -> usize {
        self.windows().iter().map(|w| w.pump()).sum()
    }

    /// Drive queued export/confirm actions of every window.
    ///
    /// Windows are polled together, a stalled delivery on one screen does not
    /// hold back the others.
    pub async fn run_pending_actions(&self) -> usize {
        let windows = self.windows();
        let runs: FuturesUnordered<_> = windows
            .iter()
            .map(|w| w.coordinator.run_pending_actions())
            .collect();
        runs.fold(0, |total, completed| async move { total + completed })
            .await
    }

    /// Toolbar placement for the selection on `screen`'s window
    pub fn toolbar_placement(&self, screen: &str, toolbar_size: Size) -> Option<ToolbarPlacement> {
        let window = self.window(screen)?;
        window.coordinator.toolbar_placement(
            toolbar_size,
            &self.screens.borrow(),
            self.config.toolbar_margin,
            self.config.screen_probe_inset,
        )
    }

    /// Cancel active sessions and close every window
    pub fn teardown(&self) {
        let windows = std::mem::take(&mut *self.windows.borrow_mut());
        if windows.is_empty() {
            return;
        }
        for window in &windows {
            close_window(window, "overlay closed");
        }
        self.set_ime_enabled(false);
        log::debug!("Closed {} overlay window(s)", windows.len());
    }
}

fn close_window(window: &OverlayWindow, reason: &str) {
    if window.coordinator.mode() != OverlayMode::Idle {
        window.coordinator.cancel(reason);
    }
    window.bus.clear_all();
}

impl OverlayHost for OverlayOrchestrator {
    fn set_ime_enabled(&self, enabled: bool) {
        if self.ime_enabled.replace(enabled) != enabled {
            log::debug!("IME {}", if enabled { "enabled" } else { "disabled" });
        }
    }
}
