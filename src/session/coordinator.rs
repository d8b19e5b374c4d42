//! Event coordinator for one overlay window
//!
//! The coordinator subscribes to every overlay event on the window's bus and
//! turns them into session mode changes, annotation layer edits, and capture
//! plus delivery of the selected region.
//!
//! Export and confirm are the only asynchronous steps. Their futures are queued
//! here and driven by [`EventCoordinator::run_pending_actions`] on the overlay
//! thread; cancelling the session aborts them at their next await point.

use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

use futures::StreamExt;
use futures::future::{AbortHandle, Abortable, FutureExt, LocalBoxFuture};
use futures::stream::FuturesUnordered;

use super::actions::{ActionHandler, CapturedRegion, OverlayHost};
use super::state::OverlaySession;
use crate::annotations::AnnotationLayer;
use crate::capture::CaptureService;
use crate::domain::{OverlayMode, Rect, ScreenDescriptor, Size};
use crate::error::OverlayError;
use crate::events::{
    AnnotationClicked, AnnotationCreated, CancelRequested, CaptureFailed, ClearRequested,
    ConfirmRequested, CopyRequested, DeleteRequested, DuplicateRequested, EventBus,
    ExportRequested, Handler, NudgeRequested, PasteRequested, RedoRequested, ReselectRequested,
    SelectAllRequested, SelectionChanged, SelectionFinished, SelectionStarted, TextEditEnded,
    TextEditStarted, ToolChanged, UndoRequested, handler,
};
use crate::placement::{ToolbarPlacement, ToolbarPositionContext, calculate_position};

type PendingAction = Abortable<LocalBoxFuture<'static, ()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Export,
    Confirm,
}

/// State reachable from bus handlers and queued actions
struct Shared {
    bus: Weak<EventBus>,
    session: RefCell<OverlaySession>,
    layer: RefCell<AnnotationLayer>,
    capture: CaptureService,
    actions: Rc<dyn ActionHandler>,
    host: RefCell<Option<Weak<dyn OverlayHost>>>,
    ime_enabled: Cell<bool>,
    pending: RefCell<FuturesUnordered<PendingAction>>,
    abort_handles: RefCell<Vec<AbortHandle>>,
}

pub struct EventCoordinator {
    shared: Rc<Shared>,
    bus: Rc<EventBus>,
    subscriptions: Vec<Box<dyn Fn(&EventBus) -> bool>>,
}

impl EventCoordinator {
    /// Create the coordinator and subscribe it to every overlay event on `bus`
    pub fn new(
        bus: Rc<EventBus>,
        session: OverlaySession,
        layer: AnnotationLayer,
        capture: CaptureService,
        actions: Rc<dyn ActionHandler>,
    ) -> Self {
        let shared = Rc::new(Shared {
            bus: Rc::downgrade(&bus),
            session: RefCell::new(session),
            layer: RefCell::new(layer),
            capture,
            actions,
            host: RefCell::new(None),
            ime_enabled: Cell::new(false),
            pending: RefCell::new(FuturesUnordered::new()),
            abort_handles: RefCell::new(Vec::new()),
        });
        let mut coordinator = Self {
            shared,
            bus,
            subscriptions: Vec::new(),
        };

        // ====================================================================
        // Selection
        // ====================================================================
        coordinator.wire(Shared::on_selection_started);
        coordinator.wire(Shared::on_selection_changed);
        coordinator.wire(Shared::on_selection_finished);
        coordinator.wire(Shared::on_reselect);

        // ====================================================================
        // Annotation editing
        // ====================================================================
        coordinator.wire(Shared::on_tool_changed);
        coordinator.wire(Shared::on_annotation_created);
        coordinator.wire(Shared::on_undo);
        coordinator.wire(Shared::on_redo);
        coordinator.wire(Shared::on_delete);
        coordinator.wire(Shared::on_clear);
        coordinator.wire(Shared::on_select_all);
        coordinator.wire(Shared::on_nudge);
        coordinator.wire(Shared::on_copy);
        coordinator.wire(Shared::on_paste);
        coordinator.wire(Shared::on_duplicate);
        coordinator.wire(Shared::on_annotation_clicked);
        coordinator.wire(Shared::on_text_edit_started);
        coordinator.wire(Shared::on_text_edit_ended);

        // ====================================================================
        // Output
        // ====================================================================
        coordinator.wire(Shared::on_export);
        coordinator.wire(Shared::on_confirm);
        coordinator.wire(Shared::on_cancel);

        coordinator
    }

    fn wire<T: 'static>(&mut self, on_event: fn(&Rc<Shared>, &T) -> anyhow::Result<()>) {
        let weak = Rc::downgrade(&self.shared);
        let h: Handler<T> = handler(move |event: &T| match weak.upgrade() {
            Some(shared) => on_event(&shared, event),
            None => Ok(()),
        });
        self.bus.subscribe(&h);
        self.subscriptions
            .push(Box::new(move |bus: &EventBus| bus.unsubscribe(&h)));
    }

    /// Attach the orchestrator that owns this window
    pub fn set_orchestrator(&self, host: Weak<dyn OverlayHost>) {
        *self.shared.host.borrow_mut() = Some(host);
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn mode(&self) -> OverlayMode {
        self.shared.session.borrow().mode()
    }

    pub fn session(&self) -> Ref<'_, OverlaySession> {
        self.shared.session.borrow()
    }

    pub fn layer(&self) -> Ref<'_, AnnotationLayer> {
        self.shared.layer.borrow()
    }

    /// Snapshot this window's screen if not done yet. Returns false when no
    /// frozen background is available afterwards.
    pub fn freeze_background(&self) -> bool {
        self.shared.freeze_background()
    }

    /// Follow a geometry change of this window's screen.
    ///
    /// A synced selection is not valid on the new geometry, so an annotating
    /// or exporting session is cancelled when the screen actually changed.
    pub fn set_screen(&self, screen: ScreenDescriptor) {
        let changed = *self.shared.session.borrow().screen() != screen;
        let active = matches!(
            self.mode(),
            OverlayMode::Annotating | OverlayMode::Exporting
        );
        if changed && active {
            self.shared.cancel("screen changed");
        }
        self.shared.session.borrow_mut().set_screen(screen);
    }

    /// Where the toolbar goes for the visible selection, `None` without one
    pub fn toolbar_placement(
        &self,
        toolbar_size: Size,
        screens: &[ScreenDescriptor],
        margin: f64,
        probe_inset: f64,
    ) -> Option<ToolbarPlacement> {
        let session = self.shared.session.borrow();
        let selection = session.visible_selection()?;
        let ctx = ToolbarPositionContext::new(
            selection,
            toolbar_size,
            session.window_position(),
            screens,
            margin,
        )
        .with_probe_inset(probe_inset);
        Some(calculate_position(&ctx))
    }

    /// Abort in-flight actions and end the session
    pub fn cancel(&self, reason: &str) {
        self.shared.cancel(reason);
    }

    pub fn pending_actions(&self) -> usize {
        self.shared.pending.borrow().len()
    }

    /// Drive queued export/confirm actions until none are left.
    ///
    /// Returns how many ran to completion; aborted ones are not counted.
    pub async fn run_pending_actions(&self) -> usize {
        let mut completed = 0;
        loop {
            // Actions may queue more actions, so drain in batches
            let mut batch = self.shared.pending.take();
            if batch.is_empty() {
                break;
            }
            while let Some(outcome) = batch.next().await {
                match outcome {
                    Ok(()) => completed += 1,
                    Err(_aborted) => log::debug!("Pending action aborted"),
                }
            }
        }
        self.shared.abort_handles.borrow_mut().clear();
        completed
    }

    /// Unsubscribe from the bus. Safe to call more than once.
    pub fn detach(&mut self) {
        for unsubscribe in self.subscriptions.drain(..) {
            unsubscribe(&self.bus);
        }
    }
}

impl Drop for EventCoordinator {
    fn drop(&mut self) {
        self.detach();
    }
}

impl Shared {
    fn mode(&self) -> OverlayMode {
        self.session.borrow().mode()
    }

    /// Editing events only apply while annotating
    fn annotating(&self, what: &str) -> bool {
        let mode = self.mode();
        if mode != OverlayMode::Annotating {
            log::debug!("Ignoring {} in {:?}", what, mode);
            return false;
        }
        true
    }

    fn freeze_background(&self) -> bool {
        if self.session.borrow().frozen_background().is_some() {
            return true;
        }
        let screen = self.session.borrow().screen().clone();
        let frozen = self.capture.freeze_screen(&screen);
        let frozen_ok = frozen.is_some();
        self.session.borrow_mut().set_frozen_background(frozen);
        frozen_ok
    }

    fn set_ime(&self, enabled: bool) {
        if self.ime_enabled.replace(enabled) == enabled {
            return;
        }
        let host = self.host.borrow().as_ref().and_then(Weak::upgrade);
        match host {
            Some(host) => host.set_ime_enabled(enabled),
            None => log::debug!("No orchestrator attached for IME toggle"),
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    fn on_selection_started(self: &Rc<Self>, event: &SelectionStarted) -> anyhow::Result<()> {
        match self.mode() {
            OverlayMode::Idle => self.session.borrow_mut().switch_mode(OverlayMode::Selecting)?,
            OverlayMode::Selecting => {}
            other => {
                log::debug!("Ignoring selection start in {:?}", other);
                return Ok(());
            }
        }
        if !self.freeze_background() {
            log::warn!("No frozen background, exports will capture live");
        }
        let origin = event.origin;
        self.session
            .borrow_mut()
            .update_selection(Rect::from_points(origin, origin));
        Ok(())
    }

    fn on_selection_changed(self: &Rc<Self>, event: &SelectionChanged) -> anyhow::Result<()> {
        let mut session = self.session.borrow_mut();
        if session.mode() != OverlayMode::Selecting {
            log::debug!("Ignoring selection change in {:?}", session.mode());
            return Ok(());
        }
        session.update_selection(event.rect);
        Ok(())
    }

    fn on_selection_finished(self: &Rc<Self>, event: &SelectionFinished) -> anyhow::Result<()> {
        let mut session = self.session.borrow_mut();
        if session.mode() != OverlayMode::Selecting {
            log::debug!("Ignoring selection finish in {:?}", session.mode());
            return Ok(());
        }
        // The mode switch validates against the stored selection, so it must
        // be synced first
        session.sync_selection(event.rect);
        match session.switch_mode(OverlayMode::Annotating) {
            Ok(()) => Ok(()),
            Err(OverlayError::EmptySelection(_)) => {
                log::debug!("Selection {:?} is empty, still selecting", event.rect);
                session.clear_selection();
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn on_reselect(self: &Rc<Self>, _: &ReselectRequested) -> anyhow::Result<()> {
        if !self.annotating("reselect") {
            return Ok(());
        }
        self.session.borrow_mut().switch_mode(OverlayMode::Selecting)?;
        Ok(())
    }

    // ========================================================================
    // Annotation editing
    // ========================================================================

    fn on_tool_changed(self: &Rc<Self>, event: &ToolChanged) -> anyhow::Result<()> {
        self.layer.borrow_mut().set_tool(event.tool);
        Ok(())
    }

    fn on_annotation_created(self: &Rc<Self>, event: &AnnotationCreated) -> anyhow::Result<()> {
        if !self.annotating("new annotation") {
            return Ok(());
        }
        let id = self.layer.borrow_mut().add(event.kind.clone())?;
        log::debug!("Added {} {}", event.kind.name(), id);
        Ok(())
    }

    fn on_undo(self: &Rc<Self>, _: &UndoRequested) -> anyhow::Result<()> {
        if self.annotating("undo") {
            if self.layer.borrow_mut().undo() {
                log::debug!("Undo applied");
            } else {
                log::debug!("Nothing to undo");
            }
        }
        Ok(())
    }

    fn on_redo(self: &Rc<Self>, _: &RedoRequested) -> anyhow::Result<()> {
        if self.annotating("redo") {
            if self.layer.borrow_mut().redo() {
                log::debug!("Redo applied");
            } else {
                log::debug!("Nothing to redo");
            }
        }
        Ok(())
    }

    fn on_delete(self: &Rc<Self>, _: &DeleteRequested) -> anyhow::Result<()> {
        if self.annotating("delete") {
            let removed = self.layer.borrow_mut().delete_selected()?;
            log::debug!("Deleted {} annotation(s)", removed);
        }
        Ok(())
    }

    fn on_clear(self: &Rc<Self>, _: &ClearRequested) -> anyhow::Result<()> {
        if self.annotating("clear") {
            let removed = self.layer.borrow_mut().clear()?;
            log::debug!("Cleared {} annotation(s)", removed);
        }
        Ok(())
    }

    fn on_select_all(self: &Rc<Self>, _: &SelectAllRequested) -> anyhow::Result<()> {
        if self.annotating("select all") {
            self.layer.borrow_mut().select_all();
        }
        Ok(())
    }

    fn on_nudge(self: &Rc<Self>, event: &NudgeRequested) -> anyhow::Result<()> {
        if self.annotating("nudge") {
            self.layer
                .borrow_mut()
                .nudge(event.dx, event.dy, event.large)?;
        }
        Ok(())
    }

    fn on_copy(self: &Rc<Self>, _: &CopyRequested) -> anyhow::Result<()> {
        if self.annotating("copy") {
            let copied = self.layer.borrow_mut().copy();
            log::debug!("Copied {} annotation(s)", copied);
        }
        Ok(())
    }

    fn on_paste(self: &Rc<Self>, _: &PasteRequested) -> anyhow::Result<()> {
        if self.annotating("paste") {
            self.layer.borrow_mut().paste()?;
        }
        Ok(())
    }

    fn on_duplicate(self: &Rc<Self>, _: &DuplicateRequested) -> anyhow::Result<()> {
        if self.annotating("duplicate") {
            self.layer.borrow_mut().duplicate()?;
        }
        Ok(())
    }

    fn on_annotation_clicked(self: &Rc<Self>, event: &AnnotationClicked) -> anyhow::Result<()> {
        if self.annotating("click") {
            self.layer.borrow_mut().select_at(event.point, event.extend);
        }
        Ok(())
    }

    fn on_text_edit_started(self: &Rc<Self>, event: &TextEditStarted) -> anyhow::Result<()> {
        if !self.annotating("text edit") {
            return Ok(());
        }
        self.layer.borrow_mut().begin_text_edit(event.id)?;
        self.set_ime(true);
        Ok(())
    }

    fn on_text_edit_ended(self: &Rc<Self>, event: &TextEditEnded) -> anyhow::Result<()> {
        let result = self
            .layer
            .borrow_mut()
            .end_text_edit(event.id, event.text.clone());
        // Always leave IME mode, even if the commit failed
        self.set_ime(false);
        result
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn on_export(self: &Rc<Self>, _: &ExportRequested) -> anyhow::Result<()> {
        self.start_action(ActionKind::Export)
    }

    fn on_confirm(self: &Rc<Self>, _: &ConfirmRequested) -> anyhow::Result<()> {
        self.start_action(ActionKind::Confirm)
    }

    fn on_cancel(self: &Rc<Self>, event: &CancelRequested) -> anyhow::Result<()> {
        self.cancel(&event.reason);
        Ok(())
    }

    /// Capture the selection and queue its delivery
    fn start_action(self: &Rc<Self>, kind: ActionKind) -> anyhow::Result<()> {
        let mode = self.session.borrow().mode();
        if mode != OverlayMode::Annotating {
            log::debug!("{:?} ignored in {:?} mode", kind, mode);
            return Ok(());
        }
        self.session.borrow_mut().switch_mode(OverlayMode::Exporting)?;

        let (selection, region) = {
            let session = self.session.borrow();
            let selection = session
                .selection()
                .ok_or(OverlayError::EmptySelection(OverlayMode::Exporting))?;
            let annotations = self.layer.borrow().snapshot();
            let image = self.capture.capture_region(
                selection,
                session.screen(),
                session.frozen_background(),
                &annotations,
            );
            let region = image.map(|image| CapturedRegion {
                screen: session.screen().name.clone(),
                selection,
                global: session.global_selection().unwrap_or(selection),
                image,
            });
            (selection, region)
        };

        let Some(region) = region else {
            self.fail_action(kind, selection, "capture returned no image".to_string());
            return Ok(());
        };

        let delivery = match kind {
            ActionKind::Export => self.actions.handle_export(region),
            ActionKind::Confirm => self.actions.handle_confirm(region),
        };
        let weak = Rc::downgrade(self);
        let task = async move {
            let result = delivery.await;
            if let Some(shared) = weak.upgrade() {
                shared.finish_action(kind, selection, result);
            }
        }
        .boxed_local();

        let (abort, registration) = AbortHandle::new_pair();
        self.abort_handles.borrow_mut().push(abort);
        self.pending
            .borrow_mut()
            .push(Abortable::new(task, registration));
        log::debug!("{:?} of {:?} queued", kind, selection);
        Ok(())
    }

    fn finish_action(&self, kind: ActionKind, selection: Rect, result: anyhow::Result<()>) {
        if let Err(err) = result {
            self.fail_action(kind, selection, format!("{err:#}"));
            return;
        }
        let target = match kind {
            ActionKind::Export => OverlayMode::Annotating,
            ActionKind::Confirm => OverlayMode::Idle,
        };
        if target == OverlayMode::Idle {
            self.layer.borrow_mut().reset();
        }
        let switched = self.session.borrow_mut().switch_mode(target);
        match switched {
            Ok(()) => log::debug!("{:?} of {:?} delivered", kind, selection),
            Err(err) => log::error!("{:?} finished but session cannot switch: {}", kind, err),
        }
    }

    /// Log, return to annotating and notify the host
    fn fail_action(&self, kind: ActionKind, selection: Rect, message: String) {
        log::warn!("{:?} of {:?} failed: {}", kind, selection, message);
        let switched = self.session.borrow_mut().switch_mode(OverlayMode::Annotating);
        if let Err(err) = switched {
            log::error!("Cannot return to annotating after failed {:?}: {}", kind, err);
        }
        match self.bus.upgrade() {
            Some(bus) => {
                bus.publish(&CaptureFailed {
                    region: selection,
                    message,
                });
            }
            None => log::debug!("Bus is gone, capture failure not published"),
        }
    }

    fn cancel(&self, reason: &str) {
        let aborted = self.abort_handles.take();
        for handle in &aborted {
            handle.abort();
        }
        if !aborted.is_empty() {
            log::debug!("Aborted {} in-flight action(s)", aborted.len());
        }
        self.actions.handle_cancel(reason);
        self.set_ime(false);
        self.layer.borrow_mut().reset();
        let switched = self.session.borrow_mut().switch_mode(OverlayMode::Idle);
        if let Err(err) = switched {
            log::error!("Cancel could not reach idle: {}", err);
        }
        log::debug!("Session cancelled: {}", reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::StaticCaptureStrategy;
    use crate::config::EngineConfig;
    use crate::domain::{
        AnnotationId, AnnotationKind, Point, RedactAnnotation, TextAnnotation, Tool,
    };
    use crate::render::DirtyRegionRenderer;
    use anyhow::anyhow;
    use futures::future;

    #[derive(Default)]
    struct Actions {
        exports: RefCell<Vec<(u32, u32)>>,
        confirms: RefCell<Vec<(u32, u32)>>,
        cancels: RefCell<Vec<String>>,
        fail: Cell<bool>,
        hang: Cell<bool>,
    }

    impl Actions {
        fn outcome(&self) -> LocalBoxFuture<'static, anyhow::Result<()>> {
            if self.hang.get() {
                future::pending().boxed_local()
            } else if self.fail.get() {
                future::ready(Err(anyhow!("disk full"))).boxed_local()
            } else {
                future::ready(Ok(())).boxed_local()
            }
        }
    }

    impl ActionHandler for Actions {
        fn handle_export(&self, region: CapturedRegion) -> LocalBoxFuture<'static, anyhow::Result<()>> {
            self.exports.borrow_mut().push(region.image.dimensions());
            self.outcome()
        }

        fn handle_confirm(&self, region: CapturedRegion) -> LocalBoxFuture<'static, anyhow::Result<()>> {
            self.confirms.borrow_mut().push(region.image.dimensions());
            self.outcome()
        }

        fn handle_cancel(&self, reason: &str) {
            self.cancels.borrow_mut().push(reason.to_string());
        }
    }

    #[derive(Default)]
    struct Host {
        ime: RefCell<Vec<bool>>,
    }

    impl OverlayHost for Host {
        fn set_ime_enabled(&self, enabled: bool) {
            self.ime.borrow_mut().push(enabled);
        }
    }

    fn screen() -> ScreenDescriptor {
        ScreenDescriptor::new("main", Rect::new(0.0, 0.0, 400.0, 300.0), 2.0)
    }

    fn setup() -> (Rc<EventBus>, EventCoordinator, Rc<Actions>) {
        let bus = Rc::new(EventBus::new());
        let actions = Rc::new(Actions::default());
        let strategy = StaticCaptureStrategy::new()
            .with_screen("main", image::RgbaImage::new(800, 600));
        let coordinator = EventCoordinator::new(
            bus.clone(),
            OverlaySession::new(screen()),
            AnnotationLayer::new(
                &EngineConfig::default(),
                Box::new(DirtyRegionRenderer::new()),
            ),
            CaptureService::new(Rc::new(strategy)),
            actions.clone(),
        );
        (bus, coordinator, actions)
    }

    fn select(bus: &EventBus, rect: Rect) {
        bus.publish(&SelectionStarted {
            origin: rect.top_left(),
        });
        bus.publish(&SelectionChanged { rect });
        bus.publish(&SelectionFinished { rect });
    }

    fn redact() -> AnnotationKind {
        AnnotationKind::Redact(RedactAnnotation {
            start: Point::new(20.0, 20.0),
            end: Point::new(40.0, 40.0),
        })
    }

    #[test]
    fn test_selection_finish_enters_annotating() {
        let (bus, coordinator, _) = setup();
        let rect = Rect::from_xywh(10.0, 10.0, 100.0, 50.0);
        select(&bus, rect);
        assert_eq!(coordinator.mode(), OverlayMode::Annotating);
        assert_eq!(coordinator.session().selection(), Some(rect));
        assert!(coordinator.session().frozen_background().is_some());
    }

    #[test]
    fn test_click_without_drag_keeps_selecting() {
        let (bus, coordinator, _) = setup();
        let origin = Point::new(30.0, 30.0);
        bus.publish(&SelectionStarted { origin });
        bus.publish(&SelectionFinished {
            rect: Rect::from_points(origin, origin),
        });
        assert_eq!(coordinator.mode(), OverlayMode::Selecting);
        assert_eq!(coordinator.session().selection(), None);
    }

    #[test]
    fn test_editing_events_route_to_layer() {
        let (bus, coordinator, _) = setup();
        // Ignored before a selection exists
        bus.publish(&AnnotationCreated { kind: redact() });
        assert!(coordinator.layer().canvas().items().is_empty());

        select(&bus, Rect::from_xywh(0.0, 0.0, 200.0, 200.0));
        bus.publish(&ToolChanged { tool: Tool::Redact });
        bus.publish(&AnnotationCreated { kind: redact() });
        bus.publish(&AnnotationCreated { kind: redact() });
        assert_eq!(coordinator.layer().canvas().items().len(), 2);
        assert_eq!(coordinator.layer().tool(), Tool::Redact);

        bus.publish(&UndoRequested);
        assert_eq!(coordinator.layer().canvas().items().len(), 1);
        bus.publish(&RedoRequested);
        assert_eq!(coordinator.layer().canvas().items().len(), 2);

        bus.publish(&SelectAllRequested);
        bus.publish(&DuplicateRequested);
        assert_eq!(coordinator.layer().canvas().items().len(), 4);
        bus.publish(&DeleteRequested);
        assert_eq!(coordinator.layer().canvas().items().len(), 2);
        bus.publish(&ClearRequested);
        assert!(coordinator.layer().canvas().items().is_empty());
        bus.publish(&UndoRequested);
        assert_eq!(coordinator.layer().canvas().items().len(), 2);
    }

    #[test]
    fn test_text_editing_toggles_ime_on_host() {
        let (bus, coordinator, _) = setup();
        let host = Rc::new(Host::default());
        let dyn_host: Rc<dyn OverlayHost> = host.clone();
        coordinator.set_orchestrator(Rc::downgrade(&dyn_host));

        select(&bus, Rect::from_xywh(0.0, 0.0, 200.0, 200.0));
        bus.publish(&AnnotationCreated {
            kind: AnnotationKind::Text(TextAnnotation {
                origin: Point::new(10.0, 10.0),
                text: "hi".to_string(),
                font_size: 16.0,
                color: Default::default(),
                background: None,
            }),
        });
        let id = coordinator.layer().canvas().items().ids()[0];
        bus.publish(&TextEditStarted { id });
        bus.publish(&TextEditEnded {
            id,
            text: "hello".to_string(),
        });
        assert_eq!(*host.ime.borrow(), vec![true, false]);

        // Unknown id: handler error is logged, IME untouched
        bus.publish(&TextEditStarted {
            id: AnnotationId(999),
        });
        assert_eq!(host.ime.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_export_delivers_physical_pixels() {
        let (bus, coordinator, actions) = setup();
        select(&bus, Rect::from_xywh(10.0, 10.0, 100.0, 50.0));
        bus.publish(&AnnotationCreated { kind: redact() });

        bus.publish(&ExportRequested);
        assert_eq!(coordinator.mode(), OverlayMode::Exporting);
        assert_eq!(coordinator.pending_actions(), 1);

        assert_eq!(coordinator.run_pending_actions().await, 1);
        assert_eq!(*actions.exports.borrow(), vec![(200, 100)]);
        assert_eq!(coordinator.mode(), OverlayMode::Annotating);
        // Export keeps the annotations for further edits
        assert_eq!(coordinator.layer().canvas().items().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_export_notifies_and_returns_to_annotating() {
        let (bus, coordinator, actions) = setup();
        let failures = Rc::new(RefCell::new(Vec::new()));
        let seen = failures.clone();
        let on_failure: Handler<CaptureFailed> = handler(move |e: &CaptureFailed| {
            seen.borrow_mut().push(e.message.clone());
            Ok(())
        });
        bus.subscribe(&on_failure);

        select(&bus, Rect::from_xywh(10.0, 10.0, 100.0, 50.0));
        actions.fail.set(true);
        bus.publish(&ExportRequested);
        coordinator.run_pending_actions().await;

        assert_eq!(coordinator.mode(), OverlayMode::Annotating);
        assert_eq!(failures.borrow().len(), 1);
        assert!(failures.borrow()[0].contains("disk full"));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_export() {
        let (bus, coordinator, actions) = setup();
        select(&bus, Rect::from_xywh(10.0, 10.0, 100.0, 50.0));
        actions.hang.set(true);
        bus.publish(&ExportRequested);
        bus.publish(&CancelRequested {
            reason: "escape".to_string(),
        });

        assert_eq!(coordinator.run_pending_actions().await, 0);
        assert_eq!(*actions.cancels.borrow(), vec!["escape".to_string()]);
        assert_eq!(coordinator.mode(), OverlayMode::Idle);
        assert_eq!(coordinator.session().selection(), None);
    }

    #[tokio::test]
    async fn test_confirm_ends_session() {
        let (bus, coordinator, actions) = setup();
        select(&bus, Rect::from_xywh(10.0, 10.0, 100.0, 50.0));
        bus.publish(&AnnotationCreated { kind: redact() });
        bus.publish(&ConfirmRequested);
        assert_eq!(coordinator.run_pending_actions().await, 1);
        assert_eq!(actions.confirms.borrow().len(), 1);
        assert_eq!(coordinator.mode(), OverlayMode::Idle);
        assert!(coordinator.layer().canvas().items().is_empty());
    }

    #[test]
    fn test_export_outside_annotating_is_rejected() {
        let (bus, coordinator, actions) = setup();
        bus.publish(&ExportRequested);
        assert_eq!(coordinator.mode(), OverlayMode::Idle);
        assert_eq!(coordinator.pending_actions(), 0);
        assert!(actions.exports.borrow().is_empty());
    }

    #[test]
    fn test_requests_while_exporting_are_ignored() {
        let (bus, coordinator, actions) = setup();
        select(&bus, Rect::from_xywh(10.0, 10.0, 100.0, 50.0));
        actions.hang.set(true);
        bus.publish(&ExportRequested);
        bus.publish(&ExportRequested);
        bus.publish(&ConfirmRequested);

        assert_eq!(coordinator.mode(), OverlayMode::Exporting);
        assert_eq!(coordinator.pending_actions(), 1);
        assert_eq!(actions.exports.borrow().len(), 1);
        assert!(actions.confirms.borrow().is_empty());
    }

    #[test]
    fn test_toolbar_follows_selection() {
        let (bus, coordinator, _) = setup();
        let screens = [screen()];
        assert!(
            coordinator
                .toolbar_placement(Size::new(100.0, 20.0), &screens, 8.0, 2.0)
                .is_none()
        );
        select(&bus, Rect::from_xywh(10.0, 10.0, 150.0, 50.0));
        let placement = coordinator
            .toolbar_placement(Size::new(100.0, 20.0), &screens, 8.0, 2.0)
            .unwrap();
        assert_eq!(placement.position, Point::new(60.0, 68.0));
    }

    #[test]
    fn test_drop_unsubscribes_everything() {
        let (bus, coordinator, _) = setup();
        assert_eq!(bus.subscriber_count::<ExportRequested>(), 1);
        drop(coordinator);
        assert_eq!(bus.subscriber_count::<ExportRequested>(), 0);
        assert_eq!(bus.subscriber_count::<SelectionFinished>(), 0);
    }
}
