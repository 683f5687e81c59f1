//! Tracing session: the explicitly-constructed engine context
//!
//! All process-wide mutable state (subscriptions, toggles, output sink,
//! timer store) lives in one `Session` passed by reference wherever it is
//! needed; there is no ambient global. Cloning a session clones a handle
//! to the same engine.

use std::io::Write;
use std::sync::{Arc, PoisonError, RwLock};

use crate::dispatcher::{self, Dispatch, EventCategory, EventSource, ExceptionScope, FrameSkip};
use crate::entity::{Entity, EntityId, ProxyEntity};
use crate::error::{Result, TraceError};
use crate::event::{CallEvent, ExceptionEvent, Frame};
use crate::format::{self, LineBlock};
use crate::registry::Registry;
use crate::sink::{OutputSink, SinkCell};
use crate::timer::TimerStore;
use crate::vars;

struct SessionInner {
    registry: Registry,
    dispatch: Dispatch,
    timers: TimerStore,
    sink: SinkCell,
    source: RwLock<Option<Arc<dyn EventSource>>>,
}

/// Handle to one tracing engine instance.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// New session writing to standard error with default toggles.
    pub fn new() -> Self {
        let sink = SinkCell::new(OutputSink::stderr());
        let inner = Arc::new(SessionInner {
            registry: Registry::new(),
            dispatch: Dispatch::new(),
            timers: TimerStore::new(sink.clone()),
            sink,
            source: RwLock::new(None),
        });
        let session = Self { inner };
        session.refresh_exclusions();
        session
    }

    fn identity(&self) -> EntityId {
        EntityId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// The session's own identity as an entity. Offering it to `trace`
    /// is a silent no-op: the engine never observes itself.
    pub fn as_entity(&self) -> Entity {
        ProxyEntity::new(
            self.identity(),
            "Session",
            format!("#<mirador session {:#x}>", self.identity().as_usize()),
        )
    }

    fn refresh_exclusions(&self) {
        self.inner
            .registry
            .set_exclusions(vec![self.identity(), self.inner.sink.identity()]);
    }

    // --- output sink -----------------------------------------------------

    /// Replace the output sink. The writer is probed once; a target that
    /// cannot accept text fails with [`TraceError::Configuration`] and
    /// leaves the previous sink in place.
    pub fn set_output(&self, writer: impl Write + Send + 'static) -> Result<()> {
        let sink = OutputSink::new(writer);
        sink.probe().map_err(TraceError::Configuration)?;
        self.inner.sink.replace(sink);
        self.refresh_exclusions();
        tracing::debug!("output sink replaced");
        Ok(())
    }

    /// Handle to the current sink.
    pub fn output(&self) -> OutputSink {
        self.inner.sink.current()
    }

    // --- toggles ---------------------------------------------------------

    pub fn caller_locations(&self) -> bool {
        self.inner.dispatch.caller_locations()
    }

    pub fn set_caller_locations(&self, enabled: bool) {
        self.inner.dispatch.set_caller_locations(enabled);
    }

    pub fn trace_calls(&self) -> bool {
        self.inner.dispatch.trace_calls()
    }

    pub fn set_trace_calls(&self, enabled: bool) {
        self.inner.dispatch.set_trace_calls(enabled);
        self.notify_source(EventCategory::Calls, enabled);
    }

    pub fn trace_results(&self) -> bool {
        self.inner.dispatch.trace_results()
    }

    pub fn set_trace_results(&self, enabled: bool) {
        self.inner.dispatch.set_trace_results(enabled);
        self.notify_source(EventCategory::Returns, enabled);
    }

    /// Render keyword argument names in signature lines. Off by default:
    /// keyword arguments print their values only, in declared order.
    pub fn keyword_names(&self) -> bool {
        self.inner.dispatch.keyword_names()
    }

    pub fn set_keyword_names(&self, enabled: bool) {
        self.inner.dispatch.set_keyword_names(enabled);
    }

    /// Replace the predicate that classifies stack frames as engine
    /// internals during call-site attribution.
    pub fn set_frame_skip(&self, skip: FrameSkip) {
        self.inner.dispatch.set_frame_skip(skip);
    }

    // --- host instrumentation --------------------------------------------

    /// Attach the host-side hook and synchronize it with the current
    /// toggle state.
    pub fn attach_source(&self, source: Arc<dyn EventSource>) {
        source.set_enabled(EventCategory::Calls, self.trace_calls());
        source.set_enabled(EventCategory::Returns, self.trace_results());
        source.set_enabled(
            EventCategory::Exceptions,
            self.inner.dispatch.exceptions_enabled(),
        );
        *self
            .inner
            .source
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(source);
    }

    fn current_source(&self) -> Option<Arc<dyn EventSource>> {
        self.inner
            .source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn notify_source(&self, category: EventCategory, enabled: bool) {
        if let Some(source) = self.current_source() {
            source.set_enabled(category, enabled);
        }
    }

    /// Host entry point for call firings.
    pub fn on_call(&self, event: &CallEvent) -> Result<()> {
        dispatcher::dispatch_call(&self.inner.dispatch, &self.inner.registry, &self.inner.sink, event)
    }

    /// Host entry point for return firings.
    pub fn on_return(&self, event: &CallEvent) -> Result<()> {
        dispatcher::dispatch_return(&self.inner.dispatch, &self.inner.registry, &self.inner.sink, event)
    }

    /// Host entry point for raises.
    pub fn on_raise(&self, event: &ExceptionEvent) -> Result<()> {
        dispatcher::dispatch_exception(&self.inner.dispatch, &self.inner.sink, event)
    }

    /// Host entry point for rescues.
    pub fn on_rescue(&self, event: &ExceptionEvent) -> Result<()> {
        dispatcher::dispatch_exception(&self.inner.dispatch, &self.inner.sink, event)
    }

    // --- subscriptions ----------------------------------------------------

    /// Trace an entity until it is untraced. Returns the entity.
    pub fn trace(&self, entity: Entity) -> Entity {
        self.inner.registry.add(entity)
    }

    pub fn trace_all(&self, entities: &[Entity]) -> Vec<Entity> {
        self.inner.registry.add_all(entities)
    }

    /// Trace an entity only for the extent of `body`. An entity that was
    /// already traced stays traced afterward.
    pub fn trace_scoped<R>(&self, entity: Entity, body: impl FnOnce() -> R) -> R {
        self.inner.registry.add_scoped(entity, body)
    }

    pub fn trace_all_scoped<R>(&self, entities: &[Entity], body: impl FnOnce() -> R) -> R {
        self.inner.registry.add_all_scoped(entities, body)
    }

    pub fn traced(&self, entity: &Entity) -> bool {
        self.inner.registry.contains_entity(entity)
    }

    /// Stop tracing one entity, returning it if it was traced.
    pub fn untrace(&self, entity: &Entity) -> Option<Entity> {
        self.inner.registry.remove(entity)
    }

    pub fn untrace_many(&self, entities: &[Entity]) -> Vec<Entity> {
        self.inner.registry.remove_all(entities)
    }

    /// Stop tracing everything. Idempotent.
    pub fn untrace_all(&self) -> &Self {
        self.inner.registry.clear();
        self
    }

    // --- exception capture -------------------------------------------------

    /// Capture raises and rescues for the extent of `body`. The prior
    /// enabled/location mode is restored exactly afterward, however
    /// deeply calls nest and even if `body` unwinds.
    pub fn trace_exceptions<R>(&self, with_locations: bool, body: impl FnOnce() -> R) -> R {
        let _scope = ExceptionScope::enter(
            &self.inner.dispatch,
            with_locations,
            self.current_source(),
        );
        body()
    }

    // --- markers ------------------------------------------------------------

    /// Emit a `* path:line` marker for the call site.
    #[track_caller]
    pub fn here(&self) -> Result<()> {
        let frame = Frame::caller();
        let mut block = LineBlock::new();
        block.push(format::marker_line(&frame));
        self.inner.sink.write_block(&block)
    }

    /// Emit the marker only when `condition` holds; returns `condition`.
    #[track_caller]
    pub fn here_if(&self, condition: bool) -> Result<bool> {
        if condition {
            let frame = Frame::caller();
            let mut block = LineBlock::new();
            block.push(format::marker_line(&frame));
            self.inner.sink.write_block(&block)?;
        }
        Ok(condition)
    }

    /// Evaluate `check` and emit the marker when it returns true; returns
    /// the check's result.
    #[track_caller]
    pub fn here_check(&self, check: impl FnOnce() -> bool) -> Result<bool> {
        let frame = Frame::caller();
        let hit = check();
        if hit {
            let mut block = LineBlock::new();
            block.push(format::marker_line(&frame));
            self.inner.sink.write_block(&block)?;
        }
        Ok(hit)
    }

    // --- satellite components ------------------------------------------------

    /// The session's timer store.
    pub fn timers(&self) -> &TimerStore {
        &self.inner.timers
    }

    /// Dump whatever variables `target` exposes and hand it back. A
    /// target with no dump capability yields a best-effort error line,
    /// never an `Err`; only sink write failures fail. A currently-traced
    /// target is suppressed from the registry while its attributes are
    /// read, then restored, so the dump cannot trace itself.
    #[track_caller]
    pub fn vars<'a>(&self, target: &'a Entity) -> Result<&'a Entity> {
        let caller = Frame::caller();
        let suppressed = self.inner.registry.remove(target);
        let block = vars::dump_block(target.vars_view(), &caller);
        let outcome = self.inner.sink.write_block(&block);
        if let Some(entity) = suppressed {
            self.inner.registry.add(entity);
        }
        outcome?;
        Ok(target)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
