//! Event dispatch: from host instrumentation firings to emitted lines
//!
//! Each event category (calls, returns, exceptions) toggles independently.
//! A disabled category is forwarded to the host's [`EventSource`] so the
//! hook itself can be deactivated and cost nothing. An enabled category
//! filters every firing through the subscription registry and the
//! self-instrumentation guard before formatting anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use regex::RegexSet;

use crate::error::Result;
use crate::event::{CallEvent, ExceptionEvent};
use crate::format::{self, LineBlock};
use crate::registry::Registry;
use crate::sink::SinkCell;

/// Calls are reported out of the box; return values and exceptions are
/// opt-in.
pub const DEFAULT_TRACE_CALLS: bool = true;
pub const DEFAULT_TRACE_RESULTS: bool = false;
pub const DEFAULT_CALLER_LOCATIONS: bool = true;
pub const DEFAULT_KEYWORD_NAMES: bool = false;

/// The three independently toggled event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Calls,
    Returns,
    Exceptions,
}

/// Host-side instrumentation hook. The engine only ever tells the host
/// which categories it currently wants; the host fires events back
/// through the session's `on_*` entry points. A synthetic implementation
/// drives the engine deterministically in tests and demos.
pub trait EventSource: Send + Sync {
    fn set_enabled(&self, category: EventCategory, enabled: bool);
}

/// Predicate deciding which stack frames belong to the engine itself (or
/// other wrapper code) and must be skipped during call-site attribution.
/// The exact skip list is host-specific, so it is plain data: a set of
/// path patterns, replaceable wholesale.
#[derive(Debug, Clone)]
pub struct FrameSkip {
    patterns: RegexSet,
}

impl FrameSkip {
    pub fn new<I, S>(patterns: I) -> std::result::Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    /// Matches nothing; every frame counts as a genuine caller.
    pub fn none() -> Self {
        Self {
            patterns: RegexSet::empty(),
        }
    }

    /// Skips frames from this crate's own source tree.
    pub fn engine_default() -> Self {
        Self::new([r"(^|[/\\])mirador[/\\]src[/\\]"]).unwrap_or_else(|_| Self::none())
    }

    pub fn is_internal(&self, path: &str) -> bool {
        self.patterns.is_match(path)
    }
}

impl Default for FrameSkip {
    fn default() -> Self {
        Self::engine_default()
    }
}

/// Exception capture is scoped, not latched: the flag pair is saved and
/// restored around each `trace_exceptions` extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExceptionMode {
    pub enabled: bool,
    pub with_locations: bool,
}

/// Toggle state shared by all dispatch paths.
pub(crate) struct Dispatch {
    trace_calls: AtomicBool,
    trace_results: AtomicBool,
    caller_locations: AtomicBool,
    keyword_names: AtomicBool,
    exceptions: Mutex<ExceptionMode>,
    skip: RwLock<FrameSkip>,
}

impl Dispatch {
    pub(crate) fn new() -> Self {
        Self {
            trace_calls: AtomicBool::new(DEFAULT_TRACE_CALLS),
            trace_results: AtomicBool::new(DEFAULT_TRACE_RESULTS),
            caller_locations: AtomicBool::new(DEFAULT_CALLER_LOCATIONS),
            keyword_names: AtomicBool::new(DEFAULT_KEYWORD_NAMES),
            exceptions: Mutex::new(ExceptionMode {
                enabled: false,
                with_locations: true,
            }),
            skip: RwLock::new(FrameSkip::engine_default()),
        }
    }

    pub(crate) fn trace_calls(&self) -> bool {
        self.trace_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn set_trace_calls(&self, enabled: bool) {
        self.trace_calls.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn trace_results(&self) -> bool {
        self.trace_results.load(Ordering::Relaxed)
    }

    pub(crate) fn set_trace_results(&self, enabled: bool) {
        self.trace_results.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn caller_locations(&self) -> bool {
        self.caller_locations.load(Ordering::Relaxed)
    }

    pub(crate) fn set_caller_locations(&self, enabled: bool) {
        self.caller_locations.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn keyword_names(&self) -> bool {
        self.keyword_names.load(Ordering::Relaxed)
    }

    pub(crate) fn set_keyword_names(&self, enabled: bool) {
        self.keyword_names.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn exceptions_enabled(&self) -> bool {
        self.exception_mode().enabled
    }

    pub(crate) fn exception_mode(&self) -> ExceptionMode {
        *self.lock_exceptions()
    }

    fn lock_exceptions(&self) -> MutexGuard<'_, ExceptionMode> {
        self.exceptions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_frame_skip(&self, skip: FrameSkip) {
        *self.skip.write().unwrap_or_else(PoisonError::into_inner) = skip;
    }

    pub(crate) fn frame_skip(&self) -> FrameSkip {
        self.skip
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Enables exception capture for one dynamic extent, restoring the prior
/// mode (and the host hook state) exactly on drop, unwinding included.
/// Nesting to any depth is safe: each scope restores what it saw.
pub(crate) struct ExceptionScope<'a> {
    dispatch: &'a Dispatch,
    prior: ExceptionMode,
    source: Option<Arc<dyn EventSource>>,
}

impl<'a> ExceptionScope<'a> {
    pub(crate) fn enter(
        dispatch: &'a Dispatch,
        with_locations: bool,
        source: Option<Arc<dyn EventSource>>,
    ) -> Self {
        let prior = {
            let mut mode = dispatch.lock_exceptions();
            let prior = *mode;
            *mode = ExceptionMode {
                enabled: true,
                with_locations,
            };
            prior
        };
        if let Some(src) = &source {
            src.set_enabled(EventCategory::Exceptions, true);
        }
        tracing::debug!(with_locations, "exception tracing scope entered");
        Self {
            dispatch,
            prior,
            source,
        }
    }
}

impl Drop for ExceptionScope<'_> {
    fn drop(&mut self) {
        *self.dispatch.lock_exceptions() = self.prior;
        if let Some(src) = &self.source {
            src.set_enabled(EventCategory::Exceptions, self.prior.enabled);
        }
        tracing::debug!("exception tracing scope restored");
    }
}

/// Report a call event if its receiver is subscribed and it did not
/// originate inside the engine.
pub(crate) fn dispatch_call(
    dispatch: &Dispatch,
    registry: &Registry,
    sink: &SinkCell,
    event: &CallEvent,
) -> Result<()> {
    if !dispatch.trace_calls() {
        return Ok(());
    }
    emit_call(dispatch, registry, sink, event, '>', false)
}

/// Report a return event, including the rendered return value.
pub(crate) fn dispatch_return(
    dispatch: &Dispatch,
    registry: &Registry,
    sink: &SinkCell,
    event: &CallEvent,
) -> Result<()> {
    if !dispatch.trace_results() {
        return Ok(());
    }
    emit_call(dispatch, registry, sink, event, '<', true)
}

fn emit_call(
    dispatch: &Dispatch,
    registry: &Registry,
    sink: &SinkCell,
    event: &CallEvent,
    marker: char,
    include_result: bool,
) -> Result<()> {
    if !registry.contains(event.receiver.identity()) {
        return Ok(());
    }
    let skip = dispatch.frame_skip();
    if let Some(origin) = event.stack.first() {
        if skip.is_internal(&origin.path) {
            return Ok(());
        }
    }

    let mut block = LineBlock::new();
    block.push(format::signature_line(event, marker, dispatch.keyword_names()));
    if dispatch.caller_locations() {
        if let Some(site) = event.stack.iter().find(|f| !skip.is_internal(&f.path)) {
            block.push(format::call_site_line(site));
        }
    }
    if include_result {
        if let Some(value) = &event.returned {
            block.push(format::result_line(value));
        }
    }
    sink.write_block(&block)
}

/// Report a raise or rescue while exception capture is enabled.
/// Exceptions carry no receiver, so only the toggle and the
/// self-instrumentation guard gate them.
pub(crate) fn dispatch_exception(
    dispatch: &Dispatch,
    sink: &SinkCell,
    event: &ExceptionEvent,
) -> Result<()> {
    let mode = dispatch.exception_mode();
    if !mode.enabled {
        return Ok(());
    }
    if dispatch.frame_skip().is_internal(&event.location.path) {
        return Ok(());
    }
    let block = format::exception_block(event, mode.with_locations);
    sink.write_block(&block)
}
