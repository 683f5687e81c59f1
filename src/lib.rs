//! Mirador - selective call/exception tracing for instrumented hosts
//!
//! This library provides the core of a runtime tracing helper: subscribe
//! objects, classes, or modules to a registry, and every call, return, or
//! exception the host instrumentation reports for them is formatted into
//! plain-text lines and written atomically to a configurable output sink.
//! Satellite helpers cover source-location markers, named interval
//! timers, and variable dumps.
//!
//! The host's hooking mechanism is an external collaborator: the engine
//! depends only on the [`dispatcher::EventSource`] capability and the
//! `on_*` entry points of [`session::Session`], so any instrumentation
//! layer (or a deterministic test double) can drive it.

pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod event;
pub mod format;
pub mod registry;
pub mod session;
pub mod sink;
pub mod synthetic;
pub mod timer;
pub mod vars;

pub use dispatcher::{
    EventCategory, EventSource, FrameSkip, DEFAULT_CALLER_LOCATIONS, DEFAULT_KEYWORD_NAMES,
    DEFAULT_TRACE_CALLS, DEFAULT_TRACE_RESULTS,
};
pub use entity::{Entity, EntityId, Observed, Traceable};
pub use error::{Result, TraceError};
pub use event::{
    ArgBinding, CallEvent, ErrorInfo, ExceptionEvent, ExceptionPhase, Frame, Param, ParamKind,
};
pub use format::LineBlock;
pub use registry::Registry;
pub use session::Session;
pub use sink::OutputSink;
pub use synthetic::SyntheticSource;
pub use timer::{TimerKey, TimerStore};
pub use vars::{
    FiberProbe, InstanceProbe, LocalScope, ThreadProbe, ThreadStatus, ThreadVars, VarsView,
};
