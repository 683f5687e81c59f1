//! Deterministic event source for tests and demos
//!
//! Stands in for a real host instrumentation hook: the session tells it
//! which categories it wants, and firing helpers forward synthesized
//! events only while the matching category is enabled, the same way a
//! deactivated host hook would simply never fire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dispatcher::{EventCategory, EventSource};
use crate::error::Result;
use crate::event::{CallEvent, ExceptionEvent};
use crate::session::Session;

#[derive(Default)]
pub struct SyntheticSource {
    calls: AtomicBool,
    returns: AtomicBool,
    exceptions: AtomicBool,
}

impl SyntheticSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn flag(&self, category: EventCategory) -> &AtomicBool {
        match category {
            EventCategory::Calls => &self.calls,
            EventCategory::Returns => &self.returns,
            EventCategory::Exceptions => &self.exceptions,
        }
    }

    pub fn is_enabled(&self, category: EventCategory) -> bool {
        self.flag(category).load(Ordering::Relaxed)
    }

    /// Fire a call event into the session, unless calls are disabled.
    pub fn fire_call(&self, session: &Session, event: &CallEvent) -> Result<()> {
        if !self.is_enabled(EventCategory::Calls) {
            return Ok(());
        }
        session.on_call(event)
    }

    /// Fire a return event, unless returns are disabled.
    pub fn fire_return(&self, session: &Session, event: &CallEvent) -> Result<()> {
        if !self.is_enabled(EventCategory::Returns) {
            return Ok(());
        }
        session.on_return(event)
    }

    /// Fire a raise, unless exception capture is disabled.
    pub fn fire_raise(&self, session: &Session, event: &ExceptionEvent) -> Result<()> {
        if !self.is_enabled(EventCategory::Exceptions) {
            return Ok(());
        }
        session.on_raise(event)
    }

    /// Fire a rescue, unless exception capture is disabled.
    pub fn fire_rescue(&self, session: &Session, event: &ExceptionEvent) -> Result<()> {
        if !self.is_enabled(EventCategory::Exceptions) {
            return Ok(());
        }
        session.on_rescue(event)
    }
}

impl EventSource for SyntheticSource {
    fn set_enabled(&self, category: EventCategory, enabled: bool) {
        self.flag(category).store(enabled, Ordering::Relaxed);
    }
}
