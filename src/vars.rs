//! Variable inspection: dump what an entity can show about itself
//!
//! Targets expose at most one of four capabilities through
//! [`VarsView`](crate::vars::VarsView): a lexical binding, a thread, a
//! fiber, or a plain set of instance attributes. Anything else gets a
//! best-effort error line in the output stream rather than an error
//! value; the dump helper always hands its target back.

use std::sync::Arc;

use crate::entity::{Entity, Traceable};
use crate::event::Frame;
use crate::format::{self, LineBlock};

/// What a variable-dump target exposes. Pair names are already rendered
/// to text by the host; the inspector only sorts and lays them out.
#[derive(Debug, Clone)]
pub enum VarsView {
    /// A reified lexical scope: local variables plus the scope's own
    /// recorded source location.
    Binding {
        location: Frame,
        locals: Vec<(String, String)>,
    },
    /// A thread with status, identifiers, and two variable scopes.
    Thread(ThreadVars),
    /// A fiber with key/value storage. Only the currently-running fiber
    /// can be inspected.
    Fiber {
        current: bool,
        storage: Vec<(String, String)>,
        repr: String,
    },
    /// An enumerable set of instance-level attributes.
    Instance { fields: Vec<(String, String)> },
    /// No supported capability.
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Running,
    Sleeping,
    Aborted,
    Terminated,
}

impl ThreadStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Aborted => "aborted",
            Self::Terminated => "terminated",
        }
    }
}

/// Snapshot of a thread's inspectable state.
#[derive(Debug, Clone)]
pub struct ThreadVars {
    pub status: ThreadStatus,
    /// OS-level id when the host can supply one.
    pub native_id: Option<u64>,
    /// Host-assigned fallback identifier, used when no native id exists.
    pub fallback_id: u64,
    pub name: Option<String>,
    pub fiber_locals: Vec<(String, String)>,
    pub thread_vars: Vec<(String, String)>,
}

/// Lay out one dump block. The binding branch heads the block with the
/// binding's own location; every other branch uses the caller's.
pub(crate) fn dump_block(view: VarsView, caller: &Frame) -> LineBlock {
    let mut block = LineBlock::new();
    match view {
        VarsView::Binding { location, locals } => {
            block.push(format::marker_line(&location));
            block.push("  local variables");
            push_sorted_pairs(&mut block, locals);
        }
        VarsView::Thread(thread) => {
            block.push(format::marker_line(caller));
            block.push(thread_header(&thread));
            if !thread.fiber_locals.is_empty() {
                block.push("  fiber-local variables");
                push_sorted_pairs(&mut block, thread.fiber_locals);
            }
            block.push("  thread variables");
            if thread.thread_vars.is_empty() {
                block.push("    none");
            } else {
                push_sorted_pairs(&mut block, thread.thread_vars);
            }
        }
        VarsView::Fiber {
            current: false,
            repr,
            ..
        } => {
            block.push(format::marker_line(caller));
            block.push(format!(
                "  !!! can only inspect the storage of the current fiber: {repr}"
            ));
        }
        VarsView::Fiber { storage, .. } => {
            block.push(format::marker_line(caller));
            block.push("  fiber storage");
            push_sorted_pairs(&mut block, storage);
        }
        VarsView::Instance { fields } => {
            block.push(format::marker_line(caller));
            block.push("  instance variables");
            push_sorted_pairs(&mut block, fields);
        }
        VarsView::Unsupported => {
            block.push(format::marker_line(caller));
            block.push("  !!! unable to retrieve vars");
        }
    }
    block
}

fn thread_header(thread: &ThreadVars) -> String {
    let id = thread.native_id.unwrap_or(thread.fallback_id);
    let mut header = format!("  thread #{id}");
    if let Some(name) = &thread.name {
        header.push_str(&format!(" \"{name}\""));
    }
    header.push_str(&format!(" ({})", thread.status.as_str()));
    header
}

fn push_sorted_pairs(block: &mut LineBlock, mut pairs: Vec<(String, String)>) {
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in pairs {
        block.push(format!("    {name} = {value}"));
    }
}

/// A captured lexical scope: the binding-flavored dump target.
pub struct LocalScope {
    location: Frame,
    locals: Vec<(String, String)>,
}

impl LocalScope {
    /// Capture locals at the call site.
    #[track_caller]
    pub fn capture<I, K, V>(locals: I) -> Entity
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Arc::new(Self {
            location: Frame::caller(),
            locals: locals
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        })
    }
}

impl Traceable for LocalScope {
    fn type_name(&self) -> &str {
        "Binding"
    }

    fn repr(&self) -> String {
        format!("#<binding {}>", self.location)
    }

    fn vars_view(&self) -> VarsView {
        VarsView::Binding {
            location: self.location.clone(),
            locals: self.locals.clone(),
        }
    }
}

/// Thread-flavored dump target built from a host-supplied snapshot.
pub struct ThreadProbe {
    vars: ThreadVars,
}

impl ThreadProbe {
    pub fn new(status: ThreadStatus, fallback_id: u64) -> Self {
        Self {
            vars: ThreadVars {
                status,
                native_id: None,
                fallback_id,
                name: None,
                fiber_locals: Vec::new(),
                thread_vars: Vec::new(),
            },
        }
    }

    pub fn native_id(mut self, id: u64) -> Self {
        self.vars.native_id = Some(id);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.vars.name = Some(name.into());
        self
    }

    pub fn fiber_local(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.fiber_locals.push((name.into(), value.into()));
        self
    }

    pub fn thread_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.thread_vars.push((name.into(), value.into()));
        self
    }

    pub fn into_entity(self) -> Entity {
        Arc::new(self)
    }
}

impl Traceable for ThreadProbe {
    fn type_name(&self) -> &str {
        "Thread"
    }

    fn repr(&self) -> String {
        format!(
            "#<thread #{}>",
            self.vars.native_id.unwrap_or(self.vars.fallback_id)
        )
    }

    fn vars_view(&self) -> VarsView {
        VarsView::Thread(self.vars.clone())
    }
}

/// Fiber-flavored dump target. Only the current fiber's storage is
/// inspectable; a suspended one yields an error line.
pub struct FiberProbe {
    current: bool,
    repr: String,
    storage: Vec<(String, String)>,
}

impl FiberProbe {
    pub fn current(repr: impl Into<String>) -> Self {
        Self {
            current: true,
            repr: repr.into(),
            storage: Vec::new(),
        }
    }

    pub fn suspended(repr: impl Into<String>) -> Self {
        Self {
            current: false,
            repr: repr.into(),
            storage: Vec::new(),
        }
    }

    pub fn store(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.storage.push((key.into(), value.into()));
        self
    }

    pub fn into_entity(self) -> Entity {
        Arc::new(self)
    }
}

impl Traceable for FiberProbe {
    fn type_name(&self) -> &str {
        "Fiber"
    }

    fn repr(&self) -> String {
        self.repr.clone()
    }

    fn vars_view(&self) -> VarsView {
        VarsView::Fiber {
            current: self.current,
            storage: self.storage.clone(),
            repr: self.repr.clone(),
        }
    }
}

/// Plain-attributes dump target for anything exposing instance-level
/// fields.
pub struct InstanceProbe {
    type_name: String,
    repr: String,
    fields: Vec<(String, String)>,
}

impl InstanceProbe {
    pub fn new(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            repr: repr.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn into_entity(self) -> Entity {
        Arc::new(self)
    }
}

impl Traceable for InstanceProbe {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn repr(&self) -> String {
        self.repr.clone()
    }

    fn vars_view(&self) -> VarsView {
        VarsView::Instance {
            fields: self.fields.clone(),
        }
    }
}
