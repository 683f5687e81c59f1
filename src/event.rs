//! Call and exception events synthesized by the host instrumentation
//!
//! Events arrive with their argument values already rendered to text;
//! turning arbitrary values into representations is the host's job. The
//! engine only decides whether to report an event and how to lay the
//! lines out.

use std::fmt;

use crate::entity::Entity;

/// One stack frame: source path and line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub path: String,
    pub line: u32,
}

impl Frame {
    pub fn new(path: impl Into<String>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// Frame of the code that called the current `#[track_caller]` chain.
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self {
            path: loc.file().to_string(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// Parameter categories, in host declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    Optional,
    Rest,
    Keyword,
    KeywordRest,
    Block,
}

/// One declared parameter of the called method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub kind: ParamKind,
    pub name: Option<String>,
}

impl Param {
    pub fn new(kind: ParamKind, name: Option<&str>) -> Self {
        Self {
            kind,
            name: name.map(str::to_string),
        }
    }

    pub fn required(name: &str) -> Self {
        Self::new(ParamKind::Required, Some(name))
    }

    pub fn optional(name: &str) -> Self {
        Self::new(ParamKind::Optional, Some(name))
    }

    pub fn rest(name: Option<&str>) -> Self {
        Self::new(ParamKind::Rest, name)
    }

    pub fn keyword(name: &str) -> Self {
        Self::new(ParamKind::Keyword, Some(name))
    }

    pub fn keyword_rest(name: Option<&str>) -> Self {
        Self::new(ParamKind::KeywordRest, name)
    }

    pub fn block(name: Option<&str>) -> Self {
        Self::new(ParamKind::Block, name)
    }
}

/// Whether argument values could be resolved for this call.
///
/// Calls into interpreted bodies expose their bindings and arrive as
/// `Bound`, with one rendered value per declared parameter. Calls into
/// opaque native routines expose only the parameter shape and arrive as
/// `Opaque`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgBinding {
    Bound(Vec<String>),
    Opaque,
}

/// A call or return observed by the host instrumentation.
#[derive(Clone)]
pub struct CallEvent {
    /// Receiver of the call; membership in the subscription registry is
    /// checked against this entity's identity.
    pub receiver: Entity,
    /// Enclosing type or module name as the host reports it.
    pub type_name: String,
    /// Class/module-level call (`Type.method`) vs instance call
    /// (`Type#method`).
    pub type_level: bool,
    pub method: String,
    pub params: Vec<Param>,
    pub binding: ArgBinding,
    /// Call stack, innermost frame first. Frame 0 locates the event
    /// itself; the call site is the first frame the skip predicate does
    /// not classify as internal.
    pub stack: Vec<Frame>,
    /// Rendered return value, present on return events.
    pub returned: Option<String>,
}

impl CallEvent {
    /// Instance-level call with no parameters bound yet.
    pub fn instance(receiver: Entity, type_name: &str, method: &str) -> Self {
        Self {
            receiver,
            type_name: type_name.to_string(),
            type_level: false,
            method: method.to_string(),
            params: Vec::new(),
            binding: ArgBinding::Bound(Vec::new()),
            stack: Vec::new(),
            returned: None,
        }
    }

    /// Class/module-level call.
    pub fn type_level(receiver: Entity, type_name: &str, method: &str) -> Self {
        Self {
            type_level: true,
            ..Self::instance(receiver, type_name, method)
        }
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    /// Bind rendered argument values, one per declared parameter.
    pub fn with_args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binding = ArgBinding::Bound(values.into_iter().map(Into::into).collect());
        self
    }

    /// Mark the call as opaque: parameter shape known, values not.
    pub fn opaque(mut self) -> Self {
        self.binding = ArgBinding::Opaque;
        self
    }

    pub fn with_stack(mut self, stack: Vec<Frame>) -> Self {
        self.stack = stack;
        self
    }

    pub fn returning(mut self, repr: &str) -> Self {
        self.returned = Some(repr.to_string());
        self
    }
}

impl fmt::Debug for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallEvent")
            .field("receiver", &self.receiver.repr())
            .field("type_name", &self.type_name)
            .field("type_level", &self.type_level)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("binding", &self.binding)
            .field("stack", &self.stack)
            .field("returned", &self.returned)
            .finish()
    }
}

/// Class name and message of one error object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub class_name: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(class_name: &str, message: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            message: message.to_string(),
        }
    }
}

/// First raise of an error vs a later rescue of the same error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionPhase {
    Raise,
    Rescue,
}

/// An exception observed by the host instrumentation.
#[derive(Debug, Clone)]
pub struct ExceptionEvent {
    pub error: ErrorInfo,
    /// Causal chain, immediate cause first, walking outward.
    pub causes: Vec<ErrorInfo>,
    pub phase: ExceptionPhase,
    pub location: Frame,
}

impl ExceptionEvent {
    pub fn raise(error: ErrorInfo, location: Frame) -> Self {
        Self {
            error,
            causes: Vec::new(),
            phase: ExceptionPhase::Raise,
            location,
        }
    }

    pub fn rescue(error: ErrorInfo, location: Frame) -> Self {
        Self {
            error,
            causes: Vec::new(),
            phase: ExceptionPhase::Rescue,
            location,
        }
    }

    pub fn caused_by(mut self, causes: Vec<ErrorInfo>) -> Self {
        self.causes = causes;
        self
    }
}
