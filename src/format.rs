//! Line construction for trace output
//!
//! Everything here is stateless: events in, text lines out. All lines for
//! one logical event are collected into a [`LineBlock`] and written to the
//! sink as a single unit so concurrent emitters cannot interleave partial
//! messages.

use crate::event::{ArgBinding, CallEvent, ExceptionEvent, ExceptionPhase, Frame, Param, ParamKind};

/// Ordered lines for one emitted message block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBlock {
    lines: Vec<String>,
}

impl LineBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render the block to one string, each line newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// `> Type#method(args)` for calls, `< ...` for returns. Type-level calls
/// join with `.` instead of `#`.
pub fn signature_line(ev: &CallEvent, marker: char, keyword_names: bool) -> String {
    let sep = if ev.type_level { '.' } else { '#' };
    format!(
        "{} {}{}{}({})",
        marker,
        ev.type_name,
        sep,
        ev.method,
        render_args(&ev.params, &ev.binding, keyword_names)
    )
}

/// Render the argument list in declaration order.
///
/// Bound calls print the supplied representation per parameter, with the
/// category sigil for rest (`*`), keyword-rest (`**`) and block (`&`)
/// parameters. Keyword argument names are suppressed unless
/// `keyword_names` is set. Opaque calls print `?` for bindable parameters
/// and the bare sigil for the rest/keyword-rest/block slots.
pub fn render_args(params: &[Param], binding: &ArgBinding, keyword_names: bool) -> String {
    let parts: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(idx, param)| match binding {
            ArgBinding::Bound(values) => {
                let value = values.get(idx).map(String::as_str).unwrap_or("?");
                match param.kind {
                    ParamKind::Required | ParamKind::Optional => value.to_string(),
                    ParamKind::Rest => format!("*{value}"),
                    ParamKind::Keyword => match (&param.name, keyword_names) {
                        (Some(name), true) => format!("{name}: {value}"),
                        _ => value.to_string(),
                    },
                    ParamKind::KeywordRest => format!("**{value}"),
                    ParamKind::Block => format!("&{value}"),
                }
            }
            ArgBinding::Opaque => match param.kind {
                ParamKind::Required | ParamKind::Optional | ParamKind::Keyword => "?".to_string(),
                ParamKind::Rest => "*".to_string(),
                ParamKind::KeywordRest => "**".to_string(),
                ParamKind::Block => "&".to_string(),
            },
        })
        .collect();
    parts.join(", ")
}

/// Indented call-site line.
pub fn call_site_line(frame: &Frame) -> String {
    format!("  {frame}")
}

/// Indented return-value line.
pub fn result_line(repr: &str) -> String {
    format!("  = {repr}")
}

/// Point-in-code marker line, also used as the dump header.
pub fn marker_line(frame: &Frame) -> String {
    format!("* {frame}")
}

/// `x Class: message` for a first raise, `! Class: message` for a later
/// rescue. Rescues list the causal chain, immediate cause first, one
/// indented `[Class: message]` line per link.
pub fn exception_block(ev: &ExceptionEvent, with_location: bool) -> LineBlock {
    let marker = match ev.phase {
        ExceptionPhase::Raise => 'x',
        ExceptionPhase::Rescue => '!',
    };
    let mut block = LineBlock::new();
    block.push(format!("{} {}: {}", marker, ev.error.class_name, ev.error.message));
    if ev.phase == ExceptionPhase::Rescue {
        for cause in &ev.causes {
            block.push(format!("  [{}: {}]", cause.class_name, cause.message));
        }
    }
    if with_location {
        block.push(call_site_line(&ev.location));
    }
    block
}
