//! End-to-end tests for the core tracing engine: subscriptions, call and
//! return dispatch, call-site attribution, and self-exclusion.

mod common;

use std::sync::Arc;

use common::rig;
use mirador::{CallEvent, EventCategory, Frame, FrameSkip, Observed, Param};

fn add_call(session: &mirador::Session) -> CallEvent {
    let sample = session.trace(Observed::instance("Sample", "#<Sample>"));
    CallEvent::instance(sample, "Sample", "add")
        .with_params(vec![Param::required("a"), Param::required("b")])
        .with_args(["21", "21"])
        .with_stack(vec![Frame::new("app.rb", 3)])
}

#[test]
fn test_call_signature_literal() {
    let (session, source, buf) = rig();
    session.set_caller_locations(false);
    let ev = add_call(&session);
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "> Sample#add(21, 21)\n");
}

#[test]
fn test_call_with_caller_location() {
    let (session, source, buf) = rig();
    let ev = add_call(&session);
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "> Sample#add(21, 21)\n  app.rb:3\n");
}

#[test]
fn test_return_value_line_when_results_enabled() {
    let (session, source, buf) = rig();
    session.set_caller_locations(false);
    session.set_trace_results(true);
    let ev = add_call(&session).returning("42");
    source.fire_return(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "< Sample#add(21, 21)\n  = 42\n");
}

#[test]
fn test_results_off_by_default_means_hook_never_fires() {
    let (session, source, buf) = rig();
    assert!(!source.is_enabled(EventCategory::Returns));
    let ev = add_call(&session).returning("42");
    source.fire_return(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "");
}

#[test]
fn test_disabling_calls_deactivates_the_hook() {
    let (session, source, buf) = rig();
    session.set_trace_calls(false);
    assert!(!source.is_enabled(EventCategory::Calls));
    let ev = add_call(&session);
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "");
}

#[test]
fn test_untraced_receiver_is_silent() {
    let (session, source, buf) = rig();
    let stranger = Observed::instance("Sample", "#<Sample>");
    let ev = CallEvent::instance(stranger, "Sample", "add")
        .with_stack(vec![Frame::new("app.rb", 3)]);
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "");
}

#[test]
fn test_type_level_call_uses_dot_separator() {
    let (session, source, buf) = rig();
    session.set_caller_locations(false);
    let kernel = session.trace(Observed::type_level("Kernel"));
    let ev = CallEvent::type_level(kernel, "Kernel", "printf")
        .with_params(vec![Param::required("format"), Param::rest(None)])
        .opaque()
        .with_stack(vec![Frame::new("app.rb", 8)]);
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "> Kernel.printf(?, *)\n");
}

#[test]
fn test_scoped_tracing_restores_prior_state() {
    let (session, source, buf) = rig();
    session.set_caller_locations(false);
    let fresh = Observed::instance("Sample", "#<Sample>");
    let ev = CallEvent::instance(fresh.clone(), "Sample", "add")
        .with_params(vec![Param::required("a"), Param::required("b")])
        .with_args(["21", "21"])
        .with_stack(vec![Frame::new("app.rb", 3)]);

    session.trace_scoped(fresh.clone(), || {
        assert!(session.traced(&fresh));
        source.fire_call(&session, &ev).unwrap();
    });
    assert!(!session.traced(&fresh));
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "> Sample#add(21, 21)\n");

    // Pre-traced entities survive the scope.
    session.trace(fresh.clone());
    session.trace_scoped(fresh.clone(), || {});
    assert!(session.traced(&fresh));
}

#[test]
fn test_untrace_unwraps_single_entity() {
    let (session, _source, _buf) = rig();
    let e = session.trace(Observed::instance("A", "#<A>"));
    let removed = session.untrace(&e).expect("was traced");
    assert_eq!(removed.identity(), e.identity());
    assert!(session.untrace(&e).is_none());
}

#[test]
fn test_self_exclusion_produces_no_lines() {
    let (session, source, buf) = rig();
    session.set_caller_locations(false);

    let me = session.as_entity();
    let sink = session.output().entity();
    session.trace(me.clone());
    session.trace(sink.clone());
    assert!(!session.traced(&me));
    assert!(!session.traced(&sink));

    for receiver in [me, sink] {
        let ev = CallEvent::instance(Arc::clone(&receiver), "Engine", "write")
            .with_stack(vec![Frame::new("app.rb", 1)]);
        source.fire_call(&session, &ev).unwrap();
    }
    assert_eq!(buf.contents(), "");
}

#[test]
fn test_custom_frame_skip_governs_attribution() {
    let (session, source, buf) = rig();
    session.set_frame_skip(FrameSkip::new([r"^prelude/"]).unwrap());
    let ev = add_call(&session).with_stack(vec![
        Frame::new("app.rb", 3),
        Frame::new("prelude/hook.rb", 2),
        Frame::new("main.rb", 90),
    ]);
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "> Sample#add(21, 21)\n  app.rb:3\n");
}

#[test]
fn test_engine_originated_events_are_suppressed() {
    let (session, source, buf) = rig();
    session.set_frame_skip(FrameSkip::new([r"^prelude/"]).unwrap());
    let ev = add_call(&session).with_stack(vec![Frame::new("prelude/hook.rb", 2)]);
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "");
}

#[test]
fn test_here_markers() {
    let (session, _source, buf) = rig();
    session.here().unwrap();
    assert!(session.here_if(true).unwrap());
    assert!(!session.here_if(false).unwrap());
    let lines: Vec<String> = buf.contents().lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        assert!(line.starts_with("* "));
        assert!(line.contains("tracing_engine_tests.rs:"));
    }
}

#[test]
fn test_output_redirectable_to_file() {
    let session = mirador::Session::new();
    let file = tempfile::NamedTempFile::new().unwrap();
    session.set_output(file.reopen().unwrap()).unwrap();
    session.here().unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    assert!(text.starts_with("* "));
    assert!(text.contains("tracing_engine_tests.rs:"));
}

#[test]
fn test_keyword_names_option() {
    let (session, source, buf) = rig();
    session.set_caller_locations(false);
    session.set_keyword_names(true);
    let target = session.trace(Observed::instance("Report", "#<Report>"));
    let ev = CallEvent::instance(target, "Report", "render")
        .with_params(vec![Param::keyword("depth"), Param::keyword_rest(Some("rest"))])
        .with_args(["3", "{:a=>1, :b=>2}"])
        .with_stack(vec![Frame::new("app.rb", 14)]);
    source.fire_call(&session, &ev).unwrap();
    assert_eq!(buf.contents(), "> Report#render(depth: 3, **{:a=>1, :b=>2})\n");
}
