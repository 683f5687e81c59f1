//! Drive the tracing engine with a synthetic event source.
//!
//! Run with: cargo run --example synthetic_trace

use std::sync::Arc;

use anyhow::Result;
use mirador::{
    CallEvent, ErrorInfo, ExceptionEvent, Frame, LocalScope, Observed, Param, Session,
    SyntheticSource, ThreadProbe, ThreadStatus,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let session = Session::new();
    let source = SyntheticSource::new();
    session.attach_source(Arc::<SyntheticSource>::clone(&source));
    session.set_trace_results(true);

    // Subscribe a sample object and replay a call/return pair for it.
    let sample = session.trace(Observed::instance("Sample", "#<Sample>"));
    let call = CallEvent::instance(Arc::clone(&sample), "Sample", "add")
        .with_params(vec![Param::required("a"), Param::required("b")])
        .with_args(["21", "21"])
        .with_stack(vec![Frame::new("demos/synthetic_trace.rs", 31)]);
    source.fire_call(&session, &call)?;
    source.fire_return(&session, &call.clone().returning("42"))?;

    // A variadic call into opaque native code: shapes only, no values.
    let kernel = session.trace(Observed::type_level("Kernel"));
    let native = CallEvent::type_level(kernel, "Kernel", "printf")
        .with_params(vec![Param::required("format"), Param::rest(None)])
        .opaque()
        .with_stack(vec![Frame::new("demos/synthetic_trace.rs", 40)]);
    source.fire_call(&session, &native)?;

    // Exception capture is scoped: enabled for this block only.
    session.trace_exceptions(true, || -> Result<()> {
        let raise = ExceptionEvent::raise(
            ErrorInfo::new("IOError", "closed stream"),
            Frame::new("demos/synthetic_trace.rs", 47),
        );
        source.fire_raise(&session, &raise)?;

        let rescue = ExceptionEvent::rescue(
            ErrorInfo::new("AppError", "request failed"),
            Frame::new("demos/synthetic_trace.rs", 53),
        )
        .caused_by(vec![
            ErrorInfo::new("IOError", "closed stream"),
            ErrorInfo::new("Errno::EPIPE", "broken pipe"),
        ]);
        source.fire_rescue(&session, &rescue)?;
        Ok(())
    })?;

    // Markers, timers, and variable dumps write through the same sink.
    session.here()?;

    let timers = session.timers();
    let id = timers.create(Some("demo"))?;
    std::thread::sleep(std::time::Duration::from_millis(5));
    timers.lookup("demo")?;
    timers.report_all()?;
    timers.delete(id);

    let scope = LocalScope::capture([("total", "42"), ("label", "\"demo\"")]);
    session.vars(&scope)?;

    let worker = ThreadProbe::new(ThreadStatus::Running, 1)
        .named("worker")
        .thread_var("queue_depth", "3")
        .into_entity();
    session.vars(&worker)?;

    Ok(())
}
