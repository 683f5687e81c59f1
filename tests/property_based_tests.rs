//! Property-based tests for registry membership, argument rendering, and
//! the timer store, using proptest.

mod common;

use common::rig;
use mirador::{ArgBinding, Observed, Param, ParamKind};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_trace_untrace_round_trip(count in 1usize..20) {
        let (session, _source, _buf) = rig();
        let entities: Vec<_> = (0..count)
            .map(|i| Observed::instance("Sample", format!("#<Sample:{i}>")))
            .collect();

        for e in session.trace_all(&entities) {
            prop_assert!(session.traced(&e));
        }
        for e in &entities {
            prop_assert!(session.untrace(e).is_some());
            prop_assert!(!session.traced(e));
        }
    }

    #[test]
    fn prop_untrace_all_always_empties(count in 0usize..20, repeats in 1usize..4) {
        let (session, _source, _buf) = rig();
        for i in 0..count {
            session.trace(Observed::instance("Sample", format!("#<Sample:{i}>")));
        }
        for _ in 0..repeats {
            session.untrace_all();
            for i in 0..count {
                let probe = Observed::instance("Sample", format!("#<Sample:{i}>"));
                prop_assert!(!session.traced(&probe));
            }
        }
    }

    #[test]
    fn prop_scoped_trace_never_leaks(values in prop::collection::vec("[a-z]{1,8}", 1..10)) {
        let (session, _source, _buf) = rig();
        let entities: Vec<_> = values
            .iter()
            .map(|v| Observed::instance("Sample", format!("#<{v}>")))
            .collect();
        session.trace_all_scoped(&entities, || {
            for e in &entities {
                assert!(session.traced(e));
            }
        });
        for e in &entities {
            prop_assert!(!session.traced(e));
        }
    }

    #[test]
    fn prop_bound_args_render_one_part_per_param(values in prop::collection::vec("[0-9]{1,4}", 0..8)) {
        let params: Vec<_> = (0..values.len())
            .map(|i| Param::required(&format!("p{i}")))
            .collect();
        let rendered = mirador::format::render_args(
            &params,
            &ArgBinding::Bound(values.clone()),
            false,
        );
        if values.is_empty() {
            prop_assert_eq!(rendered, "");
        } else {
            prop_assert_eq!(rendered.split(", ").count(), values.len());
        }
    }

    #[test]
    fn prop_opaque_args_never_leak_values(kinds in prop::collection::vec(0usize..6, 1..8)) {
        let params: Vec<_> = kinds
            .iter()
            .map(|k| {
                let kind = [
                    ParamKind::Required,
                    ParamKind::Optional,
                    ParamKind::Rest,
                    ParamKind::Keyword,
                    ParamKind::KeywordRest,
                    ParamKind::Block,
                ][*k];
                Param::new(kind, Some("p"))
            })
            .collect();
        let rendered = mirador::format::render_args(&params, &ArgBinding::Opaque, false);
        for part in rendered.split(", ") {
            prop_assert!(matches!(part, "?" | "*" | "**" | "&"));
        }
    }

    #[test]
    fn prop_timer_elapsed_non_negative(lookups in 1usize..5) {
        let (session, _source, buf) = rig();
        let id = session.timers().create(None).unwrap();
        for _ in 0..lookups {
            session.timers().lookup(id).unwrap();
        }
        let text = buf.contents();
        let mut previous = 0.0f64;
        for line in text.lines().filter(|l| l.ends_with(" s")) {
            let elapsed: f64 = line
                .rsplit(": ")
                .next()
                .unwrap()
                .trim_end_matches(" s")
                .parse()
                .unwrap();
            prop_assert!(elapsed >= 0.0);
            prop_assert!(elapsed >= previous);
            previous = elapsed;
        }
    }

    #[test]
    fn prop_timer_ids_unique_and_names_tracked(names in prop::collection::vec("[a-z]{1,6}", 1..8)) {
        let (session, _source, _buf) = rig();
        let timers = session.timers();
        let mut ids = Vec::new();
        for name in &names {
            ids.push(timers.create(Some(name)).unwrap());
        }
        let mut sorted = ids.clone();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), ids.len());

        // Every distinct name resolves to the timer that owns it now.
        for name in &names {
            let resolved = timers.lookup(name.as_str()).unwrap();
            prop_assert!(ids.contains(&resolved));
        }
    }
}
