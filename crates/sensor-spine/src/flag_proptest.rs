#[cfg(test)]
mod proptest_flag {
    use crate::flag::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy)]
    enum Event {
        Tick,
        /// Sampling thread tries to pick up work (only if some is due).
        Take,
        /// Sampling thread finishes the sample it holds (if any).
        Finish,
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            3 => Just(Event::Tick),
            2 => Just(Event::Take),
            2 => Just(Event::Finish),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        // Property: a sample never starts without an armed tick behind it, and
        // one armed tick never yields two samples.
        #[test]
        fn samples_never_exceed_armed_ticks(events in prop::collection::vec(event(), 0..200)) {
            let flag = ReadinessFlag::new();
            let mut armed = 0u32;
            let mut taken = 0u32;
            let mut holding = false;

            for ev in events {
                match ev {
                    Event::Tick => {
                        if flag.raise() == TickOutcome::Armed {
                            armed += 1;
                        }
                    }
                    Event::Take => {
                        // wait() would block on an empty flag; only take when due.
                        if !holding && flag.is_pending() {
                            prop_assert_eq!(flag.wait(), Wake::Sample);
                            taken += 1;
                            holding = true;
                        }
                    }
                    Event::Finish => {
                        if holding {
                            flag.complete();
                            holding = false;
                        }
                    }
                }
                prop_assert!(taken <= armed, "taken={} armed={}", taken, armed);
                prop_assert!(armed - taken <= 1, "backlog of {}", armed - taken);
                prop_assert_eq!(flag.is_busy(), holding);
            }
        }

        // Property: any burst of ticks while a sample is in flight produces exactly
        // one follow-up sample.
        #[test]
        fn burst_during_sample_yields_one_follow_up(burst in 1usize..64) {
            let flag = ReadinessFlag::new();
            flag.raise();
            prop_assert_eq!(flag.wait(), Wake::Sample);

            let outcomes: Vec<_> = (0..burst).map(|_| flag.raise()).collect();
            prop_assert_eq!(outcomes[0], TickOutcome::Armed);
            prop_assert!(outcomes[1..].iter().all(|o| *o == TickOutcome::Coalesced));

            flag.complete();
            prop_assert_eq!(flag.wait(), Wake::Sample);
            flag.complete();
            prop_assert!(!flag.is_raised());
        }

        // Property: after kill, no tick sequence can raise the flag.
        #[test]
        fn killed_flag_rejects_everything(ticks in 0usize..1000, raised_before in any::<bool>()) {
            let flag = ReadinessFlag::new();
            if raised_before {
                flag.raise();
            }
            flag.kill();
            for _ in 0..ticks {
                prop_assert_eq!(flag.raise(), TickOutcome::Rejected);
            }
            prop_assert!(!flag.is_raised());
            prop_assert_eq!(flag.wait(), Wake::Killed);
        }
    }
}
