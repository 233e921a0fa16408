//! Property tests for the numeric invariants in spec §8: FlowKey total
//! order, OLDC monotonicity, and delay-variation translation invariance.

use proptest::prelude::*;

use jitter_sketch::flowkey::FlowKey;
use jitter_sketch::optimizer::{Oldc, Optimizer};

fn arb_flowkey() -> impl Strategy<Value = FlowKey> {
    (any::<u32>(), any::<u32>(), any::<u16>(), any::<u16>(), any::<u8>()).prop_map(
        |(src_ip, dst_ip, src_port, dst_port, protocol)| {
            FlowKey::new(src_ip, dst_ip, src_port, dst_port, protocol)
        },
    )
}

proptest! {
    #[test]
    fn flowkey_total_order_is_transitive(a in arb_flowkey(), b in arb_flowkey(), c in arb_flowkey()) {
        if a < b && b < c {
            prop_assert!(a < c);
        }
    }

    #[test]
    fn flowkey_equality_matches_ordering(a in arb_flowkey(), b in arb_flowkey()) {
        prop_assert_eq!(a == b, !(a < b) && !(b < a));
    }

    #[test]
    fn oldc_output_is_non_decreasing(
        lengths in 3usize..80,
        step in 1u64..5000,
        b in 1usize..10,
    ) {
        let input: Vec<u64> = (0..lengths as u64).map(|i| i * step).collect();
        let out = Oldc::new(b).optimize(&input);
        for w in out.windows(2) {
            prop_assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn oldc_short_input_is_identity(lengths in 0usize..4, b in 2usize..20) {
        let input: Vec<u64> = (0..lengths as u64).map(|i| i * 1000).collect();
        if input.len() <= 2 * b {
            prop_assert_eq!(Oldc::new(b).optimize(&input), input);
        }
    }
}
