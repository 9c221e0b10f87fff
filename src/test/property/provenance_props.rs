//! Property tests for provenance resolution.

use proptest::prelude::*;

use crate::provenance::{BackwardResolution, ForwardResolution, RewriteLog, RewriteRecord};
use crate::test::support::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Forward resolution of any chain member lands on the newest node,
    /// backward resolution on the oldest, whatever the chain length.
    #[test]
    fn replace_chain_resolves_to_endpoints(hops in 1usize..48) {
        let mut log = RewriteLog::new();
        let mut nodes = vec![leaf(SOURCE)];
        for _ in 0..hops {
            let next = leaf(MAP);
            log.append(RewriteRecord::Replace {
                original: nodes.last().unwrap().clone(),
                replacement: next.clone(),
            })
            .unwrap();
            nodes.push(next);
        }

        let oldest = nodes.first().unwrap();
        let newest = nodes.last().unwrap();

        for node in &nodes[..nodes.len() - 1] {
            match log.resolve_forward(node) {
                ForwardResolution::Replaced(n) => prop_assert_eq!(n.id, newest.id),
                other => prop_assert!(false, "expected a replacement, got {:?}", other),
            }
        }
        for node in &nodes[1..] {
            match log.resolve_backward(node) {
                BackwardResolution::Original(n) => prop_assert_eq!(n.id, oldest.id),
                other => prop_assert!(false, "expected an original, got {:?}", other),
            }
        }
    }

    /// Deleting the newest node of a replace chain dominates every earlier
    /// identity in the chain.
    #[test]
    fn delete_dominates_whole_chain(hops in 1usize..32) {
        let mut log = RewriteLog::new();
        let mut nodes = vec![leaf(SOURCE)];
        for _ in 0..hops {
            let next = leaf(MAP);
            log.append(RewriteRecord::Replace {
                original: nodes.last().unwrap().clone(),
                replacement: next.clone(),
            })
            .unwrap();
            nodes.push(next);
        }
        log.append(RewriteRecord::Delete { original: nodes.last().unwrap().clone() }).unwrap();

        for node in &nodes {
            prop_assert!(matches!(log.resolve_forward(node), ForwardResolution::Deleted));
        }
    }

    /// A node the log has never seen resolves to Untracked in both
    /// directions, no matter how much unrelated history exists.
    #[test]
    fn unrelated_history_stays_untracked(hops in 0usize..32) {
        let mut log = RewriteLog::new();
        let mut current = leaf(SOURCE);
        for _ in 0..hops {
            let next = leaf(MAP);
            log.append(RewriteRecord::Replace {
                original: current.clone(),
                replacement: next.clone(),
            })
            .unwrap();
            current = next;
        }

        let stranger = leaf(FILTER);
        prop_assert!(matches!(log.resolve_forward(&stranger), ForwardResolution::Untracked));
        prop_assert!(matches!(log.resolve_backward(&stranger), BackwardResolution::Untracked));
    }
}
