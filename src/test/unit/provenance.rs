//! Unit tests for the rewrite log and identity resolution.

use test_case::test_case;

use crate::error::Error;
use crate::provenance::{BackwardResolution, ForwardResolution, RewriteLog, RewriteRecord};
use crate::test::support::{SOURCE, leaf};

#[test]
fn test_untracked_node_resolves_to_fallback() {
    let log = RewriteLog::new();
    let n = leaf(SOURCE);

    assert!(matches!(log.resolve_forward(&n), ForwardResolution::Untracked));
    assert!(matches!(log.resolve_backward(&n), BackwardResolution::Untracked));
    assert_eq!(log.resolve_forward(&n).node_or(&n).unwrap().id, n.id);

    // Repeated resolution is idempotent: the log is never mutated by reads.
    assert!(matches!(log.resolve_forward(&n), ForwardResolution::Untracked));
}

#[test_case(1; "single hop")]
#[test_case(3; "three hops")]
#[test_case(12; "twelve hops")]
fn test_replace_chain_is_transitive(hops: usize) {
    let mut log = RewriteLog::new();
    let nodes: Vec<_> = (0..=hops).map(|_| leaf(SOURCE)).collect();
    for pair in nodes.windows(2) {
        log.append(RewriteRecord::Replace {
            original: pair[0].clone(),
            replacement: pair[1].clone(),
        })
        .unwrap();
    }

    let first = &nodes[0];
    let last = &nodes[hops];
    match log.resolve_forward(first) {
        ForwardResolution::Replaced(n) => assert_eq!(n.id, last.id),
        other => panic!("expected Replaced, got {other:?}"),
    }
    match log.resolve_backward(last) {
        BackwardResolution::Original(n) => assert_eq!(n.id, first.id),
        other => panic!("expected Original, got {other:?}"),
    }
}

#[test]
fn test_delete_dominates_the_chain() {
    let mut log = RewriteLog::new();
    let a = leaf(SOURCE);
    let b = leaf(SOURCE);
    log.append(RewriteRecord::Replace { original: a.clone(), replacement: b.clone() }).unwrap();
    log.append(RewriteRecord::Delete { original: b.clone() }).unwrap();

    assert!(matches!(log.resolve_forward(&a), ForwardResolution::Deleted));
    assert!(log.resolve_forward(&a).node_or(&a).is_none());
}

#[test]
fn test_new_node_has_no_original() {
    let mut log = RewriteLog::new();
    let n = leaf(SOURCE);
    log.append(RewriteRecord::New { replacement: n.clone() }).unwrap();

    assert!(matches!(log.resolve_backward(&n), BackwardResolution::Created));
    assert!(log.resolve_backward(&n).node_or(&n).is_none());
    // Forward direction never saw it.
    assert!(matches!(log.resolve_forward(&n), ForwardResolution::Untracked));
}

#[test]
fn test_double_replace_is_rejected() {
    let mut log = RewriteLog::new();
    let a = leaf(SOURCE);
    let b = leaf(SOURCE);
    let c = leaf(SOURCE);
    log.append(RewriteRecord::Replace { original: a.clone(), replacement: b.clone() }).unwrap();

    let err = log
        .append(RewriteRecord::Replace { original: a.clone(), replacement: c.clone() })
        .unwrap_err();
    assert_eq!(err, Error::DoubleReplace { id: a.id });
    // The first replacement still stands.
    match log.resolve_forward(&a) {
        ForwardResolution::Replaced(n) => assert_eq!(n.id, b.id),
        other => panic!("expected Replaced, got {other:?}"),
    }
}

#[test]
fn test_delete_may_overwrite_an_earlier_replace() {
    // Retroactive pruning: a producer survives a rewrite, then loses its
    // last consumer and is deleted after the fact.
    let mut log = RewriteLog::new();
    let a = leaf(SOURCE);
    let b = leaf(SOURCE);
    log.append(RewriteRecord::Replace { original: a.clone(), replacement: b.clone() }).unwrap();
    log.append(RewriteRecord::Delete { original: a.clone() }).unwrap();

    assert!(matches!(log.resolve_forward(&a), ForwardResolution::Deleted));
    // The append-only record list keeps both events.
    assert_eq!(log.len(), 2);
}

#[test]
fn test_records_are_append_only() {
    let mut log = RewriteLog::new();
    let a = leaf(SOURCE);
    let b = leaf(SOURCE);
    log.append(RewriteRecord::Replace { original: a.clone(), replacement: b.clone() }).unwrap();
    log.append(RewriteRecord::New { replacement: a.clone() }).unwrap();

    let kinds: Vec<_> = log.records().iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![crate::provenance::RecordKind::Replace, crate::provenance::RecordKind::New]
    );
    assert_eq!(log.records()[0].original().unwrap().id, a.id);
    assert_eq!(log.records()[0].replacement().unwrap().id, b.id);
    assert!(log.records()[1].original().is_none());
}
