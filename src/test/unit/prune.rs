//! Collapsible-predecessor pruning.

use crate::node::Node;
use crate::provenance::{ForwardResolution, RecordKind, RewriteLog};
use crate::rule::GraphEditor;
use crate::test::support::*;

#[test]
fn test_prune_removes_fully_accounted_predecessor() {
    let (mut graph, p, q, r) = chain_graph();
    let mut log = RewriteLog::new();

    {
        let mut editor = GraphEditor::new(&mut graph, &mut log);
        editor.mark_collapsible(&p, &q);
        editor.prune_collapsible(&q).unwrap();
    }

    assert!(!graph.contains(&p));
    assert!(graph.contains(&q));
    assert!(graph.contains(&r));

    assert_eq!(log.len(), 1);
    assert_eq!(log.records()[0].kind(), RecordKind::Delete);
    assert_eq!(log.records()[0].original().unwrap().id, p.id);
    assert!(matches!(log.resolve_forward(&p), ForwardResolution::Deleted));
}

#[test]
fn test_prune_never_removes_result() {
    let (mut graph, p, q, _r) = chain_graph();
    graph.add_result(p.clone());
    let mut log = RewriteLog::new();

    {
        let mut editor = GraphEditor::new(&mut graph, &mut log);
        editor.mark_collapsible(&p, &q);
        editor.prune_collapsible(&q).unwrap();
    }

    assert!(graph.contains(&p));
    assert!(log.is_empty());
}

#[test]
fn test_prune_keeps_predecessor_with_unaccounted_successor() {
    let (mut graph, p, q, _r) = chain_graph();
    let side = unary(FILTER, &p);
    graph.add_node(side.clone());
    let mut log = RewriteLog::new();

    {
        let mut editor = GraphEditor::new(&mut graph, &mut log);
        editor.mark_collapsible(&p, &q);
        editor.prune_collapsible(&q).unwrap();
    }

    // `side` still consumes p and nothing accounted for it.
    assert!(graph.contains(&p));
    assert!(log.is_empty());
}

#[test]
fn test_prune_accounts_through_forward_resolution() {
    // The accounted successor is recorded pre-replacement; pruning after the
    // replacement must recognize its current stand-in.
    let (mut graph, p, q, _r) = chain_graph();
    let mut log = RewriteLog::new();

    {
        let mut editor = GraphEditor::new(&mut graph, &mut log);
        editor.mark_collapsible(&p, &q);

        let q_new = Node::with_key(TestOperand::new(FUSED), Vec::new(), q.key());
        editor.replace_node(&q, &q_new);
        editor.record_replace(&q, &q_new).unwrap();

        editor.prune_collapsible(&q).unwrap();
    }

    assert!(!graph.contains(&p));
    assert!(matches!(log.resolve_forward(&p), ForwardResolution::Deleted));
}

#[test]
fn test_replace_with_new_node_collapses_chain() {
    let (mut graph, p, q, r) = chain_graph();
    let mut log = RewriteLog::new();

    // Q' absorbs P's work but keeps it as an input until pruning runs.
    let q_new = Node::with_key(TestOperand::new(FUSED), vec![p.clone()], q.key());
    {
        let mut editor = GraphEditor::new(&mut graph, &mut log);
        editor.mark_collapsible(&p, &q);
        editor.replace_with_new_node(&q, q_new.clone()).unwrap();
    }

    assert!(!graph.contains(&p));
    assert!(!graph.contains(&q));
    assert!(graph.contains(&q_new));
    assert!(graph.contains(&r));

    // The affected consumer was rewired onto the replacement.
    assert_eq!(r.inputs().len(), 1);
    assert_eq!(r.inputs()[0].id, q_new.id);
    assert_eq!(graph.results().len(), 1);
    assert_eq!(graph.results()[0].id, r.id);

    assert!(matches!(log.resolve_forward(&p), ForwardResolution::Deleted));
    assert!(matches!(
        log.resolve_forward(&q),
        ForwardResolution::Replaced(n) if n.id == q_new.id
    ));
}

#[test]
fn test_replace_with_new_node_carries_result_status() {
    let (mut graph, _p, _q, r) = chain_graph();
    let mut log = RewriteLog::new();

    let r_new = Node::with_key(TestOperand::new(FUSED), r.inputs().to_vec(), r.key());
    {
        let mut editor = GraphEditor::new(&mut graph, &mut log);
        editor.replace_with_new_node(&r, r_new.clone()).unwrap();
    }

    assert!(!graph.contains(&r));
    assert_eq!(graph.results().len(), 1);
    assert_eq!(graph.results()[0].id, r_new.id);
}
