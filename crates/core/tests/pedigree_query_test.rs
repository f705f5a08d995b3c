//! Integration test: end-to-end pedigree queries on small hand-checked
//! populations.
//!
//! Diamond population used throughout:
//!   1, -, -   (founder)
//!   2, -, -   (founder)
//!   3, 1, 2
//!   4, 1, 2   (full sib of 3)
//!   5, 3, 4   (full-sib mating)
//!
//! Ancestor multiset of 5 = {3, 4, 1, 2, 1, 2}: 6 occurrences, 4 distinct,
//! so its ancestor-collision count is 2. Everyone else scores 0.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use approx::assert_relative_eq;

use lineage_graph_core::pedigree::{
    build_ancestor_tree, build_descendant_tree, compute_coefficients, ChildIndex,
};
use lineage_graph_core::{
    query_pedigree, Individual, IndividualId, PedigreeError, PedigreeSession, Population,
    QueryOptions, TraversalMode,
};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `content` to a uniquely named temporary file and return its path.
fn write_temp(content: &str, extension: &str) -> std::path::PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "lineage_test_{}_{}.{}",
        std::process::id(),
        id,
        extension
    ));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn ind(id: IndividualId, left: Option<IndividualId>, right: Option<IndividualId>) -> Individual {
    Individual::new(id, format!("owner-{}", id)).with_parents(left, right)
}

fn diamond() -> Population {
    Population::from_records(vec![
        ind(1, None, None),
        ind(2, None, None),
        ind(3, Some(1), Some(2)),
        ind(4, Some(1), Some(2)),
        ind(5, Some(3), Some(4)),
    ])
    .unwrap()
}

#[test]
fn test_diamond_ancestor_dag_has_five_nodes() {
    let pop = diamond();
    let dag = query_pedigree(&pop, 5, &QueryOptions::new().mode(TraversalMode::Ancestors)).unwrap();

    assert_eq!(dag.n_nodes(), 5);
    assert_eq!(dag.nodes.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert_eq!(dag.n_edges(), 6);
    assert_eq!(dag.node(1).unwrap().level, -2);
    assert_eq!(dag.node(2).unwrap().level, -2);
    assert_eq!(dag.node(3).unwrap().level, -1);
    assert_eq!(dag.node(5).unwrap().level, 0);
}

#[test]
fn test_diamond_coefficients() {
    let pop = diamond();
    let table = compute_coefficients(&pop).unwrap();
    assert_eq!(table.get(5), 2);
    for id in 1..=4 {
        assert_eq!(table.get(id), 0);
    }

    let dag = query_pedigree(&pop, 5, &QueryOptions::new()).unwrap();
    assert_relative_eq!(dag.node(5).unwrap().inbreeding, 2.0);
    assert_relative_eq!(dag.node(3).unwrap().inbreeding, 0.0);
}

#[test]
fn test_leaf_descendant_tree_is_empty() {
    let pop = diamond();
    let index = ChildIndex::build(&pop);
    let tree = build_descendant_tree(&index, 5, None).unwrap();
    assert!(tree.root().children.is_empty());

    let dag = query_pedigree(&pop, 5, &QueryOptions::new().mode(TraversalMode::Descendants))
        .unwrap();
    assert_eq!(dag.n_nodes(), 1);
    assert_eq!(dag.n_edges(), 0);
}

#[test]
fn test_max_depth_zero_ancestor_tree() {
    let pop = diamond();
    let tree = build_ancestor_tree(&pop, 5, Some(0)).unwrap();
    assert_eq!(tree.root().id, 5);
    assert!(tree.root().left.is_none() && tree.root().right.is_none());

    let dag = query_pedigree(&pop, 5, &QueryOptions::new().max_depth(Some(0))).unwrap();
    assert_eq!(dag.n_nodes(), 1);
}

#[test]
fn test_missing_root_not_found() {
    let pop = diamond();
    for mode in [TraversalMode::Ancestors, TraversalMode::Descendants, TraversalMode::Both] {
        let result = query_pedigree(&pop, 42, &QueryOptions::new().mode(mode));
        assert!(matches!(result, Err(PedigreeError::NotFound(42))));
    }
}

#[test]
fn test_introduced_cycle_is_cyclic_pedigree() {
    // Diamond plus founder 1 rewritten to descend from 5.
    let pop = Population::from_records(vec![
        ind(1, Some(5), None),
        ind(2, None, None),
        ind(3, Some(1), Some(2)),
        ind(4, Some(1), Some(2)),
        ind(5, Some(3), Some(4)),
    ])
    .unwrap();

    assert!(matches!(
        compute_coefficients(&pop),
        Err(PedigreeError::CyclicPedigree { .. })
    ));
    assert!(matches!(
        query_pedigree(&pop, 2, &QueryOptions::new()),
        Err(PedigreeError::CyclicPedigree { .. })
    ));
    assert!(pop.validate().is_err());
}

#[test]
fn test_full_tree_from_middle_generation() {
    // Extend the diamond downward: 6 = (5, 2), 7 = (6, 3).
    let mut pop = diamond();
    pop.insert(ind(6, Some(5), Some(2))).unwrap();
    pop.insert(ind(7, Some(6), Some(3))).unwrap();

    let session = PedigreeSession::new(&pop).unwrap();
    let dag = session.query(5, &QueryOptions::new()).unwrap();

    assert_eq!(dag.nodes.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(dag.node(6).unwrap().level, 1);
    assert_eq!(dag.node(7).unwrap().level, 2);
    // Edges from the descendant side only run out of the root's line.
    assert!(dag.edges.contains(&(5, 6)));
    assert!(dag.edges.contains(&(6, 7)));
    assert!(!dag.edges.contains(&(2, 6)));
    assert!(dag.check_invariants().is_ok());

    // 6: {5, 3, 4, 1, 2, 1, 2, 2} -> 8 - 5 = 3
    assert_eq!(session.coefficients().get(6), 3);
}

#[test]
fn test_csv_file_round_trip_through_query() {
    let path = write_temp(
        "id,owner,left,right\n1,a,0,0\n2,b,0,0\n3,a,1,2\n4,b,1,2\n5,a,3,4\n",
        "csv",
    );
    let pop = Population::from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(pop.len(), 5);
    assert_eq!(pop.get(5).unwrap().owner, "a");
    let dag = query_pedigree(&pop, 5, &QueryOptions::new()).unwrap();
    assert_relative_eq!(dag.node(5).unwrap().inbreeding, 2.0);
}

#[test]
fn test_api_json_file_query() {
    let path = write_temp(
        r#"{"result": [
            {"id": 1, "owner": "0x01", "coi": 0.0, "parents": []},
            {"id": 2, "owner": "0x02", "coi": 0.0, "parents": []},
            {"id": 3, "owner": "0x01", "coi": 0.0, "parents": [{"tokenId": 1}, {"tokenId": 2}]},
            {"id": 4, "owner": "0x02", "coi": 0.0, "parents": [{"tokenId": 1}, {"tokenId": 2}]},
            {"id": 5, "owner": "0x03", "coi": 0.25, "parents": [{"tokenId": 3}, {"tokenId": 4}]}
        ]}"#,
        "json",
    );
    let pop = Population::from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let dag = query_pedigree(&pop, 5, &QueryOptions::new()).unwrap();
    let five = dag.node(5).unwrap();
    assert_relative_eq!(five.inbreeding, 2.0);
    assert_relative_eq!(five.reported_coi.unwrap(), 0.25);

    let json = serde_json::to_value(&dag).unwrap();
    assert_eq!(json["root"], 5);
    assert_eq!(json["nodes"].as_array().unwrap().len(), 5);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = Population::from_path("/definitely/not/here.json");
    assert!(matches!(result, Err(PedigreeError::Io(_))));
}
