use bistro::dag::DependencyGraph;
use bistro::errors::BistroError;
use bistro::{TaskConfig, TaskSet};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// `(name, space-separated run list)` pairs.
fn tasks(entries: &[(&str, &str)]) -> TaskSet {
    entries.iter()
        .map(|(name, run)| (*name, TaskConfig::new("*.test").run(run.split_whitespace())))
        .collect()
}

fn position(order: &[String], name: &str) -> usize {
    order.iter().position(|n| n == name).expect("task missing from order")
}

#[test]
fn overall_order_follows_run_lists() -> TestResult {
    let graph = DependencyGraph::build(&tasks(&[
        ("one", "two three"),
        ("two", ""),
        ("three", "four"),
        ("four", ""),
    ]))?;

    assert_eq!(graph.overall_order(), vec!["one", "two", "three", "four"]);
    Ok(())
}

#[test]
fn overall_order_of_independent_tasks_is_insertion_order() -> TestResult {
    let graph = DependencyGraph::build(&tasks(&[("b", ""), ("a", ""), ("c", "")]))?;
    assert_eq!(graph.overall_order(), vec!["b", "a", "c"]);
    Ok(())
}

#[test]
fn dependants_of_chain_are_in_run_order() -> TestResult {
    let graph = DependencyGraph::build(&tasks(&[
        ("one", "two"),
        ("two", "three"),
        ("three", "four"),
        ("four", ""),
    ]))?;

    assert_eq!(graph.dependants_of("one")?, vec!["two", "three", "four"]);
    assert_eq!(graph.dependants_of("three")?, vec!["four"]);
    assert!(graph.dependants_of("four")?.is_empty());
    Ok(())
}

#[test]
fn dependants_of_diamond_respect_every_edge() -> TestResult {
    // a -> b -> d, a -> c -> d
    let graph = DependencyGraph::build(&tasks(&[
        ("a", "b c"),
        ("b", "d"),
        ("c", "d"),
        ("d", ""),
    ]))?;

    let order = graph.dependants_of("a")?;
    assert_eq!(order.len(), 3);
    assert!(position(&order, "b") < position(&order, "d"));
    assert!(position(&order, "c") < position(&order, "d"));
    Ok(())
}

#[test]
fn immediate_neighbours_are_exposed() -> TestResult {
    let graph = DependencyGraph::build(&tasks(&[("a", "b c"), ("b", "c"), ("c", "")]))?;

    assert_eq!(graph.dependents_of("a"), ["b", "c"]);
    assert_eq!(graph.dependencies_of("c"), ["a", "b"]);
    assert!(graph.dependencies_of("a").is_empty());
    assert!(graph.dependents_of("missing").is_empty());
    assert_eq!(graph.tasks().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert!(graph.contains("b"));
    assert_eq!(graph.len(), 3);
    Ok(())
}

#[test]
fn duplicate_run_entries_are_ignored() -> TestResult {
    let graph = DependencyGraph::build(&tasks(&[("a", "b b"), ("b", "")]))?;
    assert_eq!(graph.dependents_of("a"), ["b"]);
    assert_eq!(graph.dependants_of("a")?, vec!["b"]);
    Ok(())
}

#[test]
fn unknown_task_in_dependants_query_is_an_error() -> TestResult {
    let graph = DependencyGraph::build(&tasks(&[("a", "")]))?;
    let err = graph.dependants_of("nope").unwrap_err();
    assert!(matches!(err, BistroError::TaskNotFound(ref name) if name == "nope"));
    Ok(())
}

#[test]
fn unknown_run_target_is_a_config_error() {
    let err = DependencyGraph::build(&tasks(&[("a", "ghost")])).unwrap_err();
    match err {
        BistroError::ConfigError(msg) => {
            assert!(msg.contains("'a'"), "unexpected message: {msg}");
            assert!(msg.contains("'ghost'"), "unexpected message: {msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn cycles_are_rejected() {
    let err = DependencyGraph::build(&tasks(&[("a", "b"), ("b", "c"), ("c", "a")]))
        .unwrap_err();
    assert!(matches!(err, BistroError::DagCycle(_)), "got {err:?}");
}

#[test]
fn self_reference_is_a_cycle() {
    let err = DependencyGraph::build(&tasks(&[("a", "a")])).unwrap_err();
    assert!(matches!(err, BistroError::DagCycle(_)), "got {err:?}");
}

#[test]
fn empty_task_set_gives_empty_graph() -> TestResult {
    let graph = DependencyGraph::build(&TaskSet::new())?;
    assert!(graph.is_empty());
    assert!(graph.overall_order().is_empty());
    Ok(())
}
