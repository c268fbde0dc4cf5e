//! Tests for the keyed dependency index.

use opforge::dep::DepIndex;
use opforge::error::OpError;

#[derive(Debug, Clone, PartialEq)]
struct Task(&'static str);

fn index() -> DepIndex<&'static str, Task, impl Fn(&Task) -> &'static str> {
    DepIndex::new(|task: &Task| task.0)
}

#[test]
fn test_nothing_ready_until_prerequisites_exist() {
    let mut deps = index();
    deps.put(Task("a"), vec!["b", "c", "d"]);
    assert!(matches!(deps.pop(), Err(OpError::QueueEmpty)));
    assert_eq!(deps.pending_len(), 1);
}

#[test]
fn test_items_release_in_readiness_order() {
    let mut deps = index();
    deps.put(Task("a"), vec!["b", "c", "d", "e"]);
    deps.put(Task("e"), vec!["f"]);

    assert!(matches!(deps.pop(), Err(OpError::QueueEmpty)));

    deps.put(Task("b"), vec![]);
    deps.put(Task("c"), vec![]);
    deps.put(Task("d"), vec![]);

    assert_eq!(deps.pop().unwrap(), (Task("b"), vec![]));
    assert_eq!(deps.pop().unwrap(), (Task("c"), vec![]));
    assert_eq!(deps.pop().unwrap(), (Task("d"), vec![]));

    deps.put(Task("f"), vec![]);

    assert_eq!(deps.pop().unwrap(), (Task("f"), vec![]));
    assert_eq!(deps.pop().unwrap(), (Task("e"), vec![Task("f")]));
    assert_eq!(
        deps.pop().unwrap(),
        (Task("a"), vec![Task("b"), Task("c"), Task("d"), Task("e")]),
    );
    assert_eq!(deps.pending_len(), 0);

    // A popped key may be registered again and starts fresh.
    deps.put(Task("a"), vec![]);
    assert_eq!(deps.pop().unwrap(), (Task("a"), vec![]));
}

#[test]
fn test_dependency_results_follow_declaration_order() {
    let mut deps = index();
    deps.put(Task("root"), vec!["z", "a", "m"]);
    deps.put(Task("m"), vec![]);
    deps.put(Task("z"), vec![]);
    deps.put(Task("a"), vec![]);

    deps.pop().unwrap();
    deps.pop().unwrap();
    deps.pop().unwrap();
    let (item, dep_items) = deps.pop().unwrap();
    assert_eq!(item, Task("root"));
    // Declaration order, not resolution order.
    assert_eq!(dep_items, vec![Task("z"), Task("a"), Task("m")]);
}

#[test]
fn test_cycle_never_becomes_ready() {
    let mut deps = index();
    deps.put(Task("a"), vec!["b"]);
    deps.put(Task("b"), vec!["a"]);
    assert!(deps.is_idle());
    assert_eq!(deps.pending_len(), 2);
}
