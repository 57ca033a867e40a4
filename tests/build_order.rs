mod common;

use common::{engine_for, resolved, TestProject};
use tsbuild::engine;
use tsbuild::host::MockHost;
use tsbuild::types::ExitStatus;

fn chain(mock: &MockHost) {
    let at = MockHost::time(10);
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .composite()
        .write(mock, at);
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .composite()
        .reference("../a")
        .write(mock, at);
    TestProject::new("/c")
        .source("c.ts", "export const c = 3;\n")
        .reference("../b")
        .write(mock, at);
}

#[test]
fn order_is_leaves_first() {
    let mock = MockHost::new();
    chain(&mock);
    let mut state = engine_for(&mock, &["/c"]);

    let order = state.get_build_order();
    assert_eq!(
        order.order,
        vec![resolved("/a"), resolved("/b"), resolved("/c")]
    );
    assert!(order.circular_diagnostics.is_empty());
}

#[test]
fn diamond_orders_every_edge_before_its_dependents() {
    let mock = MockHost::new();
    let at = MockHost::time(10);
    TestProject::new("/base")
        .source("base.ts", "export const base = 0;\n")
        .composite()
        .write(&mock, at);
    TestProject::new("/left")
        .source("left.ts", "export const left = 1;\n")
        .composite()
        .reference("../base")
        .write(&mock, at);
    TestProject::new("/right")
        .source("right.ts", "export const right = 2;\n")
        .composite()
        .reference("../base")
        .write(&mock, at);
    TestProject::new("/app")
        .source("app.ts", "export const app = 3;\n")
        .reference("../left")
        .reference("../right")
        .write(&mock, at);

    let mut state = engine_for(&mock, &["/app"]);
    let order = state.get_build_order();

    let position = |dir: &str| {
        order
            .order
            .iter()
            .position(|p| p == &resolved(dir))
            .unwrap()
    };
    assert!(position("/base") < position("/left"));
    assert!(position("/base") < position("/right"));
    assert!(position("/left") < position("/app"));
    assert!(position("/right") < position("/app"));
    assert_eq!(order.order.len(), 4);
}

#[test]
fn cycle_is_reported_once_and_walk_terminates() {
    let mock = MockHost::new();
    let at = MockHost::time(10);
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .composite()
        .reference("../b")
        .write(&mock, at);
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .composite()
        .reference("../a")
        .write(&mock, at);

    let mut state = engine_for(&mock, &["/a"]);
    let order = state.get_build_order();

    assert_eq!(order.circular_diagnostics.len(), 1);
    assert!(order.circular_diagnostics[0]
        .message
        .contains("circular"));
    assert_eq!(order.order.len(), 2);

    // The engine still terminates when asked to build the cyclic graph.
    let exit = engine::build(&mut state, None, None).unwrap();
    assert_eq!(exit, ExitStatus::Success);
}

#[test]
fn circular_flag_suppresses_the_diagnostic() {
    let mock = MockHost::new();
    let at = MockHost::time(10);
    mock.add_file_at(
        "/a/tsconfig.json",
        r#"{"files":["a.ts"],"references":[{"path":"../b","circular":true}]}"#,
        at,
    );
    mock.add_file_at("/a/a.ts", "export const a = 1;\n", at);
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../a")
        .write(&mock, at);

    let mut state = engine_for(&mock, &["/a"]);
    let order = state.get_build_order();
    assert!(order.circular_diagnostics.is_empty());
}

#[test]
fn unresolvable_reference_is_a_leaf() {
    let mock = MockHost::new();
    let at = MockHost::time(10);
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../missing")
        .write(&mock, at);

    let mut state = engine_for(&mock, &["/b"]);
    let order = state.get_build_order();
    assert_eq!(
        order.order,
        vec![resolved("/missing"), resolved("/b")]
    );
}

#[test]
fn sub_order_restricts_to_transitive_closure() {
    let mock = MockHost::new();
    chain(&mock);
    let mut state = engine_for(&mock, &["/c"]);

    let sub = state.get_build_order_for(&resolved("/b")).unwrap();
    assert_eq!(sub.order, vec![resolved("/a"), resolved("/b")]);
}

#[test]
fn unknown_sub_project_is_invalid() {
    let mock = MockHost::new();
    chain(&mock);
    let mut state = engine_for(&mock, &["/c"]);

    assert!(state.get_build_order_for(&resolved("/elsewhere")).is_none());
    let exit = engine::build(&mut state, Some(&resolved("/elsewhere")), None).unwrap();
    assert_eq!(exit, ExitStatus::InvalidProjectOutputsSkipped);
}
