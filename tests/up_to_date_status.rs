mod common;

use common::{engine_for, resolved, TestProject};
use tsbuild::host::MockHost;
use tsbuild::status::{project_up_to_date_status, Freshness, UpToDateStatus};

#[test]
fn missing_input_is_unbuildable() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .write(&mock, MockHost::time(10));
    mock.remove_file("/a/a.ts");

    let mut state = engine_for(&mock, &["/a"]);
    let status = project_up_to_date_status(&mut state, &resolved("/a"));
    match status {
        UpToDateStatus::Unbuildable { reason } => assert!(reason.contains("a.ts")),
        other => panic!("expected Unbuildable, got {other:?}"),
    }
}

#[test]
fn reference_aggregator_is_container_only() {
    let mock = MockHost::new();
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .write(&mock, MockHost::time(10));
    TestProject::new("/all")
        .container()
        .reference("../b")
        .write(&mock, MockHost::time(10));

    let mut state = engine_for(&mock, &["/all"]);
    let status = project_up_to_date_status(&mut state, &resolved("/all"));
    assert_eq!(status, UpToDateStatus::ContainerOnly);
}

#[test]
fn absent_output_reports_output_missing() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .write(&mock, MockHost::time(10));

    let mut state = engine_for(&mock, &["/a"]);
    let status = project_up_to_date_status(&mut state, &resolved("/a"));
    match status {
        UpToDateStatus::OutputMissing { missing_output } => {
            assert_eq!(missing_output, resolved("/a").with_file_name("a.js"));
        }
        other => panic!("expected OutputMissing, got {other:?}"),
    }
}

#[test]
fn output_older_than_input_is_out_of_date_with_self() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .write(&mock, MockHost::time(5));
    mock.touch("/a/a.ts", MockHost::time(20));
    mock.add_file_at("/a/a.js", "export const a = 1;\n", MockHost::time(15));

    let mut state = engine_for(&mock, &["/a"]);
    let status = project_up_to_date_status(&mut state, &resolved("/a"));
    match status {
        UpToDateStatus::OutOfDateWithSelf {
            out_of_date_output,
            newer_input,
        } => {
            assert!(out_of_date_output.ends_with("a.js"));
            assert!(newer_input.ends_with("a.ts"));
        }
        other => panic!("expected OutOfDateWithSelf, got {other:?}"),
    }
}

#[test]
fn fresh_outputs_are_up_to_date() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .write(&mock, MockHost::time(5));
    mock.touch("/a/a.ts", MockHost::time(10));
    mock.add_file_at("/a/a.js", "export const a = 1;\n", MockHost::time(30));

    let mut state = engine_for(&mock, &["/a"]);
    let status = project_up_to_date_status(&mut state, &resolved("/a"));
    match status {
        UpToDateStatus::UpToDate(freshness) => {
            assert!(freshness.newest_input_name.ends_with("a.ts"));
            assert_eq!(freshness.newest_input_time, MockHost::time(10));
            assert!(freshness.oldest_output_name.ends_with("a.js"));
        }
        other => panic!("expected UpToDate, got {other:?}"),
    }
}

#[test]
fn config_newer_than_outputs_is_out_of_date_with_self() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .write(&mock, MockHost::time(10));
    mock.add_file_at("/a/a.js", "export const a = 1;\n", MockHost::time(30));
    mock.touch("/a/tsconfig.json", MockHost::time(40));

    let mut state = engine_for(&mock, &["/a"]);
    let status = project_up_to_date_status(&mut state, &resolved("/a"));
    match status {
        UpToDateStatus::OutOfDateWithSelf { newer_input, .. } => {
            assert!(newer_input.ends_with("tsconfig.json"));
        }
        other => panic!("expected OutOfDateWithSelf, got {other:?}"),
    }
}

#[test]
fn unparseable_upstream_blocks_downstream() {
    let mock = MockHost::new();
    mock.add_file_at("/a/tsconfig.json", "{not json", MockHost::time(10));
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../a")
        .write(&mock, MockHost::time(10));

    let mut state = engine_for(&mock, &["/b"]);
    let status = project_up_to_date_status(&mut state, &resolved("/b"));
    assert_eq!(
        status,
        UpToDateStatus::UpstreamBlocked {
            upstream_project: resolved("/a"),
        }
    );
}

#[test]
fn stale_upstream_makes_downstream_upstream_out_of_date() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .write(&mock, MockHost::time(5));
    mock.touch("/a/a.ts", MockHost::time(20));
    mock.add_file_at("/a/a.js", "export const a = 1;\n", MockHost::time(10));
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../a")
        .write(&mock, MockHost::time(5));
    mock.add_file_at("/b/b.js", "export const b = 2;\n", MockHost::time(30));

    let mut state = engine_for(&mock, &["/b"]);
    let status = project_up_to_date_status(&mut state, &resolved("/b"));
    assert_eq!(
        status,
        UpToDateStatus::UpstreamOutOfDate {
            upstream_project: resolved("/a"),
        }
    );
}

fn seeded_upstream_freshness(newest_input: u64, decl_change: u64) -> UpToDateStatus {
    UpToDateStatus::UpToDate(Freshness {
        newest_input_time: MockHost::time(newest_input),
        newest_input_name: "/a/a.ts".into(),
        newest_decl_change_time: Some(MockHost::time(decl_change)),
        oldest_output_name: "/a/a.js".into(),
        newest_output_time: MockHost::time(newest_input + 5),
        newest_output_name: "/a/a.js".into(),
    })
}

/// Upstream inputs moved but its declaration content did not: downstream is
/// only pseudo-stale.
#[test]
fn unchanged_upstream_declarations_give_up_to_date_with_upstream_types() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .composite()
        .write(&mock, MockHost::time(5));
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../a")
        .write(&mock, MockHost::time(5));
    mock.add_file_at("/b/b.js", "export const b = 2;\n", MockHost::time(20));

    let mut state = engine_for(&mock, &["/b"]);
    let a_key = state.key_for(&resolved("/a"));
    state
        .project_status
        .insert(a_key, seeded_upstream_freshness(25, 10));

    let status = project_up_to_date_status(&mut state, &resolved("/b"));
    assert!(matches!(
        status,
        UpToDateStatus::UpToDateWithUpstreamTypes(_)
    ));
}

#[test]
fn changed_upstream_declarations_give_out_of_date_with_upstream() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .composite()
        .write(&mock, MockHost::time(5));
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../a")
        .write(&mock, MockHost::time(5));
    mock.add_file_at("/b/b.js", "export const b = 2;\n", MockHost::time(20));

    let mut state = engine_for(&mock, &["/b"]);
    let a_key = state.key_for(&resolved("/a"));
    state
        .project_status
        .insert(a_key, seeded_upstream_freshness(25, 25));

    let status = project_up_to_date_status(&mut state, &resolved("/b"));
    assert_eq!(
        status,
        UpToDateStatus::OutOfDateWithUpstream {
            out_of_date_output: "/b/b.js".into(),
            newer_project: resolved("/a"),
        }
    );
}

#[test]
fn prepended_upstream_with_unchanged_types_forces_bundle_rebuild() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .composite()
        .out_file("dist/bundle.js")
        .write(&mock, MockHost::time(5));
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .prepend_reference("../a")
        .write(&mock, MockHost::time(5));
    mock.add_file_at("/b/b.js", "export const b = 2;\n", MockHost::time(20));

    let mut state = engine_for(&mock, &["/b"]);
    let a_key = state.key_for(&resolved("/a"));
    state
        .project_status
        .insert(a_key, seeded_upstream_freshness(25, 10));

    let status = project_up_to_date_status(&mut state, &resolved("/b"));
    assert_eq!(
        status,
        UpToDateStatus::OutOfDateWithPrepend {
            out_of_date_output: "/b/b.js".into(),
            newer_project: resolved("/a"),
        }
    );
}

#[test]
fn build_info_from_another_version_invalidates() {
    let mock = MockHost::new();
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .composite()
        .write(&mock, MockHost::time(5));
    mock.add_file_at("/a/a.js", "export const a = 1;\n", MockHost::time(30));
    mock.add_file_at("/a/a.d.ts", "export const a = 1;\n", MockHost::time(30));
    mock.add_file_at(
        "/a/tsconfig.tsbuildinfo",
        r#"{"version":"9.9.9"}"#,
        MockHost::time(30),
    );

    let mut state = engine_for(&mock, &["/a"]);
    let status = project_up_to_date_status(&mut state, &resolved("/a"));
    assert_eq!(
        status,
        UpToDateStatus::BuildInfoVersionMismatch {
            version: "9.9.9".to_string(),
        }
    );
}

/// The cycle sentinel must never be a final status.
#[test]
fn computing_upstream_never_escapes_the_evaluator() {
    let mock = MockHost::new();
    let at = MockHost::time(5);
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\n")
        .reference("../b")
        .write(&mock, at);
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../a")
        .write(&mock, at);

    let mut state = engine_for(&mock, &["/a"]);
    let status = project_up_to_date_status(&mut state, &resolved("/a"));
    assert_ne!(status, UpToDateStatus::ComputingUpstream);
    let status = project_up_to_date_status(&mut state, &resolved("/b"));
    assert_ne!(status, UpToDateStatus::ComputingUpstream);
}
