mod common;

use std::time::Duration;

use common::{engine_for, resolved, TestProject};
use tsbuild::engine::{self, get_next_invalidated_project, ActionKind};
use tsbuild::host::{HostOp, MockHost};
use tsbuild::status::UpToDateStatus;
use tsbuild::types::{ExitStatus, ReloadLevel};

fn two_projects(mock: &MockHost) {
    let at = MockHost::time(10);
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\nconst internal = 0;\n")
        .composite()
        .write(mock, at);
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../a")
        .write(mock, at);
    mock.set_now(MockHost::time(100));
}

/// Step the factory through the whole order, collecting each action kind.
fn drain_actions(state: &mut tsbuild::engine::BuildState) -> Vec<(ActionKind, String)> {
    let order = state.get_build_order();
    for project in &order.order {
        let key = state.key_for(project);
        state.pending.enqueue(key, ReloadLevel::None);
    }
    let mut actions = Vec::new();
    while let Some(invalidated) = get_next_invalidated_project(state, &order) {
        actions.push((
            invalidated.kind,
            invalidated.project.display().to_string(),
        ));
        invalidated.done(state, &order, None).unwrap();
    }
    actions
}

#[test]
fn stale_chain_builds_bottom_up() {
    let mock = MockHost::new();
    two_projects(&mock);
    let mut state = engine_for(&mock, &["/b"]);

    let exit = engine::build(&mut state, None, None).unwrap();
    assert_eq!(exit, ExitStatus::Success);

    assert!(mock.file_text("/a/a.js").is_some());
    assert!(mock.file_text("/a/a.d.ts").is_some());
    assert!(mock.file_text("/a/tsconfig.tsbuildinfo").is_some());
    assert!(mock.file_text("/b/b.js").is_some());

    let a_key = state.key_for(&resolved("/a"));
    let b_key = state.key_for(&resolved("/b"));
    assert!(matches!(
        state.project_status.get(&a_key),
        Some(UpToDateStatus::UpToDate(_))
    ));
    assert!(matches!(
        state.project_status.get(&b_key),
        Some(UpToDateStatus::UpToDate(_))
    ));

    // The declaration carries only the exported surface.
    assert_eq!(
        mock.file_text("/a/a.d.ts").unwrap(),
        "export const a = 1;\n"
    );
}

/// Idempotence: a second build with no file-system changes writes nothing.
#[test]
fn rebuild_without_changes_writes_nothing() {
    let mock = MockHost::new();
    two_projects(&mock);

    let mut state = engine_for(&mock, &["/b"]);
    engine::build(&mut state, None, None).unwrap();

    mock.clear_ops();
    mock.advance(Duration::from_secs(50));
    let mut second = engine_for(&mock, &["/b"]);
    let exit = engine::build(&mut second, None, None).unwrap();

    assert_eq!(exit, ExitStatus::Success);
    assert!(mock.ops().is_empty(), "second build performed {:?}", mock.ops());
}

/// Editing only internal code leaves `.d.ts` bytes identical, so the
/// downstream project needs nothing but new timestamps.
#[test]
fn internal_edit_downgrades_downstream_to_timestamp_update() {
    let mock = MockHost::new();
    two_projects(&mock);

    let mut state = engine_for(&mock, &["/b"]);
    engine::build(&mut state, None, None).unwrap();

    // Same exported surface, different internals.
    mock.add_file_at(
        "/a/a.ts",
        "export const a = 1;\nconst internal = 42;\n",
        MockHost::time(200),
    );
    mock.set_now(MockHost::time(300));
    mock.clear_ops();

    let mut second = engine_for(&mock, &["/b"]);
    let actions = drain_actions(&mut second);
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].0, ActionKind::Build);
    assert!(actions[0].1.ends_with("/a/tsconfig.json"));
    assert_eq!(actions[1].0, ActionKind::UpdateOutputFileStamps);
    assert!(actions[1].1.ends_with("/b/tsconfig.json"));

    // The declaration kept its bytes and was not rewritten.
    let ops = mock.ops();
    assert!(!ops.contains(&HostOp::Write("/a/a.d.ts".into())));
    // Downstream outputs only moved in time.
    assert!(!ops.contains(&HostOp::Write("/b/b.js".into())));
    assert!(ops.contains(&HostOp::SetModifiedTime("/b/b.js".into())));
    assert_eq!(mock.mtime("/b/b.js"), Some(MockHost::time(300)));
}

/// A prepend reference turns the downstream action into a bundle update.
#[test]
fn prepend_reference_updates_bundle_without_full_build() {
    let mock = MockHost::new();
    let at = MockHost::time(10);
    TestProject::new("/a")
        .source("a.ts", "export const a = 1;\nconst internal = 0;\n")
        .composite()
        .out_file("dist/bundle.js")
        .write(&mock, at);
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .composite()
        .out_file("dist/bundle.js")
        .prepend_reference("../a")
        .write(&mock, at);
    mock.set_now(MockHost::time(100));

    let mut state = engine_for(&mock, &["/b"]);
    let exit = engine::build(&mut state, None, None).unwrap();
    assert_eq!(exit, ExitStatus::Success);
    let bundle = mock.file_text("/b/dist/bundle.js").unwrap();
    assert!(bundle.contains("const internal = 0;"));
    assert!(bundle.contains("export const b = 2;"));

    // Edit upstream internals only.
    mock.add_file_at(
        "/a/a.ts",
        "export const a = 1;\nconst internal = 99;\n",
        MockHost::time(200),
    );
    mock.set_now(MockHost::time(300));

    let mut second = engine_for(&mock, &["/b"]);
    let actions = drain_actions(&mut second);
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].0, ActionKind::Build);
    assert_eq!(actions[1].0, ActionKind::UpdateBundle);

    let bundle = mock.file_text("/b/dist/bundle.js").unwrap();
    assert!(bundle.contains("const internal = 99;"));
    assert!(bundle.contains("export const b = 2;"));
    // Declaration bundle kept its original timestamp.
    assert_eq!(
        mock.mtime("/b/dist/bundle.d.ts"),
        Some(MockHost::time(100))
    );
}

/// Upstream type errors block downstream projects instead of failing the
/// whole invocation with an exception.
#[test]
fn upstream_error_blocks_downstream() {
    let mock = MockHost::new();
    let at = MockHost::time(10);
    TestProject::new("/a")
        .source(
            "a.ts",
            "export const a: string = 1;\n// @type-error: number is not assignable to string\n",
        )
        .composite()
        .write(&mock, at);
    TestProject::new("/b")
        .source("b.ts", "export const b = 2;\n")
        .reference("../a")
        .write(&mock, at);
    mock.set_now(MockHost::time(100));

    let mut state = engine_for(&mock, &["/b"]);
    let exit = engine::build(&mut state, None, None).unwrap();
    assert_eq!(exit, ExitStatus::DiagnosticsPresentOutputsSkipped);

    let a_key = state.key_for(&resolved("/a"));
    assert!(state.reporter.has_errors(&a_key));
    assert!(matches!(
        state.project_status.get(&a_key),
        Some(UpToDateStatus::Unbuildable { .. })
    ));
    // Downstream never built.
    assert!(mock.file_text("/b/b.js").is_none());
}

/// Error in one project does not stop independent siblings from building.
#[test]
fn sibling_projects_still_build_when_one_fails() {
    let mock = MockHost::new();
    let at = MockHost::time(10);
    TestProject::new("/bad")
        .source("bad.ts", "// @syntax-error: unexpected token\n")
        .write(&mock, at);
    TestProject::new("/good")
        .source("good.ts", "export const ok = true;\n")
        .write(&mock, at);
    TestProject::new("/all")
        .container()
        .reference("../bad")
        .reference("../good")
        .write(&mock, at);
    mock.set_now(MockHost::time(100));

    let mut state = engine_for(&mock, &["/all"]);
    let exit = engine::build(&mut state, None, None).unwrap();
    assert_eq!(exit, ExitStatus::DiagnosticsPresentOutputsGenerated);
    assert!(mock.file_text("/good/good.js").is_some());
    assert!(mock.file_text("/bad/bad.js").is_none());
}

#[test]
fn build_info_version_mismatch_triggers_rebuild() {
    let mock = MockHost::new();
    two_projects(&mock);

    let mut state = engine_for(&mock, &["/b"]);
    engine::build(&mut state, None, None).unwrap();

    mock.add_file_at(
        "/a/tsconfig.tsbuildinfo",
        r#"{"version":"9.9.9"}"#,
        MockHost::time(150),
    );
    mock.set_now(MockHost::time(300));
    mock.clear_ops();

    let mut second = engine_for(&mock, &["/b"]);
    let actions = drain_actions(&mut second);
    assert_eq!(actions[0].0, ActionKind::Build);
    assert!(mock.write_count() > 0);
}

/// End-to-end against the real file system.
#[test]
fn builds_on_a_real_file_system() {
    use std::sync::Arc;
    use tsbuild::compile::SimpleProgramBuilder;
    use tsbuild::config::resolve_project_path;
    use tsbuild::engine::{BuildOptions, BuildState};
    use tsbuild::host::{BuildHost, CachingHost, RealHost};

    let dir = tempfile::tempdir().unwrap();
    let a_dir = dir.path().join("a");
    let b_dir = dir.path().join("b");
    std::fs::create_dir_all(&a_dir).unwrap();
    std::fs::create_dir_all(&b_dir).unwrap();
    std::fs::write(
        a_dir.join("tsconfig.json"),
        r#"{"compilerOptions":{"composite":true},"files":["a.ts"]}"#,
    )
    .unwrap();
    std::fs::write(a_dir.join("a.ts"), "export const a = 1;\n").unwrap();
    std::fs::write(
        b_dir.join("tsconfig.json"),
        r#"{"files":["b.ts"],"references":[{"path":"../a"}]}"#,
    )
    .unwrap();
    std::fs::write(b_dir.join("b.ts"), "export const b = 2;\n").unwrap();

    let host: Arc<dyn BuildHost> = Arc::new(RealHost::new());
    let host = Arc::new(CachingHost::new(host));
    let builder = Arc::new(SimpleProgramBuilder::new());
    let root = resolve_project_path(dir.path(), std::path::Path::new("b"));
    let mut state = BuildState::new(host, builder, BuildOptions::default(), vec![root]);

    let exit = engine::build(&mut state, None, None).unwrap();
    assert_eq!(exit, ExitStatus::Success);
    assert!(a_dir.join("a.js").is_file());
    assert!(a_dir.join("a.d.ts").is_file());
    assert!(a_dir.join("tsconfig.tsbuildinfo").is_file());
    assert!(b_dir.join("b.js").is_file());
}
