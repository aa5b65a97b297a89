use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const TARGET: &str = "Assets/Scripts/BattleSystem/InventoryUI.cs";

const DEPENDENCIES: [&str; 4] = [
    "Assets/Scripts/BattleSystem/AttachmentSystem.cs",
    "Assets/Scripts/BattleSystem/WeaponData.cs",
    "Assets/Scripts/BattleSystem/UI/TitleScreenUI.cs",
    "Assets/Scripts/BattleSystem/UI/StageSelectionUI.cs",
];

fn branchfix_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("branchfix"));
    cmd.env_remove("RUST_LOG").current_dir(root);
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn project(dependencies: usize) -> TempDir {
    let root = TempDir::new().expect("root");
    write(root.path(), TARGET, "int p = weapon.attackPower;\n");
    for rel in DEPENDENCIES.iter().take(dependencies) {
        write(root.path(), rel, "// stub\n");
    }
    root
}

fn target(root: &TempDir) -> String {
    fs::read_to_string(root.path().join(TARGET)).expect("read target")
}

// ---------------------------------------------------------------------------
// 1. Default command
// ---------------------------------------------------------------------------

#[test]
fn battle_gate_branch_rewrites_and_exits_zero() {
    let root = project(4);
    branchfix_cmd(root.path())
        .arg("feature/battle-gate-system")
        .assert()
        .success()
        .stdout(contains("1 replacements"))
        .stdout(contains("all stages passed"));
    assert_eq!(target(&root), "int p = weapon.basePower;\n");
}

#[test]
fn master_exits_zero_without_touching_target() {
    let root = project(4);
    branchfix_cmd(root.path())
        .arg("master")
        .assert()
        .success()
        .stdout(contains("canonical"));
    assert_eq!(target(&root), "int p = weapon.attackPower;\n");
}

#[test]
fn unknown_branch_exits_three() {
    let root = project(4);
    branchfix_cmd(root.path())
        .arg("nonexistent-branch")
        .assert()
        .code(3)
        .stdout(contains("no rewrite rules registered"));
    assert_eq!(target(&root), "int p = weapon.attackPower;\n");
}

#[test]
fn missing_target_exits_four() {
    let root = project(4);
    fs::remove_file(root.path().join(TARGET)).unwrap();
    branchfix_cmd(root.path())
        .args(["fix", "feature/battle-gate-system"])
        .assert()
        .code(4)
        .stdout(contains("target file not found"));
}

#[test]
fn missing_dependencies_exit_five_unless_policy_any() {
    let root = project(1);
    branchfix_cmd(root.path())
        .arg("master")
        .assert()
        .code(5)
        .stdout(contains("1/4 dependencies present"));

    branchfix_cmd(root.path())
        .args(["master", "--policy", "any"])
        .assert()
        .success();
}

#[test]
fn root_flag_points_at_project() {
    let root = project(4);
    let elsewhere = TempDir::new().unwrap();
    branchfix_cmd(elsewhere.path())
        .arg("feature/battle-gate-system")
        .arg("--root")
        .arg(root.path())
        .assert()
        .success();
    assert_eq!(target(&root), "int p = weapon.basePower;\n");
}

#[test]
fn dry_run_prints_diff_and_writes_nothing() {
    let root = project(4);
    branchfix_cmd(root.path())
        .args(["feature/battle-gate-system", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("+int p = weapon.basePower;"));
    assert_eq!(target(&root), "int p = weapon.attackPower;\n");
}

#[test]
fn json_report_names_failing_stage() {
    let root = project(0);
    let output = branchfix_cmd(root.path())
        .args(["master", "--json"])
        .output()
        .expect("run branchfix");
    assert_eq!(output.status.code(), Some(5));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["status"], "inconsistent_dependencies");
    assert_eq!(json["failed_stage"], "consistency check");
    assert_eq!(json["rewrite"]["action"], "skipped");
    assert_eq!(json["consistency"]["present"], 0);
    assert!(json["checked_at"].is_string());
}

#[test]
fn root_config_file_overrides_builtin_table() {
    let root = project(0);
    write(
        root.path(),
        "branchfix.yaml",
        "target: Assets/Scripts/BattleSystem/InventoryUI.cs\n\
         branches:\n  - branch: trunk\n    canonical: true\n",
    );
    branchfix_cmd(root.path()).arg("trunk").assert().success();
    branchfix_cmd(root.path()).arg("master").assert().code(3);
}

#[test]
fn invalid_pattern_in_config_exits_one() {
    let root = project(0);
    write(
        root.path(),
        "branchfix.yaml",
        "target: a.cs\nbranches:\n  - branch: x\n    rules:\n      - pattern: '('\n        replacement: 'y'\n",
    );
    branchfix_cmd(root.path())
        .arg("x")
        .assert()
        .code(1)
        .stderr(contains("invalid pattern"));
}

#[test]
fn non_idempotent_rules_stop_fix_before_rewrite() {
    let root = project(4);
    write(
        root.path(),
        "branchfix.yaml",
        "target: Assets/Scripts/BattleSystem/InventoryUI.cs\n\
         branches:\n  - branch: x\n    rules:\n      - pattern: '\\bid\\b'\n        replacement: 'id.id'\n",
    );
    write(root.path(), TARGET, "id\n");

    for _ in 0..2 {
        branchfix_cmd(root.path())
            .arg("x")
            .assert()
            .code(6)
            .stdout(contains("not idempotent"))
            .stderr(contains("self-check"));
    }
    assert_eq!(target(&root), "id\n");
}

#[test]
fn non_idempotent_rules_reported_in_json() {
    let root = project(4);
    write(
        root.path(),
        "branchfix.yaml",
        "target: Assets/Scripts/BattleSystem/InventoryUI.cs\n\
         branches:\n  - branch: x\n    rules:\n      - pattern: '\\bid\\b'\n        replacement: 'id.id'\n",
    );
    let output = branchfix_cmd(root.path())
        .args(["x", "--json"])
        .output()
        .expect("run branchfix");
    assert_eq!(output.status.code(), Some(6));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["status"], "self_check_failed");
    assert!(json["issues"][0].as_str().unwrap().contains("not idempotent"));
}

#[test]
fn style_warnings_do_not_block_fix() {
    let root = project(4);
    write(
        root.path(),
        "branchfix.yaml",
        "target: Assets/Scripts/BattleSystem/InventoryUI.cs\n\
         branches:\n  - branch: x\n    rules:\n      - pattern: '(weapon)\\.attackPower'\n        replacement: '${1}.basePower'\n",
    );
    branchfix_cmd(root.path())
        .arg("x")
        .assert()
        .success()
        .stdout(contains("no leading"))
        .stdout(contains("all stages passed"));
    assert_eq!(target(&root), "int p = weapon.basePower;\n");
}

// ---------------------------------------------------------------------------
// 2. Subcommands
// ---------------------------------------------------------------------------

#[test]
fn check_reports_missing_dependencies() {
    let root = project(3);
    branchfix_cmd(root.path())
        .arg("check")
        .assert()
        .code(5)
        .stdout(contains("MISSING"))
        .stdout(contains("StageSelectionUI.cs"));

    branchfix_cmd(root.path())
        .args(["check", "--policy", "any"])
        .assert()
        .success();
}

#[test]
fn rules_validate_passes_for_builtin_table() {
    let root = project(0);
    branchfix_cmd(root.path())
        .args(["rules", "--validate"])
        .assert()
        .success()
        .stdout(contains("feature/battle-gate-system"))
        .stdout(contains("self-check: all rule sets passed"));
}

#[test]
fn rules_validate_flags_unanchored_pattern() {
    let root = project(0);
    write(
        root.path(),
        "branchfix.yaml",
        "target: a.cs\nbranches:\n  - branch: x\n    rules:\n      - pattern: 'attachment\\.id'\n        replacement: 'attachment.attachmentId'\n",
    );
    branchfix_cmd(root.path())
        .args(["rules", "--validate"])
        .assert()
        .code(6)
        .stdout(contains("no leading"));
}

#[test]
fn diff_previews_without_writing() {
    let root = project(0);
    branchfix_cmd(root.path())
        .args(["diff", "feature/battle-gate-system"])
        .assert()
        .success()
        .stdout(contains("--- a/Assets/Scripts/BattleSystem/InventoryUI.cs"))
        .stdout(contains("+int p = weapon.basePower;"));
    assert_eq!(target(&root), "int p = weapon.attackPower;\n");
}

#[test]
fn bad_policy_is_usage_error() {
    let root = project(0);
    branchfix_cmd(root.path())
        .args(["master", "--policy", "most"])
        .assert()
        .code(2)
        .stderr(contains("unknown policy"));
}
