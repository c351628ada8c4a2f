//! Integration tests for the Forge CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a forge command with logging silenced
fn forge() -> Command {
    let mut cmd = Command::cargo_bin("forge").unwrap();
    cmd.env_remove("FORGE_LOG")
        .env_remove("FORGE_COMPANY")
        .env_remove("FORGE_MAX_DEPTH")
        .env_remove("FORGE_DEFAULT_UNIT");
    cmd
}

/// Helper to create a project with one company in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    forge()
        .current_dir(tmp.path())
        .args(["init", "--company", "ACME", "--company-name", "Acme Cycles"])
        .assert()
        .success();
    tmp
}

/// Helper to create a part
fn create_part(tmp: &TempDir, number: &str, extra: &[&str]) {
    forge()
        .current_dir(tmp.path())
        .args(["part", "new", number])
        .args(extra)
        .assert()
        .success();
}

/// Helper to add a BOM line
fn add_line(tmp: &TempDir, parent: &str, component: &str, qty: &str) {
    forge()
        .current_dir(tmp.path())
        .args(["bom", "add", parent, component, qty])
        .assert()
        .success();
}

/// bike -> frame x1, wheel x2; wheel -> spoke x36
fn setup_bike(tmp: &TempDir) {
    create_part(tmp, "BIKE", &["--type", "product"]);
    create_part(tmp, "FRAME", &["--type", "assembly", "--cost", "80", "--stock", "5"]);
    create_part(tmp, "WHEEL", &["--type", "assembly", "--stock", "3"]);
    create_part(tmp, "SPOKE", &["--cost", "0.5", "--stock", "50"]);
    add_line(tmp, "BIKE", "FRAME", "1");
    add_line(tmp, "BIKE", "WHEEL", "2");
    add_line(tmp, "WHEEL", "SPOKE", "36");
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    forge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bills of materials"));
}

#[test]
fn test_version_displays() {
    forge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("forge"));
}

#[test]
fn test_unknown_command_fails() {
    forge().arg("explode-everything").assert().failure();
}

#[test]
fn test_command_outside_project_fails() {
    let tmp = TempDir::new().unwrap();
    forge()
        .current_dir(tmp.path())
        .args(["part", "list"])
        .assert()
        .failure();
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_project() {
    let tmp = TempDir::new().unwrap();
    forge()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized Forge project"));

    assert!(tmp.path().join(".forge").is_dir());
    assert!(tmp.path().join(".forge/config.yaml").is_file());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_test_project();
    forge()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_init_with_company_sets_default() {
    let tmp = setup_test_project();
    let config = fs::read_to_string(tmp.path().join(".forge/config.yaml")).unwrap();
    assert!(config.contains("company: ACME"));

    forge()
        .current_dir(tmp.path())
        .args(["company", "list", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ACME,Acme Cycles"));
}

// ============================================================================
// Part Tests
// ============================================================================

#[test]
fn test_part_new_and_list() {
    let tmp = setup_test_project();
    create_part(&tmp, "FRAME", &["--name", "Steel frame", "--stock", "4"]);

    forge()
        .current_dir(tmp.path())
        .args(["part", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FRAME"))
        .stdout(predicate::str::contains("Steel frame"));
}

#[test]
fn test_duplicate_part_number_fails() {
    let tmp = setup_test_project();
    create_part(&tmp, "FRAME", &[]);

    forge()
        .current_dir(tmp.path())
        .args(["part", "new", "FRAME"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_part_stock_cannot_go_negative() {
    let tmp = setup_test_project();
    create_part(&tmp, "BOLT", &["--stock", "3"]);

    forge()
        .current_dir(tmp.path())
        .args(["part", "stock", "BOLT", "-5"])
        .assert()
        .failure();

    forge()
        .current_dir(tmp.path())
        .args(["part", "stock", "BOLT", "-2"])
        .assert()
        .success();

    forge()
        .current_dir(tmp.path())
        .args(["part", "show", "BOLT", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stock_quantity\": 1"));
}

#[test]
fn test_delete_referenced_part_needs_cascade() {
    let tmp = setup_test_project();
    setup_bike(&tmp);

    forge()
        .current_dir(tmp.path())
        .args(["part", "delete", "SPOKE"])
        .assert()
        .failure();

    forge()
        .current_dir(tmp.path())
        .args(["part", "delete", "SPOKE", "--cascade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1 BOM line"));
}

// ============================================================================
// BOM Tests
// ============================================================================

#[test]
fn test_bom_explode_multiplies_levels() {
    let tmp = setup_test_project();
    setup_bike(&tmp);

    forge()
        .current_dir(tmp.path())
        .args(["bom", "explode", "BIKE", "--qty", "2", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SPOKE"))
        .stdout(predicate::str::contains(",144,"));
}

#[test]
fn test_bom_explode_leaf_uses_stock_unit() {
    let tmp = setup_test_project();
    create_part(&tmp, "FRAME", &["--type", "assembly"]);
    create_part(&tmp, "TUBE", &["--type", "raw-material", "--unit", "m"]);
    forge()
        .current_dir(tmp.path())
        .args(["bom", "add", "FRAME", "TUBE", "3", "--unit", "cm"])
        .assert()
        .success();

    forge()
        .current_dir(tmp.path())
        .args(["bom", "explode", "TUBE", "--qty", "2", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TUBE,TUBE,2,m,0,0"));
}

#[test]
fn test_bom_cost_rollup() {
    let tmp = setup_test_project();
    setup_bike(&tmp);

    // frame 80 + 72 spokes x 0.5
    forge()
        .current_dir(tmp.path())
        .args(["bom", "cost", "BIKE", "-f", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("116.00"));
}

#[test]
fn test_bom_cycle_rejected() {
    let tmp = setup_test_project();
    setup_bike(&tmp);

    forge()
        .current_dir(tmp.path())
        .args(["bom", "add", "SPOKE", "BIKE", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));

    forge()
        .current_dir(tmp.path())
        .args(["bom", "children", "SPOKE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has no components"));

    forge()
        .current_dir(tmp.path())
        .args(["bom", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acyclic"));
}

#[test]
fn test_bom_self_reference_rejected() {
    let tmp = setup_test_project();
    create_part(&tmp, "A", &[]);

    forge()
        .current_dir(tmp.path())
        .args(["bom", "add", "A", "A", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("component of itself"));
}

#[test]
fn test_bom_remove_absent_line_succeeds() {
    let tmp = setup_test_project();
    create_part(&tmp, "A", &[]);
    create_part(&tmp, "B", &[]);

    forge()
        .current_dir(tmp.path())
        .args(["bom", "remove", "A", "B"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not a component"));
}

#[test]
fn test_bom_add_updates_existing_line() {
    let tmp = setup_test_project();
    setup_bike(&tmp);

    forge()
        .current_dir(tmp.path())
        .args(["bom", "add", "WHEEL", "SPOKE", "32"])
        .assert()
        .success()
        .stdout(predicate::str::contains("was 36"));

    forge()
        .current_dir(tmp.path())
        .args(["bom", "where-used", "SPOKE", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"quantity\": 32.0"));
}

#[test]
fn test_bom_tree_and_export() {
    let tmp = setup_test_project();
    setup_bike(&tmp);

    forge()
        .current_dir(tmp.path())
        .args(["bom", "tree", "BIKE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("└─ SPOKE"));

    forge()
        .current_dir(tmp.path())
        .args(["bom", "export", "BIKE"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "level,parent,component,name,quantity,extended_quantity,unit",
        ))
        .stdout(predicate::str::contains("2,WHEEL,SPOKE,SPOKE,36,72,pcs"));
}

#[test]
fn test_bom_add_defaults_to_component_unit() {
    let tmp = setup_test_project();
    create_part(&tmp, "FRAME", &["--type", "assembly"]);
    create_part(&tmp, "TUBE", &["--type", "raw-material", "--unit", "m"]);

    forge()
        .current_dir(tmp.path())
        .args(["bom", "add", "FRAME", "TUBE", "2.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2.5 m"));

    forge()
        .current_dir(tmp.path())
        .args(["bom", "export", "FRAME"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1,FRAME,TUBE,TUBE,2.5,2.5,m"));
}

#[test]
fn test_import_bom_defaults_to_component_unit() {
    let tmp = setup_test_project();
    create_part(&tmp, "SHELF", &["--type", "assembly"]);
    create_part(&tmp, "GLUE", &["--type", "raw-material", "--unit", "ml"]);
    let bom_csv = tmp.path().join("bom.csv");
    fs::write(&bom_csv, "parent,component,quantity\nSHELF,GLUE,15\n").unwrap();

    forge()
        .current_dir(tmp.path())
        .args(["import", "bom"])
        .arg(&bom_csv)
        .assert()
        .success();

    forge()
        .current_dir(tmp.path())
        .args(["bom", "export", "SHELF"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1,SHELF,GLUE,GLUE,15,15,ml"));
}

// ============================================================================
// Order Tests
// ============================================================================

#[test]
fn test_order_plan_and_complete() {
    let tmp = setup_test_project();
    setup_bike(&tmp);

    forge()
        .current_dir(tmp.path())
        .args(["order", "new", "WO-1", "BIKE", "1"])
        .assert()
        .success();

    forge()
        .current_dir(tmp.path())
        .args(["order", "plan", "WO-1", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SPOKE"));

    // Completing straight from PLANNED is not allowed
    forge()
        .current_dir(tmp.path())
        .args(["order", "complete", "WO-1"])
        .assert()
        .failure();

    forge()
        .current_dir(tmp.path())
        .args(["order", "start", "WO-1"])
        .assert()
        .success();

    forge()
        .current_dir(tmp.path())
        .args(["order", "complete", "WO-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed WO-1"));

    forge()
        .current_dir(tmp.path())
        .args(["part", "show", "BIKE", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stock_quantity\": 1"));
}

#[test]
fn test_order_complete_short_stock_needs_force() {
    let tmp = setup_test_project();
    setup_bike(&tmp);

    forge()
        .current_dir(tmp.path())
        .args(["order", "new", "WO-2", "BIKE", "2"])
        .assert()
        .success();
    forge()
        .current_dir(tmp.path())
        .args(["order", "start", "WO-2"])
        .assert()
        .success();

    // 4 wheels needed, 3 on hand
    forge()
        .current_dir(tmp.path())
        .args(["order", "complete", "WO-2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("WHEEL"));

    forge()
        .current_dir(tmp.path())
        .args(["order", "complete", "WO-2", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("short by 1"));
}

// ============================================================================
// Seed, Import and Report Tests
// ============================================================================

#[test]
fn test_seed_then_plan() {
    let tmp = TempDir::new().unwrap();
    forge().current_dir(tmp.path()).arg("init").assert().success();
    forge().current_dir(tmp.path()).arg("seed").assert().success();

    forge()
        .current_dir(tmp.path())
        .args(["order", "plan", "WO-0001", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BOLT-M6"));

    forge()
        .current_dir(tmp.path())
        .args(["report", "low-stock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SEAT-01"));
}

#[test]
fn test_import_parts_and_bom() {
    let tmp = setup_test_project();
    let parts_csv = tmp.path().join("parts.csv");
    fs::write(
        &parts_csv,
        "part_number,name,type,stock,unit_cost\n\
         CART,Cart,product,0,\n\
         AXLE,Axle,component,10,4.5\n\
         WHEEL,Wheel,component,oops,2\n",
    )
    .unwrap();

    // Bad stock value on row 4 stops the import
    forge()
        .current_dir(tmp.path())
        .args(["import", "parts"])
        .arg(&parts_csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Row 4"));

    forge()
        .current_dir(tmp.path())
        .args(["import", "parts", "--skip-errors", "--update"])
        .arg(&parts_csv)
        .assert()
        .success();

    let bom_csv = tmp.path().join("bom.csv");
    fs::write(&bom_csv, "parent,component,quantity\nCART,AXLE,2\n").unwrap();

    forge()
        .current_dir(tmp.path())
        .args(["import", "bom", "--dry-run"])
        .arg(&bom_csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Would create"));

    forge()
        .current_dir(tmp.path())
        .args(["bom", "children", "CART"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has no components"));

    forge()
        .current_dir(tmp.path())
        .args(["import", "bom"])
        .arg(&bom_csv)
        .assert()
        .success();

    forge()
        .current_dir(tmp.path())
        .args(["bom", "children", "CART", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AXLE"));
}

#[test]
fn test_completions_generate() {
    forge()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("forge"));
}
