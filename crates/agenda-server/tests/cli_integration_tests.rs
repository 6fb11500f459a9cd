/// Black-box tests for the `agenda` binary: seeding fixtures and printing
/// planner output against a temporary database.
use predicates::prelude::*;
use serde_json::Value;

mod helpers;
use helpers::*;

fn planner_json(harness: &CliTestHarness, args: &[&str]) -> Value {
    let output = harness.run_success(args).get_output().stdout.clone();
    serde_json::from_slice(&output).expect("planner output is JSON")
}

fn week_args<'a>(extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec![
        "planner",
        "--type",
        "week",
        "--start",
        "2024-01-01T00:00:00.000Z",
        "--end",
        "2024-01-08T00:00:00.000Z",
        "--timezone",
        "UTC",
    ];
    args.extend_from_slice(extra);
    args
}

#[test]
fn test_cli_help_and_version() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&["--help"])
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("planner"))
        .stdout(predicate::str::contains("seed"));

    harness
        .run_success(&["--version"])
        .stdout(predicate::str::contains("agenda"));

    harness
        .run_failure(&["invalid-command"])
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_seed_reports_counts() {
    let harness = CliTestHarness::new();
    let path = harness.write_file("fixture.json", &fixture_json());

    harness
        .run_success(&["seed", &path.to_string_lossy()])
        .stdout(predicate::str::contains("2 collections"))
        .stdout(predicate::str::contains("3 tasks"))
        .stdout(predicate::str::contains("1 completions"));

    assert!(harness.db_path().exists());
}

#[test]
fn test_seed_rejects_malformed_fixture() {
    let harness = CliTestHarness::new();
    let path = harness.write_file("broken.json", "{ not json");

    harness
        .run_failure(&["seed", &path.to_string_lossy()])
        .stderr(predicate::str::contains("Invalid fixture"));
}

#[test]
fn test_planner_week_view() {
    let harness = CliTestHarness::new();
    harness.seed_fixture();

    let buckets = planner_json(
        &harness,
        &week_args(&["--id", GROCERIES_ID, "--space", SPACE_ID, "--user", USER_ID]),
    );
    let buckets = buckets.as_array().expect("array of buckets");

    assert_eq!(buckets.len(), 7);
    assert_eq!(buckets[0]["start"], "2024-01-01T00:00:00.000Z");
    assert_eq!(buckets[0]["end"], "2024-01-01T23:59:59.000Z");

    for bucket in buckets {
        let gym = &bucket["entities"][GYM_ID];
        assert_eq!(gym["name"], "Gym");
        assert!(gym["occurrenceDate"].as_str().unwrap().ends_with("T07:00:00.000Z"));
    }

    let dentist = &buckets[2]["entities"][DENTIST_ID];
    assert_eq!(dentist["name"], "Dentist");
    assert!(dentist.get("occurrenceDate").is_none());
    assert_eq!(dentist["completionInstances"].as_array().unwrap().len(), 1);
    assert!(buckets[3]["entities"].get(DENTIST_ID).is_none());
    assert!(buckets[3]["entities"].get(VACUUM_ID).is_none());
}

#[test]
fn test_planner_all_flag_includes_other_collections() {
    let harness = CliTestHarness::new();
    harness.seed_fixture();

    let buckets = planner_json(
        &harness,
        &week_args(&["--id", GROCERIES_ID, "--all", "--space", SPACE_ID, "--user", USER_ID]),
    );
    assert_eq!(buckets[3]["entities"][VACUUM_ID]["name"], "Vacuum");
}

#[test]
fn test_planner_public_token_access() {
    let harness = CliTestHarness::new();
    harness.seed_fixture();

    let buckets = planner_json(&harness, &week_args(&["--id", CHORES_TOKEN, "--public"]));
    let buckets = buckets.as_array().unwrap();

    let total: usize = buckets
        .iter()
        .map(|b| b["entities"].as_object().unwrap().len())
        .sum();
    assert_eq!(total, 1);
    assert_eq!(buckets[3]["entities"][VACUUM_ID]["name"], "Vacuum");
}

#[test]
fn test_planner_timezone_shifts_occurrences() {
    let harness = CliTestHarness::new();
    harness.seed_fixture();

    let args = [
        "planner", "--type", "week",
        "--start", "2024-01-01T00:00:00.000Z",
        "--end", "2024-01-08T00:00:00.000Z",
        "--timezone", "America/New_York",
        "--id", GROCERIES_ID, "--space", SPACE_ID, "--user", USER_ID,
    ];
    let buckets = planner_json(&harness, &args);
    assert_eq!(
        buckets[0]["entities"][GYM_ID]["occurrenceDate"],
        "2024-01-01T12:00:00.000Z"
    );
}

#[test]
fn test_planner_rejects_invalid_timezone() {
    let harness = CliTestHarness::new();
    harness.seed_fixture();

    let mut args = week_args(&["--id", GROCERIES_ID, "--space", SPACE_ID, "--user", USER_ID]);
    args[8] = "Mars/Olympus_Mons";

    harness
        .run_failure(&args)
        .stderr(predicate::str::contains("Invalid timezone"))
        .stderr(predicate::str::contains("Mars/Olympus_Mons"));
}

#[test]
fn test_planner_rejects_reversed_range() {
    let harness = CliTestHarness::new();

    harness
        .run_failure(&[
            "planner", "--type", "month",
            "--start", "2024-02-01", "--end", "2024-01-01",
            "--timezone", "UTC", "--id", GROCERIES_ID,
            "--space", SPACE_ID, "--user", USER_ID,
        ])
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn test_config_file_sets_default_timezone() {
    let harness = CliTestHarness::new();
    harness.seed_fixture();
    let config = harness.write_file(
        "custom.toml",
        "[planner]\ndefault_timezone = \"America/New_York\"\n",
    );

    let buckets = planner_json(
        &harness,
        &[
            "--config", &config.to_string_lossy(),
            "planner", "--type", "week",
            "--start", "2024-01-01T00:00:00.000Z",
            "--end", "2024-01-08T00:00:00.000Z",
            "--id", GROCERIES_ID, "--space", SPACE_ID, "--user", USER_ID,
        ],
    );
    assert_eq!(
        buckets[0]["entities"][GYM_ID]["occurrenceDate"],
        "2024-01-01T12:00:00.000Z"
    );
}
