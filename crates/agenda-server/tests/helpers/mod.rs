#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SPACE_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8057";
pub const USER_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8058";
pub const GROCERIES_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8001";
pub const CHORES_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8002";
pub const CHORES_TOKEN: &str = "chores-share";
pub const DENTIST_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8101";
pub const GYM_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8102";
pub const VACUUM_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8103";

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("agenda").expect("Failed to find agenda binary");

        // Keep any agenda.toml of the developer out of the picture
        cmd.current_dir(self.temp_dir.path());
        cmd.env("AGENDA_DATABASE__PATH", &self.db_path);
        cmd.env("RUST_LOG", "warn");

        cmd
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Write a file into the harness directory and return its path
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write test file");
        path
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Seed the standard fixture
    pub fn seed_fixture(&self) {
        let path = self.write_file("fixture.json", &fixture_json());
        self.run_success(&["seed", &path.to_string_lossy()]);
    }
}

/// Two collections in one space:
/// - Groceries: a one-off dentist visit on 2024-01-03 and a daily gym habit
/// - Chores (shared through an invite token): a vacuum task on 2024-01-04
pub fn fixture_json() -> String {
    serde_json::json!({
        "collections": [
            { "id": GROCERIES_ID, "name": "Groceries", "spaceId": SPACE_ID },
            { "id": CHORES_ID, "name": "Chores", "spaceId": SPACE_ID, "inviteToken": CHORES_TOKEN }
        ],
        "labels": [],
        "tasks": [
            { "id": DENTIST_ID, "name": "Dentist", "spaceId": SPACE_ID,
              "collectionId": GROCERIES_ID, "start": "2024-01-03T15:00:00Z", "agendaOrder": "a" },
            { "id": GYM_ID, "name": "Gym", "spaceId": SPACE_ID, "collectionId": GROCERIES_ID,
              "agendaOrder": "b",
              "recurrenceRule": { "freq": "DAILY", "dtstart": "2024-01-01T07:00:00.000Z" } },
            { "id": VACUUM_ID, "name": "Vacuum", "spaceId": SPACE_ID,
              "collectionId": CHORES_ID, "start": "2024-01-04T10:00:00Z" }
        ],
        "completions": [
            { "taskId": DENTIST_ID, "completedAt": "2024-01-03T16:00:00Z" }
        ]
    })
    .to_string()
}
