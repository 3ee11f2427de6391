//! CLI command integration tests.
//! Each test uses a temp directory via DDA_DATA_DIR for full isolation.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"{
  "variables": [
    { "name": "Health", "terms": [
      { "label": "Low",  "points": [0.0, 0.0, 0.5] },
      { "label": "High", "points": [0.5, 1.0, 1.0] }
    ]},
    { "name": "SpawnRate", "terms": [
      { "label": "Low",  "points": [0.0, 0.0, 0.5] },
      { "label": "High", "points": [0.5, 1.0, 1.0] }
    ]}
  ],
  "rules": [
    { "conditions": [{ "variable": "Health", "term": "Low" }],
      "actions": [{ "variable": "SpawnRate", "term": "High" }] },
    { "conditions": [{ "variable": "Health", "term": "High" }],
      "actions": [{ "variable": "SpawnRate", "term": "Low" }] }
  ]
}"#;

const BROKEN: &str = r#"{
  "variables": [
    { "name": "Health", "terms": [{ "label": "Low", "points": [0.0, 0.5] }] }
  ],
  "rules": [
    { "conditions": [{ "variable": "Speed", "term": "Low" }],
      "actions": [{ "variable": "Health", "term": "Low" }] }
  ]
}"#;

fn dda_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("dda").unwrap();
    cmd.env("DDA_DATA_DIR", data_dir.path());
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn eval_low_health_raises_spawn_rate() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    let output = dda_cmd(&dir)
        .args(["eval", "--config"])
        .arg(&config)
        .arg("Health=0.1")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: f64 = stdout
        .trim()
        .strip_prefix("SpawnRate = ")
        .expect("one SpawnRate line")
        .parse()
        .unwrap();
    assert!(value > 0.8, "got {value}");
}

#[test]
fn eval_without_firing_rules_reports_no_adjustments() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    // 0.5 sits on the feet of both Health terms
    dda_cmd(&dir)
        .args(["eval", "--config"])
        .arg(&config)
        .arg("Health=0.5")
        .assert()
        .success()
        .stdout("(no adjustments)\n");
}

#[test]
fn eval_json_output() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    let output = dda_cmd(&dir)
        .args(["eval", "--json", "--config"])
        .arg(&config)
        .arg("Health=1.0")
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let spawn = parsed["SpawnRate"].as_f64().unwrap();
    assert!(spawn < 0.2, "got {spawn}");
}

#[test]
fn eval_verbose_lists_fired_rules() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    dda_cmd(&dir)
        .args(["--verbose", "eval", "--config"])
        .arg(&config)
        .arg("Health=0.1")
        .assert()
        .success()
        .stderr(predicate::str::contains("rule 0 fired at 0.8000"))
        .stderr(predicate::str::contains("1 of 2 rules fired"));
}

#[test]
fn eval_rejects_malformed_assignment() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    dda_cmd(&dir)
        .args(["eval", "--config"])
        .arg(&config)
        .arg("Health")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=VALUE"));
}

#[test]
fn eval_accepts_toml_config() {
    let dir = TempDir::new().unwrap();
    let config = write(
        &dir,
        "mini.toml",
        r#"
[[variables]]
name = "Health"
terms = [{ label = "Low", points = [0.0, 0.0, 0.5] }]

[[variables]]
name = "Difficulty"
terms = [{ label = "Mid", points = [0.25, 0.5, 0.75] }]

[[rules]]
conditions = [{ variable = "Health", term = "Low" }]
actions = [{ variable = "Difficulty", term = "Mid" }]
"#,
    );

    dda_cmd(&dir)
        .args(["eval", "--config"])
        .arg(&config)
        .arg("Health=0.0")
        .assert()
        .success()
        .stdout("Difficulty = 0.5000\n");
}

#[test]
fn check_clean_config() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    dda_cmd(&dir)
        .args(["check", "--strict", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 variables, 2 rules"))
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn check_reports_issues_without_failing() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "broken.json", BROKEN);

    dda_cmd(&dir)
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("has 2 points, expected 3 or 4"))
        .stdout(predicate::str::contains("unknown variable 'Speed'"))
        .stdout(predicate::str::contains("2 issue(s)"));
}

#[test]
fn check_strict_fails_on_issues() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "broken.json", BROKEN);

    dda_cmd(&dir)
        .args(["check", "--strict", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 configuration issue(s)"));
}

#[test]
fn check_unknown_extension_fails() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.yaml", CONFIG);

    dda_cmd(&dir)
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported config extension"));
}

#[test]
fn stats_fresh_db() {
    let dir = TempDir::new().unwrap();
    dda_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("(no sessions recorded)"));
}

#[test]
fn simulate_then_stats() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    dda_cmd(&dir)
        .args(["simulate", "--cycles", "30", "--seed", "9", "--label", "nightly"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("cycles:   30"))
        .stdout(predicate::str::contains("flow ratio:"))
        .stdout(predicate::str::contains("Health"))
        .stdout(predicate::str::contains("rule coverage (2 rules):"));

    dda_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("nightly"))
        .stdout(predicate::str::contains("30 cycles"));
}

#[test]
fn simulate_is_deterministic_per_seed() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    let run = || {
        let output = dda_cmd(&dir)
            .args(["simulate", "--no-log", "--cycles", "50", "--seed", "1"])
            .arg("--config")
            .arg(&config)
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    };

    let first = run();
    assert!(first.contains("session:  (not recorded)"));
    assert_eq!(first, run());
}

#[test]
fn simulate_no_log_leaves_store_empty() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    dda_cmd(&dir)
        .args(["simulate", "--no-log", "--cycles", "5"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    assert!(!dir.path().join("sessions.db").exists());
}

#[test]
fn simulate_with_settings_and_data_dir_flag() {
    let dir = TempDir::new().unwrap();
    let other = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);
    let settings = write(
        &dir,
        "settings.toml",
        r#"
evaluation_interval = 0.0

[[series]]
metric = "Health"
lower = 0.3
upper = 0.7
"#,
    );

    dda_cmd(&dir)
        .args(["simulate", "--cycles", "10", "--label", "elsewhere"])
        .arg("--config")
        .arg(&config)
        .arg("--settings")
        .arg(&settings)
        .arg("--data-dir")
        .arg(other.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cycles:   10"));

    assert!(other.path().join("sessions.db").exists());
    assert!(!dir.path().join("sessions.db").exists());
}

#[test]
fn simulate_rejects_bad_settings() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);
    let settings = write(
        &dir,
        "settings.toml",
        "[[series]]\nmetric = \"Health\"\nlower = 0.9\nupper = 0.1\n",
    );

    dda_cmd(&dir)
        .args(["simulate", "--no-log"])
        .arg("--config")
        .arg(&config)
        .arg("--settings")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load settings"));
}

#[test]
fn stats_for_one_session() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);

    dda_cmd(&dir)
        .args(["simulate", "--cycles", "12"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    let db = dda_store::SessionLog::open(&dir.path().join("sessions.db")).unwrap();
    let sessions = db.list_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].label, "seed-0");
    drop(db);

    dda_cmd(&dir)
        .args(["stats", "--session", &sessions[0].id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("cycles:   12"))
        .stdout(predicate::str::contains("samples:  12"));
}

#[test]
fn simulate_rejects_infinite_interval() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "shooter.json", CONFIG);
    let settings = write(&dir, "settings.toml", "evaluation_interval = inf\n");

    dda_cmd(&dir)
        .args(["simulate", "--no-log", "--cycles", "3"])
        .arg("--config")
        .arg(&config)
        .arg("--settings")
        .arg(&settings)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("evaluation_interval"));
}

#[test]
fn eval_repeated_output_label_uses_both_terms() {
    let dir = TempDir::new().unwrap();
    let config = write(
        &dir,
        "extremes.toml",
        r#"
[[variables]]
name = "Health"
terms = [{ label = "Low", points = [0.0, 0.0, 0.5] }]

[[variables]]
name = "Difficulty"
terms = [
  { label = "Extreme", points = [0.0, 0.0, 0.2] },
  { label = "Extreme", points = [0.8, 1.0, 1.0] },
]

[[rules]]
conditions = [{ variable = "Health", term = "Low" }]
actions = [{ variable = "Difficulty", term = "Extreme" }]
"#,
    );

    dda_cmd(&dir)
        .args(["eval", "--config"])
        .arg(&config)
        .arg("Health=0.0")
        .assert()
        .success()
        .stdout("Difficulty = 0.5000\n");
}
