use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plan_on_empty_cache_lists_everything_to_build() {
  let env = TestEnv::from_fixture("two_tools.json");

  env
    .run("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("alpha (to build)"))
    .stdout(predicate::str::contains("beta (to build)"));

  assert!(!env.cache_path().exists());
}

#[test]
fn plan_after_build_reports_cached() {
  let env = TestEnv::from_fixture("two_tools.json");
  env.build_sources();

  env
    .run("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("alpha (cached)"))
    .stdout(predicate::str::contains("beta (cached)"));
}

#[test]
fn plan_json_output_is_valid() {
  let env = TestEnv::from_fixture("two_tools.json");

  let output = env.run("plan").args(["--format", "json"]).output().unwrap();

  assert!(output.status.success());
  let statuses: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(statuses[0]["name"], "alpha");
  assert_eq!(statuses[0]["state"], "pending");
}

#[test]
fn plan_honors_cache_dir_flag() {
  let env = TestEnv::from_fixture("two_tools.json");
  env.build_sources();
  let elsewhere = env.temp.path().join("other-cache");

  env
    .run("plan")
    .arg("--cache-dir")
    .arg(&elsewhere)
    .assert()
    .success()
    .stdout(predicate::str::contains("alpha (to build)"));
}

#[test]
fn duplicate_component_names_rejected() {
  let env = TestEnv::from_fixture("duplicate_names.json");

  env
    .run("plan")
    .assert()
    .failure()
    .stderr(predicate::str::contains("duplicate component 'alpha'"));
}
