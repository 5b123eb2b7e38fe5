use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_writes_manifest_and_links_sources() {
  let env = TestEnv::from_fixture("two_tools.json");

  env
    .run("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Package built!"));

  let spec = std::fs::read_to_string(env.default_manifest()).unwrap();
  assert!(spec.contains("Name: demo\n"));
  assert!(spec.contains("Source100: launcher\nSource101: alpha\nSource102: beta\n"));
  assert!(spec.contains("install -p -D -m 0755 %{SOURCE101} %{buildroot}/usr/libexec/demo/alpha\n"));

  let src = env.cache_path().join("src");
  assert_eq!(std::fs::read_to_string(src.join("alpha")).unwrap(), "alpha\n");
  assert!(src.join("launcher").exists());
}

#[test]
fn second_build_uses_cache() {
  let env = TestEnv::from_fixture("two_tools.json");
  env.build_sources();
  let first = std::fs::read_to_string(env.default_manifest()).unwrap();

  env
    .run("build")
    .args(["--skip-bootstrap", "--no-package"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Sources ready!"))
    .stdout(predicate::str::contains("Cached: 2"));

  assert_eq!(std::fs::read_to_string(env.default_manifest()).unwrap(), first);
}

#[test]
fn build_json_output_is_valid() {
  let env = TestEnv::from_fixture("two_tools.json");

  let output = env
    .run("build")
    .args(["--skip-bootstrap", "--no-package", "--format", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["built"], 2);
  assert_eq!(report["sources"], 3);
  assert_eq!(report["packaged"], false);
  assert_eq!(report["manifest_digest"].as_str().unwrap().len(), 64);
}

#[test]
fn build_honors_manifest_flag() {
  let env = TestEnv::from_fixture("two_tools.json");
  let manifest = env.temp.path().join("out/custom.spec");

  env
    .run("build")
    .args(["--skip-bootstrap", "--no-package", "--manifest"])
    .arg(&manifest)
    .assert()
    .success();

  assert!(manifest.exists());
  assert!(!env.default_manifest().exists());
}

#[test]
fn overflow_fails_without_writing_manifest() {
  let env = TestEnv::from_fixture("overflow.json");

  env
    .run("build")
    .args(["--skip-bootstrap", "--no-package"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("3 sources do not fit in 2 available slots"));

  assert!(!env.default_manifest().exists());
}

#[test]
fn failing_step_names_component() {
  let env = TestEnv::from_fixture("failing_step.json");

  env
    .run("build")
    .args(["--skip-bootstrap", "--no-package"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("component 'beta' step 1 failed"));

  assert!(env.cache_path().join("bin/alpha").exists());
  assert!(!env.default_manifest().exists());
}

#[test]
fn build_tool_output_stays_off_json_stdout() {
  let env = TestEnv::from_fixture("noisy_steps.json");

  let output = env
    .run("build")
    .args(["--skip-bootstrap", "--no-package", "--format", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["built"], 2);
  assert!(String::from_utf8_lossy(&output.stderr).contains("compiling alpha"));
}
