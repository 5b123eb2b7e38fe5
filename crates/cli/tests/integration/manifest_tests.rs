use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn manifest_before_build_fails() {
  let env = TestEnv::from_fixture("two_tools.json");

  env
    .run("manifest")
    .assert()
    .failure()
    .stderr(predicate::str::contains("component 'alpha' has not been built yet"));
}

#[test]
fn manifest_matches_built_one() {
  let env = TestEnv::from_fixture("two_tools.json");
  env.build_sources();
  let built = std::fs::read_to_string(env.default_manifest()).unwrap();

  env.run("manifest").assert().success().stdout(built);
}

#[test]
fn manifest_output_flag_writes_file() {
  let env = TestEnv::from_fixture("two_tools.json");
  env.build_sources();
  let path = env.temp.path().join("rendered.spec");

  env
    .run("manifest")
    .arg("--output")
    .arg(&path)
    .assert()
    .success()
    .stdout(predicate::str::contains("3 sources"));

  assert_eq!(
    std::fs::read_to_string(&path).unwrap(),
    std::fs::read_to_string(env.default_manifest()).unwrap()
  );
}
