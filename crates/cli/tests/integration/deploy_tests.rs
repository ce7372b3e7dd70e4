use predicates::prelude::*;

use super::common::{TestEnv, parse_outputs, path_of};

/// Two commits: `A.cls` modified, `B.cls` deleted, `C.object` added.
fn two_commit_repo() -> (TestEnv, String, String) {
  let env = TestEnv::git();
  env.write_file("classes/A.cls", "class A { v1 }");
  env.write_file("classes/A.cls-meta.xml", "<meta/>");
  env.write_file("classes/B.cls", "class B {}");
  env.write_file("profiles/Admin.profile", "<profile/>");
  env.write_file("README.txt", "docs");
  let first = env.commit_all("first");

  env.write_file("classes/A.cls", "class A { v2 }");
  env.remove_file("classes/B.cls");
  env.write_file("objects/C.object", "<object/>");
  let second = env.commit_all("second");

  (env, first, second)
}

#[test]
fn first_build_deploys_whole_tree() {
  let (env, _, second) = two_commit_repo();

  let output = env.deploy_cmd(&second, None).output().unwrap();
  assert!(output.status.success(), "deploy failed: {}", String::from_utf8_lossy(&output.stderr));

  let outputs = parse_outputs(&output.stdout);
  assert_eq!(outputs.len(), 1);
  assert_eq!(path_of(&outputs, "METAPACK_DEPLOY"), Some(env.workspace().join("metapack")));

  let package = env.read_file("metapack/package.xml");
  assert!(package.contains("<name>ApexClass</name>"));
  assert!(package.contains("<members>A</members>"));
  assert!(package.contains("<members>C</members>"));
  assert!(package.contains("<members>Admin</members>"));
  assert!(!package.contains("<members>B</members>"));

  assert!(env.exists("metapack/destructiveChanges.xml"));
  assert!(env.exists("metapack/classes/A.cls-meta.xml"));
  assert!(!env.exists("metapack/README.txt"));
}

#[test]
fn diff_build_with_rollback() {
  let (env, first, second) = two_commit_repo();

  let output = env
    .deploy_cmd(&second, Some(&first))
    .arg("--rollback")
    .output()
    .unwrap();
  assert!(output.status.success(), "deploy failed: {}", String::from_utf8_lossy(&output.stderr));

  let destructive = env.read_file("metapack/destructiveChanges.xml");
  assert!(destructive.contains("<members>B</members>"));

  let package = env.read_file("metapack/package.xml");
  assert!(package.contains("<members>A</members>"));
  assert!(package.contains("<members>C</members>"));
  assert!(!package.contains("Admin"));
  assert_eq!(env.read_file("metapack/classes/A.cls"), "class A { v2 }");
  assert!(!env.exists("metapack/classes/B.cls"));

  let outputs = parse_outputs(&output.stdout);
  let archive = path_of(&outputs, "METAPACK_ROLLBACK").unwrap();
  assert_eq!(archive, env.workspace().join("metapack-test-1.zip"));
  assert!(archive.exists());
  assert!(!env.exists("metapack-rollback"));
}

#[test]
fn rollback_without_previous_commit_is_skipped() {
  let (env, _, second) = two_commit_repo();

  let output = env.deploy_cmd(&second, None).arg("--rollback").output().unwrap();
  assert!(output.status.success());

  let outputs = parse_outputs(&output.stdout);
  assert_eq!(path_of(&outputs, "METAPACK_ROLLBACK"), None);
}

#[test]
fn update_package_commits_repository_manifest() {
  let (env, first, second) = two_commit_repo();

  env
    .deploy_cmd(&second, Some(&first))
    .arg("--update-package")
    .env("GIT_COMMITTER_NAME", "Deploy Bot")
    .env("GIT_COMMITTER_EMAIL", "bot@example.com")
    .assert()
    .success();

  let manifest = env.read_file("package.xml");
  assert!(manifest.contains("<members>*</members>"));
  assert!(manifest.contains("<name>CustomObject</name>"));

  assert_ne!(env.git_cmd(&["rev-parse", "HEAD"]), second);
  assert_eq!(env.git_cmd(&["log", "-1", "--format=%an <%ae>"]), "Deploy Bot <bot@example.com>");
  assert_eq!(env.git_cmd(&["log", "-1", "--format=%H", "--", "package.xml"]).len(), 40);
}

#[test]
fn update_package_without_identity_fails() {
  let (env, first, second) = two_commit_repo();

  env
    .deploy_cmd(&second, Some(&first))
    .arg("--update-package")
    .assert()
    .failure()
    .stderr(predicate::str::contains("committer"));

  assert!(!env.exists("metapack"));
}

#[test]
fn missing_commit_fails() {
  let (env, _, _) = two_commit_repo();

  env
    .metapack_cmd()
    .arg("deploy")
    .env("WORKSPACE", env.temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("no current commit"));
}

#[test]
fn unknown_commit_fails() {
  let (env, _, _) = two_commit_repo();

  env
    .deploy_cmd("0000000000000000000000000000000000000000", None)
    .assert()
    .failure()
    .stderr(predicate::str::contains("change set"));
}

#[test]
fn workspace_must_be_a_repository() {
  let env = TestEnv::empty();

  env
    .deploy_cmd("HEAD", None)
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to open repository"));
}

#[test]
fn outputs_file_and_json() {
  let (env, first, second) = two_commit_repo();

  let output = env
    .deploy_cmd(&second, Some(&first))
    .args(["--rollback", "--outputs-file", "deploy.properties", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success(), "deploy failed: {}", String::from_utf8_lossy(&output.stderr));

  let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let deploy_dir = env.workspace().join("metapack");
  assert_eq!(value["outputs"]["METAPACK_DEPLOY"], deploy_dir.display().to_string());
  assert!(value["outputs"]["METAPACK_ROLLBACK"].is_string());
  assert_eq!(value["outcome"]["changes"]["deletions"], 1);
  assert_eq!(value["outcome"]["changes"]["full_tree"], false);

  let properties = env.read_file("deploy.properties");
  assert!(properties.starts_with(&format!("METAPACK_DEPLOY={}\n", deploy_dir.display())));
  assert!(properties.contains("METAPACK_ROLLBACK="));
}

#[test]
fn custom_stage_name() {
  let (env, _, second) = two_commit_repo();

  env
    .deploy_cmd(&second, None)
    .args(["--stage-name", "release"])
    .assert()
    .success()
    .stdout(predicate::str::contains("release"));

  assert!(env.exists("release/package.xml"));
  assert!(!env.exists("metapack"));
}

#[test]
fn unsafe_stage_name_is_rejected() {
  let (env, _, second) = two_commit_repo();
  env.write_file("precious/notes.txt", "keep me");

  for name in ["", ".", ".."] {
    env
      .deploy_cmd(&second, None)
      .args(["--stage-name", name])
      .assert()
      .failure()
      .stderr(predicate::str::contains("invalid stage name"));
  }

  assert_eq!(env.read_file("precious/notes.txt"), "keep me");
  assert!(env.exists("classes/A.cls"));
}
