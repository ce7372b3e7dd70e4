//! End-to-end runs of the deployment flow against real git repositories.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::process::Command;

use metapack_lib::deploy::{DeployEnv, DeployOptions, Phase, deploy};
use metapack_lib::manifest::PackageManifest;
use metapack_lib::vcs::Identity;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
  let output = Command::new("git")
    .arg("-C")
    .arg(dir)
    .args(args)
    .env("GIT_AUTHOR_NAME", "Test Runner")
    .env("GIT_AUTHOR_EMAIL", "runner@example.com")
    .env("GIT_COMMITTER_NAME", "Test Runner")
    .env("GIT_COMMITTER_EMAIL", "runner@example.com")
    .output()
    .unwrap();
  assert!(output.status.success(), "git {:?}: {}", args, String::from_utf8_lossy(&output.stderr));
  String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write(dir: &Path, rel: &str, content: &str) {
  let path = dir.join(rel);
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, content).unwrap();
}

fn commit_all(dir: &Path, message: &str) -> String {
  git(dir, &["add", "-A"]);
  git(dir, &["commit", "-q", "-m", message]);
  git(dir, &["rev-parse", "HEAD"])
}

struct Repo {
  temp: TempDir,
  first: String,
  second: String,
}

/// First commit has two classes, a trigger and a profile. The second modifies
/// `Foo.cls`, deletes `Gone.cls` and the trigger, and adds an object.
fn repo() -> Repo {
  let temp = TempDir::new().unwrap();
  let dir = temp.path();
  git(dir, &["init", "-q"]);

  write(dir, "src/classes/Foo.cls", "class Foo { v1 }");
  write(dir, "src/classes/Foo.cls-meta.xml", "<meta/>");
  write(dir, "src/classes/Gone.cls", "class Gone {}");
  write(dir, "src/triggers/Acct.trigger", "trigger Acct {}");
  write(dir, "src/profiles/Admin.profile", "<profile/>");
  let first = commit_all(dir, "first");

  write(dir, "src/classes/Foo.cls", "class Foo { v2 }");
  fs::remove_file(dir.join("src/classes/Gone.cls")).unwrap();
  fs::remove_file(dir.join("src/triggers/Acct.trigger")).unwrap();
  write(dir, "src/objects/Invoice.object", "<object/>");
  let second = commit_all(dir, "second");

  Repo { temp, first, second }
}

fn env(repo: &Repo, previous: Option<&str>) -> DeployEnv {
  DeployEnv {
    commit: repo.second.clone(),
    previous_commit: previous.map(String::from),
    workspace: repo.temp.path().to_path_buf(),
    build_tag: Some("nightly-3".to_string()),
    committer: Some(Identity {
      name: "Deploy Bot".to_string(),
      email: "bot@example.com".to_string(),
    }),
    ..DeployEnv::default()
  }
}

fn read_manifest(path: &Path) -> PackageManifest {
  PackageManifest::from_xml(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn diff_deploy_with_rollback_and_package_update() {
  let repo = repo();
  let options = DeployOptions {
    rollback: true,
    update_package: true,
    ..DeployOptions::default()
  };

  let outcome = deploy(None, &env(&repo, Some(&repo.first)), &options).unwrap();

  let destructive = read_manifest(&outcome.destructive_manifest_path);
  assert_eq!(destructive.group("ApexClass").unwrap().members, vec!["Gone"]);
  assert_eq!(destructive.group("ApexTrigger").unwrap().members, vec!["Acct"]);

  let package = read_manifest(&outcome.manifest_path);
  assert_eq!(package.types[0].name, "CustomObject");
  assert_eq!(package.group("ApexClass").unwrap().members, vec!["Foo"]);
  assert_eq!(
    fs::read_to_string(outcome.deploy_dir.join("src/classes/Foo.cls")).unwrap(),
    "class Foo { v2 }"
  );

  let archive_path = outcome.rollback_archive.clone().unwrap();
  let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
  let mut restored = String::new();
  archive
    .by_name("src/classes/Gone.cls")
    .unwrap()
    .read_to_string(&mut restored)
    .unwrap();
  assert_eq!(restored, "class Gone {}");

  let mut rollback_destructive = String::new();
  archive
    .by_name("destructiveChanges.xml")
    .unwrap()
    .read_to_string(&mut rollback_destructive)
    .unwrap();
  assert!(rollback_destructive.contains("<members>Invoice</members>"));

  assert_eq!(outcome.package_updated, Some(true));
  let head_author = git(repo.temp.path(), &["log", "-1", "--format=%an"]);
  assert_eq!(head_author, "Deploy Bot");
}

#[test]
fn second_package_update_is_a_no_op() {
  let repo = repo();
  let options = DeployOptions {
    update_package: true,
    ..DeployOptions::default()
  };

  deploy(None, &env(&repo, None), &options).unwrap();
  let head = git(repo.temp.path(), &["rev-parse", "HEAD"]);

  let outcome = deploy(None, &env(&repo, None), &options).unwrap();

  assert_eq!(outcome.package_updated, Some(false));
  assert_eq!(git(repo.temp.path(), &["rev-parse", "HEAD"]), head);
}

#[test]
fn missing_previous_commit_fails_in_change_set_phase() {
  let repo = repo();

  let err = deploy(
    None,
    &env(&repo, Some("0123456789abcdef0123456789abcdef01234567")),
    &DeployOptions::default(),
  )
  .unwrap_err();

  assert_eq!(err.phase(), Phase::ChangeSet);
}
