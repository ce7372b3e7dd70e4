use predicates::prelude::*;

use super::common::TestEnv;

const SMALL_REGISTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<salesforceMetadata>
    <version API="50.0"/>
    <extension name="cls">
        <container>classes</container>
        <metadata>ApexClass</metadata>
        <destructible>true</destructible>
    </extension>
    <extension name="profile">
        <container>profiles</container>
        <metadata>Profile</metadata>
        <destructible>false</destructible>
    </extension>
</salesforceMetadata>
"#;

#[test]
fn prints_manifest_to_stdout() {
  let env = TestEnv::empty();

  env
    .metapack_cmd()
    .args(["manifest", "classes/Foo.cls", "classes/Foo.cls-meta.xml", "objects/Bar.object"])
    .assert()
    .success()
    .stdout(predicate::str::starts_with("<?xml"))
    .stdout(predicate::str::contains("<name>ApexClass</name>"))
    .stdout(predicate::str::contains("<members>Foo</members>"))
    .stdout(predicate::str::contains("<members>Bar</members>"))
    .stdout(predicate::str::contains("<version>58.0</version>"));
}

#[test]
fn destructive_skips_non_destructible_types() {
  let env = TestEnv::empty();

  env
    .metapack_cmd()
    .args(["manifest", "--destructive", "classes/Foo.cls", "profiles/Admin.profile"])
    .assert()
    .success()
    .stdout(predicate::str::contains("<members>Foo</members>"))
    .stdout(predicate::str::contains("Admin").not())
    .stderr(predicate::str::contains("profiles/Admin.profile"));
}

#[test]
fn unknown_extension_is_reported_not_fatal() {
  let env = TestEnv::empty();

  env
    .metapack_cmd()
    .args(["manifest", "docs/readme.txt", "classes/Foo.cls"])
    .assert()
    .success()
    .stdout(predicate::str::contains("readme").not())
    .stderr(predicate::str::contains("not a deployable member"));
}

#[test]
fn writes_manifest_to_file() {
  let env = TestEnv::empty();

  env
    .metapack_cmd()
    .args(["manifest", "--out", "out/package.xml", "classes/Foo.cls"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1 member(s)"));

  let content = env.read_file("out/package.xml");
  assert!(content.contains("<members>Foo</members>"));
}

#[test]
fn custom_registry_is_used() {
  let env = TestEnv::empty();
  env.write_file("registry.xml", SMALL_REGISTRY);

  env
    .metapack_cmd()
    .args(["--registry", "registry.xml", "manifest", "classes/Foo.cls", "objects/Bar.object"])
    .assert()
    .success()
    .stdout(predicate::str::contains("<version>50.0</version>"))
    .stdout(predicate::str::contains("Bar").not());
}

#[test]
fn registry_from_environment() {
  let env = TestEnv::empty();
  env.write_file("registry.xml", SMALL_REGISTRY);

  env
    .metapack_cmd()
    .env("METAPACK_REGISTRY", env.temp.path().join("registry.xml"))
    .arg("types")
    .assert()
    .success()
    .stdout(predicate::str::contains("50.0"))
    .stdout(predicate::str::contains("CustomObject").not());
}
