use assert_cmd::Command;
use predicates::prelude::*;

fn write_source(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).expect("write source");
    path
}

#[test]
fn minifies_to_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_source(&dir, "cart.lua", "local value = 1 + 2\nprint(value)\n");

    Command::cargo_bin("luashrink")
        .expect("binary")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("print(3)"));
}

#[test]
fn writes_output_file_and_stats() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_source(&dir, "cart.lua", "local value = 1 + 2\nprint(value)\n");
    let output = dir.path().join("cart.min.lua");

    Command::cargo_bin("luashrink")
        .expect("binary")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--stats")
        .assert()
        .success()
        .stderr(predicate::str::contains("outputBytes"));

    let text = std::fs::read_to_string(&output).expect("read output");
    assert_eq!(text, "print(3)");
}

#[test]
fn rejects_invalid_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_source(&dir, "broken.lua", "local = 1\n");

    Command::cargo_bin("luashrink")
        .expect("binary")
        .arg(&input)
        .assert()
        .failure();
}

#[test]
fn verbatim_regions_pass_through_unminified() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_source(
        &dir,
        "cart.lua",
        "local value = 1 + 2\nprint(value)\n--minify:off\nlocal  kept   =  \"as is\"\n--minify:on\nprint(value)\n",
    );

    Command::cargo_bin("luashrink")
        .expect("binary")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("local  kept   =  \"as is\""))
        .stdout(predicate::str::contains("print(3)"))
        .stdout(predicate::str::contains("--minify:off").not())
        .stdout(predicate::str::contains("__verbatim").not());
}

#[test]
fn project_config_controls_the_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_source(&dir, "cart.lua", "local value = 1 + 2\nprint(value)\n");
    let config = write_source(&dir, "luashrink.yaml", "foldConstants: false\nrenameVariables: false\n");

    Command::cargo_bin("luashrink")
        .expect("binary")
        .arg(&input)
        .arg("--project")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("value"));
}
