//! End-to-end tests of the resub binary.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with an isolated HOME so config and logs never touch the real
/// user directory, and a clean editor environment.
fn resub(home: &TempDir, cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("resub").unwrap();
    cmd.current_dir(cwd)
        .env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("VISUAL")
        .env_remove("EDITOR");
    cmd
}

fn write_editor_script(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("fake-editor.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn binary_files_are_excluded_from_replacement_output() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "hello world\n").unwrap();
    fs::write(work.path().join("b.bin"), b"he\x00llo world").unwrap();

    resub(&home, work.path())
        .args(["hello", "hi"])
        .assert()
        .success()
        .stdout("a.txt:hi world\n");
}

#[test]
fn empty_tree_exits_one_with_diagnostic() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    resub(&home, work.path())
        .args(["anything"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no files matched"));
}

#[test]
fn quiet_suppresses_the_no_match_diagnostic() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    resub(&home, work.path())
        .args(["-q", "anything"])
        .assert()
        .code(1)
        .stderr("");
}

#[test]
fn search_prints_matching_lines_with_filenames() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "one foo\ntwo\nthree foo\n").unwrap();

    resub(&home, work.path())
        .args(["foo"])
        .assert()
        .success()
        .stdout("a.txt:one foo\na.txt:three foo\n");
}

#[test]
fn single_file_root_drops_the_filename_prefix() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "one foo\n").unwrap();

    resub(&home, work.path())
        .args(["-p", "a.txt", "foo"])
        .assert()
        .success()
        .stdout("one foo\n");
}

#[test]
fn list_mode_prints_file_names_once() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "foo\nfoo\n").unwrap();
    fs::write(work.path().join("b.txt"), "nothing\n").unwrap();

    resub(&home, work.path())
        .args(["-l", "foo"])
        .assert()
        .success()
        .stdout("a.txt\n");
}

#[test]
fn no_matching_lines_exits_one() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "content\n").unwrap();

    resub(&home, work.path())
        .args(["absent"])
        .assert()
        .code(1)
        .stdout("");
}

#[test]
fn invalid_pattern_exits_two() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "content\n").unwrap();

    resub(&home, work.path())
        .args(["([unclosed"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid pattern"));
}

#[test]
fn usage_error_exits_two_with_hint() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    resub(&home, work.path())
        .args(["--bogus"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--help"));
}

#[test]
fn help_exits_zero() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    resub(&home, work.path())
        .args(["--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: resub"));
}

#[test]
fn update_rewrites_in_place_and_is_idempotent() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let target = work.path().join("a.txt");
    fs::write(&target, "foo and foo\n").unwrap();

    resub(&home, work.path())
        .args(["-u", "foo", "bar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 file(s) updated"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "bar and bar\n");

    // Second run has nothing left to do.
    resub(&home, work.path())
        .args(["-u", "foo", "bar"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("0 file(s) updated"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "bar and bar\n");
}

#[test]
fn quiet_diff_probes_without_output() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "foo\n").unwrap();

    resub(&home, work.path())
        .args(["-qd", "foo", "bar"])
        .assert()
        .success()
        .stdout("");

    resub(&home, work.path())
        .args(["-qd", "absent", "bar"])
        .assert()
        .code(1)
        .stdout("");
    // The probe never wrote anything.
    assert_eq!(
        fs::read_to_string(work.path().join("a.txt")).unwrap(),
        "foo\n"
    );
}

#[test]
fn quiet_diff_identity_replacement_exits_one() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "foo bar\n").unwrap();

    // foo -> foo changes no content: no diff, exit 1.
    resub(&home, work.path())
        .args(["-d", "foo", "foo"])
        .assert()
        .code(1)
        .stdout("");

    // The quiet short-circuit must produce the same exit code.
    resub(&home, work.path())
        .args(["-qd", "foo", "foo"])
        .assert()
        .code(1)
        .stdout("");
}

#[test]
fn diff_output_applies_to_the_same_result_as_update() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "alpha foo\nbeta\ngamma foo\n").unwrap();

    let output = resub(&home, work.path())
        .args(["-d", "foo", "bar"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let diff = String::from_utf8(output).unwrap();
    assert!(diff.contains("--- a.txt"));
    // Diff mode never mutates.
    assert_eq!(
        fs::read_to_string(work.path().join("a.txt")).unwrap(),
        "alpha foo\nbeta\ngamma foo\n"
    );

    let changed = resub::patch::apply_patch(&diff, work.path()).unwrap();
    assert_eq!(changed, 1);
    assert_eq!(
        fs::read_to_string(work.path().join("a.txt")).unwrap(),
        "alpha bar\nbeta\ngamma bar\n"
    );
}

#[test]
fn editor_clearing_the_buffer_aborts() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "foo\n").unwrap();
    let editor = write_editor_script(&home, ": > \"$1\"");

    resub(&home, work.path())
        .args(["-e", "foo", "bar"])
        .env("EDITOR", &editor)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Patch aborted"));
    assert_eq!(
        fs::read_to_string(work.path().join("a.txt")).unwrap(),
        "foo\n"
    );
}

#[test]
fn editor_failure_aborts() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "foo\n").unwrap();
    let editor = write_editor_script(&home, "exit 3");

    resub(&home, work.path())
        .args(["-e", "foo", "bar"])
        .env("EDITOR", &editor)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Patch aborted"));
    assert_eq!(
        fs::read_to_string(work.path().join("a.txt")).unwrap(),
        "foo\n"
    );
}

#[test]
fn editor_accepting_the_buffer_applies_the_patch() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "foo\n").unwrap();

    resub(&home, work.path())
        .args(["-e", "foo", "bar"])
        .env("EDITOR", "true")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 file(s) updated"));
    assert_eq!(
        fs::read_to_string(work.path().join("a.txt")).unwrap(),
        "bar\n"
    );
}

#[test]
fn interrupt_during_review_removes_the_patch_buffer() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "foo\n").unwrap();
    // The editor signals its parent (the resub process itself) and then
    // lingers, so the termination lands mid-review.
    let editor = write_editor_script(&home, "kill -TERM $PPID\nsleep 2");

    resub(&home, work.path())
        .args(["-e", "foo", "bar"])
        .env("EDITOR", &editor)
        .env("TMPDIR", tmp.path())
        .assert()
        .code(130);

    let leftovers: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "staged buffer leaked: {leftovers:?}");
    assert_eq!(
        fs::read_to_string(work.path().join("a.txt")).unwrap(),
        "foo\n"
    );
}

#[test]
fn editor_mode_without_matches_reports_and_exits_one() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "content\n").unwrap();
    // Fails loudly if the editor is ever launched.
    let editor = write_editor_script(&home, "exit 42");

    resub(&home, work.path())
        .args(["-e", "absent", "bar"])
        .env("EDITOR", &editor)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no matches"));
}

#[test]
fn exclude_name_skips_directories() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::create_dir(work.path().join("vendor")).unwrap();
    fs::write(work.path().join("vendor").join("v.txt"), "foo\n").unwrap();
    fs::write(work.path().join("top.txt"), "foo\n").unwrap();

    resub(&home, work.path())
        .args(["-X", "vendor", "-l", "foo"])
        .assert()
        .success()
        .stdout("top.txt\n");
}

#[test]
fn search_output_files_are_a_subset_of_list_output() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "foo\nbar foo\n").unwrap();
    fs::write(work.path().join("b.txt"), "plain\n").unwrap();
    fs::write(work.path().join("c.txt"), "foo again\n").unwrap();

    let listed = resub(&home, work.path())
        .args(["-l", "foo"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let listed: Vec<String> = String::from_utf8(listed)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();

    let searched = resub(&home, work.path())
        .args(["foo"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    for line in String::from_utf8(searched).unwrap().lines() {
        let (file, _) = line.split_once(':').unwrap();
        assert!(listed.contains(&file.to_string()), "{file} not listed");
    }
}

#[test]
fn separator_exhaustion_suggests_the_flag() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("a.txt"), "x\n").unwrap();

    resub(&home, work.path())
        .args(["-d", "/,;:|%#@!=+~^&?_", "y"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--separator"));
}
