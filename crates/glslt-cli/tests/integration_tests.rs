use assert_cmd::cargo;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;

fn create_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write temp file");
    path
}

#[test]
fn test_cli_run_with_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    let assert = cmd.write_stdin("int a=1,b;").assert();
    assert.success().code(0).stdout("int a = 1, b;\n");

    Ok(())
}

#[rstest]
#[case::compact(vec!["--style", "compact"], "void main(){return;}", "void main() { return; }\n")]
#[case::indented(
    vec!["--style", "indented"],
    "#version 330\nstruct L { vec3 c; };\nvoid main() { if (a) { b(); } else c = 1; }",
    "#version 330\nstruct L {\n    vec3 c;\n};\nvoid main() {\n    if (a) {\n        b();\n    } else c = 1;\n}\n"
)]
#[case::indent_width(vec!["--style", "indented", "-i", "2"], "void main() { return; }", "void main() {\n  return;\n}\n")]
#[case::annotated(vec!["--style", "annotated"], "#line 1 1\nint a;\n", "#line 1 1\nint a;\n")]
#[case::annotated_gap(vec!["--style", "annotated"], "int a;\n\n\nint b;", "int a;\n#line 4\nint b;\n")]
#[case::version(vec!["--glsl-version", "330"], "void f(vec2 sample) { }", "void f(vec2 sample) { }\n")]
#[case::strings(vec!["--enable-strings"], "int a; string s = \"x\";", "int a; string s = \"x\";\n")]
#[case::include(vec!["--enable-include"], "#include <a.glsl>\nint a;", "#include <a.glsl>\nint a;\n")]
#[case::custom(vec!["--enable-custom"], "#custom marker\nint a;", "#custom marker\nint a;\n")]
#[case::check(vec!["--check"], "int a;", "")]
fn test_cli_commands(#[case] args: Vec<&str>, #[case] input: &str, #[case] expected: &str) {
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    cmd.args(args)
        .write_stdin(input)
        .assert()
        .success()
        .code(0)
        .stdout(expected.to_string());
}

#[rstest]
#[case::syntax_error(vec![], "int a = ;")]
#[case::reserved_word(vec!["--glsl-version", "400"], "void f(vec2 sample) { }")]
#[case::disabled_strings(vec![], "string s = \"x\";")]
#[case::unsupported_version(vec!["--glsl-version", "310"], "int a;")]
#[case::check(vec!["--check"], "int a")]
#[case::bad_style(vec!["--style", "pretty"], "int a;")]
fn test_cli_failures(#[case] args: Vec<&str>, #[case] input: &str) {
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    cmd.args(args).write_stdin(input).assert().failure();
}

#[test]
fn test_cli_no_throw_reports_every_error() {
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    let output = cmd
        .arg("--no-throw")
        .write_stdin("int a; int = 1; int b;")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "int a; int b;\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("<stdin>: 1 syntax error(s)"));
}

#[test]
fn test_cli_multiple_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = create_file(&dir, "a.vert", "int a;");
    let second = create_file(&dir, "b.frag", "float b=2.0;");
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    cmd.arg(&first)
        .arg(&second)
        .assert()
        .success()
        .stdout("int a;\nfloat b = 2.0;\n");
}

#[test]
fn test_cli_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    cmd.arg(dir.path().join("missing.frag")).assert().failure();
}

#[test]
fn test_cli_discovers_config_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    create_file(
        &dir,
        "glslt.toml",
        "[lexer]\nenable_strings = true\n\n[printer]\nstyle = \"indented\"\n",
    );
    create_file(&dir, "s.frag", "string s = \"x\";");
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    cmd.current_dir(dir.path())
        .arg("s.frag")
        .assert()
        .success()
        .stdout("string s = \"x\";\n");
}

#[test]
fn test_cli_flags_override_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_file(&dir, "custom.toml", "[printer]\nstyle = \"indented\"\n");
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    cmd.arg("--config")
        .arg(&config)
        .args(["--style", "compact"])
        .write_stdin("void main() { return; }")
        .assert()
        .success()
        .stdout("void main() { return; }\n");
}

#[test]
fn test_cli_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_file(&dir, "bad.toml", "[printer]\nwidth = 2\n");
    let mut cmd = cargo::cargo_bin_cmd!("glslt");

    cmd.arg("--config")
        .arg(&config)
        .write_stdin("int a;")
        .assert()
        .failure();
}

#[test]
fn test_cli_deep_nesting_fails_with_diagnostic() {
    let mut cmd = cargo::cargo_bin_cmd!("glslt");
    let input = format!("int a = {}1{};", "(".repeat(50_000), ")".repeat(50_000));

    let output = cmd.arg("--no-throw").write_stdin(input).output().unwrap();

    assert!(!output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Nesting exceeds"));
}
