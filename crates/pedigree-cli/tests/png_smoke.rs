use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("pedigree").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
    let reader = png::Decoder::new(bytes).read_info().expect("png header");
    (reader.info().width, reader.info().height)
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("pedigree-cli"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn cli_renders_png_smoke() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("out.png");

    cli()
        .args([
            "render",
            "--format",
            "png",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture("three_generations.txt").to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&out).expect("read png");
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "output is not a PNG"
    );
    assert_eq!(png_dimensions(&bytes), (800, 600));
}

#[test]
fn cli_renders_png_with_default_out_path_for_file_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let tmp_fixture = tmp.path().join("family.txt");
    fs::copy(fixture("nuclear_compact.txt"), &tmp_fixture).expect("copy fixture");

    cli()
        .args([
            "render",
            "--width",
            "400",
            "--height",
            "300",
            tmp_fixture.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(tmp_fixture.with_extension("png")).expect("read png");
    assert_eq!(png_dimensions(&bytes), (400, 300));
}

#[test]
fn cli_renders_svg_to_stdout() {
    let output = cli()
        .args([
            "render",
            "--format",
            "svg",
            fixture("nuclear_compact.txt").to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    assert!(output.status.success());
    let svg = String::from_utf8(output.stdout).expect("utf8");
    assert!(svg.starts_with("<svg "));
    assert!(svg.contains(">Noah</text>"));
}

#[test]
fn cli_renders_jpeg() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("chart.jpg");

    cli()
        .args([
            "render",
            "--format",
            "jpg",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture("mixed_with_noise.txt").to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&out).expect("read jpg");
    assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
}

#[test]
fn cli_build_prints_pedigree_json() {
    let output = cli()
        .args([
            "build",
            "--pretty",
            fixture("three_generations.txt").to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    assert!(output.status.success());

    let pedigree: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(pedigree["individuals"].as_object().map(|m| m.len()), Some(8));
    assert_eq!(pedigree["generations"].as_array().map(Vec::len), Some(3));
}

#[test]
fn cli_parse_reads_stdin() {
    let output = cli()
        .args(["parse", "-"])
        .write_stdin("Ann (30 F, carrier) and Bob (32 M) have a child — Cy (3 M, affected).")
        .output()
        .expect("run");
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(parsed["source"], "text");
    assert_eq!(parsed["individuals"].as_array().map(Vec::len), Some(3));
}

#[test]
fn cli_layout_honors_config_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{"layout":{"canvasWidth":1000,"symbolSize":40}}"#).expect("config");

    let output = cli()
        .args([
            "layout",
            "--config",
            config.to_string_lossy().as_ref(),
            fixture("nuclear_compact.txt").to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    assert!(output.status.success());

    let layout: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(layout["width"], 1000.0);
    assert_eq!(layout["height"], 600.0);
    assert_eq!(layout["symbols"][0]["size"], 40.0);
}

#[test]
fn cli_assistant_failure_falls_back_to_text_grammars() {
    let text_only = cli()
        .args(["build", fixture("nuclear_compact.txt").to_string_lossy().as_ref()])
        .output()
        .expect("run");
    let with_assistant = cli()
        .env("PEDIGREE_ASSISTANT_ENDPOINT", "http://127.0.0.1:9/generate")
        .env("PEDIGREE_ASSISTANT_TIMEOUT_SECS", "2")
        .env("PEDIGREE_ASSISTANT_MAX_RETRIES", "0")
        .args([
            "build",
            "--assistant",
            fixture("nuclear_compact.txt").to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    assert!(text_only.status.success());
    assert!(with_assistant.status.success());
    assert_eq!(text_only.stdout, with_assistant.stdout);
}

#[test]
fn cli_reports_empty_input() {
    let output = cli().args(["build", "-"]).write_stdin("   \n").output().expect("run");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Family description is empty"), "{stderr}");
}

#[test]
fn cli_rejects_unknown_flags() {
    let output = cli().args(["render", "--bogus"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
}
