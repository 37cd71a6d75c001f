use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::io::Write;
use std::process::Command;
use tempfile::{tempdir, NamedTempFile};

fn neon_void() -> Command {
    Command::cargo_bin("neon-void").expect("binary exists")
}

#[test]
fn cli_renders_frames_with_bloom() {
    let mut cmd = neon_void();
    cmd.args(["--frames", "100", "--size", "320x240"]);
    cmd.assert()
        .success()
        .stdout(contains("Rendered 100 frame(s): 100 bloom, 0 direct, 0 skipped"))
        .stdout(contains("Shape: cube"))
        .stdout(contains("Color: red (1.00, 0.10, 0.10)"))
        .stdout(contains("Camera distance: 5.00"))
        .stdout(contains("Rotation: (0.700, 1.000, 0.300)"))
        .stdout(contains("Targets: 320x240"))
        .stdout(contains("Last surface pass: Bloom"));
}

#[test]
fn cli_applies_shape_color_and_zoom() {
    let mut cmd = neon_void();
    cmd.args([
        "--frames", "3", "--shape", "Sphere", "--color", "chartreuse", "--zoom", "-100",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("Shape: sphere"))
        .stdout(contains("Color: red (1.00, 0.10, 0.10)"))
        .stdout(contains("Camera distance: 1.50"));
}

#[test]
fn cli_resizes_targets_mid_run() {
    let mut cmd = neon_void();
    cmd.args([
        "--frames", "4", "--size", "800x600", "--resize-at", "2:1024x768",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("4 bloom"))
        .stdout(contains("Surface: 1024x768"))
        .stdout(contains("Targets: 1024x768"));
}

#[test]
fn cli_falls_back_to_direct_draw_when_bloom_fails() {
    let mut cmd = neon_void();
    cmd.args(["--frames", "5", "--fail-bloom"]);
    cmd.assert()
        .success()
        .stdout(contains("Rendered 5 frame(s): 0 bloom, 5 direct, 0 skipped"))
        .stdout(contains("Last surface pass: Direct"));
}

#[test]
fn cli_reads_settings_file() {
    let mut settings = NamedTempFile::new().expect("temp settings");
    write!(
        settings,
        r#"<settings>
    <shape>pyramid</shape>
    <color>cyan</color>
    <camera-distance>8</camera-distance>
    <rotation-step>0 0.02 0</rotation-step>
</settings>"#
    )
    .expect("write settings");

    let mut cmd = neon_void();
    cmd.args(["--frames", "10", "--settings"]).arg(settings.path());
    cmd.assert()
        .success()
        .stdout(contains("Shape: pyramid"))
        .stdout(contains("Color: cyan (0.10, 1.00, 1.00)"))
        .stdout(contains("Camera distance: 8.00"))
        .stdout(contains("Rotation: (0.000, 0.200, 0.000)"));
}

#[test]
fn cli_loads_shader_directory() {
    let dir = tempdir().expect("temp dir");
    let files = [
        "vertex.glsl",
        "fragment.glsl",
        "bloom-vertex.glsl",
        "bloom-fragment.glsl",
        "blur.glsl",
        "composite.glsl",
    ];
    for file in files {
        fs::write(dir.path().join(file), "void main() {}\n").expect("write shader");
    }

    let mut cmd = neon_void();
    cmd.args(["--frames", "2", "--shaders"]).arg(dir.path());
    cmd.assert().success().stdout(contains("2 bloom"));

    fs::remove_file(dir.path().join("composite.glsl")).expect("remove shader");
    let mut cmd = neon_void();
    cmd.args(["--frames", "2", "--shaders"]).arg(dir.path());
    cmd.assert().failure().stderr(contains("composite.glsl"));
}

#[test]
fn cli_rejects_empty_shader_source() {
    let dir = tempdir().expect("temp dir");
    for file in [
        "vertex.glsl",
        "fragment.glsl",
        "bloom-vertex.glsl",
        "bloom-fragment.glsl",
        "blur.glsl",
    ] {
        fs::write(dir.path().join(file), "void main() {}\n").expect("write shader");
    }
    fs::write(dir.path().join("composite.glsl"), "").expect("write shader");

    let mut cmd = neon_void();
    cmd.arg("--shaders").arg(dir.path());
    cmd.assert()
        .failure()
        .stderr(contains("failed to initialize renderer"))
        .stderr(contains("fragment shader failed to compile"));
}

#[test]
fn cli_rejects_unknown_shape_and_flags() {
    neon_void()
        .args(["--shape", "torus"])
        .assert()
        .failure()
        .stderr(contains("unknown shape \"torus\""));

    neon_void()
        .arg("--wireframe")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --wireframe"));

    neon_void()
        .args(["--size", "0x600"])
        .assert()
        .failure()
        .stderr(contains("invalid size"));
}
