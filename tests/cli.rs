use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const FONT: &str = r#"{
    "glyphs": {
        "?": { "ha": 600, "x_min": 50, "x_max": 550, "o": "m 50 0 l 550 0 l 550 700 l 50 700 z" },
        " ": { "ha": 300, "x_min": 0, "x_max": 0, "o": "" }
    },
    "familyName": "Fixture",
    "ascender": 1000,
    "descender": -200,
    "underlinePosition": -100,
    "underlineThickness": 50,
    "boundingBox": { "yMin": -200, "xMin": 0, "yMax": 1000, "xMax": 600 },
    "resolution": 1000
}"#;

fn flat_hdr(width: u32, height: u32) -> Vec<u8> {
    let mut bytes =
        format!("#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y {height} +X {width}\n").into_bytes();
    for _ in 0..(width * height) {
        bytes.extend_from_slice(&[128, 128, 128, 129]);
    }
    bytes
}

fn asset_dir(with_font: bool) -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "environment/kloppenheim_06_puresky_2k.hdr",
        &flat_hdr(2, 2),
    );
    if with_font {
        write(
            dir.path(),
            "fonts/helvetiker_regular.typeface.json",
            FONT.as_bytes(),
        );
    }
    dir
}

fn write(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent dir")).expect("create dir");
    fs::write(path, bytes).expect("write asset");
}

#[test]
fn cli_assembles_full_scene() {
    let assets = asset_dir(true);
    let mut cmd = Command::cargo_bin("scene-showcase").expect("binary exists");
    cmd.arg(assets.path())
        .arg("--seed")
        .arg("7")
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 202 meshes"))
        .stdout(contains("Environment: 2x2 (equirectangular-reflection)"))
        .stdout(contains(" - text: 2"))
        .stdout(contains(" - torus: 100"))
        .stdout(contains(" - torus knot: 100"))
        .stdout(contains(" - materials: 1"));
}

#[test]
fn cli_keeps_environment_when_font_is_missing() {
    let assets = asset_dir(false);
    let mut cmd = Command::cargo_bin("scene-showcase").expect("binary exists");
    cmd.arg(assets.path()).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 0 meshes"))
        .stdout(contains("Environment: 2x2"))
        .stderr(contains("font stage failed"));
}

#[test]
fn cli_reads_layout_from_config() {
    let assets = asset_dir(true);
    let config = assets.path().join("showcase.json");
    fs::write(&config, r#"{ "seed": 3, "layout": { "instance_pairs": 5 } }"#).expect("config");
    let mut cmd = Command::cargo_bin("scene-showcase").expect("binary exists");
    cmd.arg(assets.path())
        .arg("--config")
        .arg(&config)
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 12 meshes"));
}

#[test]
fn cli_requires_asset_dir() {
    let mut cmd = Command::cargo_bin("scene-showcase").expect("binary exists");
    cmd.assert().failure().stderr(contains("Usage: scene-showcase"));
}

#[test]
fn cli_rejects_unknown_flags() {
    let assets = asset_dir(true);
    let mut cmd = Command::cargo_bin("scene-showcase").expect("binary exists");
    cmd.arg(assets.path()).arg("--fullscreen");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --fullscreen"));
}
