//! End-to-end tests for the `watermark` binary.
//!
//! Each test builds a throwaway input folder of synthetic images, runs the
//! compiled binary, and checks exit status, report lines, and written files.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn watermark(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_watermark"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
        .save(path)
        .unwrap();
}

fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba([20, 40, 60, 255]))
        .save(path)
        .unwrap();
}

fn apply(input: &Path, output: &Path, extra: &[&str]) -> Output {
    let mut args = vec![
        "apply",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "-t",
        "(c) Test",
    ];
    args.extend_from_slice(extra);
    watermark(&args)
}

// =========================================================================
// apply: successful runs
// =========================================================================

#[test]
fn apply_processes_recognized_files_only() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_jpeg(&input.join("a.jpg"), 120, 80);
    write_png(&input.join("b.PNG"), 60, 60);
    std::fs::write(input.join("notes.txt"), "ignored").unwrap();

    let out = apply(&input, &output, &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("[done] Processed 2 image(s)."));
    assert!(output.join("a_wm.jpg").exists());
    assert!(output.join("b_wm.PNG").exists());
    assert!(!output.join("notes_wm.txt").exists());
    assert_eq!(image::image_dimensions(output.join("a_wm.jpg")).unwrap(), (120, 80));
}

#[test]
fn apply_tiled_with_rotation() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_png(&input.join("wall.png"), 150, 100);

    let out = apply(
        &input,
        &output,
        &["--tile", "--tile-angle", "-30", "--tile-spacing", "0", "--tile-opacity", "50"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let result = image::open(output.join("wall_wm.png")).unwrap().to_rgba8();
    let changed = result.pixels().filter(|p| p.0 != [20, 40, 60, 255]).count();
    assert!(changed > 0);
}

#[test]
fn apply_recursive_keep_tree() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_jpeg(&input.join("top.jpg"), 40, 40);
    write_jpeg(&input.join("2024/may/deep.jpg"), 40, 40);

    let out = apply(&input, &output, &["--recursive", "--keep-tree", "--suffix", "-x"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(output.join("top-x.jpg").exists());
    assert!(output.join("2024/may/deep-x.jpg").exists());
}

#[test]
fn apply_non_recursive_skips_subfolders() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_jpeg(&input.join("sub/deep.jpg"), 40, 40);

    let out = apply(&input, &output, &[]);
    assert!(out.status.success());
    assert!(stderr(&out).contains("[warn] No images processed."));
}

#[test]
fn apply_reports_corrupt_file_and_continues() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_jpeg(&input.join("good.jpg"), 50, 50);
    std::fs::write(input.join("bad.jpg"), b"definitely not a jpeg").unwrap();

    let out = apply(&input, &output, &[]);
    assert!(out.status.success());
    assert!(stderr(&out).contains("[fail]"));
    assert!(stderr(&out).contains("bad.jpg"));
    assert!(stdout(&out).contains("[done] Processed 1 image(s)."));
    assert!(output.join("good_wm.jpg").exists());
}

#[test]
fn apply_empty_folder_warns_but_succeeds() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    std::fs::create_dir_all(&input).unwrap();

    let out = apply(&input, &tmp.path().join("out"), &[]);
    assert!(out.status.success());
    assert!(stderr(&out).contains(
        "[warn] No images processed. Check your input folder and file extensions."
    ));
}

#[test]
fn out_of_range_opacities_are_clamped() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_png(&input.join("a.png"), 40, 40);

    let out = apply(&input, &output, &["--opacity", "-0.5"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    // Zero alpha leaves the image untouched
    let result = image::open(output.join("a_wm.png")).unwrap().to_rgba8();
    assert!(result.pixels().all(|p| p.0 == [20, 40, 60, 255]));

    let out = apply(&input, &output, &["--tile", "--tile-opacity", "-1"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
}

#[test]
fn oversize_watermark_fails_one_file_only() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_jpeg(&input.join("a.jpg"), 64, 64);
    write_jpeg(&input.join("b.jpg"), 64, 64);

    let out = apply(&input, &output, &["--stroke-width", "2000000000"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("[fail]") && err.contains("a.jpg") && err.contains("b.jpg"));
    assert!(err.contains("[warn] No images processed."));
    assert!(!output.join("a_wm.jpg").exists());
}

#[test]
fn config_file_is_layered_under_flags() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_jpeg(&input.join("a.jpg"), 40, 40);
    let config = tmp.path().join("wm.toml");
    std::fs::write(
        &config,
        "[output]\nsuffix = \"_cfg\"\nquality = 50\n\n[text]\ncolor = \"gold\"\n",
    )
    .unwrap();

    let out = apply(
        &input,
        &output,
        &["--config", config.to_str().unwrap(), "--suffix", "_flag"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(output.join("a_flag.jpg").exists());
    assert!(!output.join("a_cfg.jpg").exists());
}

// =========================================================================
// apply: fatal configuration errors
// =========================================================================

#[test]
fn missing_input_folder_fails() {
    let tmp = TempDir::new().unwrap();
    let out = apply(&tmp.path().join("nope"), &tmp.path().join("out"), &[]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("[error]"));
}

#[test]
fn invalid_color_fails_before_writing() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_jpeg(&input.join("a.jpg"), 40, 40);

    let out = apply(&input, &output, &["--color", "#XYZXYZ"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("#XYZXYZ"));
    assert!(!output.exists());
}

#[test]
fn invalid_stroke_color_fails() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    std::fs::create_dir_all(&input).unwrap();

    let out = apply(&input, &tmp.path().join("out"), &["--stroke-color", "blurple"]);
    assert!(!out.status.success());
}

#[test]
fn non_positive_rel_size_fails() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    std::fs::create_dir_all(&input).unwrap();

    for value in ["0", "-0.5"] {
        let out = apply(&input, &tmp.path().join("out"), &["--rel-size", value]);
        assert!(!out.status.success(), "rel-size {value} accepted");
    }
}

#[test]
fn negative_tile_spacing_fails() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    std::fs::create_dir_all(&input).unwrap();

    let out = apply(
        &input,
        &tmp.path().join("out"),
        &["--tile", "--tile-spacing-x", "-4"],
    );
    assert!(!out.status.success());
    assert!(stderr(&out).contains("spacing"));
}

#[test]
fn unknown_config_key_fails() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    std::fs::create_dir_all(&input).unwrap();
    let config = tmp.path().join("wm.toml");
    std::fs::write(&config, "[text]\ncolour = \"red\"\n").unwrap();

    let out = apply(
        &input,
        &tmp.path().join("out"),
        &["--config", config.to_str().unwrap()],
    );
    assert!(!out.status.success());
}

// =========================================================================
// describe / gen-config
// =========================================================================

#[test]
fn describe_lists_images() {
    let tmp = TempDir::new().unwrap();
    write_png(&tmp.path().join("shot.png"), 64, 32);

    let out = watermark(&["describe", "-i", tmp.path().to_str().unwrap()]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.starts_with("Filename: shot.png - Size: "));
    assert!(text.trim_end().ends_with("Dimensions: 64x32"));
}

#[test]
fn describe_json() {
    let tmp = TempDir::new().unwrap();
    write_png(&tmp.path().join("shot.png"), 64, 32);

    let out = watermark(&["describe", "-i", tmp.path().to_str().unwrap(), "--json"]);
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(value["filename"], "shot.png");
    assert_eq!(value["width"], 64);
    assert_eq!(value["height"], 32);
}

#[test]
fn gen_config_prints_parseable_toml() {
    let out = watermark(&["gen-config"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("[text]"));
    assert!(text.contains("[tile]"));
    let parsed: toml::Value = toml::from_str(&text).unwrap();
    assert_eq!(parsed["output"]["suffix"].as_str(), Some("_wm"));
}
