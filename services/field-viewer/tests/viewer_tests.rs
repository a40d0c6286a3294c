//! End-to-end tests for the field viewer.

use std::path::{Path, PathBuf};

use field_common::{GridRecord, RecordHeader};
use field_viewer::{run, RenderJob, RenderMode, ViewerConfig};
use gpu_particles::GpuContext;
use tempfile::TempDir;
use test_utils::TEMP_RECORD;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

fn write_record(dir: &Path, name: &str, value: impl Fn(usize, usize) -> f32) -> PathBuf {
    let header = RecordHeader {
        lo1: 124.0,
        la1: 39.0,
        dx: 0.1,
        dy: -0.1,
        nx: 11,
        ny: 11,
    };
    let mut data = Vec::with_capacity(121);
    for row in 0..11 {
        for col in 0..11 {
            data.push(Some(value(col, row)));
        }
    }
    let record = GridRecord {
        header: Some(header),
        data,
    };
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();
    path
}

fn job(dir: &TempDir, mode: RenderMode) -> RenderJob {
    let u = write_record(dir.path(), "u.json", |col, _| 2.0 + col as f32);
    let v = write_record(dir.path(), "v.json", |_, row| 5.0 - row as f32);
    let scalar = dir.path().join("temp.json");
    std::fs::write(&scalar, TEMP_RECORD).unwrap();

    RenderJob {
        u_path: u,
        v_path: v,
        scalar_path: Some(scalar),
        parameter: "TEMP".to_string(),
        output_dir: dir.path().join("frames"),
        mode,
        seed: Some(17),
    }
}

fn small_config() -> ViewerConfig {
    ViewerConfig {
        width: 96,
        height: 64,
        frames: 3,
        ..ViewerConfig::default()
    }
}

#[test]
fn test_canvas_mode_writes_png_frames() {
    let dir = TempDir::new().unwrap();
    let job = job(&dir, RenderMode::Canvas);

    let written = run(&job, &small_config()).unwrap();

    assert_eq!(written.len(), 3);
    assert_eq!(written[0], job.output_dir.join("frame-0000.png"));
    for path in &written {
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }
}

#[test]
fn test_canvas_mode_is_reproducible_with_seed() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();

    let first = run(&job(&first_dir, RenderMode::Canvas), &small_config()).unwrap();
    let second = run(&job(&second_dir, RenderMode::Canvas), &small_config()).unwrap();

    for (a, b) in first.iter().zip(&second) {
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
}

#[test]
fn test_missing_record_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut job = job(&dir, RenderMode::Canvas);
    job.u_path = dir.path().join("absent.json");

    let err = run(&job, &small_config()).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.json"));
}

#[test]
fn test_gpu_mode_writes_png_frames() {
    if let Err(e) = GpuContext::new_blocking() {
        eprintln!("skipping GPU test: {e}");
        return;
    }
    let dir = TempDir::new().unwrap();
    let job = job(&dir, RenderMode::Gpu);

    let written = run(&job, &small_config()).unwrap();

    assert_eq!(written.len(), 3);
    for path in &written {
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }
}
