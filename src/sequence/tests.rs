use super::*;
use crate::geometry::CandidateRect;
use crate::payload::encode_fits;
use crate::render::encode_full_png;
use chrono::Utc;
use ndarray::Array2;
use std::path::Path;
use std::time::{Duration, SystemTime};

fn ramp(width: usize, height: usize) -> Array2<u16> {
    Array2::from_shape_fn((height, width), |(r, c)| (r * width + c) as u16)
}

fn write_with_mtime(path: &Path, data: &[u8], secs_after_epoch: u64) {
    std::fs::write(path, data).unwrap();
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
        .unwrap();
}

#[test]
fn test_is_image_file() {
    assert!(is_image_file(Path::new("a/b/frame.fits")));
    assert!(is_image_file(Path::new("frame.FIT")));
    assert!(is_image_file(Path::new("frame.png")));
    assert!(is_image_file(Path::new("frame.tiff")));
    assert!(!is_image_file(Path::new("notes.txt")));
    assert!(!is_image_file(Path::new("fits")));
}

#[tokio::test]
async fn test_list_images_sorted_by_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let fits = encode_fits(&ramp(4, 4), Utc::now());

    write_with_mtime(&dir.path().join("late.fits"), &fits, 3_000);
    write_with_mtime(&dir.path().join("early.fits"), &fits, 1_000);
    write_with_mtime(&dir.path().join("middle.fit"), &fits, 2_000);
    write_with_mtime(&dir.path().join("readme.txt"), b"not an image", 500);

    let images = list_images(dir.path()).await.unwrap();
    let names: Vec<_> = images
        .iter()
        .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["early.fits", "middle.fit", "late.fits"]);
    assert_eq!(images[0].0.timestamp(), 1_000);
}

#[tokio::test]
async fn test_list_images_missing_dir_is_error() {
    assert!(list_images(Path::new("/nonexistent/ccd-sequence")).await.is_err());
}

#[tokio::test]
async fn test_load_fits_and_png() {
    let dir = tempfile::tempdir().unwrap();
    let pixels = ramp(5, 3).mapv(|v| v * 1000);

    let fits_path = dir.path().join("frame.fits");
    std::fs::write(&fits_path, encode_fits(&pixels, Utc::now())).unwrap();
    assert_eq!(load_image(&fits_path).await.unwrap(), pixels);

    let png_path = dir.path().join("frame.png");
    std::fs::write(&png_path, encode_full_png(&pixels).unwrap()).unwrap();
    assert_eq!(load_image(&png_path).await.unwrap(), pixels);
}

#[tokio::test]
async fn test_load_corrupt_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"definitely not a png").unwrap();
    assert!(load_image(&path).await.is_err());
}

#[test]
fn test_analyse_roi_and_profiles() {
    let analyser = SequenceAnalyser::new(Some(CandidateRect::new(1, 1, 2, 2)), 1, 1);
    let row = analyser.analyse(&ramp(4, 4), Utc::now(), Path::new("frame.fits"));

    // ROI holds 5, 6, 9, 10
    assert_eq!(row.roi_min, 5);
    assert_eq!(row.roi_max, 10);
    assert!((row.roi_mean - 7.5).abs() < 1e-9);

    // X profile: row 1 across the ROI columns
    assert_eq!((row.x_min, row.x_max), (5, 6));
    assert!((row.x_mean - 5.5).abs() < 1e-9);

    // Y profile: column 1 down the ROI rows
    assert_eq!((row.y_min, row.y_max), (5, 9));
    assert!((row.y_mean - 7.0).abs() < 1e-9);
    assert!((row.y_sd_pct - 100.0 * 2.0 / 7.0).abs() < 1e-9);
}

#[test]
fn test_analyse_clips_oversized_roi() {
    let analyser = SequenceAnalyser::new(Some(CandidateRect::new(2, 0, 100, 100)), 1, 1);
    let row = analyser.analyse(&ramp(4, 4), Utc::now(), Path::new("frame.fits"));

    // clipped to columns 2..4, rows 0..4
    assert_eq!(row.roi_min, 2);
    assert_eq!(row.roi_max, 15);
}

#[tokio::test]
async fn test_analyse_dir_skips_unreadable_and_writes_csv() {
    let dir = tempfile::tempdir().unwrap();
    write_with_mtime(
        &dir.path().join("a.fits"),
        &encode_fits(&ramp(4, 4), Utc::now()),
        1_000,
    );
    write_with_mtime(&dir.path().join("b.fits"), b"garbage", 2_000);
    write_with_mtime(
        &dir.path().join("c.png"),
        &encode_full_png(&ramp(4, 4).mapv(|v| v + 100)).unwrap(),
        3_000,
    );

    let rows = SequenceAnalyser::new(None, 1, 1)
        .analyse_dir(dir.path())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].roi_max, 15);
    assert_eq!(rows[1].roi_min, 100);
    assert_eq!(rows[0].mtime, 1_000.0);

    let mut out = Vec::new();
    write_csv(&rows, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "mtime,path,roi_min,roi_mean,roi_max,roi_sd_pct,x_min,x_mean,x_max,x_sd_pct,\
         y_min,y_mean,y_max,y_sd_pct"
    );
    assert!(lines.next().unwrap().contains("a.fits"));
    assert!(lines.next().unwrap().contains("c.png"));
    assert!(lines.next().is_none());
}
