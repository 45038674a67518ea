use dotgrid_calib::lens::ParamsError;
use dotgrid_calib::{
    calibrate_directory, BlobDotDetector, CalibrateError, CalibrationConfig, CalibrationReport,
};
use image::{GenericImageView, Rgb, RgbImage};
use std::path::Path;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

fn fill_disk(img: &mut RgbImage, cx: i64, cy: i64, r: i64) {
    for y in cy - r..=cy + r {
        for x in cx - r..=cx + r {
            let inside = (x - cx).pow(2) + (y - cy).pow(2) <= r * r;
            if inside && x >= 0 && y >= 0 && x < WIDTH as i64 && y < HEIGHT as i64 {
                img.put_pixel(x as u32, y as u32, Rgb([15, 15, 15]));
            }
        }
    }
}

/// Light target with a 10×8 dot lattice (24 px pitch) around a large centre
/// marker, shifted horizontally by `shift` pixels.
fn target_image(shift: i64) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([235, 235, 235]));
    let (cx, cy) = (WIDTH as i64 / 2 + shift, HEIGHT as i64 / 2);
    fill_disk(&mut img, cx, cy, 7);
    for j in -3..=4 {
        for i in -4..=5 {
            fill_disk(&mut img, cx + 24 * i - 12, cy + 24 * j - 12, 3);
        }
    }
    img
}

fn write_rig(dir: &Path, cameras: &[usize]) {
    for &camera in cameras {
        for (pan, tilt, shift) in [(10, 0, -6), (20, 5, 0), (30, 10, 6)] {
            let path = dir.join(format!("raw{camera}_{pan}_{tilt}.png"));
            target_image(shift).save(path).expect("save png");
        }
    }
}

fn quick_config(dir: &Path) -> CalibrationConfig {
    let mut cfg = CalibrationConfig {
        image_dir: dir.display().to_string(),
        device: "bench".to_string(),
        ..CalibrationConfig::default()
    };
    cfg.detect.overlay.scale_steps = 10;
    cfg.detect.overlay.translate_x = 3;
    cfg.detect.overlay.translate_y = 3;
    cfg.detect.distortion.passes = 15;
    cfg.rig.focal_length_px = Some(300.0);
    cfg
}

#[test]
fn stereo_directory_produces_report_and_debug_images() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().expect("tempdir");
    write_rig(dir.path(), &[0, 1]);
    let cfg = quick_config(dir.path());
    let detector = BlobDotDetector::new(cfg.detector.clone());

    let report = calibrate_directory(&cfg, &detector).expect("calibration");
    assert_eq!(report.device, "bench");
    assert_eq!(report.cameras.len(), 2);
    assert_eq!(report.baseline_mm, Some(cfg.rig.baseline_mm));
    assert_eq!(report.focal_length_px, 300.0);

    for cam in &report.cameras {
        assert_eq!((cam.width, cam.height), (320, 240));
        assert_eq!(cam.images_used, 3);
        assert_eq!(cam.images_skipped, 0);
        assert!(cam.rms_error < 0.5, "rms {}", cam.rms_error);
        assert!(cam.rotation_deg.abs() < 0.5, "rotation {}", cam.rotation_deg);
        assert_eq!(cam.distortion.len(), 4);
        for path in [
            &cam.debug_images.dots,
            &cam.debug_images.rectified,
            &cam.debug_images.grid,
        ] {
            let img = image::open(path).expect("debug image");
            assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        }
    }

    // both cameras saw identical images
    let offset = report.stereo_offset_px.expect("stereo offset");
    assert!(offset.norm() < 1e-9, "offset {offset:?}");

    // the target moves right as the pan servo grows
    let pan_tilt = report.pan_tilt.as_ref().expect("pan/tilt fit");
    assert!(pan_tilt.pan.coefficients[1] > 0.0);

    let saved = CalibrationReport::load_json(cfg.output_path()).expect("report file");
    assert_eq!(saved, report);
}

#[test]
fn mono_rig_ignores_second_camera() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_rig(dir.path(), &[0]);
    let mut cfg = quick_config(dir.path());
    cfg.rig.stereo = false;
    let detector = BlobDotDetector::new(cfg.detector.clone());

    let report = calibrate_directory(&cfg, &detector).expect("calibration");
    assert_eq!(report.cameras.len(), 1);
    assert_eq!(report.baseline_mm, None);
    assert!(report.stereo_offset_px.is_none());
}

#[test]
fn blank_images_leave_no_usable_model() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["raw0_0_0.png", "raw1_0_0.png"] {
        RgbImage::from_pixel(64, 48, Rgb([200, 200, 200]))
            .save(dir.path().join(name))
            .expect("save png");
    }
    let cfg = quick_config(dir.path());
    let err = calibrate_directory(&cfg, &BlobDotDetector::default()).unwrap_err();
    assert!(matches!(err, CalibrateError::NoUsableImages { camera: 0 }));
    assert!(err.is_input_error());
}

#[test]
fn unreadable_image_is_a_hard_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("raw0_0_0.png"), b"not a png").expect("write");
    std::fs::write(dir.path().join("raw1_0_0.png"), b"not a png").expect("write");
    let cfg = quick_config(dir.path());
    let err = calibrate_directory(&cfg, &BlobDotDetector::default()).unwrap_err();
    assert!(matches!(err, CalibrateError::Image(_)), "{err}");
    assert!(!err.is_input_error());
}

#[test]
fn invalid_search_params_fail_before_any_image_is_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_rig(dir.path(), &[0, 1]);
    let raw = r#"{"detect":{"distortion":{"cooling_factor":0.0,"passes":10}}}"#;
    let mut cfg: CalibrationConfig = serde_json::from_str(raw).expect("config json");
    cfg.image_dir = dir.path().display().to_string();

    let err = calibrate_directory(&cfg, &BlobDotDetector::default()).unwrap_err();
    assert!(
        matches!(
            err,
            CalibrateError::InvalidParams(ParamsError::CoolingFactor(c)) if c == 0.0
        ),
        "{err}"
    );
    assert!(!err.is_input_error());
    assert!(!cfg.output_path().exists());
}
