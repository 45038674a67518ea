use dotgrid_calib::{
    calibrate_dots, calibrate_image, DetectError, DetectParams, Dot, DotDetector, RgbImage,
};
use dotgrid_core::GrayImageView;
use nalgebra::Point2;

/// Detector stand-in that returns a fixed dot list.
struct FixedDots(Vec<Dot>);

impl DotDetector for FixedDots {
    fn detect(&self, _image: &GrayImageView<'_>) -> Vec<Dot> {
        self.0.clone()
    }
}

/// 9×9 lattice with 40 px pitch around a centre marker at (320, 240). The
/// marker sits in the middle of a lattice cell.
fn lattice_dots(distort: impl Fn(Point2<f64>) -> Point2<f64>) -> Vec<Dot> {
    let mut dots = vec![Dot::centre(320.0, 240.0, 8.0)];
    for j in 0..9 {
        for i in 0..9 {
            let p = Point2::new(
                320.0 + 40.0 * (i as f64 - 4.0) - 20.0,
                240.0 + 40.0 * (j as f64 - 4.0) - 20.0,
            );
            let q = distort(p);
            dots.push(Dot::new(q.x, q.y, 4.0));
        }
    }
    dots
}

fn quick_params() -> DetectParams {
    let mut params = DetectParams::default();
    params.overlay.scale_steps = 20;
    params.distortion.passes = 40;
    params
}

#[test]
fn undistorted_lattice_recovers_image_centre() {
    let _ = env_logger::builder().is_test(true).try_init();
    let detector = FixedDots(lattice_dots(|p| p));
    let image = RgbImage::new(640, 480);

    let cal = calibrate_image(&detector, &image, &quick_params()).expect("calibration");
    let centre = cal.fit.model.centre;
    assert!(
        (centre - Point2::new(320.0, 240.0)).norm() < 2.0,
        "centre of distortion {centre:?}"
    );
    assert!(cal.rms_error() < 0.5, "rms {}", cal.rms_error());
    assert!(cal.rotation.abs() < 0.01, "rotation {}", cal.rotation);
    assert_eq!(cal.assigned, 81);
    assert_eq!(cal.centre_dot, Point2::new(320.0, 240.0));
    assert!((cal.scale - 1.0).abs() < 1e-6, "scale {}", cal.scale);
    assert!((cal.overlay.pitch_px() - 40.0).abs() < 1.0);
}

#[test]
fn same_seed_gives_the_same_model() {
    let dots = lattice_dots(|p| {
        let c = Point2::new(320.0, 240.0);
        let d = p - c;
        c + d * (1.0 - 2e-7 * d.norm_squared())
    });
    let params = quick_params();
    let a = calibrate_dots(dots.clone(), 640, 480, &params).expect("first");
    let b = calibrate_dots(dots, 640, 480, &params).expect("second");
    assert_eq!(a.fit, b.fit);
    assert_eq!(a.rotation, b.rotation);
}

#[test]
fn missing_centre_marker_is_a_detection_failure() {
    let mut dots = lattice_dots(|p| p);
    dots.remove(0);
    let err = calibrate_dots(dots, 640, 480, &quick_params()).unwrap_err();
    assert!(matches!(err, DetectError::Grid(_)), "{err}");
}
