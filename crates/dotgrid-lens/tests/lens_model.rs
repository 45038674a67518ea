use approx::assert_relative_eq;
use dotgrid_core::{Polynomial, PolynomialFit};
use dotgrid_lens::{valid_curve, DistortionModel, RemapGeometry, RemapParams, RemapTable};
use nalgebra::Point2;

#[test]
fn cubic_curve_round_trip_recovers_k() {
    for &k in &[1e-7, -3e-7, 8e-7] {
        let mut fit = PolynomialFit::new(3);
        for i in 1..=80 {
            let r = i as f64 * 4.0;
            fit.add_point(r, r + k * r.powi(3));
        }
        let solved = fit.solve().expect("solvable");
        assert_relative_eq!(solved.coefficient(3), k, epsilon = 1e-11);
        assert!(solved.rms_error() < 1e-6, "rms {}", solved.rms_error());
    }
}

#[test]
fn outward_reversing_curve_is_rejected() {
    let max_radius = 400.0;
    let curve = Polynomial::new(vec![0.0, 0.98, 0.0, 2e-7]);
    let deviation_max = curve.eval(max_radius) - max_radius;
    let deviation_half = curve.eval(max_radius / 2.0) - max_radius / 2.0;
    assert!(deviation_max > deviation_half);
    assert!(!valid_curve(&curve, max_radius));
}

#[test]
fn remap_round_trip_with_rotation_and_scale() {
    let (w, h) = (160, 120);
    let model = DistortionModel {
        curve: Polynomial::new(vec![0.0, 1.0, 0.0, -5e-7]),
        centre: Point2::new(82.0, 58.0),
    };
    let geometry = RemapGeometry {
        rotation: 0.01,
        scale: model.scale_for_width(w),
        ..RemapGeometry::new(w, h)
    };
    let table = RemapTable::build(&model, geometry, &RemapParams::default());

    let mut checked = 0;
    for y in 0..h {
        for x in 0..w {
            let Some((sx, sy)) = table.forward(x, y) else {
                continue;
            };
            let (rx, ry) = table.inverse(sx, sy).expect("inverse entry");
            assert!((rx as i64 - x as i64).abs() <= 1);
            assert!((ry as i64 - y as i64).abs() <= 1);
            checked += 1;
        }
    }
    assert!(checked > 0);
}
