//! Recovery of planted convection vectors through the cosine fitter.

mod common;

use sdconv::config::Weighting;
use sdconv::cosfit::{CosineFitter, SkipReason};
use sdconv::samples::SuperposedSample;
use sdconv::{GridCell, PipelineParams};

use common::DEG2RAD;

fn superposed(azimuth: f64, velocity: f64) -> SuperposedSample {
    SuperposedSample {
        radar_id: "kap".into(),
        relative_minutes: 0,
        cell: GridCell::new(65.5, 0.0, azimuth),
        velocity,
        source_event: 0,
    }
}

fn planted(speed: f64, direction_deg: f64, azimuths: &[f64]) -> Vec<SuperposedSample> {
    azimuths
        .iter()
        .map(|&a| superposed(a, speed * ((a - direction_deg) * DEG2RAD).cos()))
        .collect()
}

const AZIMUTHS: [f64; 6] = [-67.5, -37.5, -22.5, -7.5, 22.5, 52.5];

#[test]
fn recovers_a_slow_flow_at_two_hundred_degrees() {
    let samples = planted(37.0, 200.0, &AZIMUTHS);
    let batch = CosineFitter::new(&PipelineParams::new()).fit_all(&samples);
    assert_eq!(batch.results.len(), 1);
    let fit = &batch.results[0];
    assert!((fit.vel_mag - 37.0).abs() / 37.0 < 0.05, "vel_mag = {}", fit.vel_mag);
    assert!((fit.vel_dir - 200.0).abs() < 2.0, "vel_dir = {}", fit.vel_dir);
    assert_eq!(fit.vel_count, AZIMUTHS.len());
}

#[test]
fn noisy_flow_is_recovered_within_tolerance() {
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 3.0).unwrap();
    let samples: Vec<SuperposedSample> = (0..8)
        .flat_map(|_| {
            AZIMUTHS.iter().map(|&a| {
                let v = 37.0 * ((a - 200.0) * DEG2RAD).cos() + noise.sample(&mut rng);
                superposed(a, v)
            }).collect::<Vec<_>>()
        })
        .collect();

    let batch = CosineFitter::new(&PipelineParams::new()).fit_all(&samples);
    let fit = &batch.results[0];
    assert!((fit.vel_mag - 37.0).abs() / 37.0 < 0.05, "vel_mag = {}", fit.vel_mag);
    assert!((fit.vel_dir - 200.0).abs() < 5.0, "vel_dir = {}", fit.vel_dir);
    assert!(fit.vel_mag_err > 0.0);
}

#[test]
fn a_degenerate_azimuth_spread_is_rejected() {
    // All points in one azimuth bin cannot constrain two parameters.
    let samples: Vec<SuperposedSample> =
        (0..10).map(|i| superposed(22.5, 30.0 + i as f64)).collect();
    let batch = CosineFitter::new(&PipelineParams::new()).fit_all(&samples);
    assert!(batch.results.is_empty());
    assert!(matches!(
        batch.skipped[0].reason,
        SkipReason::TooFewUniqueAzimuths { unique: 1, .. }
    ));
}

#[test]
fn std_weighting_downweights_a_scattered_azimuth() {
    // A clean planted cosine plus a polluted azimuth bin: half its points
    // are far off the curve. Unweighted, the outliers drag the direction;
    // std weighting inflates that bin's sigma and protects the fit.
    let mut samples: Vec<SuperposedSample> = (0..4)
        .flat_map(|_| planted(100.0, 10.0, &AZIMUTHS))
        .collect();
    for _ in 0..4 {
        samples.push(superposed(-67.5, 250.0));
    }

    let unweighted = CosineFitter::new(&PipelineParams::new()).fit_all(&samples);
    let weighted_params = PipelineParams::builder()
        .weighting(Weighting::Std)
        .build()
        .unwrap();
    let weighted = CosineFitter::new(&weighted_params).fit_all(&samples);

    let err_unweighted = (unweighted.results[0].vel_dir - 10.0).abs();
    let err_weighted = (weighted.results[0].vel_dir - 10.0).abs();
    assert!(err_weighted < err_unweighted);
}
