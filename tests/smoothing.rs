//! Smoothing Integration Tests
//!
//! Length preservation, fixed points and window handling of both strategies.

use eventlens::smoothing::{gaussian_weights, smooth, SmoothingConfig, SmoothingStrategy};

const STRATEGIES: [SmoothingStrategy; 2] =
    [SmoothingStrategy::MovingAverage, SmoothingStrategy::Gaussian];

fn close(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
}

#[test]
fn test_constant_series_is_fixed_point_of_moving_average() {
    let smoothed = smooth(&[1.0, 1.0, 1.0, 1.0, 1.0], 2, SmoothingStrategy::MovingAverage);
    assert!(close(&smoothed, &[1.0, 1.0, 1.0, 1.0, 1.0]), "{:?}", smoothed);
}

#[test]
fn test_length_preserved_for_every_window() {
    let scores: Vec<f64> = (0..37).map(|i| ((i * 7) % 11) as f64).collect();

    for strategy in STRATEGIES {
        for window in 1..=50 {
            assert_eq!(
                smooth(&scores, window, strategy).len(),
                scores.len(),
                "{} window {}",
                strategy,
                window
            );
        }
    }
}

#[test]
fn test_single_value_series() {
    for strategy in STRATEGIES {
        assert_eq!(smooth(&[4.0], 10, strategy).len(), 1);
    }
}

#[test]
fn test_empty_series() {
    for strategy in STRATEGIES {
        assert!(smooth(&[], 10, strategy).is_empty());
    }
}

#[test]
fn test_window_zero_does_not_panic() {
    for strategy in STRATEGIES {
        assert_eq!(smooth(&[1.0, 2.0, 3.0], 0, strategy).len(), 3);
    }
}

#[test]
fn test_window_one_moving_average_is_identity() {
    let scores = [7.0, 0.0, 5.0, 2.0];
    assert!(close(
        &smooth(&scores, 1, SmoothingStrategy::MovingAverage),
        &scores
    ));
}

#[test]
fn test_moving_average_stays_within_input_range() {
    let scores = [0.0, 20.0, 0.0, 20.0, 0.0, 20.0];
    let smoothed = smooth(&scores, 3, SmoothingStrategy::MovingAverage);
    assert!(smoothed.iter().all(|v| (0.0..=20.0).contains(v)));
}

#[test]
fn test_gaussian_weights_favour_window_centre() {
    let weights = gaussian_weights(7);
    assert_eq!(weights.len(), 7);
    assert!(weights.iter().all(|w| *w > 0.0 && *w <= 1.0));
    assert!(weights[3] > weights[0]);
    assert!(weights[3] > weights[6]);
}

#[test]
fn test_config_defaults() {
    let config = SmoothingConfig::default();
    assert_eq!(config.window_size, 10);
    assert_eq!(config.strategy, SmoothingStrategy::Gaussian);
    assert_eq!(config.smooth(&[1.0, 2.0]).len(), 2);
}

#[test]
fn test_strategy_names() {
    for strategy in STRATEGIES {
        assert_eq!(strategy.as_str().parse::<SmoothingStrategy>().unwrap(), strategy);
    }
    assert!("median".parse::<SmoothingStrategy>().is_err());
}
