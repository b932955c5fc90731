/// Score returned when the window carries no spread to rescale against.
pub const NO_SIGNAL_SCORE: f64 = 50.0;

/// Min-max rescales `value` to 0..=100 against the bounds of `window`.
///
/// `window` must hold finite values; an empty window is treated as the
/// one-element window `[value]`. When `max <= min` the result is
/// [`NO_SIGNAL_SCORE`]. With `invert` the score is mirrored (`100 - score`),
/// for indicators where a higher reading means lower risk.
pub fn normalize(value: f64, window: &[f64], invert: bool) -> f64 {
    debug_assert!(value.is_finite(), "normalize called with non-finite value");

    let (min_v, max_v) = bounds(window).unwrap_or((value, value));
    let score = if max_v <= min_v {
        NO_SIGNAL_SCORE
    } else {
        ((value - min_v) / (max_v - min_v) * 100.0).clamp(0.0, 100.0)
    };

    if invert {
        100.0 - score
    } else {
        score
    }
}

fn bounds(window: &[f64]) -> Option<(f64, f64)> {
    let mut iter = window.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_within_window() {
        assert_eq!(normalize(20.0, &[0.0, 40.0], false), 50.0);
        assert_eq!(normalize(40.0, &[0.0, 10.0, 40.0], false), 100.0);
        assert_eq!(normalize(0.0, &[0.0, 40.0], false), 0.0);
    }

    #[test]
    fn inverted_mirrors_score() {
        assert_eq!(normalize(10.0, &[0.0, 20.0], true), 50.0);
        let window = [3.0, 9.0, 4.5];
        for value in [3.0, 4.0, 7.5, 9.0, 12.0, -1.0] {
            let plain = normalize(value, &window, false);
            let inverted = normalize(value, &window, true);
            assert!((inverted - (100.0 - plain)).abs() < 1e-12);
        }
    }

    #[test]
    fn clamps_values_outside_window() {
        assert_eq!(normalize(-5.0, &[0.0, 10.0], false), 0.0);
        assert_eq!(normalize(999.0, &[0.0, 10.0], false), 100.0);
        assert_eq!(normalize(999.0, &[0.0, 10.0], true), 0.0);
    }

    #[test]
    fn degenerate_window_is_midpoint() {
        for value in [-100.0, 0.0, 7.0, 1e6] {
            assert_eq!(normalize(value, &[7.0, 7.0], false), NO_SIGNAL_SCORE);
            assert_eq!(normalize(value, &[7.0, 7.0], true), NO_SIGNAL_SCORE);
        }
        assert_eq!(normalize(3.0, &[], false), NO_SIGNAL_SCORE);
    }

    #[test]
    fn always_within_bounds() {
        let windows: [&[f64]; 4] = [&[1.0, 2.0], &[-50.0, 50.0], &[0.1], &[5.0, 20.0, 12.0]];
        for window in windows {
            for value in [-1e9, -3.0, 0.0, 1.5, 15.0, 1e9] {
                for invert in [false, true] {
                    let score = normalize(value, window, invert);
                    assert!((0.0..=100.0).contains(&score), "{score} out of range");
                }
            }
        }
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(33.33333), 33.33);
        assert_eq!(round2(66.666), 66.67);
    }
}
