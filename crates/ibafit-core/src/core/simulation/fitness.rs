use crate::core::models::spectrum::ChannelWindow;

/// Weighted mean squared deviation of `simulated` from `measured` over `window`.
///
/// Each channel is weighted by `1 / max(measured, 1)`. Only channels present in both
/// spectra count; an empty overlap scores `f64::INFINITY`.
pub fn fitness(simulated: &[f64], measured: &[f64], window: ChannelWindow) -> f64 {
    let Some(range) = window.intersect(simulated.len(), measured.len()) else {
        return f64::INFINITY;
    };
    let n = range.clone().count();
    let sum: f64 = range
        .map(|c| {
            let d = simulated[c] - measured[c];
            d * d / measured[c].max(1.0)
        })
        .sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_spectra_score_zero() {
        let s = vec![0.0, 3.0, 100.0, 7.5];
        assert_eq!(fitness(&s, &s, ChannelWindow::new(0, 10)), 0.0);
    }

    #[test]
    fn score_grows_with_squared_deviation() {
        let measured = vec![10.0; 20];
        let near: Vec<f64> = measured.iter().map(|m| m + 1.0).collect();
        let far: Vec<f64> = measured.iter().map(|m| m + 2.0).collect();
        let w = ChannelWindow::new(0, 19);
        let a = fitness(&near, &measured, w);
        let b = fitness(&far, &measured, w);
        assert!((a - 0.1).abs() < 1e-12);
        assert!((b - 4.0 * a).abs() < 1e-12);
    }

    #[test]
    fn low_count_channels_use_unit_weight() {
        let f = fitness(&[3.0], &[0.0], ChannelWindow::new(0, 0));
        assert_eq!(f, 9.0);
    }

    #[test]
    fn only_the_window_is_scored() {
        let measured = vec![5.0; 10];
        let mut simulated = measured.clone();
        simulated[9] = 500.0;
        assert_eq!(fitness(&simulated, &measured, ChannelWindow::new(0, 8)), 0.0);
        assert!(fitness(&simulated, &measured, ChannelWindow::new(0, 9)) > 0.0);
    }

    #[test]
    fn disjoint_window_is_infinite() {
        assert_eq!(
            fitness(&[1.0; 4], &[1.0; 4], ChannelWindow::new(10, 20)),
            f64::INFINITY
        );
    }
}
