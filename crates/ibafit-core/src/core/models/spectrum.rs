use std::time::Duration;

/// Inclusive channel range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelWindow {
    pub start: usize,
    pub end: usize,
}

impl ChannelWindow {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Channels of the window that exist in both spectra of the given lengths.
    pub fn intersect(&self, len_a: usize, len_b: usize) -> Option<std::ops::RangeInclusive<usize>> {
        let last = len_a.min(len_b).checked_sub(1)?;
        let end = self.end.min(last);
        (self.start <= end).then_some(self.start..=end)
    }

    /// Same window expressed in compressed channels of `bins` original channels each.
    pub fn compressed(&self, bins: usize) -> Self {
        let bins = bins.max(1);
        Self {
            start: self.start / bins,
            end: self.end / bins,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredSpectrum {
    pub label: String,
    pub counts: Vec<f64>,
}

impl MeasuredSpectrum {
    pub fn new(label: impl Into<String>, counts: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            counts,
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sums groups of `bins` adjacent channels; a trailing partial group is kept.
    pub fn compressed(&self, bins: usize) -> Self {
        Self {
            label: self.label.clone(),
            counts: compress_counts(&self.counts, bins),
        }
    }
}

pub fn compress_counts(counts: &[f64], bins: usize) -> Vec<f64> {
    if bins <= 1 {
        return counts.to_vec();
    }
    counts.chunks(bins).map(|c| c.iter().sum()).collect()
}

/// What a partial spectrum belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    Layer { index: usize },
    Element { layer: usize, z: u8 },
    Isotope { layer: usize, z: u8, mass: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSpectrum {
    pub kind: ComponentKind,
    pub counts: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationData {
    /// Lower edge energy of every channel, keV.
    pub energies: Vec<f64>,
    pub counts: Vec<f64>,
    pub components: Vec<ComponentSpectrum>,
    pub elapsed: Duration,
    /// Present only when a measured spectrum was supplied.
    pub fitness: Option<f64>,
}

impl SimulationData {
    pub fn total_counts(&self) -> f64 {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_intersection_clips_to_shorter_spectrum() {
        let w = ChannelWindow::new(10, 500);
        assert_eq!(w.intersect(100, 300), Some(10..=99));
        assert_eq!(w.intersect(5, 300), None);
        assert_eq!(w.intersect(0, 0), None);
    }

    #[test]
    fn reversed_window_is_reordered() {
        assert_eq!(ChannelWindow::new(9, 3), ChannelWindow { start: 3, end: 9 });
    }

    #[test]
    fn compression_sums_neighbouring_channels() {
        let s = MeasuredSpectrum::new("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(s.compressed(2).counts, vec![3.0, 7.0, 5.0]);
        assert_eq!(s.compressed(1).counts, s.counts);
        assert_eq!(
            ChannelWindow::new(10, 21).compressed(4),
            ChannelWindow { start: 2, end: 5 }
        );
    }
}
