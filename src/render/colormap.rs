use once_cell::sync::Lazy;

/// `jet` segment data as (x, value) breakpoints for red, green and blue
const JET_RED: &[(f64, f64)] = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: &[(f64, f64)] = &[(0.0, 0.0), (0.125, 0.0), (0.375, 1.0), (0.64, 1.0), (0.91, 0.0), (1.0, 0.0)];
const JET_BLUE: &[(f64, f64)] = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

static JET_64: Lazy<Colormap> = Lazy::new(|| Colormap::jet(64));

/// Listed colormap: `n` RGB entries in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    colors: Vec<[f64; 3]>,
}

impl Colormap {
    /// `jet` sampled at `n` evenly spaced positions
    pub fn jet(n: usize) -> Colormap {
        let n = n.max(1);
        let colors = (0..n)
            .map(|i| {
                let x = if n == 1 { 0.0 } else { i as f64 / (n - 1) as f64 };
                [segment(JET_RED, x), segment(JET_GREEN, x), segment(JET_BLUE, x)]
            })
            .collect();
        Colormap { colors }
    }

    /// Shared 64-entry table used for every snapshot
    pub fn jet64() -> &'static Colormap {
        &JET_64
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[[f64; 3]] {
        &self.colors
    }

    /// Colour of `value` within `clim = [min, max]`.
    /// Values outside the range take the end colours; NaN takes the lowest.
    pub fn map(&self, value: f64, clim: [f64; 2]) -> [f64; 3] {
        let n = self.colors.len();
        let span = clim[1] - clim[0];
        let t = if span > 0.0 {
            (value - clim[0]) / span
        } else if value > clim[0] {
            1.0
        } else {
            0.0
        };
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let idx = ((t * n as f64).floor() as usize).min(n - 1);
        self.colors[idx]
    }
}

/// Piecewise-linear interpolation of one channel
fn segment(points: &[(f64, f64)], x: f64) -> f64 {
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            if x1 <= x0 {
                return y1;
            }
            return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
        }
    }
    points.last().map(|p| p.1).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_jet_end_colours() {
        let jet = Colormap::jet64();
        assert_eq!(jet.len(), 64);
        assert_eq!(jet.colors()[0], [0.0, 0.0, 0.5]);
        assert_eq!(jet.colors()[63], [0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_jet_midpoint_is_greenish() {
        let jet = Colormap::jet(64);
        // x = 32/63 lies on the plateau of the green channel
        let c = jet.colors()[32];
        assert_abs_diff_eq!(c[1], 1.0, epsilon = 1e-12);
        assert!(c[0] > 0.4 && c[0] < 0.6);
        assert!(c[2] > 0.4 && c[2] < 0.6);
    }

    #[test]
    fn test_map_clamps_and_bins() {
        let jet = Colormap::jet64();
        let clim = [0.0, 0.4];
        assert_eq!(jet.map(-1.0, clim), jet.colors()[0]);
        assert_eq!(jet.map(0.4, clim), jet.colors()[63]);
        assert_eq!(jet.map(10.0, clim), jet.colors()[63]);
        // 0.11 / 0.4 * 64 = 17.6
        assert_eq!(jet.map(0.11, clim), jet.colors()[17]);
        assert_eq!(jet.map(f64::NAN, clim), jet.colors()[0]);
    }

    #[test]
    fn test_degenerate_range() {
        let jet = Colormap::jet64();
        assert_eq!(jet.map(0.0, [0.0, 0.0]), jet.colors()[0]);
        assert_eq!(jet.map(1.0, [0.0, 0.0]), jet.colors()[63]);
    }
}
