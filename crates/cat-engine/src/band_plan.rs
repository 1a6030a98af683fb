//! Band edges used to keep tuning inside the current band

use cat_protocol::Band;

/// Lookup of band edges
pub trait BandPlan: Send + Sync {
    /// Band containing `hz`
    fn band_for(&self, hz: u32) -> Option<Band>;

    /// Inclusive `(min, max)` edges of `band` in Hz
    fn limits(&self, band: Band) -> Option<(u32, u32)>;
}

/// Static band table. Entries are searched in order, so overlapping
/// catch-all entries must come last.
#[derive(Debug, Clone)]
pub struct StaticBandPlan {
    entries: Vec<(Band, u32, u32)>,
}

impl StaticBandPlan {
    /// Build a plan from `(band, min_khz, max_khz)` entries
    pub fn from_khz(entries: &[(Band, u32, u32)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|&(band, min, max)| (band, min * 1000, max * 1000))
                .collect(),
        }
    }

    /// Bands of the FT-891, IARU Region 1 allocations
    pub fn iaru_region1() -> Self {
        Self::from_khz(&[
            (Band::M160, 1810, 2000),
            (Band::M80, 3500, 3800),
            (Band::M40, 7000, 7200),
            (Band::M30, 10100, 10150),
            (Band::M20, 14000, 14350),
            (Band::M17, 18068, 18168),
            (Band::M15, 21000, 21450),
            (Band::M12, 24890, 24990),
            (Band::M10, 28000, 29700),
            (Band::M6, 50000, 54000),
            (Band::Gen, 30, 56000),
        ])
    }
}

impl Default for StaticBandPlan {
    fn default() -> Self {
        Self::iaru_region1()
    }
}

impl BandPlan for StaticBandPlan {
    fn band_for(&self, hz: u32) -> Option<Band> {
        self.entries
            .iter()
            .find(|&&(_, min, max)| (min..=max).contains(&hz))
            .map(|&(band, _, _)| band)
    }

    fn limits(&self, band: Band) -> Option<(u32, u32)> {
        self.entries
            .iter()
            .find(|&&(b, _, _)| b == band)
            .map(|&(_, min, max)| (min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_lookup() {
        let plan = StaticBandPlan::iaru_region1();
        assert_eq!(plan.band_for(14_025_000), Some(Band::M20));
        assert_eq!(plan.band_for(7_000_000), Some(Band::M40));
        assert_eq!(plan.band_for(7_200_000), Some(Band::M40));
        assert_eq!(plan.band_for(7_200_001), Some(Band::Gen));
        assert_eq!(plan.band_for(30_000), Some(Band::Gen));
        assert_eq!(plan.band_for(29_999), None);
    }

    #[test]
    fn test_limits() {
        let plan = StaticBandPlan::iaru_region1();
        assert_eq!(plan.limits(Band::M30), Some((10_100_000, 10_150_000)));
        assert_eq!(plan.limits(Band::Gen), Some((30_000, 56_000_000)));
        assert_eq!(plan.limits(Band::Mw), None);
    }
}
