//! Microstop catalog.
//!
//! Each variant carries its own station/duration/weight via the methods
//! below rather than through a lookup table of function pointers — dispatch
//! for fingerprint and register-mutation purposes is a `match` in the
//! engine, not an indirect call through stored closures.

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Microstop {
    Ms01,
    Ms02,
    Ms03,
    Ms04,
    Ms05,
    Ms06,
    Ms07,
    Ms08,
    Ms09,
    Ms10,
}

impl Microstop {
    pub const ALL: [Microstop; 10] = [
        Microstop::Ms01,
        Microstop::Ms02,
        Microstop::Ms03,
        Microstop::Ms04,
        Microstop::Ms05,
        Microstop::Ms06,
        Microstop::Ms07,
        Microstop::Ms08,
        Microstop::Ms09,
        Microstop::Ms10,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Microstop::Ms01 => "MS01",
            Microstop::Ms02 => "MS02",
            Microstop::Ms03 => "MS03",
            Microstop::Ms04 => "MS04",
            Microstop::Ms05 => "MS05",
            Microstop::Ms06 => "MS06",
            Microstop::Ms07 => "MS07",
            Microstop::Ms08 => "MS08",
            Microstop::Ms09 => "MS09",
            Microstop::Ms10 => "MS10",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Microstop::Ms01 => "Infeed Misfeed",
            Microstop::Ms02 => "Fill Stabilisation Wait",
            Microstop::Ms03 => "Nozzle Drip Detect",
            Microstop::Ms04 => "Cap Feed Stutter",
            Microstop::Ms05 => "Torque Recheck",
            Microstop::Ms06 => "Checkweigher Re-zero",
            Microstop::Ms07 => "Label Peelback",
            Microstop::Ms08 => "Barcode Re-scan",
            Microstop::Ms09 => "Reject Pusher Slow Return",
            Microstop::Ms10 => "Outfeed Accumulation Nudge",
        }
    }

    /// 1-based position in the catalog; becomes the register `stop_code`
    /// directly (1..=10).
    pub fn stop_code(self) -> u16 {
        match self {
            Microstop::Ms01 => 1,
            Microstop::Ms02 => 2,
            Microstop::Ms03 => 3,
            Microstop::Ms04 => 4,
            Microstop::Ms05 => 5,
            Microstop::Ms06 => 6,
            Microstop::Ms07 => 7,
            Microstop::Ms08 => 8,
            Microstop::Ms09 => 9,
            Microstop::Ms10 => 10,
        }
    }

    pub fn station(self) -> &'static str {
        match self {
            Microstop::Ms01 => "Infeed01",
            Microstop::Ms02 => "Filler01",
            Microstop::Ms03 => "Filler01",
            Microstop::Ms04 => "Capper01",
            Microstop::Ms05 => "Capper01",
            Microstop::Ms06 => "Checkweigher01",
            Microstop::Ms07 => "Labeller01",
            Microstop::Ms08 => "Scanner01",
            Microstop::Ms09 => "RejectPusher01",
            Microstop::Ms10 => "Line01",
        }
    }

    /// `(lo, hi)` sim-seconds duration range.
    pub fn duration_range_s(self) -> (f64, f64) {
        match self {
            Microstop::Ms01 => (6.0, 25.0),
            Microstop::Ms02 => (8.0, 40.0),
            Microstop::Ms03 => (5.0, 20.0),
            Microstop::Ms04 => (10.0, 50.0),
            Microstop::Ms05 => (12.0, 60.0),
            Microstop::Ms06 => (10.0, 90.0),
            Microstop::Ms07 => (8.0, 45.0),
            Microstop::Ms08 => (5.0, 30.0),
            Microstop::Ms09 => (8.0, 35.0),
            Microstop::Ms10 => (15.0, 120.0),
        }
    }

    pub fn base_weight(self) -> f64 {
        match self {
            Microstop::Ms01 => 12.0,
            Microstop::Ms02 => 18.0,
            Microstop::Ms03 => 8.0,
            Microstop::Ms04 => 10.0,
            Microstop::Ms05 => 9.0,
            Microstop::Ms06 => 11.0,
            Microstop::Ms07 => 10.0,
            Microstop::Ms08 => 9.0,
            Microstop::Ms09 => 7.0,
            Microstop::Ms10 => 6.0,
        }
    }

    /// Small diagnostic record attached to `MicrostopStarted`.
    pub fn fingerprint(self) -> Vec<(&'static str, String)> {
        let mut fp = vec![("station", self.station().to_string())];
        fp.push(("code", self.code().to_string()));
        fp
    }

    /// Weight used for selection, accounting for the large-format SKU bias
    /// on MS02 (filler scale overload).
    fn effective_weight(self, sku_is_large_format: bool) -> f64 {
        if self == Microstop::Ms02 && sku_is_large_format {
            self.base_weight() * 1.8
        } else {
            self.base_weight()
        }
    }
}

/// Weighted random pick over the catalog, with MS02's weight multiplied by
/// 1.8 when `sku_is_large_format` (see [`Microstop::effective_weight`]).
pub fn pick_microstop<R: Rng + ?Sized>(sku_is_large_format: bool, rng: &mut R) -> Microstop {
    let weights: Vec<f64> = Microstop::ALL
        .iter()
        .map(|m| m.effective_weight(sku_is_large_format))
        .collect();
    let total: f64 = weights.iter().sum();
    let mut pick = rng.gen::<f64>() * total;
    for (microstop, weight) in Microstop::ALL.iter().zip(weights.iter()) {
        if pick < *weight {
            return *microstop;
        }
        pick -= *weight;
    }
    // floating-point edge case: fall through to the last entry
    Microstop::Ms10
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn stop_codes_are_one_based_and_dense() {
        for (i, m) in Microstop::ALL.iter().enumerate() {
            assert_eq!(m.stop_code(), (i + 1) as u16);
        }
    }

    #[test]
    fn pick_microstop_is_deterministic_for_a_seeded_rng() {
        let mut rng_a = rand::rngs::StdRng::seed_from_u64(7);
        let mut rng_b = rand::rngs::StdRng::seed_from_u64(7);
        let picks_a: Vec<_> = (0..20).map(|_| pick_microstop(false, &mut rng_a)).collect();
        let picks_b: Vec<_> = (0..20).map(|_| pick_microstop(false, &mut rng_b)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn large_format_bias_increases_ms02_share() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let small_picks: Vec<_> = (0..5000).map(|_| pick_microstop(false, &mut rng)).collect();
        let mut rng2 = rand::rngs::StdRng::seed_from_u64(42);
        let large_picks: Vec<_> = (0..5000).map(|_| pick_microstop(true, &mut rng2)).collect();
        let small_ms02 = small_picks.iter().filter(|m| **m == Microstop::Ms02).count();
        let large_ms02 = large_picks.iter().filter(|m| **m == Microstop::Ms02).count();
        assert!(large_ms02 > small_ms02);
    }
}
