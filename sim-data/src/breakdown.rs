//! Breakdown catalog: major (dispatched by schedule entries) and minor
//! (cataloged for future schedule authors, never injected by the built-in
//! schedule).

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakdownCode {
    BdM1,
    BdM2,
    BdM3,
    BdMinorPe,
    BdMinorLs,
    BdMinorCa,
}

impl BreakdownCode {
    pub fn code(self) -> &'static str {
        match self {
            BreakdownCode::BdM1 => "BD-M1",
            BreakdownCode::BdM2 => "BD-M2",
            BreakdownCode::BdM3 => "BD-M3",
            BreakdownCode::BdMinorPe => "BD-MINOR-PE",
            BreakdownCode::BdMinorLs => "BD-MINOR-LS",
            BreakdownCode::BdMinorCa => "BD-MINOR-CA",
        }
    }

    pub fn station(self) -> &'static str {
        match self {
            BreakdownCode::BdM1 => "Filler01",
            BreakdownCode::BdM2 => "Capper01",
            BreakdownCode::BdM3 => "Checkweigher01",
            BreakdownCode::BdMinorPe => "Infeed01",
            BreakdownCode::BdMinorLs => "Labeller01",
            BreakdownCode::BdMinorCa => "Capper01",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BreakdownCode::BdM1 => "Filler Scale Failure",
            BreakdownCode::BdM2 => "Capper Torque Sensor Failure",
            BreakdownCode::BdM3 => "Checkweigher Loadcell Failure",
            BreakdownCode::BdMinorPe => "Photoeye Misalignment",
            BreakdownCode::BdMinorLs => "Label Sensor Cleaning",
            BreakdownCode::BdMinorCa => "Cap Chute Adjustment",
        }
    }

    pub fn is_major(self) -> bool {
        matches!(self, BreakdownCode::BdM1 | BreakdownCode::BdM2 | BreakdownCode::BdM3)
    }

    pub fn severity(self) -> &'static str {
        if self.is_major() {
            "Major"
        } else {
            "Minor"
        }
    }

    /// `(lo, hi)` sim-seconds duration range.
    pub fn duration_range_s(self) -> (f64, f64) {
        let (lo_min, hi_min) = if self.is_major() {
            (45.0, 75.0)
        } else {
            (5.0, 20.0)
        };
        (lo_min * 60.0, hi_min * 60.0)
    }

    /// Compact integer fault code written to the register image. Minor
    /// breakdowns have a stop code but no distinct register `fault_code`
    /// value (only majors drive the line to `FAULT`; see `SPEC_FULL.md`
    /// §4.5).
    pub fn fault_code(self) -> u16 {
        match self {
            BreakdownCode::BdM1 => 1,
            BreakdownCode::BdM2 => 2,
            BreakdownCode::BdM3 => 3,
            _ => 0,
        }
    }

    /// Register `stop_code` value (21-23 majors, 24-26 minors).
    pub fn stop_code(self) -> u16 {
        match self {
            BreakdownCode::BdM1 => 21,
            BreakdownCode::BdM2 => 22,
            BreakdownCode::BdM3 => 23,
            BreakdownCode::BdMinorPe => 24,
            BreakdownCode::BdMinorLs => 25,
            BreakdownCode::BdMinorCa => 26,
        }
    }
}

/// Sample a concrete duration within a breakdown's range.
pub fn sample_duration<R: Rng + ?Sized>(code: BreakdownCode, rng: &mut R) -> f64 {
    let (lo, hi) = code.duration_range_s();
    rng.gen_range(lo..=hi)
}

/// `order_duration_s * U(0.20, 0.40)` — how far into an order a breakdown
/// injection fires.
pub fn trigger_offset<R: Rng + ?Sized>(order_duration_s: f64, rng: &mut R) -> f64 {
    order_duration_s * rng.gen_range(0.20..=0.40)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn major_breakdowns_have_a_nonzero_fault_code() {
        assert_eq!(BreakdownCode::BdM1.fault_code(), 1);
        assert_eq!(BreakdownCode::BdM2.fault_code(), 2);
        assert_eq!(BreakdownCode::BdM3.fault_code(), 3);
    }

    #[test]
    fn minor_breakdowns_have_no_fault_code() {
        assert_eq!(BreakdownCode::BdMinorPe.fault_code(), 0);
    }

    #[test]
    fn sample_duration_stays_within_range() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let (lo, hi) = BreakdownCode::BdM1.duration_range_s();
        for _ in 0..200 {
            let d = sample_duration(BreakdownCode::BdM1, &mut rng);
            assert!(d >= lo && d <= hi);
        }
    }

    #[test]
    fn trigger_offset_is_within_20_to_40_percent() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let offset = trigger_offset(1000.0, &mut rng);
            assert!(offset >= 200.0 && offset <= 400.0);
        }
    }
}
