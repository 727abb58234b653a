//! SKU catalog and liquid-base reference data.

/// Volumetric fill rate shared by every SKU.
pub const FILL_RATE_ML_PER_SEC: f64 = 120.0;

/// A liquid base: density and whether it is carbonated (informational only;
/// no current computation branches on carbonation, but schedule authors and
/// downstream MES tooling use it to group products).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidBase {
    pub key: &'static str,
    pub name: &'static str,
    pub density_g_ml: f64,
    pub carbonated: bool,
    /// Orders between mandatory CIPs for this base (0 = every liquid
    /// changeover onto this base is followed by a CIP, see `ChangeoverKind::Liquid`).
    /// Carried from the source material defs; nothing downstream counts
    /// orders against it, the same as in the material it was ported from.
    pub cip_after_orders: u32,
}

pub const LIQUID_BASES: &[LiquidBase] = &[
    LiquidBase {
        key: "BASE-LEM",
        name: "Lemon Base",
        density_g_ml: 1.01,
        carbonated: false,
        cip_after_orders: 4,
    },
    LiquidBase {
        key: "BASE-DL",
        name: "Diet Lemon Base",
        density_g_ml: 1.02,
        carbonated: false,
        cip_after_orders: 4,
    },
    LiquidBase {
        key: "BASE-COL",
        name: "Cola Base",
        density_g_ml: 1.04,
        carbonated: true,
        cip_after_orders: 0,
    },
    LiquidBase {
        key: "BASE-DC",
        name: "Diet Cola Base",
        density_g_ml: 1.02,
        carbonated: true,
        cip_after_orders: 0,
    },
];

pub fn liquid_base(key: &str) -> Option<&'static LiquidBase> {
    LIQUID_BASES.iter().find(|b| b.key == key)
}

/// A concrete product variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sku {
    pub key: &'static str,
    pub name: &'static str,
    pub volume_ml: f64,
    pub base_key: &'static str,
    pub torque_target_ncm: f64,
    pub hazard: bool,
    pub market: &'static str,
    pub label_group: &'static str,
    pub nominal_speed_bpm: f64,
    pub work_master_id: &'static str,
}

impl Sku {
    pub fn base(&self) -> &'static LiquidBase {
        liquid_base(self.base_key).expect("sku references unknown liquid base")
    }

    /// `volume_ml * base.density_g_ml`.
    pub fn target_weight_g(&self) -> f64 {
        self.volume_ml * self.base().density_g_ml
    }

    /// `volume_ml / FILL_RATE_ML_PER_SEC`.
    pub fn fill_time_s(&self) -> f64 {
        self.volume_ml / FILL_RATE_ML_PER_SEC
    }

    pub fn fill_time_ms(&self) -> f64 {
        self.fill_time_s() * 1000.0
    }

    /// Large-format SKUs whose filler scale is disproportionately prone to
    /// instability (MS02 selection weight bump, see [`crate::microstop`]).
    pub fn is_large_format(&self) -> bool {
        matches!(self.key, "LEM-2L-IE" | "LEM-6L-IE" | "COL-2L-IE")
    }
}

/// Dense index order for the register image's `sku_idx` field.
pub const SKU_LIST: &[Sku] = &[
    Sku {
        key: "LEM-200-IE",
        name: "Lemon 200mL",
        volume_ml: 200.0,
        base_key: "BASE-LEM",
        torque_target_ncm: 32.0,
        hazard: false,
        market: "IE",
        label_group: "LBL-A",
        nominal_speed_bpm: 120.0,
        work_master_id: "WM-001",
    },
    Sku {
        key: "LEM-500-IE",
        name: "Lemon 500mL",
        volume_ml: 500.0,
        base_key: "BASE-LEM",
        torque_target_ncm: 34.0,
        hazard: false,
        market: "IE",
        label_group: "LBL-A",
        nominal_speed_bpm: 100.0,
        work_master_id: "WM-002",
    },
    Sku {
        key: "LEM-2L-IE",
        name: "Lemon 2L",
        volume_ml: 2000.0,
        base_key: "BASE-LEM",
        torque_target_ncm: 36.0,
        hazard: false,
        market: "IE",
        label_group: "LBL-A",
        nominal_speed_bpm: 60.0,
        work_master_id: "WM-003",
    },
    Sku {
        key: "LEM-6L-IE",
        name: "Lemon 6L",
        volume_ml: 6000.0,
        base_key: "BASE-LEM",
        torque_target_ncm: 40.0,
        hazard: false,
        market: "IE",
        label_group: "LBL-A",
        nominal_speed_bpm: 30.0,
        work_master_id: "WM-004",
    },
    Sku {
        key: "DL-200-IE",
        name: "Diet Lemon 200mL",
        volume_ml: 200.0,
        base_key: "BASE-DL",
        torque_target_ncm: 32.0,
        hazard: false,
        market: "IE",
        label_group: "LBL-B",
        nominal_speed_bpm: 120.0,
        work_master_id: "WM-001",
    },
    Sku {
        key: "DL-500-IE",
        name: "Diet Lemon 500mL",
        volume_ml: 500.0,
        base_key: "BASE-DL",
        torque_target_ncm: 34.0,
        hazard: false,
        market: "IE",
        label_group: "LBL-B",
        nominal_speed_bpm: 100.0,
        work_master_id: "WM-002",
    },
    Sku {
        key: "COL-500-IE",
        name: "Cola 500mL",
        volume_ml: 500.0,
        base_key: "BASE-COL",
        torque_target_ncm: 34.0,
        hazard: false,
        market: "IE",
        label_group: "LBL-C",
        nominal_speed_bpm: 95.0,
        work_master_id: "WM-005",
    },
    Sku {
        key: "COL-2L-IE",
        name: "Cola 2L",
        volume_ml: 2000.0,
        base_key: "BASE-COL",
        torque_target_ncm: 36.0,
        hazard: false,
        market: "IE",
        label_group: "LBL-C",
        nominal_speed_bpm: 55.0,
        work_master_id: "WM-005",
    },
    Sku {
        key: "DC-500-IE",
        name: "Diet Cola 500mL IE",
        volume_ml: 500.0,
        base_key: "BASE-DC",
        torque_target_ncm: 34.0,
        hazard: true,
        market: "IE",
        label_group: "LBL-D",
        nominal_speed_bpm: 95.0,
        work_master_id: "WM-006",
    },
    Sku {
        key: "DC-500-UK",
        name: "Diet Cola 500mL UK",
        volume_ml: 500.0,
        base_key: "BASE-DC",
        torque_target_ncm: 34.0,
        hazard: true,
        market: "UK",
        label_group: "LBL-E",
        nominal_speed_bpm: 95.0,
        work_master_id: "WM-006",
    },
];

pub fn get_sku(key: &str) -> Option<&'static Sku> {
    SKU_LIST.iter().find(|s| s.key == key)
}

/// Dense index of a SKU for the register image, or `None` if unknown.
///
/// Unlike the reference implementation this never returns a sentinel value
/// for a miss: callers must treat an unknown SKU as a schedule-level error
/// (see the crate-level Open Question note) rather than writing a value that
/// could alias the idle sentinel.
pub fn sku_index(key: &str) -> Option<u16> {
    SKU_LIST.iter().position(|s| s.key == key).map(|i| i as u16)
}

pub fn sku_from_index(index: u16) -> Option<&'static Sku> {
    SKU_LIST.get(index as usize)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn target_weight_matches_density() {
        let sku = get_sku("COL-500-IE").unwrap();
        assert!((sku.target_weight_g() - 520.0).abs() < 1e-9);
    }

    #[test]
    fn fill_time_matches_fill_rate() {
        let sku = get_sku("LEM-200-IE").unwrap();
        assert!((sku.fill_time_s() - 200.0 / FILL_RATE_ML_PER_SEC).abs() < 1e-9);
    }

    #[test]
    fn sku_index_round_trips_through_sku_from_index() {
        for (i, sku) in SKU_LIST.iter().enumerate() {
            assert_eq!(sku_index(sku.key), Some(i as u16));
            assert_eq!(sku_from_index(i as u16).unwrap().key, sku.key);
        }
    }

    #[test]
    fn unknown_sku_has_no_index() {
        assert_eq!(sku_index("NOT-A-SKU"), None);
    }

    #[test]
    fn large_format_skus_are_flagged() {
        assert!(get_sku("LEM-2L-IE").unwrap().is_large_format());
        assert!(get_sku("COL-2L-IE").unwrap().is_large_format());
        assert!(!get_sku("LEM-500-IE").unwrap().is_large_format());
    }
}
