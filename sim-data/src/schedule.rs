//! The built-in production schedule.
//!
//! Loading a schedule from an `.xlsx` file is out of scope (see
//! `SPEC_FULL.md` §1 Non-goals); [`load_schedule`] always returns
//! [`BUILT_IN_SCHEDULE`] regardless of the path it is given.

use crate::breakdown::BreakdownCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeoverKind {
    Label,
    Size,
    Liquid,
}

impl ChangeoverKind {
    pub fn name(self) -> &'static str {
        match self {
            ChangeoverKind::Label => "LABEL",
            ChangeoverKind::Size => "SIZE",
            ChangeoverKind::Liquid => "LIQUID",
        }
    }
}

/// A changeover performed either standalone or as an order's preceding step.
#[derive(Debug, Clone, Copy)]
pub struct ChangeoverSpec {
    pub kind: ChangeoverKind,
    /// `ST01`/`ST02`/`ST03`-style schedule stop code.
    pub stop_code: &'static str,
    pub duration_min_lo: f64,
    pub duration_min_hi: f64,
}

#[derive(Debug, Clone)]
pub struct OrderEntry {
    pub order_id: &'static str,
    pub sku_key: &'static str,
    pub planned_qty: u32,
    pub preceding_changeover: Option<ChangeoverSpec>,
    /// Run a CIP immediately after this order completes, in addition to the
    /// implicit CIP that always follows a `LIQUID` changeover.
    pub cip_after: bool,
    pub inject_breakdown: Option<BreakdownCode>,
}

#[derive(Debug, Clone)]
pub enum ScheduleEntry {
    Order(OrderEntry),
    /// A changeover with no attached order (not used by the built-in
    /// schedule, but part of the external contract: a schedule author may
    /// place one standalone).
    Changeover(ChangeoverSpec),
    Cip { duration_min: f64 },
    Break { duration_min: f64, reason_text: &'static str },
}

fn order(
    order_id: &'static str,
    sku_key: &'static str,
    planned_qty: u32,
    preceding_changeover: Option<ChangeoverSpec>,
    cip_after: bool,
    inject_breakdown: Option<BreakdownCode>,
) -> ScheduleEntry {
    ScheduleEntry::Order(OrderEntry {
        order_id,
        sku_key,
        planned_qty,
        preceding_changeover,
        cip_after,
        inject_breakdown,
    })
}

fn co(kind: ChangeoverKind, stop_code: &'static str, lo: f64, hi: f64) -> ChangeoverSpec {
    ChangeoverSpec {
        kind,
        stop_code,
        duration_min_lo: lo,
        duration_min_hi: hi,
    }
}

pub fn built_in_schedule() -> Vec<ScheduleEntry> {
    vec![
        // Monday Shift 1
        order("ORD-001", "LEM-500-IE", 4000, None, false, None),
        order(
            "ORD-002",
            "LEM-200-IE",
            3000,
            Some(co(ChangeoverKind::Label, "ST01", 20.0, 25.0)),
            false,
            None,
        ),
        order(
            "ORD-003",
            "LEM-2L-IE",
            1200,
            Some(co(ChangeoverKind::Size, "ST02", 40.0, 50.0)),
            false,
            Some(BreakdownCode::BdM1),
        ),
        ScheduleEntry::Cip { duration_min: 45.0 },
        // Monday Shift 2
        order(
            "ORD-004",
            "COL-500-IE",
            3800,
            Some(co(ChangeoverKind::Liquid, "ST03", 60.0, 90.0)),
            false,
            None,
        ),
        order(
            "ORD-005",
            "DC-500-IE",
            2500,
            None,
            false,
            Some(BreakdownCode::BdM2),
        ),
        ScheduleEntry::Break {
            duration_min: 30.0,
            reason_text: "Lunch break",
        },
        order(
            "ORD-006",
            "COL-2L-IE",
            800,
            Some(co(ChangeoverKind::Size, "ST02", 35.0, 45.0)),
            false,
            None,
        ),
        // Tuesday Shift 1
        order(
            "ORD-007",
            "LEM-500-IE",
            5000,
            Some(co(ChangeoverKind::Liquid, "ST03", 60.0, 90.0)),
            false,
            Some(BreakdownCode::BdM3),
        ),
        order("ORD-008", "LEM-500-IE", 4000, None, false, None),
        order(
            "ORD-009",
            "LEM-6L-IE",
            300,
            Some(co(ChangeoverKind::Size, "ST02", 40.0, 55.0)),
            true,
            None,
        ),
        ScheduleEntry::Cip { duration_min: 45.0 },
        // Tuesday Shift 2
        order(
            "ORD-010",
            "DC-500-UK",
            2000,
            Some(co(ChangeoverKind::Liquid, "ST03", 60.0, 90.0)),
            false,
            None,
        ),
        order(
            "ORD-011",
            "LEM-500-IE",
            4500,
            Some(co(ChangeoverKind::Liquid, "ST03", 60.0, 90.0)),
            false,
            None,
        ),
        // Wednesday Shift 1
        order(
            "ORD-012",
            "LEM-200-IE",
            5000,
            Some(co(ChangeoverKind::Size, "ST02", 35.0, 50.0)),
            false,
            None,
        ),
        order(
            "ORD-013",
            "LEM-2L-IE",
            1500,
            Some(co(ChangeoverKind::Size, "ST02", 40.0, 55.0)),
            false,
            None,
        ),
        order(
            "ORD-014",
            "LEM-500-IE",
            3500,
            Some(co(ChangeoverKind::Size, "ST02", 35.0, 45.0)),
            true,
            None,
        ),
        ScheduleEntry::Cip { duration_min: 45.0 },
        // Wednesday Shift 2
        order(
            "ORD-015",
            "COL-500-IE",
            4000,
            Some(co(ChangeoverKind::Liquid, "ST03", 60.0, 90.0)),
            false,
            None,
        ),
        ScheduleEntry::Break {
            duration_min: 30.0,
            reason_text: "Scheduled break",
        },
        order(
            "ORD-016",
            "LEM-500-IE",
            3000,
            Some(co(ChangeoverKind::Liquid, "ST03", 60.0, 90.0)),
            false,
            None,
        ),
        // Thursday Shift 1
        order("ORD-017", "LEM-500-IE", 5000, None, false, None),
        // Thursday Shift 2
        order(
            "ORD-018",
            "DC-500-IE",
            3500,
            Some(co(ChangeoverKind::Liquid, "ST03", 60.0, 90.0)),
            false,
            None,
        ),
        // Friday Shift 1
        order(
            "ORD-019",
            "LEM-500-IE",
            4500,
            Some(co(ChangeoverKind::Liquid, "ST03", 60.0, 90.0)),
            false,
            None,
        ),
        // Friday Shift 2
        order(
            "ORD-020",
            "LEM-200-IE",
            4000,
            Some(co(ChangeoverKind::Size, "ST02", 35.0, 45.0)),
            false,
            None,
        ),
    ]
}

/// Always returns [`built_in_schedule`]. `xlsx_path` is accepted for
/// interface compatibility; `.xlsx` loading is out of scope.
pub fn load_schedule(xlsx_path: Option<&str>) -> Vec<ScheduleEntry> {
    if let Some(path) = xlsx_path {
        tracing::debug!(path, "schedule_xlsx configured but xlsx loading is not implemented; using built-in schedule");
    }
    built_in_schedule()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn built_in_schedule_has_twenty_orders() {
        let orders = built_in_schedule()
            .iter()
            .filter(|e| matches!(e, ScheduleEntry::Order(_)))
            .count();
        assert_eq!(orders, 20);
    }

    #[test]
    fn built_in_schedule_has_three_standalone_cips_and_two_breaks() {
        let schedule = built_in_schedule();
        let cips = schedule
            .iter()
            .filter(|e| matches!(e, ScheduleEntry::Cip { .. }))
            .count();
        let breaks = schedule
            .iter()
            .filter(|e| matches!(e, ScheduleEntry::Break { .. }))
            .count();
        assert_eq!(cips, 3);
        assert_eq!(breaks, 2);
    }

    #[test]
    fn ord_004_is_a_liquid_changeover() {
        let schedule = built_in_schedule();
        let ord_004 = schedule.iter().find_map(|e| match e {
            ScheduleEntry::Order(o) if o.order_id == "ORD-004" => Some(o),
            _ => None,
        });
        let ord_004 = ord_004.expect("ORD-004 present");
        let changeover = ord_004.preceding_changeover.expect("has changeover");
        assert_eq!(changeover.kind, ChangeoverKind::Liquid);
    }

    #[test]
    fn load_schedule_ignores_xlsx_path() {
        assert_eq!(
            load_schedule(Some("whatever.xlsx")).len(),
            built_in_schedule().len()
        );
    }
}
