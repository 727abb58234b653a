//! Named holding-register indices and the code maps that give small integer
//! fields (`stop_code`, `fault_code`, `reject_reason`) their meaning.

/// Total size of the holding-register image, in 16-bit words.
pub const TOTAL_REGISTERS: usize = 100;

pub const R_LINE_STATE: usize = 0;
pub const R_LINE_SPEED: usize = 1; // f32, 1-2
pub const R_GOOD_COUNT: usize = 3; // u32, 3-4
pub const R_REJECT_COUNT: usize = 5; // u32, 5-6
pub const R_ORDER_IDX: usize = 7;
pub const R_SKU_IDX: usize = 8;
pub const R_STOP_CODE: usize = 9;
pub const R_FAULT_CODE: usize = 10;
pub const R_ORDER_SEQ: usize = 11;
pub const R_SIM_SPEED_X10: usize = 12;

pub const R_INFEED_BOTTLE_PRESENCE: usize = 14;
pub const R_INFEED_RATE: usize = 15; // f32, 15-16
pub const R_INFEED_STARVED: usize = 17;
pub const R_INFEED_JAM_DETECTED: usize = 18;

pub const R_FILLER_TARGET_WEIGHT: usize = 20; // f32, 20-21
pub const R_FILLER_ACTUAL_WEIGHT: usize = 22; // f32, 22-23
pub const R_FILLER_FILL_TIME_MS: usize = 24; // u32, 24-25
pub const R_FILLER_SCALE_STABLE: usize = 26;
pub const R_FILLER_DRIP_SENSOR: usize = 27;

pub const R_CAPPER_TORQUE_TARGET: usize = 29; // f32, 29-30
pub const R_CAPPER_TORQUE_ACTUAL: usize = 31; // f32, 31-32
pub const R_CAPPER_TORQUE_IN_SPEC: usize = 33;
pub const R_CAPPER_CAP_FEED_OK: usize = 34;

pub const R_CHECKWEIGHER_GROSS_WEIGHT: usize = 36; // f32, 36-37
pub const R_CHECKWEIGHER_WEIGHT_IN_SPEC: usize = 38;
pub const R_CHECKWEIGHER_REZERO_ACTIVE: usize = 39;

pub const R_LABELLER1_APPLIED: usize = 41;
pub const R_LABELLER1_SENSOR_OK: usize = 42;
pub const R_LABELLER1_STOCK_PCT: usize = 43;

pub const R_SCANNER_BARCODE_OK: usize = 45;
pub const R_SCANNER_RESCAN_COUNT: usize = 46;

pub const R_LABELLER2_HAZARD_REQUIRED: usize = 48;
pub const R_LABELLER2_HAZARD_APPLIED: usize = 49;
pub const R_LABELLER2_HAZARD_STOCK_PCT: usize = 50;

pub const R_PUSHER_REJECT_TRIGGERED: usize = 52;
pub const R_PUSHER_REJECT_REASON: usize = 53;
pub const R_PUSHER_CYCLE_MS: usize = 54; // u32, 54-55

/// Sentinel written to [`R_ORDER_IDX`]/[`R_SKU_IDX`] when no order is active.
pub const IDLE_SENTINEL: u16 = 0xFFFF;

/// Line states, as written to [`R_LINE_STATE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum LineState {
    Idle = 0,
    Running = 1,
    Microstop = 2,
    Stopped = 3,
    Fault = 4,
    Changeover = 5,
    Cip = 6,
}

impl LineState {
    pub fn as_word(self) -> u16 {
        self as u16
    }
}

impl std::fmt::Display for LineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LineState::Idle => "IDLE",
            LineState::Running => "RUNNING",
            LineState::Microstop => "MICROSTOP",
            LineState::Stopped => "STOPPED",
            LineState::Fault => "FAULT",
            LineState::Changeover => "CHANGEOVER",
            LineState::Cip => "CIP",
        };
        f.write_str(name)
    }
}

/// Reject reasons, as written to [`R_PUSHER_REJECT_REASON`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RejectReason {
    None = 0,
    Weight = 1,
    Torque = 2,
    Barcode = 3,
    Label = 4,
    HazardLabel = 5,
}

impl RejectReason {
    pub fn as_word(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            RejectReason::None => "none",
            RejectReason::Weight => "weight",
            RejectReason::Torque => "torque",
            RejectReason::Barcode => "barcode",
            RejectReason::Label => "label",
            RejectReason::HazardLabel => "hazard_label",
        }
    }
}

/// Canonical stop-code numbering: 0=none, 1-10=MS01..MS10, 11-20=ST01..ST10,
/// 21-23=BD-M1/2/3, 24-26=BD-MINOR-PE/LS/CA.
pub fn stop_code_for_microstop(index_1_based: u16) -> u16 {
    debug_assert!((1..=10).contains(&index_1_based));
    index_1_based
}

pub fn stop_code_for_scheduled_stop(index_1_based: u16) -> u16 {
    debug_assert!((1..=10).contains(&index_1_based));
    10 + index_1_based
}

pub const STOP_CODE_BD_M1: u16 = 21;
pub const STOP_CODE_BD_M2: u16 = 22;
pub const STOP_CODE_BD_M3: u16 = 23;
pub const STOP_CODE_BD_MINOR_PE: u16 = 24;
pub const STOP_CODE_BD_MINOR_LS: u16 = 25;
pub const STOP_CODE_BD_MINOR_CA: u16 = 26;

pub const FAULT_CODE_NONE: u16 = 0;
pub const FAULT_CODE_BD_M1: u16 = 1;
pub const FAULT_CODE_BD_M2: u16 = 2;
pub const FAULT_CODE_BD_M3: u16 = 3;
