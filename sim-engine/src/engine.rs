//! The line state machine: order execution, per-bottle processing,
//! microstops, breakdowns, changeovers, CIP, and scheduled breaks.
//!
//! Grounded on the original line simulator's tick loop: the engine owns a
//! local copy of the register words, mutates it across a tick, then publishes
//! the whole image atomically. It never holds the shared image lock across a
//! sleep.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sim_data::breakdown::{sample_duration, trigger_offset};
use sim_data::microstop::pick_microstop;
use sim_data::sku::{get_sku, sku_index, Sku};
use sim_data::{BreakdownCode, ChangeoverKind, ChangeoverSpec, Microstop, OrderEntry, ScheduleEntry};
use sim_events::emitter::OrderContext;
use sim_events::envelope::BottleResult;
use sim_events::EventEmitter;
use sim_registers::map::*;
use sim_registers::RegisterImage;

use crate::error::EngineError;
use crate::rng::SimRng;

/// Production-tunable parameters, supplied by configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tick_hz: f64,
    pub speed_factor: f64,
    pub microstop_mean_interval_s: f64,
    pub base_reject_probability: f64,
    pub label_stock_initial_pct: f64,
    pub label_stock_depletion_per_1000: f64,
    pub cap_stock_initial_pct: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_hz: 10.0,
            speed_factor: 60.0,
            microstop_mean_interval_s: 180.0,
            base_reject_probability: 0.003,
            label_stock_initial_pct: 100.0,
            label_stock_depletion_per_1000: 1.0,
            cap_stock_initial_pct: 100.0,
        }
    }
}

/// Default duration applied to a CIP carried implicitly by `cip_after` or a
/// `LIQUID` changeover, in minutes.
const DEFAULT_CIP_DURATION_MIN: f64 = 45.0;

pub struct LineEngine {
    image: Arc<RegisterImage>,
    emitter: EventEmitter,
    rng: SimRng,
    config: EngineConfig,
    shutdown: Arc<AtomicBool>,

    regs: [u16; TOTAL_REGISTERS],
    state: LineState,
    wall_tick: Duration,
    sim_tick: f64,

    good_count: u32,
    reject_count: u32,
    order_seq: u16,
    label_stock_pct: f64,
    hazard_stock_pct: f64,
}

impl LineEngine {
    pub fn new(
        image: Arc<RegisterImage>,
        emitter: EventEmitter,
        config: EngineConfig,
        seed: u64,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let wall_tick = Duration::from_secs_f64(1.0 / config.tick_hz.max(0.1));
        let sim_tick = wall_tick.as_secs_f64() * config.speed_factor;
        let label_stock_pct = config.label_stock_initial_pct;
        let hazard_stock_pct = config.label_stock_initial_pct;
        Self {
            image,
            emitter,
            rng: SimRng::seed_from_u64(seed),
            config,
            shutdown,
            regs: [0u16; TOTAL_REGISTERS],
            state: LineState::Idle,
            wall_tick,
            sim_tick,
            good_count: 0,
            reject_count: 0,
            order_seq: 0,
            label_stock_pct,
            hazard_stock_pct,
        }
    }

    /// Run every entry of `schedule` in order, stopping early if the
    /// shutdown flag is observed between entries.
    pub fn run(&mut self, schedule: &[ScheduleEntry]) -> Result<(), EngineError> {
        self.write_u16(R_ORDER_IDX, IDLE_SENTINEL);
        self.write_u16(R_SKU_IDX, IDLE_SENTINEL);
        self.write_u16(R_SIM_SPEED_X10, (self.config.speed_factor * 10.0).round() as u16);
        self.write_u16(R_LABELLER1_STOCK_PCT, self.label_stock_pct.round() as u16);
        self.write_u16(R_LABELLER2_HAZARD_STOCK_PCT, self.hazard_stock_pct.round() as u16);
        self.publish();

        for (index, entry) in schedule.iter().enumerate() {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::info!("shutdown observed, stopping before schedule entry {index}");
                break;
            }
            self.execute_entry(index, entry)?;
        }
        Ok(())
    }

    fn execute_entry(&mut self, index: usize, entry: &ScheduleEntry) -> Result<(), EngineError> {
        match entry {
            ScheduleEntry::Order(order) => self.run_order(index, order),
            ScheduleEntry::Changeover(spec) => {
                let ctx = OrderContext::default();
                self.run_changeover(spec, &ctx)?;
                self.transition(LineState::Idle, 0, 0, None, None, None, &ctx)
            }
            ScheduleEntry::Cip { duration_min } => {
                let ctx = OrderContext::default();
                self.run_cip(*duration_min, &ctx)
            }
            ScheduleEntry::Break {
                duration_min,
                reason_text,
            } => {
                let ctx = OrderContext::default();
                self.run_break(*duration_min, reason_text, &ctx)
            }
        }
    }

    fn run_order(&mut self, index: usize, entry: &OrderEntry) -> Result<(), EngineError> {
        let sku = match get_sku(entry.sku_key) {
            Some(sku) => sku,
            None => {
                tracing::error!(
                    sku = entry.sku_key,
                    order = entry.order_id,
                    "unknown SKU in schedule entry, skipping"
                );
                return Ok(());
            }
        };

        let order_ctx = OrderContext {
            order_id: Some(entry.order_id.to_string()),
            sku: Some(sku.key.to_string()),
        };

        let mut cip_after = entry.cip_after;
        if let Some(changeover) = &entry.preceding_changeover {
            self.run_changeover(changeover, &order_ctx)?;
            if changeover.kind == ChangeoverKind::Liquid {
                cip_after = true;
            }
        }

        self.order_seq = self.order_seq.wrapping_add(1);
        let sku_idx = sku_index(sku.key).expect("sku just looked up by key");
        self.write_u16(R_ORDER_IDX, index as u16);
        self.write_u16(R_SKU_IDX, sku_idx);
        self.write_u16(R_ORDER_SEQ, self.order_seq);
        self.write_f32(R_FILLER_TARGET_WEIGHT, sku.target_weight_g() as f32);
        self.write_f32(R_CAPPER_TORQUE_TARGET, sku.torque_target_ncm as f32);
        self.write_bool(R_LABELLER2_HAZARD_REQUIRED, sku.hazard);
        self.publish();

        let planned_start_ts = Utc::now().to_rfc3339();
        self.emitter
            .order_started(&order_ctx, entry.planned_qty, planned_start_ts, None)?;
        self.transition(LineState::Running, 0, 0, None, None, None, &order_ctx)?;

        let order_start_good = self.good_count;
        let order_start_reject = self.reject_count;

        let order_duration_s = (entry.planned_qty as f64 / sku.nominal_speed_bpm) * 60.0;
        let inject_at = entry
            .inject_breakdown
            .map(|_| trigger_offset(order_duration_s, &mut self.rng));
        let mut breakdown_injected = false;

        let mut order_elapsed = 0.0_f64;
        let mut bottle_acc = 0.0_f64;
        let mut bottles_produced: u32 = 0;
        let mut ms_countdown = self.rng.exponential(self.config.microstop_mean_interval_s);

        while bottles_produced < entry.planned_qty {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            if let (Some(at), false) = (inject_at, breakdown_injected) {
                if order_elapsed >= at {
                    if let Some(code) = entry.inject_breakdown {
                        order_elapsed += self.run_breakdown(code, &order_ctx)?;
                    }
                    breakdown_injected = true;
                }
            }

            if self.state == LineState::Running {
                ms_countdown -= self.sim_tick;
                if ms_countdown <= 0.0 {
                    let microstop = pick_microstop(sku.is_large_format(), &mut self.rng);
                    order_elapsed += self.run_microstop(microstop, &order_ctx)?;
                    ms_countdown = self.rng.exponential(self.config.microstop_mean_interval_s);
                }
            }

            if self.state == LineState::Running {
                bottle_acc += (sku.nominal_speed_bpm / 60.0) * self.sim_tick;
                while bottle_acc >= 1.0 && bottles_produced < entry.planned_qty {
                    bottle_acc -= 1.0;
                    self.process_bottle(sku, &order_ctx)?;
                    bottles_produced += 1;
                    self.deplete_stock(sku);
                }
            }

            self.update_line_signals(sku);
            self.publish();
            std::thread::sleep(self.wall_tick);
            order_elapsed += self.sim_tick;
        }

        let good_delta = self.good_count - order_start_good;
        let reject_delta = self.reject_count - order_start_reject;
        let yield_ = if entry.planned_qty > 0 {
            round4(good_delta as f64 / entry.planned_qty as f64)
        } else {
            0.0
        };
        self.emitter
            .order_completed(&order_ctx, good_delta, reject_delta, order_elapsed, yield_)?;

        self.write_u16(R_ORDER_IDX, IDLE_SENTINEL);
        self.write_u16(R_SKU_IDX, IDLE_SENTINEL);
        self.publish();

        if cip_after {
            self.run_cip(DEFAULT_CIP_DURATION_MIN, &order_ctx)?;
        }

        Ok(())
    }

    fn deplete_stock(&mut self, sku: &Sku) {
        let step = self.config.label_stock_depletion_per_1000 / 1000.0;
        self.label_stock_pct = (self.label_stock_pct - step).max(0.0);
        if sku.hazard {
            self.hazard_stock_pct = (self.hazard_stock_pct - step).max(0.0);
        }
    }

    fn run_changeover(
        &mut self,
        spec: &ChangeoverSpec,
        order_ctx: &OrderContext,
    ) -> Result<(), EngineError> {
        let stop_code = changeover_stop_code(spec.stop_code);
        self.transition(LineState::Changeover, stop_code, 0, None, None, None, order_ctx)?;
        self.emitter
            .changeover_started(order_ctx, spec.kind.name(), spec.stop_code)?;
        let duration_s = self.rng.uniform(spec.duration_min_lo, spec.duration_min_hi) * 60.0;
        self.sleep_sim(duration_s);
        self.emitter
            .changeover_completed(order_ctx, spec.kind.name(), spec.stop_code, duration_s)?;
        Ok(())
    }

    fn run_cip(&mut self, duration_min: f64, order_ctx: &OrderContext) -> Result<(), EngineError> {
        let stop_code = stop_code_for_scheduled_stop(5); // ST05, reserved for CIP
        self.transition(LineState::Cip, stop_code, 0, None, None, None, order_ctx)?;
        self.emitter.cip_started(order_ctx)?;
        let duration_s = duration_min * 60.0;
        self.sleep_sim(duration_s);
        self.emitter.cip_ended(order_ctx, duration_s)?;
        self.transition(LineState::Idle, 0, 0, None, Some(duration_s), None, order_ctx)?;
        Ok(())
    }

    fn run_break(
        &mut self,
        duration_min: f64,
        reason_text: &str,
        order_ctx: &OrderContext,
    ) -> Result<(), EngineError> {
        let stop_code = stop_code_for_scheduled_stop(4); // ST04
        self.transition(LineState::Stopped, stop_code, 0, None, None, None, order_ctx)?;
        self.emitter
            .stop_started(order_ctx, stop_code, None, Some(reason_text))?;
        let duration_s = duration_min * 60.0;
        self.sleep_sim(duration_s);
        self.emitter
            .stop_ended(order_ctx, stop_code, None, Some(reason_text), duration_s)?;
        self.transition(LineState::Idle, 0, 0, None, Some(duration_s), None, order_ctx)?;
        Ok(())
    }

    fn run_microstop(
        &mut self,
        microstop: Microstop,
        order_ctx: &OrderContext,
    ) -> Result<f64, EngineError> {
        self.transition(
            LineState::Microstop,
            microstop.stop_code(),
            0,
            None,
            None,
            None,
            order_ctx,
        )?;
        self.apply_microstop_mutation(microstop, true);
        self.publish();

        let fingerprint: BTreeMap<String, String> = microstop.fingerprint().into_iter().collect();
        self.emitter
            .microstop_started(order_ctx, microstop.stop_code(), fingerprint.clone())?;

        let (lo, hi) = microstop.duration_range_s();
        let duration_s = self.rng.uniform(lo, hi);
        self.sleep_sim(duration_s);

        self.apply_microstop_mutation(microstop, false);
        self.write_u16(R_STOP_CODE, 0);
        self.publish();
        self.emitter
            .microstop_ended(order_ctx, microstop.stop_code(), duration_s, fingerprint)?;
        self.transition(LineState::Running, 0, 0, None, Some(duration_s), None, order_ctx)?;
        Ok(duration_s)
    }

    fn run_breakdown(
        &mut self,
        code: BreakdownCode,
        order_ctx: &OrderContext,
    ) -> Result<f64, EngineError> {
        self.transition(
            LineState::Fault,
            code.stop_code(),
            code.fault_code(),
            None,
            None,
            None,
            order_ctx,
        )?;
        self.apply_breakdown_mutation(code, true);
        self.publish();

        self.emitter
            .fault_raised(order_ctx, code.fault_code(), code.severity(), code.station())?;
        self.emitter
            .stop_started(order_ctx, code.stop_code(), None, None)?;

        let duration_s = sample_duration(code, &mut self.rng);
        self.sleep_sim(duration_s);

        self.apply_breakdown_mutation(code, false);
        self.write_u16(R_STOP_CODE, 0);
        self.write_u16(R_FAULT_CODE, 0);
        self.publish();

        self.emitter
            .fault_cleared(order_ctx, code.fault_code(), code.severity(), code.station(), duration_s)?;
        self.emitter
            .stop_ended(order_ctx, code.stop_code(), None, None, duration_s)?;
        self.transition(LineState::Running, 0, 0, None, Some(duration_s), None, order_ctx)?;
        Ok(duration_s)
    }

    fn apply_breakdown_mutation(&mut self, code: BreakdownCode, active: bool) {
        match code {
            BreakdownCode::BdM1 => self.write_bool(R_FILLER_SCALE_STABLE, !active),
            BreakdownCode::BdM2 => self.write_bool(R_CAPPER_TORQUE_IN_SPEC, !active),
            BreakdownCode::BdM3 => self.write_bool(R_CHECKWEIGHER_REZERO_ACTIVE, active),
            _ => {}
        }
    }

    fn apply_microstop_mutation(&mut self, microstop: Microstop, active: bool) {
        if let Some((idx, perturbed)) = microstop_register(microstop) {
            self.write_bool(idx, if active { perturbed } else { !perturbed });
        }
    }

    fn process_bottle(&mut self, sku: &Sku, order_ctx: &OrderContext) -> Result<(), EngineError> {
        let target_weight = sku.target_weight_g();
        let actual_weight = target_weight * (1.0 + self.rng.gauss(0.0, 0.005));
        let weight_in_spec = (actual_weight - target_weight).abs() <= 0.02 * target_weight;

        let fill_time_ms = sku.fill_time_ms() * (1.0 + self.rng.gauss(0.0, 0.02));
        let drip_sensor = self.rng.bernoulli(0.02);

        let target_torque = sku.torque_target_ncm;
        let actual_torque = target_torque * (1.0 + self.rng.gauss(0.0, 0.01));
        let torque_in_spec = (actual_torque - target_torque).abs() <= 0.05 * target_torque;

        let scanner_ok_first = self.rng.bernoulli(0.995);
        let mut rescan_count = 0u16;
        let mut barcode_reject = false;
        if !scanner_ok_first {
            rescan_count = self.rng.uniform_int(1, 2) as u16;
            barcode_reject = self.rng.bernoulli(0.10);
        }

        let hazard_required = sku.hazard;
        let hazard_applied = if hazard_required {
            self.hazard_stock_pct > 2.0
        } else {
            false
        };

        let mut reject_reason = RejectReason::None;
        if !weight_in_spec {
            reject_reason = RejectReason::Weight;
        } else if !torque_in_spec {
            reject_reason = RejectReason::Torque;
        } else if barcode_reject {
            reject_reason = RejectReason::Barcode;
        } else if hazard_required && !hazard_applied {
            reject_reason = RejectReason::HazardLabel;
        } else if self.rng.bernoulli(self.config.base_reject_probability) {
            reject_reason = RejectReason::Weight;
        }
        let is_reject = reject_reason != RejectReason::None;

        let pusher_cycle_ms = if is_reject {
            self.rng.uniform(500.0, 800.0)
        } else {
            self.rng.uniform(200.0, 500.0)
        };

        self.write_f32(R_FILLER_ACTUAL_WEIGHT, actual_weight as f32);
        self.write_u32(R_FILLER_FILL_TIME_MS, fill_time_ms.max(0.0) as u32);
        self.write_bool(R_FILLER_SCALE_STABLE, true);
        self.write_bool(R_FILLER_DRIP_SENSOR, drip_sensor);
        self.write_f32(R_CAPPER_TORQUE_ACTUAL, actual_torque as f32);
        self.write_bool(R_CAPPER_TORQUE_IN_SPEC, torque_in_spec);
        self.write_f32(R_CHECKWEIGHER_GROSS_WEIGHT, actual_weight as f32);
        self.write_bool(R_CHECKWEIGHER_WEIGHT_IN_SPEC, weight_in_spec);
        self.write_bool(R_LABELLER1_APPLIED, true);
        self.write_bool(R_LABELLER1_SENSOR_OK, true);
        self.write_u16(R_LABELLER1_STOCK_PCT, self.label_stock_pct.round().clamp(0.0, 100.0) as u16);
        self.write_bool(R_SCANNER_BARCODE_OK, !barcode_reject);
        self.write_u16(R_SCANNER_RESCAN_COUNT, rescan_count);
        self.write_bool(R_LABELLER2_HAZARD_REQUIRED, hazard_required);
        self.write_bool(R_LABELLER2_HAZARD_APPLIED, hazard_applied);
        self.write_u16(
            R_LABELLER2_HAZARD_STOCK_PCT,
            self.hazard_stock_pct.round().clamp(0.0, 100.0) as u16,
        );
        self.write_bool(R_PUSHER_REJECT_TRIGGERED, is_reject);
        self.write_u16(R_PUSHER_REJECT_REASON, reject_reason.as_word());
        self.write_u32(R_PUSHER_CYCLE_MS, pusher_cycle_ms.max(0.0) as u32);

        if is_reject {
            self.reject_count += 1;
        } else {
            self.good_count += 1;
        }
        self.write_u32(R_GOOD_COUNT, self.good_count);
        self.write_u32(R_REJECT_COUNT, self.reject_count);

        // Sample roughly 2% of bottles into the transaction log; every
        // bottle would flood the log at production line speed for no
        // operational benefit (see `SPEC_FULL.md` §4.4).
        if self.rng.bernoulli(0.02) {
            let (result, station, reason_name) = if is_reject {
                (
                    BottleResult::Reject,
                    reject_station(reject_reason),
                    Some(reject_reason.name()),
                )
            } else {
                (BottleResult::Good, "Pusher", None)
            };
            self.emitter
                .bottle_completed(order_ctx, result, station, reason_name, actual_weight, actual_torque)?;
        }

        Ok(())
    }

    fn update_line_signals(&mut self, sku: &Sku) {
        let line_speed = sku.nominal_speed_bpm * (1.0 + self.rng.gauss(0.0, 0.01));
        self.write_f32(R_LINE_SPEED, line_speed as f32);
        let infeed_rate = line_speed * (1.0 + self.rng.gauss(0.0, 0.015));
        self.write_f32(R_INFEED_RATE, infeed_rate as f32);
        self.write_bool(R_INFEED_BOTTLE_PRESENCE, true);
        if self.state == LineState::Running {
            self.write_bool(R_INFEED_STARVED, false);
            self.write_bool(R_INFEED_JAM_DETECTED, false);
        }
        self.write_f32(R_CAPPER_TORQUE_TARGET, sku.torque_target_ncm as f32);
        self.write_f32(R_FILLER_TARGET_WEIGHT, sku.target_weight_g() as f32);
    }

    #[allow(clippy::too_many_arguments)]
    fn transition(
        &mut self,
        to: LineState,
        stop_code: u16,
        fault_code: u16,
        reason_id: Option<u16>,
        duration_sim_s: Option<f64>,
        fingerprint: Option<BTreeMap<String, String>>,
        order_ctx: &OrderContext,
    ) -> Result<(), EngineError> {
        let from = self.state;
        self.state = to;
        self.write_u16(R_LINE_STATE, to.as_word());
        self.write_u16(R_STOP_CODE, stop_code);
        self.write_u16(R_FAULT_CODE, fault_code);
        self.publish();
        self.emitter.state_changed(
            order_ctx,
            &from.to_string(),
            &to.to_string(),
            (stop_code != 0).then_some(stop_code),
            (fault_code != 0).then_some(fault_code),
            reason_id,
            duration_sim_s,
            fingerprint,
        )?;
        Ok(())
    }

    /// Sleep `dur_sim_s` sim-seconds in wall-tick steps, publishing the
    /// register image at every sub-tick. Returns early (without completing
    /// the full duration) if shutdown is observed.
    fn sleep_sim(&mut self, dur_sim_s: f64) -> bool {
        let wall_secs = dur_sim_s.max(0.0) / self.config.speed_factor.max(1e-6);
        let steps = (wall_secs / self.wall_tick.as_secs_f64()).ceil().max(1.0) as u64;
        for _ in 0..steps {
            if self.shutdown.load(Ordering::Relaxed) {
                return false;
            }
            self.publish();
            std::thread::sleep(self.wall_tick);
        }
        true
    }

    fn write_u16(&mut self, idx: usize, value: u16) {
        self.regs[idx] = value;
    }

    fn write_bool(&mut self, idx: usize, value: bool) {
        self.regs[idx] = sim_registers::bool_word(value);
    }

    fn write_f32(&mut self, idx: usize, value: f32) {
        let (hi, lo) = sim_registers::pack_float32(value);
        self.regs[idx] = hi;
        self.regs[idx + 1] = lo;
    }

    fn write_u32(&mut self, idx: usize, value: u32) {
        let (hi, lo) = sim_registers::pack_uint32(value);
        self.regs[idx] = hi;
        self.regs[idx + 1] = lo;
    }

    fn publish(&self) {
        self.image.publish(&self.regs);
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn changeover_stop_code(code: &str) -> u16 {
    match code {
        "ST01" => stop_code_for_scheduled_stop(1),
        "ST02" => stop_code_for_scheduled_stop(2),
        "ST03" => stop_code_for_scheduled_stop(3),
        other => {
            tracing::warn!(code = other, "unrecognized changeover stop code, defaulting to ST01");
            stop_code_for_scheduled_stop(1)
        }
    }
}

fn reject_station(reason: RejectReason) -> &'static str {
    match reason {
        RejectReason::None => "Pusher",
        RejectReason::Weight => "Filler",
        RejectReason::Torque => "Capper",
        RejectReason::Barcode => "Scanner",
        RejectReason::Label => "Labeller1",
        RejectReason::HazardLabel => "Labeller2",
    }
}

/// `(register index, value written while the stop is active)`; clearing
/// writes the complement. `None` for microstops whose station signals
/// already fluctuate under normal simulation (torque recheck, pusher slow
/// return, outfeed nudge) and carry no register mutation of their own.
fn microstop_register(microstop: Microstop) -> Option<(usize, bool)> {
    match microstop {
        Microstop::Ms01 => Some((R_INFEED_STARVED, true)),
        Microstop::Ms02 => Some((R_FILLER_SCALE_STABLE, false)),
        Microstop::Ms03 => Some((R_FILLER_DRIP_SENSOR, true)),
        Microstop::Ms04 => Some((R_CAPPER_CAP_FEED_OK, false)),
        Microstop::Ms05 => None,
        Microstop::Ms06 => Some((R_CHECKWEIGHER_REZERO_ACTIVE, true)),
        Microstop::Ms07 => Some((R_LABELLER1_SENSOR_OK, false)),
        Microstop::Ms08 => Some((R_SCANNER_BARCODE_OK, false)),
        Microstop::Ms09 => None,
        Microstop::Ms10 => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_data::schedule::{built_in_schedule, ChangeoverKind};
    use sim_events::emitter::EnterpriseContext;
    use std::fs;

    fn test_engine(tmp_name: &str) -> (LineEngine, std::path::PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("sim-engine-test-{tmp_name}-{}.jsonl", std::process::id()));
        let emitter = EventEmitter::new(
            &path,
            EnterpriseContext {
                enterprise: "ACME".into(),
                site: "Cork".into(),
                area: "Bottling".into(),
                line: "L1".into(),
                instance_id: "sim-test".into(),
            },
        )
        .unwrap();
        let mut config = EngineConfig::default();
        config.tick_hz = 1000.0; // fast ticks so tests run quickly
        config.speed_factor = 100_000.0; // compress sim-seconds into microseconds of wall time
        let image = Arc::new(RegisterImage::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        (
            LineEngine::new(image, emitter, config, 1234, shutdown),
            path,
        )
    }

    #[test]
    fn idle_registers_carry_the_sentinel() {
        let (mut engine, path) = test_engine("idle-sentinel");
        engine.write_u16(R_ORDER_IDX, IDLE_SENTINEL);
        engine.write_u16(R_SKU_IDX, IDLE_SENTINEL);
        assert_eq!(engine.regs[R_ORDER_IDX], IDLE_SENTINEL);
        assert_eq!(engine.regs[R_SKU_IDX], IDLE_SENTINEL);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn running_a_small_order_produces_exactly_planned_quantity_of_bottles() {
        let (mut engine, path) = test_engine("small-order");
        let entry = OrderEntry {
            order_id: "ORD-TEST",
            sku_key: "LEM-200-IE",
            planned_qty: 25,
            preceding_changeover: None,
            cip_after: false,
            inject_breakdown: None,
        };
        engine.run_order(0, &entry).unwrap();
        assert_eq!(engine.good_count + engine.reject_count, 25);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_sku_is_skipped_without_touching_registers() {
        let (mut engine, path) = test_engine("unknown-sku");
        let entry = OrderEntry {
            order_id: "ORD-BAD",
            sku_key: "NOT-A-REAL-SKU",
            planned_qty: 10,
            preceding_changeover: None,
            cip_after: false,
            inject_breakdown: None,
        };
        engine.run_order(0, &entry).unwrap();
        assert_eq!(engine.good_count, 0);
        assert_eq!(engine.reject_count, 0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn liquid_changeover_forces_a_trailing_cip() {
        let (mut engine, path) = test_engine("liquid-cip");
        let entry = OrderEntry {
            order_id: "ORD-LIQ",
            sku_key: "COL-500-IE",
            planned_qty: 5,
            preceding_changeover: Some(ChangeoverSpec {
                kind: ChangeoverKind::Liquid,
                stop_code: "ST03",
                duration_min_lo: 0.001,
                duration_min_hi: 0.002,
            }),
            cip_after: false,
            inject_breakdown: None,
        };
        engine.run_order(0, &entry).unwrap();
        // after a LIQUID changeover + CIP, state returns to idle
        assert_eq!(engine.state, LineState::Idle);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn breakdown_mutation_clears_after_the_breakdown_completes() {
        let (mut engine, path) = test_engine("breakdown-clears");
        let ctx = OrderContext::default();
        engine.run_breakdown(BreakdownCode::BdM1, &ctx).unwrap();
        assert!(sim_registers::word_bool(
            engine.regs[R_FILLER_SCALE_STABLE]
        ));
        assert_eq!(engine.regs[R_STOP_CODE], 0);
        assert_eq!(engine.regs[R_FAULT_CODE], 0);
        assert_eq!(engine.state, LineState::Running);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn full_built_in_schedule_runs_without_a_panicking_sku_lookup() {
        let schedule = built_in_schedule();
        assert!(!schedule.is_empty());
        // Sanity check every order's SKU is a recognized key; the engine's
        // own unknown-SKU path is exercised separately above.
        for entry in &schedule {
            if let ScheduleEntry::Order(order) = entry {
                assert!(get_sku(order.sku_key).is_some(), "{}", order.sku_key);
            }
        }
    }
}
