// Synthetic telemetry source used in place of the live link.
// Invariants: emits through the same sink contract as the live connection; every channel has its own timer.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use telemetry_core::connection::{ConnectionPhase, ConnectionStatus};
use telemetry_core::model::{
    ActuatorState, Direction, Event, EventType, FixQuality, GpsState, Liveness, OperatingState,
    Severity, WheelId,
};
use telemetry_core::parser::{Message, SpeedReading};

use crate::constants::{
    SIM_ACTUATOR_INTERVAL_MS, SIM_FAULT_INTERVAL_MS, SIM_GPS_INTERVAL_MS, SIM_LIVENESS_INTERVAL_MS,
    SIM_WHEEL_DOWNSAMPLE, SIM_WHEEL_INTERVAL_MS,
};
use crate::producer::MessageProducer;
use crate::telemetry::IngestSink;
use crate::utils::now_epoch_ms;

const SPEED_RANGE: (f64, f64) = (0.0, 80.0);
const WHEEL_SPEED_RANGE: (f64, f64) = (0.0, 90.0);
const ALTITUDE_RANGE: (f64, f64) = (2140.0, 2180.0);
const HDOP_RANGE: (f64, f64) = (0.6, 1.6);
const STATE_CHANGE_CHANCE: f64 = 0.03;
const TAMPER_CHANCE: f64 = 0.02;
const FAULT_CHANCE: f64 = 0.01;
const LIVENESS_FLIP_CHANCE: f64 = 0.02;

fn clamp(value: f64, (min, max): (f64, f64)) -> f64 {
    value.max(min).min(max)
}

pub struct VehicleModel {
    rng: StdRng,
    gps: GpsState,
    actuator: ActuatorState,
    liveness: Liveness,
    wheel_ticks: u64,
}

impl VehicleModel {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            gps: GpsState {
                latitude: 19.043,
                longitude: -98.198,
                speed_kph: 0.0,
                altitude: 2160.0,
                hdop: 0.8,
                fix_quality: FixQuality::Fix3D,
            },
            actuator: ActuatorState::default(),
            liveness: Liveness::Online,
            wheel_ticks: 0,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn gps_tick(&mut self, ts: u64) -> Vec<Message> {
        let rng = &mut self.rng;
        let speed = clamp(self.gps.speed_kph + rng.gen_range(-4.0..5.0), SPEED_RANGE);
        self.gps = GpsState {
            latitude: self.gps.latitude + rng.gen_range(-0.0005..0.0005),
            longitude: self.gps.longitude + rng.gen_range(-0.0005..0.0005),
            speed_kph: speed,
            altitude: clamp(self.gps.altitude + rng.gen_range(-0.8..0.8), ALTITUDE_RANGE),
            hdop: clamp(self.gps.hdop + rng.gen_range(-0.05..0.07), HDOP_RANGE),
            fix_quality: FixQuality::Fix3D,
        };

        let mut out = vec![Message::Gps(self.gps.clone())];
        if self.rng.gen_bool(STATE_CHANGE_CHANCE) {
            out.push(Message::Event(Event::new(
                ts,
                EventType::StateChange,
                None,
                format!("Speed target ~{speed:.0} km/h"),
            )));
        }
        out
    }

    pub fn actuator_tick(&mut self, ts: u64) -> Vec<Message> {
        let duty = clamp(self.actuator.duty_cycle + self.rng.gen_range(-8.0..12.0), (0.0, 100.0));
        let idle = duty < 5.0;
        self.actuator = ActuatorState {
            duty_cycle: duty,
            direction: if idle { Direction::Stop } else { Direction::Forward },
            standby: false,
            operating_state: if idle {
                OperatingState::Idle
            } else {
                OperatingState::Engaged
            },
        };

        let mut out = vec![Message::Actuator(self.actuator.clone())];
        if self.rng.gen_bool(TAMPER_CHANCE) {
            out.push(Message::Event(Event::new(
                ts,
                EventType::Tamper,
                Some(Severity::Warn),
                "Enclosure opened",
            )));
        }
        out
    }

    // Only every fifth sampling is forwarded.
    pub fn wheel_tick(&mut self, ts: u64) -> Vec<Message> {
        let base = self.gps.speed_kph;
        let samples: Vec<Message> = WheelId::ALL
            .iter()
            .map(|wheel| {
                let offset = f64::from(wheel.get()) - 2.5;
                let speed = base + self.rng.gen_range(-3.0..3.0) + offset * self.rng.gen_range(-0.6..0.6);
                let pulses = (base * 2.0 + self.rng.gen_range(-3.0..3.0)).round().max(0.0);
                Message::Speed(SpeedReading {
                    ts,
                    wheel: i64::from(wheel.get()),
                    speed_kph: clamp(speed, WHEEL_SPEED_RANGE),
                    pulses: Some(pulses as u32),
                })
            })
            .collect();

        self.wheel_ticks += 1;
        if self.wheel_ticks % SIM_WHEEL_DOWNSAMPLE == 0 {
            samples
        } else {
            Vec::new()
        }
    }

    pub fn fault_tick(&mut self, ts: u64) -> Option<Message> {
        self.rng.gen_bool(FAULT_CHANCE).then(|| {
            Message::Event(Event::new(
                ts,
                EventType::Fault,
                Some(Severity::Error),
                "Motor overcurrent detected",
            ))
        })
    }

    pub fn liveness_tick(&mut self) -> Option<Liveness> {
        if self.rng.gen_bool(LIVENESS_FLIP_CHANCE) {
            self.liveness = self.liveness.toggled();
            Some(self.liveness)
        } else {
            None
        }
    }
}

pub fn simulated_status(liveness: Liveness) -> ConnectionStatus {
    ConnectionStatus {
        phase: match liveness {
            Liveness::Online => ConnectionPhase::Connected,
            Liveness::Offline => ConnectionPhase::Disconnected,
        },
        liveness,
        retry_count: 0,
        next_retry_ms: None,
    }
}

pub struct SimulatedSource {
    seed: Option<u64>,
    sink: Option<IngestSink>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            sink: None,
            cancel: None,
            task: None,
        }
    }

    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl MessageProducer for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn start(&mut self, sink: IngestSink) {
        if self.cancel.is_some() {
            return;
        }
        let model = match self.seed {
            Some(seed) => VehicleModel::seeded(seed),
            None => VehicleModel::new(StdRng::from_entropy()),
        };
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.task = Some(tokio::spawn(simulation_loop(model, sink.clone(), cancel_rx)));
        self.sink = Some(sink);
        self.cancel = Some(cancel_tx);
        info!(seed = ?self.seed, "simulated source started");
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.close();
        }
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
            info!("simulated source stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn every(ms: u64) -> Interval {
    let period = Duration::from_millis(ms);
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn simulation_loop(mut model: VehicleModel, sink: IngestSink, mut cancel: oneshot::Receiver<()>) {
    sink.set_connection(simulated_status(model.liveness()));

    let mut gps = every(SIM_GPS_INTERVAL_MS);
    let mut actuator = every(SIM_ACTUATOR_INTERVAL_MS);
    let mut wheels = every(SIM_WHEEL_INTERVAL_MS);
    let mut faults = every(SIM_FAULT_INTERVAL_MS);
    let mut liveness = every(SIM_LIVENESS_INTERVAL_MS);

    loop {
        let messages = tokio::select! {
            _ = &mut cancel => break,
            _ = gps.tick() => model.gps_tick(now_epoch_ms()),
            _ = actuator.tick() => model.actuator_tick(now_epoch_ms()),
            _ = wheels.tick() => model.wheel_tick(now_epoch_ms()),
            _ = faults.tick() => model.fault_tick(now_epoch_ms()).into_iter().collect::<Vec<_>>(),
            _ = liveness.tick() => {
                if let Some(next) = model.liveness_tick() {
                    info!(liveness = %next, "simulated liveness flip");
                    sink.set_connection(simulated_status(next));
                }
                Vec::new()
            }
        };

        for message in messages {
            if sink.accept_message(message).is_none() {
                debug!("simulated message rejected after stop");
                return;
            }
        }
    }
    debug!("simulation task exited");
}
