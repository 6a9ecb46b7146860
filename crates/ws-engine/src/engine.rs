//! Measurement engine
//!
//! Runs one cycle at a time: weigh, range every laser, publish. The station
//! context from discovery is only read here; the sole state carried between
//! cycles is the last published weight.

use tracing::{debug, error, info, warn};
use ws_detect::{DetectError, DeviceBus, PortOpener, RetryPolicy, StationContext};

use crate::error::PublishError;
use crate::publisher::Publisher;
use crate::record::{local_timestamp, MeasurementRecord};
use crate::sizing::{grams_to_kg, LaserSize};
use crate::state::{EngineState, LoadClass, Thresholds};
use crate::trigger::{Trigger, TriggerPolicy};

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// When to run a cycle
    pub trigger: TriggerPolicy,
    /// Weight limits (continuous monitoring only)
    pub thresholds: Thresholds,
    /// Retry policy for distance commands
    pub ranging: RetryPolicy,
}

/// Result of one measurement cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Record was accepted by the publisher
    Published(MeasurementRecord),
    /// Weight equals the last published one; nothing was sent
    Unchanged(MeasurementRecord),
    /// Scale gave no sample; the cycle was aborted
    NoWeight(DetectError),
    /// Publisher rejected the record; it is dropped
    PublishFailed {
        record: MeasurementRecord,
        error: PublishError,
    },
}

impl CycleOutcome {
    /// The assembled record, if the cycle got that far
    pub fn record(&self) -> Option<&MeasurementRecord> {
        match self {
            CycleOutcome::Published(record)
            | CycleOutcome::Unchanged(record)
            | CycleOutcome::PublishFailed { record, .. } => Some(record),
            CycleOutcome::NoWeight(_) => None,
        }
    }
}

/// Drives measurement cycles over a discovered station
pub struct MeasurementEngine<'a, O, P> {
    bus: &'a DeviceBus<O>,
    station: &'a StationContext,
    publisher: P,
    config: EngineConfig,
    state: EngineState,
    last_published_weight: Option<f64>,
}

impl<'a, O: PortOpener, P: Publisher> MeasurementEngine<'a, O, P> {
    pub fn new(
        bus: &'a DeviceBus<O>,
        station: &'a StationContext,
        publisher: P,
        config: EngineConfig,
    ) -> Self {
        Self {
            bus,
            station,
            publisher,
            config,
            state: EngineState::Idle,
            last_published_weight: None,
        }
    }

    /// Current position in the cycle
    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Weight (kg) of the last record the publisher accepted
    pub fn last_published_weight(&self) -> Option<f64> {
        self.last_published_weight
    }

    fn continuous(&self) -> bool {
        self.config.trigger.is_continuous()
    }

    /// Run cycles forever, one per trigger
    pub async fn run(&mut self) {
        let mut trigger = Trigger::new(&self.config.trigger);
        info!(
            "Measurement engine started ({} trigger, scale on {}, {} laser(s))",
            if trigger.is_continuous() { "interval" } else { "flag" },
            self.station.scale_port(),
            self.station.laser_count()
        );

        loop {
            self.state = EngineState::Idle;
            trigger.wait().await;
            let outcome = self.run_cycle().await;
            debug!("Cycle finished: {:?}", outcome);
        }
    }

    /// Run one complete cycle as if a trigger had just fired
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let station = self.station;
        self.state = EngineState::Triggered;
        let timestamp = local_timestamp();
        info!("Measurement triggered at {}", timestamp);

        self.state = EngineState::Weighing;
        let scale_port = station.scale_port();
        let sample = match self.bus.read_mass(scale_port).await {
            Ok(sample) => sample,
            Err(e) => {
                warn!(port = scale_port, "Could not read weight, cycle aborted: {}", e);
                self.state = EngineState::Idle;
                return CycleOutcome::NoWeight(e);
            }
        };
        let grams = sample.grams();
        debug!(port = scale_port, "Weight {} g", grams);

        let record = match self.load_class(grams) {
            LoadClass::Loaded => {
                self.state = EngineState::Ranging;
                self.range(timestamp, grams).await
            }
            class => {
                if class == LoadClass::Fault {
                    warn!("Weight {} g below fault threshold, publishing zeros", grams);
                } else {
                    debug!("Weight {} g inside deadband, publishing zeros", grams);
                }
                MeasurementRecord::zeroed(timestamp, station.lasers().map(|(id, _)| id))
            }
        };

        if self.continuous() && self.last_published_weight == Some(record.weight) {
            info!("Weight unchanged at {} kg, not publishing", record.weight);
            self.state = EngineState::Idle;
            return CycleOutcome::Unchanged(record);
        }

        self.state = EngineState::Publishing;
        info!(target: "data", "Record: {}", record.to_json());
        let outcome = match self.publisher.publish(&record).await {
            Ok(()) => {
                info!("Published measurement ({} kg)", record.weight);
                self.last_published_weight = Some(record.weight);
                CycleOutcome::Published(record)
            }
            Err(error) => {
                error!("Publish failed, record dropped: {}", error);
                CycleOutcome::PublishFailed { record, error }
            }
        };
        self.state = EngineState::Idle;
        outcome
    }

    /// Thresholds only apply to continuous monitoring; a flag always ranges
    fn load_class(&self, grams: i32) -> LoadClass {
        if self.continuous() {
            self.config.thresholds.classify(grams)
        } else {
            LoadClass::Loaded
        }
    }

    async fn range(&self, timestamp: String, grams: i32) -> MeasurementRecord {
        let station = self.station;
        let mut record = MeasurementRecord::new(timestamp, grams_to_kg(grams));

        for (id, port) in station.lasers() {
            let baseline = station.baseline(id).unwrap_or_else(|| {
                warn!(laser = %id, "No calibration baseline, measuring against 0");
                0.0
            });

            let size = match self.bus.measure_distance(port, &self.config.ranging).await {
                Ok(reply) => {
                    let size = LaserSize::from_distance(baseline, reply.meters);
                    info!(
                        target: "data",
                        laser = %id,
                        "Measured {} m (distance {} m), rounded to {} m",
                        size.raw,
                        reply.meters,
                        size.rounded
                    );
                    size.rounded
                }
                Err(e) => {
                    warn!(laser = %id, port, "Ranging failed, reporting 0: {}", e);
                    0.0
                }
            };
            record.lasers.insert(id.clone(), size);
        }

        record
    }
}
