//! [`ControlLoop`] – the rover's perceive → decide → verify → act cycle.
//!
//! Each tick is strictly sequenced:
//!
//! 1. **Sense** – read [`VehicleTelemetry`] from the drive base and capture a
//!    frame from the camera.
//! 2. **Perceive** – run the [`PerceptionAdapter`] and fold the map delta
//!    into the [`WorldMap`].
//! 3. **Decide** – [`DecisionEngine::step`] consumes telemetry and
//!    observation and produces a command plus events.
//! 4. **Verify** – the [`CommandVerifier`] checks the command; a rejected
//!    command is not applied, the engine state is rolled back and no events
//!    are emitted.
//! 5. **Act** – the command goes to the drive base and the events to every
//!    [`EventSink`].
//!
//! [`ControlLoop::run`] drives ticks on the calling thread.
//! [`ControlLoop::run_pipelined`] splits perception and decision into two
//! tokio tasks joined by a pair of single-slot hand-offs, so the stages never
//! overlap even though they live on different tasks.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//! use scout_decision::{DecisionConfig, DecisionEngine};
//! use scout_hal::sim::SimRig;
//! use scout_runtime::ControlLoop;
//!
//! let rig = SimRig::new().build();
//! let engine = DecisionEngine::new(DecisionConfig::default()).unwrap();
//! let mut control = ControlLoop::new(rig.camera, rig.drive, engine);
//!
//! let summary = control.run(5, &AtomicBool::new(false)).unwrap();
//! assert_eq!(summary.ticks, 5);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use scout_decision::{Decision, DecisionEngine};
use scout_hal::{Camera, DriveBase};
use scout_perception::{PerceptionAdapter, WorldMap};
use scout_types::{
    ControlCommand, DecisionEvent, DriveMode, MissionEvent, Observation, Pose, ScoutError,
    VehicleTelemetry,
};
use tracing::{debug, info, warn};

use crate::command_verifier::CommandVerifier;
use crate::event_sink::EventSink;
use crate::handoff::handoff;

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of one successful tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub command: ControlCommand,
    pub events: Vec<DecisionEvent>,
    /// Navigable samples the decision was based on.
    pub navigable_count: usize,
}

/// Totals over a whole mission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MissionSummary {
    pub ticks: u64,
    /// Ticks whose observation or command was rejected.
    pub rejected_ticks: u64,
    pub mode_changes: u64,
    pub pickups_requested: u64,
    pub samples_collected: u32,
    pub explored_cells: usize,
    pub final_mode: DriveMode,
    pub final_pose: Pose,
}

impl MissionSummary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        for event in &report.events {
            match event {
                DecisionEvent::ModeChanged { .. } => self.mode_changes += 1,
                DecisionEvent::PickupRequested => self.pickups_requested += 1,
                _ => {}
            }
        }
    }

    fn record_rejection(&mut self) {
        self.ticks += 1;
        self.rejected_ticks += 1;
    }

    fn finish(&mut self, mode: DriveMode, telemetry: &VehicleTelemetry, map: &WorldMap) {
        self.final_mode = mode;
        self.final_pose = telemetry.pose;
        self.samples_collected = telemetry.samples_collected;
        self.explored_cells = map.explored_cells();
    }
}

/// Errors that cost one tick but leave the mission running.
fn skips_tick(err: &ScoutError) -> bool {
    matches!(
        err,
        ScoutError::CommandRejected { .. } | ScoutError::ObservationMismatch { .. }
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

struct PerceptionStage<C> {
    camera: C,
    adapter: PerceptionAdapter,
    map: WorldMap,
}

impl<C: Camera> PerceptionStage<C> {
    fn perceive(&mut self, pose: &Pose) -> Result<Observation, ScoutError> {
        let frame = self.camera.capture()?;
        let observation = self.adapter.observe(&frame, pose);
        self.map.apply(&observation.map_delta);
        Ok(observation)
    }
}

struct DecisionStage<D> {
    drive: D,
    engine: DecisionEngine,
    verifier: CommandVerifier,
    sinks: Vec<Box<dyn EventSink>>,
}

impl<D: DriveBase> DecisionStage<D> {
    fn act(
        &mut self,
        tick: u64,
        telemetry: &VehicleTelemetry,
        observation: &Observation,
    ) -> Result<TickReport, ScoutError> {
        // A vetoed tick leaves the engine exactly as it found it.
        let before = self.engine.state().clone();
        let Decision { command, events } = self
            .engine
            .step(telemetry, observation)
            .inspect_err(|e| warn!(tick, error = %e, "observation rejected"))?;

        if let Err(e) = self.verifier.verify(&command, telemetry) {
            warn!(tick, error = %e, "command not applied");
            *self.engine.state_mut() = before;
            return Err(e);
        }
        self.drive.apply(&command)?;

        for event in &events {
            let envelope = MissionEvent::new(tick, event.clone());
            for sink in &self.sinks {
                sink.emit(&envelope);
            }
        }

        debug!(
            tick,
            mode = %command.mode,
            throttle = command.throttle,
            brake = command.brake,
            steer = command.steer,
            pickup = command.pickup_requested,
            "command applied"
        );

        Ok(TickReport {
            tick,
            command,
            events,
            navigable_count: self.engine.state().navigable_count(),
        })
    }
}

/// A camera frame's worth of perception, handed to the decision stage.
struct Perceived {
    tick: u64,
    telemetry: VehicleTelemetry,
    observation: Observation,
}

// ────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ────────────────────────────────────────────────────────────────────────────

/// Owns the hardware, perception and decision engine of one rover.
pub struct ControlLoop<C, D> {
    perception: PerceptionStage<C>,
    decision: DecisionStage<D>,
    tick: u64,
    period: Option<Duration>,
}

impl<C: Camera, D: DriveBase> ControlLoop<C, D> {
    /// A loop with default perception, the built-in command rules and no
    /// event sinks.
    pub fn new(camera: C, drive: D, engine: DecisionEngine) -> Self {
        let verifier = CommandVerifier::with_builtin_rules(engine.config().max_steer);
        Self {
            perception: PerceptionStage {
                camera,
                adapter: PerceptionAdapter::default(),
                map: WorldMap::default(),
            },
            decision: DecisionStage {
                drive,
                engine,
                verifier,
                sinks: Vec::new(),
            },
            tick: 0,
            period: None,
        }
    }

    pub fn with_perception(mut self, adapter: PerceptionAdapter) -> Self {
        self.perception.adapter = adapter;
        self
    }

    pub fn with_verifier(mut self, verifier: CommandVerifier) -> Self {
        self.decision.verifier = verifier;
        self
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.decision.sinks.push(Box::new(sink));
        self
    }

    /// Pace ticks at one per `period`.  Unpaced loops run flat out.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.decision.engine
    }

    pub fn world_map(&self) -> &WorldMap {
        &self.perception.map
    }

    pub fn telemetry(&self) -> VehicleTelemetry {
        self.decision.drive.telemetry()
    }

    /// Ticks attempted so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// - [`ScoutError::HardwareFault`] from the camera or drive base.
    /// - [`ScoutError::ObservationMismatch`] when perception broke its
    ///   contract; nothing was decided.
    /// - [`ScoutError::CommandRejected`] when a rule vetoed the command; it
    ///   was not applied.
    pub fn tick(&mut self) -> Result<TickReport, ScoutError> {
        let tick = self.tick;
        self.tick += 1;
        let telemetry = self.decision.drive.telemetry();
        let observation = self.perception.perceive(&telemetry.pose)?;
        self.decision.act(tick, &telemetry, &observation)
    }

    /// Tick until `max_ticks` have run or `shutdown` is raised.
    ///
    /// Rejected observations and commands are counted and skipped; hardware
    /// faults end the mission.
    pub fn run(&mut self, max_ticks: u64, shutdown: &AtomicBool) -> Result<MissionSummary, ScoutError> {
        info!(max_ticks, "mission started");
        let mut summary = MissionSummary::default();
        while summary.ticks < max_ticks && !shutdown.load(Ordering::Acquire) {
            match self.tick() {
                Ok(report) => summary.record(&report),
                Err(e) if skips_tick(&e) => summary.record_rejection(),
                Err(e) => return Err(e),
            }
            if let Some(period) = self.period {
                std::thread::sleep(period);
            }
        }
        summary.finish(
            self.decision.engine.state().mode,
            &self.decision.drive.telemetry(),
            &self.perception.map,
        );
        info!(
            ticks = summary.ticks,
            samples = summary.samples_collected,
            "mission finished"
        );
        Ok(summary)
    }
}

impl<C, D> ControlLoop<C, D>
where
    C: Camera + 'static,
    D: DriveBase + 'static,
{
    /// Like [`run`][Self::run], with perception and decision on separate
    /// tokio tasks.
    ///
    /// Perception hands each observation over and then waits for the
    /// decision stage to hand back post-command telemetry before it captures
    /// the next frame.
    pub async fn run_pipelined(
        self,
        max_ticks: u64,
        shutdown: Arc<AtomicBool>,
    ) -> Result<MissionSummary, ScoutError> {
        let Self {
            mut perception,
            mut decision,
            tick: first_tick,
            period,
        } = self;
        let (frame_tx, mut frame_rx) = handoff::<Perceived>();
        let (ack_tx, mut ack_rx) = handoff::<VehicleTelemetry>();
        let initial = decision.drive.telemetry();

        info!(max_ticks, "pipelined mission started");

        let sense = tokio::spawn(async move {
            let mut telemetry = initial;
            for tick in first_tick..first_tick.saturating_add(max_ticks) {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }
                let observation = perception.perceive(&telemetry.pose)?;
                frame_tx
                    .put(Perceived {
                        tick,
                        telemetry,
                        observation,
                    })
                    .await?;
                match ack_rx.take().await {
                    Some(next) => telemetry = next,
                    None => break,
                }
                if let Some(period) = period {
                    tokio::time::sleep(period).await;
                }
            }
            Ok::<_, ScoutError>(perception)
        });

        let act = tokio::spawn(async move {
            let mut summary = MissionSummary::default();
            while let Some(Perceived {
                tick,
                telemetry,
                observation,
            }) = frame_rx.take().await
            {
                match decision.act(tick, &telemetry, &observation) {
                    Ok(report) => summary.record(&report),
                    Err(e) if skips_tick(&e) => summary.record_rejection(),
                    Err(e) => return Err(e),
                }
                ack_tx.put(decision.drive.telemetry()).await?;
            }
            Ok::<_, ScoutError>((decision, summary))
        });

        let (sensed, acted) = tokio::join!(sense, act);
        let joined = |e: tokio::task::JoinError| ScoutError::Channel(format!("pipeline task failed: {e}"));
        let (decision, mut summary) = acted.map_err(joined)??;
        let perception = sensed.map_err(joined)??;

        summary.finish(
            decision.engine.state().mode,
            &decision.drive.telemetry(),
            &perception.map,
        );
        info!(
            ticks = summary.ticks,
            samples = summary.samples_collected,
            "pipelined mission finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_verifier::Rule;
    use crate::event_sink::BroadcastSink;
    use scout_decision::DecisionConfig;
    use scout_hal::sim::{SimCamera, SimDrive, SimRig};
    use scout_perception::PerceptionConfig;
    use scout_types::{CameraFrame, RoverState};

    fn engine() -> DecisionEngine {
        DecisionEngine::new(DecisionConfig::default()).unwrap()
    }

    fn control(rig: SimRig) -> ControlLoop<SimCamera, SimDrive> {
        let hw = rig.build();
        ControlLoop::new(hw.camera, hw.drive, engine())
    }

    struct BrokenCamera;

    impl Camera for BrokenCamera {
        fn id(&self) -> &str {
            "broken"
        }

        fn capture(&mut self) -> Result<CameraFrame, ScoutError> {
            Err(ScoutError::HardwareFault {
                component: "broken".to_string(),
                details: "lens cap on".to_string(),
            })
        }
    }

    struct VetoEverything;

    impl Rule for VetoEverything {
        fn name(&self) -> &str {
            "veto"
        }

        fn check(&self, _: &ControlCommand, _: &VehicleTelemetry) -> Result<(), String> {
            Err("vetoed".to_string())
        }
    }

    #[test]
    fn open_ground_tick_cruises_forward() {
        let mut control = control(SimRig::new());
        let report = control.tick().unwrap();
        assert_eq!(report.tick, 0);
        assert_eq!(report.command.mode, DriveMode::Forward);
        assert!(report.command.throttle > 0.0);
        assert_eq!(report.command.brake, 0.0);
        assert!(report.navigable_count >= 500);
        assert!(control.world_map().explored_cells() > 0);
        assert!(control.telemetry().velocity > 0.0);
    }

    #[test]
    fn tilted_rover_falls_back_to_safe_default() {
        let hw = SimRig::new().build();
        hw.world.lock().unwrap().set_attitude(4.0, 0.0);
        let mut control = ControlLoop::new(hw.camera, hw.drive, engine());

        let report = control.tick().unwrap();
        assert!(report.events.contains(&DecisionEvent::ObservationMissing));
        assert_eq!(report.command.throttle, DecisionConfig::default().throttle_setting);
        assert_eq!(report.command.steer, 0.0);
        assert_eq!(report.command.mode, DriveMode::Forward);
    }

    #[test]
    fn looser_attitude_tolerance_keeps_tilted_frames() {
        let hw = SimRig::new().build();
        hw.world.lock().unwrap().set_attitude(4.0, 0.0);
        let adapter = PerceptionAdapter::new(PerceptionConfig {
            attitude_tolerance_deg: 5.0,
            ..PerceptionConfig::default()
        });
        let mut control =
            ControlLoop::new(hw.camera, hw.drive, engine()).with_perception(adapter);

        let report = control.tick().unwrap();
        assert!(!report.events.contains(&DecisionEvent::ObservationMissing));
        assert!(report.navigable_count > 0);
    }

    #[test]
    fn sample_ahead_is_acquired_and_broadcast() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();
        let mut control = control(SimRig::new().with_sample(104.0, 100.0)).with_sink(sink);

        let report = control.tick().unwrap();
        assert_eq!(report.command.mode, DriveMode::ApproachingTarget);

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.tick, 0);
            seen.push(event.payload);
        }
        assert!(matches!(seen[0], DecisionEvent::TargetAcquired { .. }));
        assert!(seen.contains(&DecisionEvent::ModeChanged {
            from: DriveMode::Forward,
            to: DriveMode::ApproachingTarget,
        }));
    }

    #[test]
    fn run_stops_at_tick_limit() {
        let mut control = control(SimRig::new());
        let summary = control.run(25, &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.ticks, 25);
        assert_eq!(summary.rejected_ticks, 0);
        assert_eq!(control.ticks(), 25);
        assert!(summary.final_pose.x > 100.0);
    }

    #[test]
    fn raised_shutdown_flag_runs_nothing() {
        let mut control = control(SimRig::new());
        let summary = control.run(25, &AtomicBool::new(true)).unwrap();
        assert_eq!(summary.ticks, 0);
    }

    #[test]
    fn camera_fault_ends_the_mission() {
        let hw = SimRig::new().build();
        let mut control = ControlLoop::new(BrokenCamera, hw.drive, engine());
        let err = control.run(10, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, ScoutError::HardwareFault { .. }));
    }

    #[test]
    fn vetoed_commands_are_counted_and_not_applied() {
        let mut verifier = CommandVerifier::new();
        verifier.add_rule(Box::new(VetoEverything));
        let mut control = control(SimRig::new()).with_verifier(verifier);

        let summary = control.run(5, &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.rejected_ticks, 5);
        assert_eq!(control.telemetry().velocity, 0.0);
        assert_eq!(summary.final_pose.x, 100.0);
    }

    #[test]
    fn vetoed_tick_leaves_engine_state_and_sinks_untouched() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();
        let mut verifier = CommandVerifier::new();
        verifier.add_rule(Box::new(VetoEverything));
        let mut control = control(SimRig::new().with_sample(104.0, 100.0))
            .with_verifier(verifier)
            .with_sink(sink);

        let err = control.tick().unwrap_err();
        assert!(matches!(err, ScoutError::CommandRejected { .. }));
        assert_eq!(control.engine().state(), &RoverState::new());
        assert_eq!(control.engine().state().mode, DriveMode::Forward);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn accepted_tick_after_a_veto_decides_from_scratch() {
        let mut control = control(SimRig::new().with_sample(104.0, 100.0));
        control.decision.verifier.add_rule(Box::new(VetoEverything));
        assert!(control.tick().is_err());

        control.decision.verifier = CommandVerifier::with_builtin_rules(15.0);
        let report = control.tick().unwrap();
        assert_eq!(report.tick, 1);
        assert!(report.events.contains(&DecisionEvent::ModeChanged {
            from: DriveMode::Forward,
            to: DriveMode::ApproachingTarget,
        }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pipelined_run_after_manual_ticks_tolerates_huge_limit() {
        let mut control = control(SimRig::new());
        control.tick().unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::Release);
        });

        let summary = control.run_pipelined(u64::MAX, shutdown).await.unwrap();
        stopper.await.unwrap();
        assert!(summary.ticks > 0);
    }

    #[test]
    fn rover_drives_to_a_sample_and_collects_it() {
        let mut control = control(SimRig::new().with_sample(104.0, 100.0));
        let summary = control.run(300, &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.samples_collected, 1);
        assert!(summary.pickups_requested >= 1);
        assert!(summary.mode_changes >= 2);
    }

    #[tokio::test]
    async fn pipelined_run_matches_sequential_run() {
        let rig = SimRig::mission(3);

        let mut sequential = control(rig.clone());
        let expected = sequential.run(120, &AtomicBool::new(false)).unwrap();

        let pipelined = control(rig)
            .run_pipelined(120, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        assert_eq!(pipelined, expected);
    }

    #[tokio::test]
    async fn pipelined_run_surfaces_camera_faults() {
        let hw = SimRig::new().build();
        let control = ControlLoop::new(BrokenCamera, hw.drive, engine());
        let err = control
            .run_pipelined(10, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::HardwareFault { .. }));
    }

    #[tokio::test]
    async fn pipelined_run_honours_shutdown() {
        let summary = control(SimRig::new())
            .run_pipelined(10, Arc::new(AtomicBool::new(true)))
            .await
            .unwrap();
        assert_eq!(summary.ticks, 0);
    }
}
