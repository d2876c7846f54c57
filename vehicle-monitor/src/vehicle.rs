/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The vehicle monitor workload.
//!
//! | Task | Kind | Default period | Output |
//! |---|---|---|---|
//! | injection, temperature | digital monitor | 15 / 20 ms | `SubsystemEvent` (motor) |
//! | abs | digital monitor | 100 ms | `SubsystemEvent` (braking) |
//! | airbag, seatbelt | digital monitor | 100 / 1000 ms | `SubsystemEvent` (life support) |
//! | speed, consumption | analog sampler | 100 ms | `AggregateMessage` every window |
//! | reporter | consumer | 1000 ms | `Reporter::render` |
//!
//! Digital monitors never block: a trigger is published with `try_send`,
//! and if the event channel is full the trigger stays pending and is retried
//! on the next activation.  Analog samplers publish one mean per full window
//! through the configured [`SendPolicy`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::channel::{self, Receiver, RecvError, SendError, SendPolicy, Sender};
use crate::clock::Clock;
use crate::config::{AggregateWait, SystemConfig};
use crate::report::{AggregateMessage, DisplaySnapshot, Reporter, SubsystemEvent, SubsystemFlags};
use crate::scheduler::{Scheduler, SchedulerError, TaskError};
use crate::sensor::{SampleSource, SensorId, SensorKind, SimulatedSource, Subsystem};
use crate::task::{PeriodSpec, PeriodicTask};
use crate::window::RunningAverage;

const EVENTS: &str = "events";
const AGGREGATES: &str = "aggregates";

// ── Digital monitor ───────────────────────────────────────────────────────────

/// Poll a digital sensor; publish a [`SubsystemEvent`] when it triggers.
pub fn digital_monitor(
    sensor: SensorId,
    subsystem: Subsystem,
    spec: PeriodSpec,
    mut source: Box<dyn SampleSource>,
    events: Sender<SubsystemEvent>,
    clock: Arc<dyn Clock>,
) -> PeriodicTask {
    let mut pending: Option<SubsystemEvent> = None;

    PeriodicTask::new(sensor.name(), spec, move || {
        if source.read(sensor).is_triggered() {
            info!(sensor = %sensor, subsystem = %subsystem, "sensor triggered");
            // an unsent trigger is kept with its first timestamp
            pending.get_or_insert(SubsystemEvent {
                sensor,
                subsystem,
                at: clock.now(),
            });
        }

        if let Some(event) = pending.take() {
            match events.try_send(event) {
                Ok(()) => {}
                Err(SendError::Full(event)) => {
                    debug!(sensor = %sensor, "event channel full, retrying next period");
                    pending = Some(event);
                }
                Err(_) => return Err(TaskError::ChannelClosed { channel: EVENTS }),
            }
        }
        Ok(())
    })
}

// ── Analog sampler ────────────────────────────────────────────────────────────

/// Sample an analog sensor into a [`RunningAverage`]; publish the mean of
/// every full window.
pub fn analog_sampler(
    sensor: SensorId,
    spec: PeriodSpec,
    mut source: Box<dyn SampleSource>,
    mut window: RunningAverage,
    aggregates: Sender<AggregateMessage>,
    policy: SendPolicy,
    clock: Arc<dyn Clock>,
) -> PeriodicTask {
    PeriodicTask::new(sensor.name(), spec, move || {
        let value = source.read(sensor).value();
        let Some(mean) = window.push(value) else {
            return Ok(());
        };

        let msg = AggregateMessage {
            sensor,
            mean,
            produced_at: clock.now(),
        };
        debug!(sensor = %sensor, mean, "window complete");

        match aggregates.send_with(msg, policy) {
            Ok(()) => Ok(()),
            Err(SendError::Disconnected(_)) => Err(TaskError::ChannelClosed {
                channel: AGGREGATES,
            }),
            Err(e) => {
                warn!(sensor = %sensor, "aggregate dropped: {e}");
                Ok(())
            }
        }
    })
}

// ── Reporter task ─────────────────────────────────────────────────────────────

/// Drain both channels, update the display state and render it.
pub fn reporter_task(
    spec: PeriodSpec,
    events: Receiver<SubsystemEvent>,
    aggregates: Receiver<AggregateMessage>,
    wait: AggregateWait,
    mut reporter: Box<dyn Reporter>,
    clock: Arc<dyn Clock>,
) -> PeriodicTask {
    let mut flags = SubsystemFlags::default();
    let mut averages: BTreeMap<SensorId, f64> = BTreeMap::new();

    PeriodicTask::new("reporter", spec, move || {
        let received = collect_aggregates(&aggregates, wait);
        let aggregates_received = received.len();
        for msg in received {
            averages.insert(msg.sensor, msg.mean);
        }

        let events_received = events.drain().into_iter().fold(0, |n, event| {
            flags.set(event.subsystem);
            n + 1
        });

        reporter.render(&DisplaySnapshot {
            at: clock.now(),
            flags,
            averages: averages.clone(),
            aggregates_received,
            events_received,
        });
        flags.reset();
        Ok(())
    })
}

fn collect_aggregates(
    aggregates: &Receiver<AggregateMessage>,
    wait: AggregateWait,
) -> Vec<AggregateMessage> {
    let first = match wait {
        AggregateWait::Poll => return aggregates.drain(),
        AggregateWait::Block => aggregates.receive(None),
        AggregateWait::Timeout(d) => aggregates.receive(Some(d)),
    };

    match first {
        Ok(msg) => {
            let mut all = vec![msg];
            all.extend(aggregates.drain());
            all
        }
        Err(RecvError::Disconnected) => {
            // no sampler left (none configured, or shutting down)
            debug!("aggregate channel has no producers");
            Vec::new()
        }
        Err(e) => {
            debug!("no aggregate this period: {e}");
            Vec::new()
        }
    }
}

// ── Assembly ──────────────────────────────────────────────────────────────────

/// Build every task of the workload described by `cfg`.
///
/// `source_for` supplies the sample source of each sensor; the channels are
/// created here and their only endpoints are moved into the tasks.
pub fn build_tasks<F>(
    cfg: &SystemConfig,
    clock: Arc<dyn Clock>,
    reporter: Box<dyn Reporter>,
    mut source_for: F,
) -> Vec<PeriodicTask>
where
    F: FnMut(SensorId) -> Box<dyn SampleSource>,
{
    let (event_tx, event_rx) = channel::bounded(cfg.event_capacity);
    let (aggregate_tx, aggregate_rx) = channel::bounded(cfg.aggregate_capacity);
    let (sensor_specs, reporter_spec) = cfg.task_specs();

    let mut tasks = Vec::with_capacity(sensor_specs.len() + 1);
    for (sensor, spec) in sensor_specs {
        let source = source_for(sensor);
        let task = match (sensor.kind(), sensor.subsystem()) {
            (SensorKind::Digital, Some(subsystem)) => digital_monitor(
                sensor,
                subsystem,
                spec,
                source,
                event_tx.clone(),
                Arc::clone(&clock),
            ),
            _ => analog_sampler(
                sensor,
                spec,
                source,
                RunningAverage::new(cfg.window_capacity),
                aggregate_tx.clone(),
                cfg.send_policy,
                Arc::clone(&clock),
            ),
        };
        tasks.push(task.with_timer_policy(cfg.timer_policy));
    }

    tasks.push(
        reporter_task(
            reporter_spec,
            event_rx,
            aggregate_rx,
            cfg.reporter.aggregate_wait,
            reporter,
            clock,
        )
        .with_timer_policy(cfg.timer_policy),
    );
    tasks
}

/// A scheduler loaded with the simulated vehicle workload.
pub fn build_scheduler(
    cfg: &SystemConfig,
    clock: Arc<dyn Clock>,
    reporter: Box<dyn Reporter>,
) -> Result<Scheduler, SchedulerError> {
    let mut scheduler = Scheduler::new(cfg.mode)
        .with_tick(cfg.tick)
        .with_clock(Arc::clone(&clock));

    let seed = cfg.seed;
    let p = cfg.trigger_probability;
    let tasks = build_tasks(cfg, clock, reporter, |sensor| -> Box<dyn SampleSource> {
        Box::new(SimulatedSource::for_sensor(seed, sensor, p))
    });
    for task in tasks {
        scheduler.spawn(task)?;
    }
    Ok(scheduler)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
