/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Vehicle monitor: fixed-priority periodic scheduling with inter-task
//! data aggregation.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── sensor        – sensor ids, SampleSource, simulated source
//! ├── window        – fixed-window running average
//! ├── channel/      – bounded FIFO channel (crossbeam), scheduler aware
//! ├── task          – PeriodSpec, PeriodicTimer, PeriodicTask, TaskState
//! ├── clock         – monotonic and manual clocks
//! ├── scheduler/    – cyclic executive, preemptive kernel, priorities
//! ├── hyperperiod/  – major / minor frame (LCM / GCD)
//! ├── report        – reporter messages, DisplaySnapshot, Reporter
//! ├── config/       – YAML system configuration
//! └── vehicle       – the simulated vehicle workload
//! ```

pub mod channel;
pub mod clock;
pub mod config;
pub mod hyperperiod;
pub mod report;
pub mod scheduler;
pub mod sensor;
pub mod task;
pub mod vehicle;
pub mod window;
