#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod resource;
pub mod run_stats;
pub mod scheduler;
pub mod scheduler_resolver;
pub mod schedulers;
pub mod simulator;
pub mod trace_log;
pub mod workflow;
