//! oddsrunner -- operations launcher and scheduler for the odds-engine pipeline.
//!
//! This crate provides the core library for resolving the pipeline's Python
//! environment, invoking pipeline tasks as logged subprocesses, recording run
//! history, generating recurring schedules (cron / Windows Task Scheduler),
//! and bootstrapping a fresh deployment.

pub mod backfill;
pub mod bootstrap;
pub mod config;
pub mod env;
pub mod logsink;
pub mod platform;
pub mod schedule;
pub mod storage;
pub mod tasks;
