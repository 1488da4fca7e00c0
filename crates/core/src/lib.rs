//! Storage guardian for the campus portal:
//! policy, classification, the periodic
//! health-check loop, and the SQLite probe
//! it runs against.

pub mod app;
pub mod domain;
pub mod infra;
pub mod ports;
