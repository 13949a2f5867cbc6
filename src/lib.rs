//! Prometheus metrics exporter for Sphinx / Manticore `searchd`.
//!
//! `searchd` exposes its counters through a MySQL-protocol listener; the
//! exporter connects to it like any other MySQL client, runs `SHOW STATUS`
//! on every pull and republishes the values in the Prometheus text format.

pub mod cli;
pub mod collectors;
pub mod exporter;
