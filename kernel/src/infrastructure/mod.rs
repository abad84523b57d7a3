/// Audit logging for session and dispatch events.
pub mod audit;
/// Configuration management for the kernel.
pub mod config;
/// HTTP server and route assembly.
pub mod server;
/// Telemetry setup for logging, tracing, and metrics.
pub mod telemetry;
