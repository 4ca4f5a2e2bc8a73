//! mediascan daemon support: configuration loading, service wiring, and the
//! discovery log listener used by the `mediascan` binary.

pub mod app;
pub mod config;
pub mod listener;
