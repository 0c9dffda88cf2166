//! loopcall simulates a two-party call between two endpoints living in the
//! same process.
//!
//! It provides one binary, `loopcall`, which negotiates a call between side A
//! and side B over an in-process loopback fabric and then chats over the data
//! channel it opened.
//!
//! The crate is structured into several modules, each responsible for one
//! layer of the session: capture, description, connectivity, transport and
//! the orchestration that ties them together.

/// Text chat over a data channel.
pub mod chat;
/// Handles configuration loading and management.
pub mod config;
/// Framed, ordered message channels between two endpoints.
pub mod data_channel;
/// The per-side connection endpoint and its signaling state machine.
pub mod endpoint;
/// Candidates, the loopback fabric and connectivity checks.
pub mod ice;
/// Logging utilities for the application.
pub mod log;
/// Local media capture.
pub mod media;
/// Drives offer/answer between the two endpoints.
pub mod orchestrator;
/// Delivers trickled candidates to the opposite endpoint.
pub mod relay;
/// SDP (Session Description Protocol) parsing and building.
pub mod sdp;
/// Sensor records exchanged over a data channel.
pub mod sensor;
/// Small shared helpers.
pub mod utils;
