// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Parlor conversational backend.
//!
//! One tokio task per WebSocket connection; shared state lives behind
//! the connection registry. REST endpoints cover visitor
//! identification, a non-streaming message turn, and message history.

pub mod handlers;
pub mod registry;
pub mod server;
pub mod ws;

pub use registry::ConnectionRegistry;
pub use server::{router, start_server, GatewayState};
