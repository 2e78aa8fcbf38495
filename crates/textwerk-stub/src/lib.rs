// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Textwerk Stub: an in-memory stand-in for the document analysis service,
// reachable in-process through `InProcessTransport` or over loopback HTTP
// through `StubServer`.

pub mod analyze;
pub mod document;
pub mod server;
pub mod service;
pub mod transport;

pub use server::StubServer;
pub use service::{StubConfig, StubService};
pub use transport::InProcessTransport;
