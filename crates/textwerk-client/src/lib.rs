// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Textwerk Client: transport, JSON-1.1 codec, typed operations, pagination
// and job polling over the types defined in `textwerk-core`.

pub mod client;
pub mod codec;
pub mod paginate;
pub mod poll;
pub mod retry;
pub mod transport;

pub use client::TextwerkClient;
pub use paginate::Paginator;
pub use poll::JobOutcome;
pub use transport::{HttpTransport, Transport, WireRequest, WireResponse};
