// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Textwerk: data model, validation, and error taxonomy shared across all crates.

pub mod config;
pub mod error;
pub mod graph;
pub mod human_errors;
pub mod model;
pub mod operation;
pub mod validate;

pub use config::ClientConfig;
pub use error::{ErrorClass, ServiceError, ServiceErrorKind, TextwerkError, ValidationError};
pub use graph::BlockGraph;
pub use operation::{HasNextToken, JobQuery, JobResult, Operation, Paginated};
pub use validate::Validate;
