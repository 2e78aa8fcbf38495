// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire data model.
//
// Every request and response of the service is a plain serde struct using
// the service's PascalCase member names.  Optional members are `Option`
// and skipped when absent; lists decode as empty when the service omits
// them.

pub mod adapters;
pub mod block;
pub mod enums;
pub mod expense;
pub mod identity;
pub mod input;
pub mod lending;
pub mod tags;
pub mod text;
pub mod wire;

pub use adapters::*;
pub use block::*;
pub use enums::*;
pub use expense::*;
pub use identity::*;
pub use input::*;
pub use lending::*;
pub use tags::*;
pub use text::*;
