// SPDX-License-Identifier: MPL-2.0
//! Application layer - ports the frame source depends on.
//!
//! - [`port`]: Trait definitions (interfaces) for dependency inversion
//!
//! # Dependency Rule
//!
//! - Application layer depends on domain layer (uses domain types)
//! - Infrastructure layer implements application layer ports
//! - The frame source engine only talks to ports

pub mod port;
