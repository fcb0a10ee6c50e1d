// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ul-core: Shared library for the unilink sync client
//!
//! This crate provides the wire protocol, message priorities, device identity
//! and clock primitives used by the unilink CLI and its sync engine.

pub mod clock;
pub mod error;
pub mod identity;
pub mod priority;
pub mod protocol;

pub use clock::{ClockSource, SystemClock};
pub use error::{Error, Result};
pub use identity::{DeviceIdentity, DeviceInfo, DeviceType, Platform};
pub use priority::Priority;
pub use protocol::{ClientMessage, InboundEvent, ProtocolError};
