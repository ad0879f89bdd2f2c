// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefixed socket transport (spec §4.F). Gated behind the
//! `transport` feature so the codec/filter/matrix core has no network
//! surface by default.

pub mod connection;
pub mod frame;

pub use connection::{canonicalize, Connection, TIMEOUT_INHERIT};
pub use frame::{encode_frame, pad_id, FrameFlags, FrameHeader};
