// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — page representations and output encoding.

pub mod encode;
pub mod representation;

pub use encode::OutputEncoder;
pub use representation::{PageImage, Representation, RepresentationData};
