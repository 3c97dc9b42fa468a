// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multi-engine ensemble OCR

pub mod coordinator;
pub mod result;

pub use coordinator::EnsembleCoordinator;
pub use result::{korean_ratio, EnsembleResult, LOW_QUALITY_THRESHOLD};
