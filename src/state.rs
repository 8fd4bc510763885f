// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;

use crate::broker::Broker;

#[derive(Clone)]
pub struct AppState {
    pub broker: Broker,
    /// Configured data directory; `None` when running in memory.
    pub data_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(broker: Broker, data_dir: Option<PathBuf>) -> Self {
        Self { broker, data_dir }
    }
}
