// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Log output setup
//!
//! `RUST_LOG` takes precedence over the level from preferences:
//! - `RUST_LOG=debug` - all debug logs, including per-binding reconciliation
//! - `RUST_LOG=keylayout_remap::core::engine=info` - pass results only

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogLevel;

/// Filter used when `RUST_LOG` is unset or invalid.
pub fn default_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::new(level.as_filter())
}

/// Installs a stderr subscriber; later calls are ignored.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}
