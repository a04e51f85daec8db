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

//! Binding eligibility predicates
//!
//! Only simple keyboard triggers (press/release) whose key actually takes
//! part in the translation are ever touched. `is_remappable` and
//! `is_remapped` are deliberately not complements: a key that is neither
//! remapped from nor remapped to is left alone by both passes.

use std::collections::BTreeSet;

use crate::core::translation::Translation;
use crate::core::types::{Binding, InputDevice, Label};

fn is_simple_key_binding(binding: &Binding) -> bool {
    binding.device == InputDevice::Keyboard && binding.trigger_mode.is_simple_key_trigger()
}

/// True when the binding sits on a physical key the translation remaps.
pub fn is_remappable(binding: &Binding, translation: &Translation) -> bool {
    is_simple_key_binding(binding) && translation.remaps_physical(&binding.trigger_char)
}

/// True when the binding sits on a key the translation produces.
pub fn is_remapped(binding: &Binding, translation: &Translation) -> bool {
    is_simple_key_binding(binding) && translation.produces_substituted(&binding.trigger_char)
}

/// Like `is_remapped`, against an explicit set of produced labels
///
/// Reverting uses the labels recorded in the journal rather than the
/// current translation, which may have changed since the last apply.
pub fn is_remapped_to(binding: &Binding, produced: &BTreeSet<Label>) -> bool {
    is_simple_key_binding(binding) && produced.contains(&binding.trigger_char)
}
