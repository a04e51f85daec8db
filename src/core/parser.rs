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

//! src/core/parser.rs
//!
//! Small text formats used by layouts and journal diffs
//!
//! This module parses:
//! - Layout rows: sequences of key labels where whitespace is insignificant,
//!   used to write built-in layouts as two aligned strings
//! - Modifier signatures: the compact `@#^!+` form produced by
//!   `ModifierSet::signature()`
//!
//! # Architecture
//! The parsers use nom combinators for composable, type-safe parsing.
//! Both formats are tiny, so every public entry point requires the whole
//! input to be consumed.

use nom::{
    branch::alt,
    character::complete::{char, multispace0, satisfy},
    combinator::{all_consuming, map, rest, success, value},
    multi::many0,
    sequence::{preceded, terminated},
    IResult, Parser,
};
use thiserror::Error;

use crate::core::types::{Label, ModifierSet, ModifierState};

/// Parse errors with the offending input
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid layout row '{input}': {message}")]
    InvalidLayoutRow { input: String, message: String },

    #[error("Invalid modifier signature '{input}': {message}")]
    InvalidSignature { input: String, message: String },
}

/// Parse a layout row into its labels
///
/// Every non-whitespace character is one label. Spaces, tabs and
/// newlines are ignored, so rows can be aligned for readability.
///
/// # Example
/// ```
/// use keylayout_remap::core::parser::parse_layout_row;
///
/// let (_, labels) = parse_layout_row("  QA  WZ ").unwrap();
/// assert_eq!(labels, vec!["Q", "A", "W", "Z"]);
/// ```
pub fn parse_layout_row(input: &str) -> IResult<&str, Vec<Label>> {
    terminated(
        many0(preceded(
            multispace0,
            map(satisfy(|c: char| !c.is_whitespace()), |c: char| c.to_string()),
        )),
        multispace0,
    )
    .parse(input)
}

/// Parse a full layout row, requiring all input to be consumed
pub fn layout_row_labels(input: &str) -> Result<Vec<Label>, ParseError> {
    all_consuming(parse_layout_row)
        .parse(input)
        .map(|(_, labels)| labels)
        .map_err(|e| ParseError::InvalidLayoutRow {
            input: input.to_string(),
            message: format!("{:?}", e),
        })
}

/// Parse one modifier position: `~X` (any), `X` (held) or nothing (off)
fn modifier_flag<'a>(
    symbol: char,
) -> impl Parser<&'a str, Output = ModifierState, Error = nom::error::Error<&'a str>> {
    alt((
        value(ModifierState::Any, (char('~'), char(symbol))),
        value(ModifierState::On, char(symbol)),
        success(ModifierState::Off),
    ))
}

/// Parse a modifier signature
///
/// Format: `[~]@ [~]# [~]^ [~]! [~]+ KEY_MODIFIER`, each part optional,
/// in that fixed order. Whatever follows the five modifier positions is
/// the key modifier.
pub fn parse_modifier_signature(input: &str) -> IResult<&str, ModifierSet> {
    let (input, hyper) = modifier_flag('@').parse(input)?;
    let (input, oskey) = modifier_flag('#').parse(input)?;
    let (input, ctrl) = modifier_flag('^').parse(input)?;
    let (input, alt_state) = modifier_flag('!').parse(input)?;
    let (input, shift) = modifier_flag('+').parse(input)?;
    let (input, key) = rest::<_, nom::error::Error<&str>>(input)?;

    let key_modifier = if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    };

    Ok((
        input,
        ModifierSet {
            shift,
            ctrl,
            alt: alt_state,
            oskey,
            hyper,
            key_modifier,
        },
    ))
}

/// Parse a modifier signature back into a `ModifierSet`
///
/// # Example
/// ```
/// use keylayout_remap::core::parser::modifier_set_from_signature;
/// use keylayout_remap::core::ModifierState;
///
/// let mods = modifier_set_from_signature("^~+").unwrap();
/// assert_eq!(mods.ctrl, ModifierState::On);
/// assert_eq!(mods.shift, ModifierState::Any);
/// ```
pub fn modifier_set_from_signature(input: &str) -> Result<ModifierSet, ParseError> {
    if input.chars().any(char::is_whitespace) {
        return Err(ParseError::InvalidSignature {
            input: input.to_string(),
            message: "signatures never contain whitespace".to_string(),
        });
    }

    parse_modifier_signature(input)
        .map(|(_, mods)| mods)
        .map_err(|e| ParseError::InvalidSignature {
            input: input.to_string(),
            message: format!("{:?}", e),
        })
}
