// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Regex deny-list filter applied before any provider call.

use parlor_core::ParlorError;
use regex::RegexSet;

pub struct SafetyFilter {
    patterns: RegexSet,
}

impl SafetyFilter {
    /// Compile the configured deny patterns, case-insensitively.
    pub fn new(patterns: &[String]) -> Result<Self, ParlorError> {
        let prefixed: Vec<String> = patterns.iter().map(|p| format!("(?i){p}")).collect();
        let patterns = RegexSet::new(&prefixed)
            .map_err(|e| ParlorError::Config(format!("invalid safety pattern: {e}")))?;
        Ok(Self { patterns })
    }

    pub fn is_blocked(&self, message: &str) -> bool {
        self.patterns.is_match(message)
    }
}
