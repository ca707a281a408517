/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::collections::HashSet;
use std::io::Write;

use crate::errors::AssemblyError;
use crate::token::SourceLocation;

/// Accumulates errors and warnings keyed by location. Parsing recovers
/// from individual errors by inserting `Expr::Invalid` nodes and
/// continuing, so a single run can collect many diagnostics; no object
/// file is produced if any error was logged, but warnings never
/// inhibit output. Divide-by-zero warnings are deduplicated per
/// location so the compression loop's fixpoint iterations don't spam
/// the same warning every pass.
pub struct Log {
    errors: Vec<(SourceLocation, String)>,
    warnings: Vec<(SourceLocation, String)>,
    warned_divide_by_zero: HashSet<SourceLocation>,
    warned_non_ascii: HashSet<SourceLocation>,
}

impl Log {
    pub fn new() -> Self {
        Log {
            errors: Vec::new(),
            warnings: Vec::new(),
            warned_divide_by_zero: HashSet::new(),
            warned_non_ascii: HashSet::new(),
        }
    }

    pub fn error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.errors.push((location, message.into()));
    }

    pub fn error_from(&mut self, err: &AssemblyError) {
        self.error(err.location().clone(), err.to_string());
    }

    pub fn warning(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.warnings.push((location, message.into()));
    }

    pub fn divide_by_zero(&mut self, location: &SourceLocation) {
        if self.warned_divide_by_zero.contains(location) {
            return;
        }
        self.warned_divide_by_zero.insert(location.clone());
        self.warning(location.clone(), "division or modulo by zero");
    }

    pub fn non_ascii_character(&mut self, location: &SourceLocation) {
        if self.warned_non_ascii.contains(location) {
            return;
        }
        self.warned_non_ascii.insert(location.clone());
        self.warning(location.clone(), "character literal is not 7-bit ASCII");
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn errors(&self) -> &[(SourceLocation, String)] {
        &self.errors
    }

    pub fn warnings(&self) -> &[(SourceLocation, String)] {
        &self.warnings
    }

    /// Writes every accumulated diagnostic followed by the summary
    /// line(s), in the `"<file>:<line>:<col>: error: <msg>"` /
    /// `"... warning: ..."` format, to `out`.
    pub fn emit(&self, out: &mut impl Write) -> std::io::Result<()> {
        for (location, message) in &self.errors {
            writeln!(out, "{location}: error: {message}")?;
        }
        for (location, message) in &self.warnings {
            writeln!(out, "{location}: warning: {message}")?;
        }
        self.summary(out)
    }

    pub fn summary(&self, out: &mut impl Write) -> std::io::Result<()> {
        if !self.errors.is_empty() {
            writeln!(out, "{} error(s)", self.errors.len())?;
        }
        if !self.warnings.is_empty() {
            writeln!(out, "{} warning(s)", self.warnings.len())?;
        }
        Ok(())
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}
