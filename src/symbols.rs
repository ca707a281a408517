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

use std::collections::HashMap;

use crate::ast::Expr;
use crate::token::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    GlobalLabel,
    LocalLabel,
    CurrentLocation,
    Equ,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub location: SourceLocation,
    pub kind: SymbolKind,
    pub name: String,
    pub offset: u16,
    pub equ_expr: Option<Box<Expr>>,
}

/// Two structures over one arena: an ordered list (emission order,
/// used to find "the most recent global label before offset X" and to
/// compose local-label names) and a name-to-entry hash for O(1)
/// lookup. The `Vec` doubles as the arena the design notes call for:
/// indices are stable across `update_after`'s in-place offset edits,
/// so nothing aliases when the compression loop mutates offsets.
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    by_name: HashMap<String, SymbolId>,
    last_global: Option<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { entries: Vec::new(), by_name: HashMap::new(), last_global: None }
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn get(&self, id: SymbolId) -> &SymbolEntry {
        &self.entries[id.0]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut SymbolEntry {
        &mut self.entries[id.0]
    }

    pub fn lookup_id(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.lookup_id(name).map(|id| self.get(id))
    }

    /// Composes the full name for a possibly-local reference. A
    /// `.`-prefixed name is qualified with the most recently declared
    /// global label (by declaration order, not by address); a bare
    /// name is returned unchanged.
    pub fn qualify(&self, name: &str) -> Option<String> {
        if let Some(local) = name.strip_prefix('.') {
            self.last_global.as_ref().map(|g| format!("{g}.{local}"))
        } else {
            Some(name.to_string())
        }
    }

    /// Declares a label, returning its id. Local labels are stored
    /// under the composed `"<last-global>.<local>"` name. Declaring a
    /// local label before any global label is the caller's
    /// responsibility to reject (`qualify` returns `None` in that
    /// case).
    pub fn declare_label(
        &mut self,
        raw_name: &str,
        kind: SymbolKind,
        offset: u16,
        location: SourceLocation,
    ) -> Result<SymbolId, String> {
        let full_name = match kind {
            SymbolKind::GlobalLabel => raw_name.to_string(),
            SymbolKind::LocalLabel => match self.qualify(raw_name) {
                Some(name) => name,
                None => return Err(raw_name.to_string()),
            },
            _ => raw_name.to_string(),
        };

        if self.by_name.contains_key(&full_name) {
            return Err(full_name);
        }

        let id = SymbolId(self.entries.len());
        self.entries.push(SymbolEntry { location, kind, name: full_name.clone(), offset, equ_expr: None });
        self.by_name.insert(full_name.clone(), id);

        if let SymbolKind::GlobalLabel = kind {
            self.last_global = Some(full_name);
        }

        Ok(id)
    }

    pub fn declare_equ(
        &mut self,
        name: &str,
        expr: Expr,
        location: SourceLocation,
    ) -> Result<SymbolId, String> {
        if self.by_name.contains_key(name) {
            return Err(name.to_string());
        }
        let id = SymbolId(self.entries.len());
        self.entries.push(SymbolEntry {
            location,
            kind: SymbolKind::Equ,
            name: name.to_string(),
            offset: 0,
            equ_expr: Some(Box::new(expr)),
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Shifts every symbol declared after `after_offset` by `delta`,
    /// the operation the compression loop applies whenever an operand
    /// changes size.
    pub fn update_after(&mut self, after_offset: u16, delta: i32) {
        for entry in &mut self.entries {
            if matches!(entry.kind, SymbolKind::Equ) {
                continue;
            }
            if entry.offset > after_offset {
                entry.offset = (entry.offset as i32 + delta) as u16;
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
