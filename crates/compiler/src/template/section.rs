/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Ordered, append-only registry backing each template section.
 */

use std::collections::HashMap;

use crate::error::DeclarationError;

/// Entries of one section in declaration order, indexed by identifier.
#[derive(Debug, Clone)]
pub struct Section<T> {
    name: &'static str,
    entries: Vec<(String, T)>,
    index_map: HashMap<String, usize>,
}

impl<T> Section<T> {
    /// Create an empty section. `name` is used in error messages.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
            index_map: HashMap::new(),
        }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationError::DuplicateIdentifier` if `id` is already declared.
    pub fn declare(&mut self, id: &str, entry: T) -> Result<(), DeclarationError> {
        if self.index_map.contains_key(id) {
            return Err(DeclarationError::DuplicateIdentifier {
                section: self.name,
                id: id.to_string(),
            });
        }
        self.index_map.insert(id.to_string(), self.entries.len());
        self.entries.push((id.to_string(), entry));
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.index_map.get(id).map(|&index| &self.entries[index].1)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index_map.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
