// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Attribute list
//!
//! The list holds every field value of an object as a flat vector kept in
//! `(attribute, field, sub-field)` order. Unrecognised attributes are kept
//! separately as opaque blobs and always come after the recognised ones.

extern crate alloc;

use alloc::vec::Vec;
use core::ops::Range;

use const_oid::ObjectIdentifier;

use super::table::{self, AttributeInfo, FieldType, TableKind, FL_CRITICAL};
use super::{AttributeValue, CertInfo};
use crate::error::{Error, ErrorKind, ErrorType, Result};

/// Per-entry state flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags {
    /// The attribute is marked critical
    pub critical: bool,
    /// The entry can't be deleted by the caller
    pub locked: bool,
    /// The field may have sibling entries with the same identifier
    pub multivalued: bool,
    /// The entry is an unrecognised attribute
    pub blob: bool,
    /// The blob isn't checked for well-formed encoding
    pub ignored: bool,
    /// The field held its default value during the last walk
    pub default_applied: bool,
}

/// One field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeEntry {
    pub attribute_id: CertInfo,
    pub field_id: CertInfo,
    /// GeneralName component for fields holding a GeneralName
    pub sub_field_id: Option<CertInfo>,
    pub field_type: FieldType,
    pub value: AttributeValue,
    pub flags: EntryFlags,
}

impl AttributeEntry {
    pub fn new(
        attribute_id: CertInfo,
        field_id: CertInfo,
        sub_field_id: Option<CertInfo>,
        field_type: FieldType,
        value: AttributeValue,
    ) -> Self {
        Self {
            attribute_id,
            field_id,
            sub_field_id,
            field_type,
            value,
            flags: EntryFlags::default(),
        }
    }

    /// True if this entry should be placed after `other`.
    fn sorts_after(&self, other: &AttributeEntry) -> bool {
        let key = (self.attribute_id, self.field_id);
        let other_key = (other.attribute_id, other.field_id);
        key > other_key || (key == other_key && self.sub_field_id > other.sub_field_id)
    }
}

/// An attribute the table doesn't describe, kept in its encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobAttribute {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// Encoded value (the contents of the OCTET STRING or SET)
    pub value: Vec<u8>,
    pub flags: EntryFlags,
}

/// Result of looking a field up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLookupResult<'a> {
    Found(&'a AttributeEntry),
    /// The attribute is present and the field takes its table default
    AbsentWithDefault(AttributeValue),
    /// The identifier names a whole attribute, which is present
    AbsentButAttributePresent,
    NotFound,
}

impl<'a> FieldLookupResult<'a> {
    pub fn is_present(&self) -> bool {
        !matches!(self, FieldLookupResult::NotFound)
    }

    pub fn value(&self) -> Option<AttributeValue> {
        match self {
            FieldLookupResult::Found(entry) => Some(entry.value.clone()),
            FieldLookupResult::AbsentWithDefault(value) => Some(value.clone()),
            _ => None,
        }
    }
}

/// The attributes of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeList {
    kind: TableKind,
    entries: Vec<AttributeEntry>,
    blobs: Vec<BlobAttribute>,
}

impl AttributeList {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            blobs: Vec::new(),
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn table(&self) -> &'static [AttributeInfo] {
        table::attribute_table(self.kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.blobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[AttributeEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&AttributeEntry> {
        self.entries.get(index)
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> Option<&mut AttributeEntry> {
        self.entries.get_mut(index)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [AttributeEntry] {
        &mut self.entries
    }

    pub fn blobs(&self) -> &[BlobAttribute] {
        &self.blobs
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.blobs.clear();
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert an entry after every entry that sorts at or before it, and
    /// return its index. Entries with equal keys keep insertion order.
    pub(crate) fn insert_entry(&mut self, entry: AttributeEntry) -> usize {
        let pos = self
            .entries
            .iter()
            .position(|e| e.sorts_after(&entry))
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        pos
    }

    pub(crate) fn push_blob(&mut self, blob: BlobAttribute) {
        self.blobs.push(blob);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Index of the entry for `field` with exactly this sub-field.
    pub fn find(&self, field: CertInfo, sub_field: Option<CertInfo>) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.field_id == field && e.sub_field_id == sub_field)
    }

    /// Index of the first entry for `field`, whatever its sub-field.
    pub fn find_first_field_of(&self, field: CertInfo) -> Option<usize> {
        self.entries.iter().position(|e| e.field_id == field)
    }

    /// All entries for `field`, in list order.
    pub fn field_values(&self, field: CertInfo) -> impl Iterator<Item = &AttributeEntry> {
        self.entries.iter().filter(move |e| e.field_id == field)
    }

    /// Value of the first entry for `field`.
    pub fn value(&self, field: CertInfo) -> Option<&AttributeValue> {
        self.find_first_field_of(field)
            .map(|index| &self.entries[index].value)
    }

    pub fn has_attribute(&self, attribute_id: CertInfo) -> bool {
        self.entries.iter().any(|e| e.attribute_id == attribute_id)
    }

    /// Index range of the entries belonging to one attribute.
    pub fn attribute_range(&self, attribute_id: CertInfo) -> Range<usize> {
        match self
            .entries
            .iter()
            .position(|e| e.attribute_id == attribute_id)
        {
            Some(start) => {
                let len = self.entries[start..]
                    .iter()
                    .take_while(|e| e.attribute_id == attribute_id)
                    .count();
                start..start + len
            }
            None => 0..0,
        }
    }

    pub fn attribute_entries(&self, attribute_id: CertInfo) -> &[AttributeEntry] {
        &self.entries[self.attribute_range(attribute_id)]
    }

    /// Distinct attribute identifiers in list order.
    pub fn attribute_ids(&self) -> Vec<CertInfo> {
        let mut ids: Vec<CertInfo> = Vec::new();
        for entry in &self.entries {
            if ids.last() != Some(&entry.attribute_id) {
                ids.push(entry.attribute_id);
            }
        }
        ids
    }

    /// Look a field up, reporting table defaults and whole-attribute
    /// identifiers as distinct results.
    pub fn lookup(&self, field: CertInfo, sub_field: Option<CertInfo>) -> FieldLookupResult<'_> {
        if let Some(index) = self.find(field, sub_field) {
            return FieldLookupResult::Found(&self.entries[index]);
        }
        let location = match table::field_id_to_attribute(self.table(), field, sub_field) {
            Some(location) => location,
            None => return FieldLookupResult::NotFound,
        };
        if !self.has_attribute(location.attribute_id) {
            return FieldLookupResult::NotFound;
        }
        if location.attribute_id == field && sub_field.is_none() {
            return FieldLookupResult::AbsentButAttributePresent;
        }
        if location.row.has_flag(table::FL_DEFAULT) {
            let value = match location.row.field_type {
                FieldType::Boolean => AttributeValue::Boolean(location.row.default_value != 0),
                _ => AttributeValue::Integer(location.row.default_value),
            };
            return FieldLookupResult::AbsentWithDefault(value);
        }
        FieldLookupResult::NotFound
    }

    /// Whether an attribute is critical, either by table or by entry.
    pub fn is_critical(&self, attribute_id: CertInfo) -> bool {
        let table_critical = table::attribute_start(self.table(), attribute_id)
            .map(|start| self.table()[start].has_flag(FL_CRITICAL))
            .unwrap_or(false);
        table_critical
            || self
                .attribute_entries(attribute_id)
                .iter()
                .any(|e| e.flags.critical)
    }

    pub fn set_critical(&mut self, attribute_id: CertInfo, critical: bool) -> Result<()> {
        let range = self.attribute_range(attribute_id);
        if range.is_empty() {
            return Err(Error::not_found(attribute_id));
        }
        for entry in &mut self.entries[range] {
            entry.flags.critical = critical;
        }
        Ok(())
    }

    /// Lock every entry of an attribute against deletion.
    pub fn lock_attribute(&mut self, attribute_id: CertInfo) {
        let range = self.attribute_range(attribute_id);
        for entry in &mut self.entries[range] {
            entry.flags.locked = true;
        }
    }

    pub fn find_blob(&self, oid: &ObjectIdentifier) -> Option<&BlobAttribute> {
        self.blobs.iter().find(|b| &b.oid == oid)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// First entry of the attribute after the one holding `index`.
    pub fn next_attribute(&self, index: usize) -> Option<usize> {
        let current = self.entries.get(index)?.attribute_id;
        (index + 1..self.entries.len()).find(|&i| self.entries[i].attribute_id != current)
    }

    /// First entry of the attribute before the one holding `index`.
    pub fn previous_attribute(&self, index: usize) -> Option<usize> {
        let current = self.entries.get(index)?.attribute_id;
        let prev = (0..index)
            .rev()
            .find(|&i| self.entries[i].attribute_id != current)?;
        Some(self.attribute_range(self.entries[prev].attribute_id).start)
    }

    /// Next entry within the same attribute.
    pub fn next_field(&self, index: usize) -> Option<usize> {
        let current = self.entries.get(index)?;
        self.entries
            .get(index + 1)
            .filter(|e| e.attribute_id == current.attribute_id)
            .map(|_| index + 1)
    }

    /// Previous entry within the same attribute.
    pub fn previous_field(&self, index: usize) -> Option<usize> {
        let current = self.entries.get(index)?;
        let prev = index.checked_sub(1)?;
        (self.entries[prev].attribute_id == current.attribute_id).then_some(prev)
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove one entry.
    pub fn delete_entry(&mut self, index: usize) -> Result<AttributeEntry> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| Error::internal("entry index out of range"))?;
        if entry.flags.locked {
            return Err(Error::permission(entry.field_id));
        }
        Ok(self.entries.remove(index))
    }

    /// Remove the entry for `field`/`sub_field`.
    pub fn delete_field(
        &mut self,
        field: CertInfo,
        sub_field: Option<CertInfo>,
    ) -> Result<AttributeEntry> {
        let index = self
            .find(field, sub_field)
            .ok_or_else(|| Error::not_found(field))?;
        self.delete_entry(index)
    }

    /// Remove every entry of an attribute. Nothing is removed if any entry
    /// is locked.
    pub fn delete_attribute(&mut self, attribute_id: CertInfo) -> Result<Vec<AttributeEntry>> {
        let range = self.attribute_range(attribute_id);
        if range.is_empty() {
            return Err(Error::not_found(attribute_id));
        }
        if self.entries[range.clone()].iter().any(|e| e.flags.locked) {
            return Err(Error::permission(attribute_id));
        }
        Ok(self.entries.drain(range).collect())
    }

    pub fn delete_blob(&mut self, oid: &ObjectIdentifier) -> Result<BlobAttribute> {
        let pos = self
            .blobs
            .iter()
            .position(|b| &b.oid == oid)
            .ok_or(Error::attribute(
                ErrorKind::NotFound,
                None,
                ErrorType::AttrAbsent,
            ))?;
        if self.blobs[pos].flags.locked {
            return Err(Error::attribute(ErrorKind::Permission, None, ErrorType::None));
        }
        Ok(self.blobs.remove(pos))
    }
}
