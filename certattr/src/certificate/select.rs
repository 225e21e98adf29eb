// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! DN and GeneralName selection.
//!
//! A DN is read or written through a selection: the subject DN, the issuer
//! DN, or a `directoryName` inside a GeneralName-valued extension field. The
//! in-extension part of the selection is derived from the attribute cursor
//! every time the cursor moves, so it can't go stale.
//!
//! Selecting a DN inside a GeneralName that doesn't exist yet creates
//! nothing. The selection is recorded as pending, and the first DN
//! component written creates the field and moves the cursor onto it.

extern crate alloc;

use alloc::string::String;
use core::ops::Range;

use const_oid::ObjectIdentifier;

use super::name::Name;
use super::CertObject;
use crate::attr::decode::add_attribute_field;
use crate::attr::table::{self, FieldType};
use crate::attr::{AttributeEntry, AttributeList, AttributeValue, CertInfo};
use crate::error::{Error, ErrorKind, ErrorType, NameError, Result};

/// How a selection treats an absent target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Probe; an absent GeneralName is remembered for later creation
    MayBeAbsent,
    /// Probe and fail if absent
    MustBePresent,
    /// Probe and create on first write if absent
    CreateIfAbsent,
}

/// The DN reads and writes go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnSelection {
    Subject,
    Issuer,
    /// `directoryName` inside the given GeneralName field
    GeneralName(CertInfo),
}

/// Cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    First,
    Last,
    Next,
    Previous,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Selection {
    dn: Option<DnSelection>,
    /// GeneralName field selected while absent
    saved_general_name: Option<CertInfo>,
    /// The DN selection waits for its field to be created
    update_cursor: bool,
}

impl Selection {
    /// Drop selections that would create something.
    pub(crate) fn clear_saved(&mut self) {
        self.saved_general_name = None;
        if self.update_cursor {
            self.dn = None;
            self.update_cursor = false;
        }
    }
}

fn is_general_name_field(list: &AttributeList, field: CertInfo) -> bool {
    table::field_id_to_attribute(list.table(), field, None)
        .map(|location| location.row.field_type == FieldType::Subtyped)
        .unwrap_or(false)
}

fn dn_locus(selection: DnSelection) -> CertInfo {
    match selection {
        DnSelection::Subject => CertInfo::SubjectName,
        DnSelection::Issuer => CertInfo::IssuerName,
        DnSelection::GeneralName(_) => CertInfo::DirectoryName,
    }
}

impl CertObject {
    // ========================================================================
    // Selection
    // ========================================================================

    /// Select the subject DN, the issuer DN, or (with `DirectoryName`) the
    /// DN inside the currently selected GeneralName.
    pub fn select_dn(&mut self, which: CertInfo, mode: SelectionMode) -> Result<()> {
        let selection = match which {
            CertInfo::SubjectName => DnSelection::Subject,
            CertInfo::IssuerName if self.issuer_aliases_subject() => DnSelection::Subject,
            CertInfo::IssuerName => DnSelection::Issuer,
            CertInfo::DirectoryName => return self.select_general_name_dn(mode),
            _ => return Err(Error::arg_value(which)),
        };
        log::trace!("select_dn: {:?}", selection);
        self.selection.dn = Some(selection);
        self.selection.update_cursor = false;
        Ok(())
    }

    /// Select a GeneralName-valued field such as subjectAltName.
    ///
    /// A present field moves the cursor to its first entry. An absent one
    /// is remembered so a following [`CertObject::select_dn`] can create a
    /// DN in it, unless the object is signed or the mode requires presence.
    pub fn select_general_name(&mut self, field: CertInfo, mode: SelectionMode) -> Result<()> {
        if !is_general_name_field(&self.attributes, field) {
            return Err(Error::arg_value(field));
        }
        self.owning_attribute(field, None)?;

        if let Some(index) = self.attributes.find_first_field_of(field) {
            log::trace!("select_general_name: {:?} at entry {}", field, index);
            self.selection.saved_general_name = None;
            self.selection.update_cursor = false;
            self.cursor = Some(index);
            self.derive_selection();
            return Ok(());
        }
        if mode == SelectionMode::MustBePresent || self.flags.signed {
            return Err(Error::not_found(field));
        }
        log::trace!("select_general_name: {:?} absent, saved", field);
        self.selection.saved_general_name = Some(field);
        Ok(())
    }

    fn select_general_name_dn(&mut self, mode: SelectionMode) -> Result<()> {
        let cursor_entry = self.cursor.and_then(|index| self.attributes.entry(index));
        let field = match (self.selection.saved_general_name, cursor_entry) {
            (Some(field), _) => field,
            (None, Some(entry)) if is_general_name_field(&self.attributes, entry.field_id) => {
                entry.field_id
            }
            _ => {
                return Err(Error::not_initialized(
                    Some(CertInfo::DirectoryName),
                    ErrorType::AttrAbsent,
                ))
            }
        };

        let existing = match cursor_entry {
            Some(entry)
                if entry.field_id == field
                    && entry.sub_field_id == Some(CertInfo::DirectoryName) =>
            {
                self.cursor
            }
            _ => self.attributes.find(field, Some(CertInfo::DirectoryName)),
        };
        if let Some(index) = existing {
            self.selection.saved_general_name = None;
            self.selection.update_cursor = false;
            self.cursor = Some(index);
            self.derive_selection();
            return Ok(());
        }

        if mode != SelectionMode::CreateIfAbsent {
            return Err(Error::not_found(CertInfo::DirectoryName));
        }
        self.ensure_mutable(CertInfo::DirectoryName)?;
        log::trace!("select_dn: directoryName in {:?} deferred", field);
        self.selection.saved_general_name = None;
        self.selection.dn = Some(DnSelection::GeneralName(field));
        self.selection.update_cursor = true;
        Ok(())
    }

    /// The current DN selection.
    pub fn dn_selection(&self) -> Option<DnSelection> {
        self.selection.dn
    }

    /// True while a DN selection waits for its GeneralName to be created.
    pub fn is_selection_pending(&self) -> bool {
        self.selection.update_cursor
    }

    // ========================================================================
    // DN access
    // ========================================================================

    fn dn_target(&self) -> Result<DnSelection> {
        self.selection
            .dn
            .ok_or(Error::NameError(NameError::NoSelection))
    }

    fn selected_entry_index(&self, field: CertInfo) -> Option<usize> {
        let index = self.cursor?;
        let entry = self.attributes.entry(index)?;
        (entry.field_id == field && entry.sub_field_id == Some(CertInfo::DirectoryName))
            .then_some(index)
    }

    /// The selected DN.
    pub fn selected_dn(&self) -> Result<&Name> {
        match self.dn_target()? {
            DnSelection::Subject => Ok(&self.subject),
            DnSelection::Issuer => Ok(self.issuer()),
            DnSelection::GeneralName(field) => self
                .selected_entry_index(field)
                .filter(|_| !self.selection.update_cursor)
                .and_then(|index| self.attributes.entry(index))
                .and_then(|entry| entry.value.as_name())
                .ok_or(Error::not_found(CertInfo::DirectoryName)),
        }
    }

    /// Text of one component of the selected DN.
    pub fn dn_component(&self, oid: ObjectIdentifier) -> Result<String> {
        let locus = dn_locus(self.dn_target()?);
        self.selected_dn()?
            .component(oid)
            .ok_or(Error::not_found(locus))
    }

    /// Add a component to the selected DN, creating a pending in-extension
    /// DN on first use.
    pub fn add_dn_component(&mut self, oid: ObjectIdentifier, value: &str) -> Result<()> {
        let target = self.dn_target()?;
        self.ensure_mutable(dn_locus(target))?;
        match target {
            DnSelection::Subject => self.subject.add_component(oid, value),
            DnSelection::Issuer => self.issuer.add_component(oid, value),
            DnSelection::GeneralName(field) if self.selection.update_cursor => {
                let mut name = Name::new();
                name.add_component(oid, value)?;
                let index = add_attribute_field(
                    &mut self.attributes,
                    field,
                    Some(CertInfo::DirectoryName),
                    AttributeValue::Name(name),
                )?;
                self.entry_inserted(index);
                self.cursor = Some(index);
                self.selection.update_cursor = false;
                self.derive_selection();
                log::trace!("add_dn_component: created directoryName at entry {}", index);
                Ok(())
            }
            DnSelection::GeneralName(field) => self.selected_name_mut(field)?.add_component(oid, value),
        }
    }

    /// Remove a component from the selected DN.
    pub fn delete_dn_component(&mut self, oid: ObjectIdentifier) -> Result<()> {
        let target = self.dn_target()?;
        self.ensure_mutable(dn_locus(target))?;
        match target {
            DnSelection::Subject => self.subject.delete_component(oid),
            DnSelection::Issuer => self.issuer.delete_component(oid),
            DnSelection::GeneralName(field) => self.selected_name_mut(field)?.delete_component(oid),
        }
    }

    fn selected_name_mut(&mut self, field: CertInfo) -> Result<&mut Name> {
        let index = self
            .selected_entry_index(field)
            .ok_or(Error::not_found(CertInfo::DirectoryName))?;
        let entry = self
            .attributes
            .entry_mut(index)
            .ok_or_else(|| Error::internal("cursor out of range"))?;
        if entry.flags.locked {
            return Err(Error::permission(field));
        }
        entry
            .value
            .as_name_mut()
            .ok_or(Error::not_found(CertInfo::DirectoryName))
    }

    // ========================================================================
    // Attribute cursor
    // ========================================================================

    /// The entry under the cursor.
    pub fn cursor_entry(&self) -> Result<&AttributeEntry> {
        self.cursor
            .and_then(|index| self.attributes.entry(index))
            .ok_or(Error::not_initialized(None, ErrorType::None))
    }

    /// Move the cursor to the first entry of a field, or of an attribute
    /// when given an attribute identifier.
    pub fn set_cursor(&mut self, field: CertInfo) -> Result<()> {
        let index = match self.attributes.find_first_field_of(field) {
            Some(index) => index,
            None => {
                let range = self.attributes.attribute_range(field);
                if range.is_empty() {
                    return Err(Error::not_found(field));
                }
                range.start
            }
        };
        self.cursor = Some(index);
        self.derive_selection();
        Ok(())
    }

    /// Move the cursor by whole attributes.
    pub fn move_attribute_cursor(&mut self, movement: CursorMove) -> Result<()> {
        let list = &self.attributes;
        let index = match (movement, self.cursor) {
            (CursorMove::First, _) => (!list.is_empty()).then_some(0),
            (CursorMove::Last, _) => list
                .entries()
                .last()
                .map(|entry| list.attribute_range(entry.attribute_id).start),
            (CursorMove::Next, Some(index)) => list.next_attribute(index),
            (CursorMove::Previous, Some(index)) => list.previous_attribute(index),
            (_, None) => return Err(Error::not_initialized(None, ErrorType::None)),
        };
        self.move_cursor_to(index)
    }

    /// Move the cursor between the fields of the current attribute.
    pub fn move_field_cursor(&mut self, movement: CursorMove) -> Result<()> {
        let list = &self.attributes;
        let current = self
            .cursor
            .filter(|&index| index < list.len())
            .ok_or(Error::not_initialized(None, ErrorType::None))?;
        let range = list.attribute_range(list.entries()[current].attribute_id);
        let index = match movement {
            CursorMove::First => Some(range.start),
            CursorMove::Last => range.end.checked_sub(1),
            CursorMove::Next => list.next_field(current),
            CursorMove::Previous => list.previous_field(current),
        };
        self.move_cursor_to(index)
    }

    fn move_cursor_to(&mut self, index: Option<usize>) -> Result<()> {
        let index = index.ok_or(Error::attribute(
            ErrorKind::NotFound,
            None,
            ErrorType::AttrAbsent,
        ))?;
        log::trace!("cursor moved to entry {}", index);
        self.cursor = Some(index);
        self.derive_selection();
        Ok(())
    }

    // ========================================================================
    // Keeping the selection consistent
    // ========================================================================

    /// Recompute the in-extension part of the selection from the cursor.
    pub(crate) fn derive_selection(&mut self) {
        let entry = self.cursor.and_then(|index| self.attributes.entry(index));
        let selection = &mut self.selection;
        match entry {
            Some(entry) if entry.sub_field_id == Some(CertInfo::DirectoryName) => {
                selection.dn = Some(DnSelection::GeneralName(entry.field_id));
                selection.saved_general_name = None;
                selection.update_cursor = false;
            }
            _ => {
                if matches!(selection.dn, Some(DnSelection::GeneralName(_)))
                    && !selection.update_cursor
                {
                    selection.dn = None;
                }
                if entry.is_some_and(|e| is_general_name_field(&self.attributes, e.field_id)) {
                    selection.saved_general_name = None;
                }
            }
        }
    }

    pub(crate) fn entry_inserted(&mut self, index: usize) {
        if let Some(cursor) = self.cursor.as_mut() {
            if *cursor >= index {
                *cursor += 1;
            }
        }
    }

    pub(crate) fn entries_removed(&mut self, range: Range<usize>) {
        self.cursor = match self.cursor {
            Some(cursor) if range.contains(&cursor) => None,
            Some(cursor) if cursor >= range.end => Some(cursor - range.len()),
            other => other,
        };
        self.derive_selection();
    }
}
