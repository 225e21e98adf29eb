// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Table walker
//!
//! Replays the description table against the flat attribute list. Each
//! attribute's entries are matched row by row; the result is a tree of
//! [`Node`]s with the encoded size of every node already computed, which the
//! encoder then writes out without consulting the table again.
//!
//! Matching rules:
//! - a leaf row consumes the current entry if the field identifiers match,
//!   otherwise it is skipped when optional and an error when mandatory
//! - an optional or identifier-selected SEQUENCE is entered only if some
//!   row inside it matches the current entry
//! - a SET OF / SEQUENCE OF repeats its children while they keep matching
//! - a GeneralName row selects exactly one alternative from its sub-table
//! - a constructed item left empty is dropped unless a default-valued or
//!   non-encoding field inside it requires a zero-length encoding

extern crate alloc;

use alloc::vec::Vec;
use core::ops::Range;

use const_oid::ObjectIdentifier;

use super::encode;
use super::list::{AttributeEntry, AttributeList};
use super::table::{
    self, AttributeInfo, FieldId, FieldType, FL_IDENTIFIER, FL_NONEMPTY, FL_NONENCODING,
    FL_SETOF,
};
use super::CertInfo;
use crate::error::{Error, ErrorType, Result};

const MAX_NESTING_DEPTH: usize = 16;
const MAX_ITERATIONS: usize = 1000;

// ============================================================================
// Encoding tree
// ============================================================================

/// One node of an attribute's encoding tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Field value taken from the list entry at `entry`
    Leaf {
        entry: usize,
        row: &'static AttributeInfo,
        size: usize,
    },
    /// Value fixed by the table (an identifier OID)
    Fixed {
        row: &'static AttributeInfo,
        size: usize,
    },
    Sequence {
        row: &'static AttributeInfo,
        children: Vec<Node>,
        size: usize,
    },
    SetOf {
        row: &'static AttributeInfo,
        children: Vec<Node>,
        size: usize,
    },
}

impl Node {
    /// Encoded size including tag and length.
    pub fn size(&self) -> usize {
        match self {
            Node::Leaf { size, .. }
            | Node::Fixed { size, .. }
            | Node::Sequence { size, .. }
            | Node::SetOf { size, .. } => *size,
        }
    }

    pub fn row(&self) -> &'static AttributeInfo {
        match self {
            Node::Leaf { row, .. }
            | Node::Fixed { row, .. }
            | Node::Sequence { row, .. }
            | Node::SetOf { row, .. } => row,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Sequence { children, .. } | Node::SetOf { children, .. } => children,
            _ => &[],
        }
    }
}

/// A validated attribute ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAttribute {
    pub attribute_id: CertInfo,
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// Indices of the attribute's entries in the list
    pub entries: Range<usize>,
    pub nodes: Vec<Node>,
    /// Length of the attribute value (the encoded nodes)
    pub payload_len: usize,
}

// ============================================================================
// Walker
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Scope {
    Top,
    /// Inside the GeneralName sub-table of the given field
    Sub(CertInfo),
}

#[derive(Default)]
struct Level {
    nodes: Vec<Node>,
    keep_empty: bool,
}

struct Walker<'a> {
    entries: &'a [AttributeEntry],
    base: usize,
    pos: usize,
    iterations: usize,
    attribute_id: CertInfo,
    defaults: Vec<usize>,
}

impl<'a> Walker<'a> {
    fn current(&self) -> Option<&'a AttributeEntry> {
        self.entries.get(self.pos)
    }

    fn matches(&self, row: &AttributeInfo, scope: Scope) -> bool {
        let (entry, field) = match (self.current(), row.field()) {
            (Some(entry), Some(field)) => (entry, field),
            _ => return false,
        };
        match scope {
            Scope::Top => entry.field_id == field,
            Scope::Sub(parent) => entry.field_id == parent && entry.sub_field_id == Some(field),
        }
    }

    fn span_matches(&self, rows: &[AttributeInfo], scope: Scope) -> bool {
        rows.iter().any(|row| self.matches(row, scope))
    }

    fn tick(&mut self) -> Result<()> {
        self.iterations += 1;
        if self.iterations > MAX_ITERATIONS {
            return Err(Error::overflow(Some(self.attribute_id)));
        }
        Ok(())
    }

    fn walk_items(
        &mut self,
        rows: &'static [AttributeInfo],
        range: Range<usize>,
        scope: Scope,
        depth: usize,
    ) -> Result<Level> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::overflow(Some(self.attribute_id)));
        }

        let mut level = Level::default();
        let mut i = range.start;
        while i < range.end {
            self.tick()?;
            let row = &rows[i];

            if row.is_constructed() {
                let end = table::find_item_end(rows, i).min(range.end - 1);
                if let Some(node) = self.walk_constructed(rows, i, end, scope, depth)? {
                    level.nodes.push(node);
                }
                i = end + 1;
                continue;
            }

            let field = match row.field_id {
                FieldId::Id(field) => field,
                _ => {
                    if row.field_type == FieldType::Identifier {
                        if let Some(oid) = row.oid {
                            let size = encode::sizeof_oid(&oid)?;
                            level.nodes.push(Node::Fixed { row, size });
                        }
                    } else if row.has_flag(FL_NONENCODING) {
                        level.keep_empty = true;
                    }
                    i += 1;
                    continue;
                }
            };

            // Skip past any alternate encodings of the same field
            let mut last = i;
            while last + 1 < range.end && rows[last + 1].field_id == row.field_id {
                last += 1;
            }

            if self.matches(row, scope) {
                if row.field_type == FieldType::Subtyped {
                    let sub_table = row
                        .sub_table()
                        .ok_or_else(|| Error::internal("GeneralName row without sub-table"))?;
                    let nodes = self.walk_choice(sub_table, field, depth + 1)?;
                    level.nodes.extend(nodes);
                } else {
                    let row = self.alternate_for(&rows[i..=last]);
                    self.walk_leaf(row, field, &mut level)?;
                }
            } else if !row.is_optional() {
                log::trace!("mandatory field {:?} absent", field);
                return Err(Error::not_initialized(Some(field), ErrorType::AttrAbsent));
            }
            i = last + 1;
        }
        Ok(level)
    }

    fn walk_constructed(
        &mut self,
        rows: &'static [AttributeInfo],
        start: usize,
        end: usize,
        scope: Scope,
        depth: usize,
    ) -> Result<Option<Node>> {
        let row = &rows[start];
        let inner = start + 1..end + 1;

        if (row.is_optional() || row.has_flag(FL_IDENTIFIER))
            && !self.span_matches(&rows[inner.clone()], scope)
        {
            return Ok(None);
        }

        let mut children = Vec::new();
        let mut keep_empty = false;
        loop {
            let before = self.pos;
            let level = self.walk_items(rows, inner.clone(), scope, depth + 1)?;
            children.extend(level.nodes);
            keep_empty |= level.keep_empty;
            if !row.has_flag(FL_SETOF)
                || self.pos == before
                || !self.span_matches(&rows[inner.clone()], scope)
            {
                break;
            }
            self.tick()?;
        }

        if children.is_empty() && !keep_empty {
            if row.has_flag(FL_NONEMPTY) {
                return Err(Error::not_initialized(
                    Some(self.attribute_id),
                    ErrorType::AttrAbsent,
                ));
            }
            log::trace!("eliding empty {}", row.description);
            return Ok(None);
        }

        let content_len: usize = children.iter().map(Node::size).sum();
        let size = encode::sizeof_constructed(row, content_len)?;
        let node = if row.has_flag(FL_SETOF) {
            Node::SetOf {
                row,
                children,
                size,
            }
        } else {
            Node::Sequence {
                row,
                children,
                size,
            }
        };
        Ok(Some(node))
    }

    /// Row among alternate encodings of one field that matches the stored
    /// entry's type, or the preferred (first) one.
    fn alternate_for(&self, alternates: &'static [AttributeInfo]) -> &'static AttributeInfo {
        let field_type = self.current().map(|entry| entry.field_type);
        alternates
            .iter()
            .find(|row| Some(row.field_type) == field_type)
            .unwrap_or(&alternates[0])
    }

    fn walk_leaf(
        &mut self,
        row: &'static AttributeInfo,
        field: CertInfo,
        level: &mut Level,
    ) -> Result<()> {
        let index = self.pos;
        let entries = self.entries;
        let entry = &entries[index];
        row.check_value(&entry.value)
            .map_err(|error_type| Error::invalid(Some(field), error_type))?;
        self.pos += 1;

        if row.is_default(&entry.value) {
            self.defaults.push(self.base + index);
            level.keep_empty = true;
            return Ok(());
        }
        let size = encode::sizeof_field(row, &entry.value)?;
        level.nodes.push(Node::Leaf {
            entry: self.base + index,
            row,
            size,
        });
        Ok(())
    }

    /// Select the one GeneralName alternative the current entry belongs to.
    fn walk_choice(
        &mut self,
        sub_table: &'static [AttributeInfo],
        parent: CertInfo,
        depth: usize,
    ) -> Result<Vec<Node>> {
        let scope = Scope::Sub(parent);
        let mut i = 0;
        while i < sub_table.len() {
            self.tick()?;
            let end = table::find_item_end(sub_table, i);
            if self.span_matches(&sub_table[i..=end], scope) {
                return Ok(self.walk_items(sub_table, i..end + 1, scope, depth)?.nodes);
            }
            i = end + 1;
        }
        Err(Error::invalid(Some(parent), ErrorType::AttrValue))
    }
}

/// Walk one attribute, returning its tree and the indices of entries that
/// held their default value.
fn walk_attribute(
    list: &AttributeList,
    attribute_id: CertInfo,
) -> Result<(EncodedAttribute, Vec<usize>)> {
    let table = list.table();
    let start = table::attribute_start(table, attribute_id)
        .ok_or_else(|| Error::internal("attribute missing from table"))?;
    let end = table::attribute_end(table, start);
    let oid = table[start]
        .oid
        .ok_or_else(|| Error::internal("attribute row without OID"))?;
    let range = list.attribute_range(attribute_id);

    let mut walker = Walker {
        entries: &list.entries()[range.clone()],
        base: range.start,
        pos: 0,
        iterations: 0,
        attribute_id,
        defaults: Vec::new(),
    };
    log::trace!("walking {}", table[start].description);
    let level = walker.walk_items(table, start..end + 1, Scope::Top, 0)?;

    if let Some(entry) = walker.current() {
        return Err(Error::invalid(
            Some(entry.sub_field_id.unwrap_or(entry.field_id)),
            ErrorType::AttrPresent,
        ));
    }

    let payload_len = level.nodes.iter().map(Node::size).sum();
    let encoded = EncodedAttribute {
        attribute_id,
        oid,
        critical: list.is_critical(attribute_id),
        entries: range,
        nodes: level.nodes,
        payload_len,
    };
    Ok((encoded, walker.defaults))
}

/// Check every attribute in `list` against the table and build the
/// encoding trees.
///
/// `valid_mask` holds the `VALID_*` bits of the owning object type. An
/// attribute that isn't valid for it is rejected. The walk records which
/// entries held default values and may be re-run at any time.
pub fn check_attributes(list: &mut AttributeList, valid_mask: u16) -> Result<Vec<EncodedAttribute>> {
    for entry in list.entries_mut() {
        entry.flags.default_applied = false;
    }

    let table = list.table();
    let mut encoded = Vec::new();
    let mut defaults = Vec::new();
    for attribute_id in list.attribute_ids() {
        let start = table::attribute_start(table, attribute_id)
            .ok_or_else(|| Error::internal("attribute missing from table"))?;
        if table[start].valid & valid_mask == 0 {
            return Err(Error::invalid(Some(attribute_id), ErrorType::AttrPresent));
        }
        let (attribute, attribute_defaults) = walk_attribute(list, attribute_id)?;
        encoded.push(attribute);
        defaults.extend(attribute_defaults);
    }

    for index in defaults {
        if let Some(entry) = list.entry_mut(index) {
            entry.flags.default_applied = true;
        }
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::decode::add_attribute_field;
    use crate::attr::table::{TableKind, VALID_CERT, VALID_CRL};
    use crate::attr::AttributeValue;
    use crate::error::ErrorKind;

    fn extensions() -> AttributeList {
        AttributeList::new(TableKind::Extensions)
    }

    fn add(list: &mut AttributeList, field: CertInfo, sub: Option<CertInfo>, value: AttributeValue) {
        add_attribute_field(list, field, sub, value).unwrap();
    }

    #[test]
    fn test_basic_constraints_tree() {
        let mut list = extensions();
        add(&mut list, CertInfo::Ca, None, AttributeValue::Boolean(true));
        add(&mut list, CertInfo::PathLenConstraint, None, AttributeValue::Integer(1));

        let encoded = check_attributes(&mut list, VALID_CERT).unwrap();
        assert_eq!(encoded.len(), 1);
        let attr = &encoded[0];
        assert_eq!(attr.oid, table::EXTENSION_INFO[attr_start(CertInfo::BasicConstraints)].oid.unwrap());
        assert!(attr.critical);
        // SEQUENCE { BOOLEAN TRUE, INTEGER 1 }
        assert_eq!(attr.nodes.len(), 1);
        assert_eq!(attr.nodes[0].children().len(), 2);
        assert_eq!(attr.payload_len, 8);
    }

    fn attr_start(id: CertInfo) -> usize {
        table::attribute_start(table::EXTENSION_INFO, id).unwrap()
    }

    #[test]
    fn test_default_keeps_empty_sequence() {
        let mut list = extensions();
        add(&mut list, CertInfo::Ca, None, AttributeValue::Boolean(false));

        let encoded = check_attributes(&mut list, VALID_CERT).unwrap();
        assert_eq!(encoded[0].nodes.len(), 1);
        assert!(encoded[0].nodes[0].children().is_empty());
        assert_eq!(encoded[0].payload_len, 2);
        assert!(list.entries()[0].flags.default_applied);

        // idempotent
        let again = check_attributes(&mut list, VALID_CERT).unwrap();
        assert_eq!(again, encoded);
    }

    #[test]
    fn test_set_of_general_names() {
        let mut list = extensions();
        let dns = |s: &str| AttributeValue::Text(s.into());
        add(&mut list, CertInfo::SubjectAltName, Some(CertInfo::DnsName), dns("a.example.com"));
        add(&mut list, CertInfo::SubjectAltName, Some(CertInfo::DnsName), dns("b.example.com"));
        add(
            &mut list,
            CertInfo::SubjectAltName,
            Some(CertInfo::Rfc822Name),
            dns("user@example.com"),
        );

        let encoded = check_attributes(&mut list, VALID_CERT).unwrap();
        let root = &encoded[0].nodes[0];
        assert!(matches!(root, Node::SetOf { .. }));
        assert_eq!(root.children().len(), 3);
    }

    #[test]
    fn test_identifier_groups() {
        let mut list = extensions();
        add(
            &mut list,
            CertInfo::AuthorityInfoOcsp,
            Some(CertInfo::UniformResourceIdentifier),
            AttributeValue::Text("http://ocsp.example.com".into()),
        );

        let encoded = check_attributes(&mut list, VALID_CERT).unwrap();
        let root = &encoded[0].nodes[0];
        // only the ocsp accessDescription is present
        assert_eq!(root.children().len(), 1);
        let description = &root.children()[0];
        assert!(matches!(description.children()[0], Node::Fixed { .. }));
        assert!(matches!(description.children()[1], Node::Leaf { .. }));
    }

    #[test]
    fn test_policy_without_qualifiers() {
        let mut list = extensions();
        add(
            &mut list,
            CertInfo::CertPolicyId,
            None,
            AttributeValue::Oid(ObjectIdentifier::new_unwrap("1.2.3.4")),
        );

        let encoded = check_attributes(&mut list, VALID_CERT).unwrap();
        let policy_information = &encoded[0].nodes[0].children()[0];
        assert_eq!(policy_information.children().len(), 1);
    }

    #[test]
    fn test_missing_mandatory_field() {
        let mut list = extensions();
        add(
            &mut list,
            CertInfo::IssuerDomainPolicy,
            None,
            AttributeValue::Oid(ObjectIdentifier::new_unwrap("1.2.3.4")),
        );

        let err = check_attributes(&mut list, VALID_CERT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        assert_eq!(err.locus(), Some(CertInfo::SubjectDomainPolicy));
        assert_eq!(err.error_type(), ErrorType::AttrAbsent);
    }

    #[test]
    fn test_attribute_not_valid_for_object() {
        let mut list = extensions();
        add(&mut list, CertInfo::KeyUsage, None, AttributeValue::Integer(1));

        let err = check_attributes(&mut list, VALID_CRL).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.locus(), Some(CertInfo::KeyUsage));
        assert_eq!(err.error_type(), ErrorType::AttrPresent);
    }
}
