/*
Copyright (c) 2021 VMware, Inc.
SPDX-License-Identifier: MIT
Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:
The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.
THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Ingests a P4Info document into an indexed, validated in-memory schema
//! (tables, match fields, actions, params), deriving each field's
//! [`Format`](crate::value::Format) along the way.

use std::collections::HashMap;

use tracing::debug;

use crate::annotation::parse_annotation;
use crate::error::{P4Error, Result};
use crate::value::Format;

/// Named P4 types that force `STRING` format regardless of any
/// `@format` annotation.
const SDN_STRING_TYPES: &[&str] = &[
    "router_interface_id_t",
    "neighbor_id_t",
    "nexthop_id_t",
    "wcmp_group_id_t",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Lpm,
    Ternary,
    Optional,
    Range,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeterUnit {
    Bytes,
    Packets,
    Both,
}

/// A reference from a match field or action parameter to another
/// table's match field, used to order writes in [`crate::sequencing`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub match_field: String,
}

/// Raw schema input: the subset of a P4Info document this crate reads.
/// Constructing an [`InfoManager`] from one of these performs all of
/// this crate's schema validation.
#[derive(Clone, Debug, Default)]
pub struct P4InfoInput {
    pub tables: Vec<TableInput>,
    pub actions: Vec<ActionInput>,
    pub packet_in_metadata: Vec<PacketMetadataInput>,
    pub packet_out_metadata: Vec<PacketMetadataInput>,
}

#[derive(Clone, Debug)]
pub struct MatchFieldInput {
    pub id: u32,
    pub name: String,
    pub bitwidth: u32,
    pub match_type: MatchKind,
    pub annotations: Vec<String>,
    pub type_name: Option<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Clone, Debug)]
pub struct ActionParamInput {
    pub id: u32,
    pub name: String,
    pub bitwidth: u32,
    pub annotations: Vec<String>,
    pub type_name: Option<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Clone, Debug)]
pub struct ActionInput {
    pub id: u32,
    pub name: String,
    pub alias: String,
    pub params: Vec<ActionParamInput>,
}

#[derive(Clone, Debug)]
pub struct TableInput {
    pub id: u32,
    pub name: String,
    pub alias: String,
    pub match_fields: Vec<MatchFieldInput>,
    pub action_ids: Vec<u32>,
    pub size: u64,
    pub meter: Option<MeterUnit>,
    pub counter: Option<MeterUnit>,
    pub uses_oneshot: bool,
}

#[derive(Clone, Debug)]
pub struct PacketMetadataInput {
    pub id: u32,
    pub name: String,
    pub bitwidth: u32,
    pub annotations: Vec<String>,
    pub type_name: Option<String>,
}

/// Computes the [`Format`] of a field from its annotations, bit-width,
/// and named type: at most one `@format` annotation is allowed, and a
/// recognized SDN-string named type forces `STRING`.
pub fn compute_format(annotations: &[String], bitwidth: u32, type_name: Option<&str>) -> Result<Format> {
    let is_sdn_string = type_name
        .map(|t| SDN_STRING_TYPES.contains(&t))
        .unwrap_or(false);
    let mut format = if is_sdn_string { Format::String } else { Format::HexString };
    let mut saw_format_annotation = false;

    for annotation in annotations {
        let parsed = match parse_annotation(annotation) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if parsed.label != "format" {
            continue;
        }
        if saw_format_annotation {
            return Err(P4Error::invalid_argument("Found conflicting formatting annotations"));
        }
        saw_format_annotation = true;
        if is_sdn_string {
            return Err(P4Error::invalid_argument(
                "Found conflicting formatting annotations: SDN string type with @format",
            ));
        }
        match parsed.body.as_deref() {
            Some("MAC_ADDRESS") => format = Format::Mac,
            Some("IPV4_ADDRESS") => format = Format::Ipv4,
            Some("IPV6_ADDRESS") => format = Format::Ipv6,
            _ => format = Format::HexString,
        }
    }

    format.validate_bitwidth(bitwidth)?;
    Ok(format)
}

#[derive(Clone, Debug)]
pub struct MatchFieldDef {
    pub id: u32,
    pub name: String,
    pub bitwidth: u32,
    pub match_type: MatchKind,
    pub format: Format,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Clone, Debug)]
pub struct ActionParamDef {
    pub id: u32,
    pub name: String,
    pub bitwidth: u32,
    pub format: Format,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Clone, Debug)]
pub struct ActionDef {
    pub id: u32,
    pub name: String,
    pub alias: String,
    pub params_by_id: HashMap<u32, ActionParamDef>,
    pub params_by_name: HashMap<String, u32>,
    pub param_order: Vec<u32>,
}

impl ActionDef {
    pub fn param_by_name(&self, name: &str) -> Option<&ActionParamDef> {
        self.params_by_name.get(name).and_then(|id| self.params_by_id.get(id))
    }

    pub fn ordered_params(&self) -> impl Iterator<Item = &ActionParamDef> {
        self.param_order.iter().map(move |id| &self.params_by_id[id])
    }
}

#[derive(Clone, Debug)]
pub struct TableDef {
    pub id: u32,
    pub name: String,
    pub alias: String,
    pub match_fields_by_id: HashMap<u32, MatchFieldDef>,
    pub match_fields_by_name: HashMap<String, u32>,
    pub action_ids: Vec<u32>,
    pub size: u64,
    pub meter: Option<MeterUnit>,
    pub counter: Option<MeterUnit>,
    pub uses_oneshot: bool,
    pub exact_match_count: usize,
    pub requires_priority: bool,
}

impl TableDef {
    pub fn match_field_by_name(&self, name: &str) -> Option<&MatchFieldDef> {
        self.match_fields_by_name.get(name).and_then(|id| self.match_fields_by_id.get(id))
    }

    pub fn allows_action(&self, action_id: u32) -> bool {
        self.action_ids.contains(&action_id)
    }
}

#[derive(Clone, Debug)]
pub struct PacketMetadataDef {
    pub id: u32,
    pub name: String,
    pub bitwidth: u32,
    pub format: Format,
}

/// The immutable, validated, indexed schema built from a [`P4InfoInput`].
#[derive(Clone, Debug, Default)]
pub struct InfoManager {
    pub tables_by_id: HashMap<u32, TableDef>,
    pub tables_by_name: HashMap<String, u32>,
    pub actions_by_id: HashMap<u32, ActionDef>,
    pub actions_by_name: HashMap<String, u32>,
    pub packet_in_by_id: HashMap<u32, PacketMetadataDef>,
    pub packet_in_by_name: HashMap<String, u32>,
    pub packet_out_by_id: HashMap<u32, PacketMetadataDef>,
    pub packet_out_by_name: HashMap<String, u32>,
}

impl InfoManager {
    pub fn build(info: &P4InfoInput) -> Result<Self> {
        let mut actions_by_id = HashMap::new();
        let mut actions_by_name = HashMap::new();

        for action in &info.actions {
            if actions_by_id.contains_key(&action.id) {
                return Err(P4Error::invalid_argument(format!(
                    "Duplicate action id {}",
                    action.id
                )));
            }
            if actions_by_name.contains_key(&action.name) {
                return Err(P4Error::invalid_argument(format!(
                    "Duplicate action name \"{}\"",
                    action.name
                )));
            }

            let mut params_by_id = HashMap::new();
            let mut params_by_name = HashMap::new();
            let mut param_order = Vec::new();
            for param in &action.params {
                if params_by_id.contains_key(&param.id) {
                    return Err(P4Error::invalid_argument(format!(
                        "Action \"{}\": duplicate param id {}",
                        action.name, param.id
                    )));
                }
                if params_by_name.contains_key(&param.name) {
                    return Err(P4Error::invalid_argument(format!(
                        "Action \"{}\": duplicate param name \"{}\"",
                        action.name, param.name
                    )));
                }
                let format = compute_format(&param.annotations, param.bitwidth, param.type_name.as_deref())
                    .map_err(|e| {
                        P4Error::invalid_argument(format!(
                            "Action \"{}\", param \"{}\": {}",
                            action.name, param.name, e.message
                        ))
                    })?;
                param_order.push(param.id);
                params_by_name.insert(param.name.clone(), param.id);
                params_by_id.insert(
                    param.id,
                    ActionParamDef {
                        id: param.id,
                        name: param.name.clone(),
                        bitwidth: param.bitwidth,
                        format,
                        foreign_keys: param.foreign_keys.clone(),
                    },
                );
            }

            actions_by_name.insert(action.name.clone(), action.id);
            actions_by_id.insert(
                action.id,
                ActionDef {
                    id: action.id,
                    name: action.name.clone(),
                    alias: action.alias.clone(),
                    params_by_id,
                    params_by_name,
                    param_order,
                },
            );
            debug!(action = %action.name, id = action.id, "indexed action");
        }

        let mut tables_by_id = HashMap::new();
        let mut tables_by_name = HashMap::new();

        for table in &info.tables {
            if tables_by_id.contains_key(&table.id) {
                return Err(P4Error::invalid_argument(format!(
                    "Duplicate table id {}",
                    table.id
                )));
            }
            if tables_by_name.contains_key(&table.name) {
                return Err(P4Error::invalid_argument(format!(
                    "Duplicate table name \"{}\"",
                    table.name
                )));
            }

            let mut match_fields_by_id = HashMap::new();
            let mut match_fields_by_name = HashMap::new();
            let mut exact_match_count = 0;
            let mut requires_priority = false;
            for mf in &table.match_fields {
                if match_fields_by_id.contains_key(&mf.id) {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\": duplicate match field id {}",
                        table.name, mf.id
                    )));
                }
                if match_fields_by_name.contains_key(&mf.name) {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\": duplicate match field name \"{}\"",
                        table.name, mf.name
                    )));
                }
                let format = compute_format(&mf.annotations, mf.bitwidth, mf.type_name.as_deref())
                    .map_err(|e| {
                        P4Error::invalid_argument(format!(
                            "Table \"{}\", match field \"{}\": {}",
                            table.name, mf.name, e.message
                        ))
                    })?;
                if mf.match_type == MatchKind::Exact {
                    exact_match_count += 1;
                }
                if matches!(mf.match_type, MatchKind::Ternary | MatchKind::Optional | MatchKind::Range) {
                    requires_priority = true;
                }
                match_fields_by_name.insert(mf.name.clone(), mf.id);
                match_fields_by_id.insert(
                    mf.id,
                    MatchFieldDef {
                        id: mf.id,
                        name: mf.name.clone(),
                        bitwidth: mf.bitwidth,
                        match_type: mf.match_type,
                        format,
                        foreign_keys: mf.foreign_keys.clone(),
                    },
                );
            }

            for action_id in &table.action_ids {
                if !actions_by_id.contains_key(action_id) {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\" references undefined action id {}",
                        table.name, action_id
                    )));
                }
            }

            tables_by_name.insert(table.name.clone(), table.id);
            tables_by_id.insert(
                table.id,
                TableDef {
                    id: table.id,
                    name: table.name.clone(),
                    alias: table.alias.clone(),
                    match_fields_by_id,
                    match_fields_by_name,
                    action_ids: table.action_ids.clone(),
                    size: table.size,
                    meter: table.meter,
                    counter: table.counter,
                    uses_oneshot: table.uses_oneshot,
                    exact_match_count,
                    requires_priority,
                },
            );
            debug!(table = %table.name, id = table.id, "indexed table");
        }

        let (packet_in_by_id, packet_in_by_name) = Self::index_packet_metadata(&info.packet_in_metadata)?;
        let (packet_out_by_id, packet_out_by_name) = Self::index_packet_metadata(&info.packet_out_metadata)?;

        Ok(InfoManager {
            tables_by_id,
            tables_by_name,
            actions_by_id,
            actions_by_name,
            packet_in_by_id,
            packet_in_by_name,
            packet_out_by_id,
            packet_out_by_name,
        })
    }

    fn index_packet_metadata(
        metadata: &[PacketMetadataInput],
    ) -> Result<(HashMap<u32, PacketMetadataDef>, HashMap<String, u32>)> {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for m in metadata {
            if by_id.contains_key(&m.id) {
                return Err(P4Error::invalid_argument(format!(
                    "Duplicate packet metadata id {}",
                    m.id
                )));
            }
            if by_name.contains_key(&m.name) {
                return Err(P4Error::invalid_argument(format!(
                    "Duplicate packet metadata name \"{}\"",
                    m.name
                )));
            }
            let format = compute_format(&m.annotations, m.bitwidth, m.type_name.as_deref())?;
            by_name.insert(m.name.clone(), m.id);
            by_id.insert(
                m.id,
                PacketMetadataDef {
                    id: m.id,
                    name: m.name.clone(),
                    bitwidth: m.bitwidth,
                    format,
                },
            );
        }
        Ok((by_id, by_name))
    }

    pub fn table_by_name(&self, name: &str) -> Result<&TableDef> {
        let id = self
            .tables_by_name
            .get(name)
            .ok_or_else(|| P4Error::not_found(format!("Table \"{}\" not found", name)))?;
        Ok(&self.tables_by_id[id])
    }

    pub fn action_by_name(&self, name: &str) -> Result<&ActionDef> {
        let id = self
            .actions_by_name
            .get(name)
            .ok_or_else(|| P4Error::not_found(format!("Action \"{}\" not found", name)))?;
        Ok(&self.actions_by_id[id])
    }

    pub fn table_by_id(&self, id: u32) -> Result<&TableDef> {
        self.tables_by_id
            .get(&id)
            .ok_or_else(|| P4Error::not_found(format!("Table id {} not found", id)))
    }

    pub fn action_by_id(&self, id: u32) -> Result<&ActionDef> {
        self.actions_by_id
            .get(&id)
            .ok_or_else(|| P4Error::not_found(format!("Action id {} not found", id)))
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    /// A minimal P4Info used throughout this crate's tests: three
    /// tables, `id_test_table`, `ternary_table`, and `lpm1_table`.
    pub fn seed_info() -> P4InfoInput {
        let do_thing_1 = ActionInput {
            id: 16777217,
            name: "do_thing_1".to_string(),
            alias: "do_thing_1".to_string(),
            params: vec![
                ActionParamInput {
                    id: 1,
                    name: "arg1".to_string(),
                    bitwidth: 32,
                    annotations: vec![],
                    type_name: None,
                    foreign_keys: vec![],
                },
                ActionParamInput {
                    id: 2,
                    name: "arg2".to_string(),
                    bitwidth: 32,
                    annotations: vec![],
                    type_name: None,
                    foreign_keys: vec![],
                },
            ],
        };
        let do_thing_3 = ActionInput {
            id: 16777219,
            name: "do_thing_3".to_string(),
            alias: "do_thing_3".to_string(),
            params: vec![],
        };
        let no_action = ActionInput {
            id: 21257015,
            name: "NoAction".to_string(),
            alias: "NoAction".to_string(),
            params: vec![],
        };

        let id_test_table = TableInput {
            id: 33554433,
            name: "id_test_table".to_string(),
            alias: "id_test_table".to_string(),
            match_fields: vec![
                MatchFieldInput {
                    id: 1,
                    name: "ipv6".to_string(),
                    bitwidth: 128,
                    match_type: MatchKind::Exact,
                    annotations: vec!["@format(IPV6_ADDRESS)".to_string()],
                    type_name: None,
                    foreign_keys: vec![],
                },
                MatchFieldInput {
                    id: 2,
                    name: "ipv4".to_string(),
                    bitwidth: 32,
                    match_type: MatchKind::Exact,
                    annotations: vec!["@format(IPV4_ADDRESS)".to_string()],
                    type_name: None,
                    foreign_keys: vec![],
                },
            ],
            action_ids: vec![16777217],
            size: 1024,
            meter: None,
            counter: None,
            uses_oneshot: false,
        };

        let ternary_table = TableInput {
            id: 33554435,
            name: "ternary_table".to_string(),
            alias: "ternary_table".to_string(),
            match_fields: vec![MatchFieldInput {
                id: 1,
                name: "normal".to_string(),
                bitwidth: 16,
                match_type: MatchKind::Ternary,
                annotations: vec![],
                type_name: None,
                foreign_keys: vec![],
            }],
            action_ids: vec![16777219],
            size: 1024,
            meter: None,
            counter: None,
            uses_oneshot: false,
        };

        let lpm1_table = TableInput {
            id: 33554436,
            name: "lpm1_table".to_string(),
            alias: "lpm1_table".to_string(),
            match_fields: vec![MatchFieldInput {
                id: 1,
                name: "ipv4".to_string(),
                bitwidth: 32,
                match_type: MatchKind::Lpm,
                annotations: vec!["@format(IPV4_ADDRESS)".to_string()],
                type_name: None,
                foreign_keys: vec![],
            }],
            action_ids: vec![21257015],
            size: 1024,
            meter: None,
            counter: None,
            uses_oneshot: false,
        };

        P4InfoInput {
            tables: vec![id_test_table, ternary_table, lpm1_table],
            actions: vec![do_thing_1, do_thing_3, no_action],
            packet_in_metadata: vec![],
            packet_out_metadata: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::seed_info;
    use super::*;

    #[test]
    fn builds_seed_info() {
        let info = InfoManager::build(&seed_info()).unwrap();
        assert_eq!(info.tables_by_id.len(), 3);
        assert_eq!(info.actions_by_id.len(), 3);
        let id_test_table = info.table_by_name("id_test_table").unwrap();
        assert_eq!(id_test_table.exact_match_count, 2);
        assert!(!id_test_table.requires_priority);
        let ternary_table = info.table_by_name("ternary_table").unwrap();
        assert!(ternary_table.requires_priority);
    }

    #[test]
    fn rejects_duplicate_table_id() {
        let mut info = seed_info();
        let mut dup = info.tables[0].clone();
        dup.name = "another_name".to_string();
        info.tables.push(dup);
        assert!(InfoManager::build(&info).is_err());
    }

    #[test]
    fn rejects_duplicate_table_name() {
        let mut info = seed_info();
        let mut dup = info.tables[0].clone();
        dup.id = 99999999;
        info.tables.push(dup);
        assert!(InfoManager::build(&info).is_err());
    }

    #[test]
    fn rejects_dangling_action_reference() {
        let mut info = seed_info();
        info.tables[0].action_ids.push(404);
        assert!(InfoManager::build(&info).is_err());
    }

    #[test]
    fn format_mac_requires_48_bits() {
        let err = compute_format(&["@format(MAC_ADDRESS)".to_string()], 32, None).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn format_rejects_conflicting_annotations() {
        let annotations = vec![
            "@format(MAC_ADDRESS)".to_string(),
            "@format(IPV4_ADDRESS)".to_string(),
        ];
        assert!(compute_format(&annotations, 48, None).is_err());
    }

    #[test]
    fn named_type_forces_string_format() {
        let format = compute_format(&[], 32, Some("nexthop_id_t")).unwrap();
        assert_eq!(format, Format::String);
    }
}
