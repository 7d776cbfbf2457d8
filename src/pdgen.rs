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

//! Emits the textual program-dependent schema for an info manager.
//! Tables, actions, and packet metadata are walked in ascending P4-id
//! order so the output is deterministic byte-for-byte for a given
//! `InfoManager`.

use std::fmt::Write as _;

use itertools::Itertools;

use crate::info::{InfoManager, MatchKind, MeterUnit, TableDef};
use crate::names::{p4_name_to_pd_message_name, p4_name_to_pd_field_name, EntityKind};

const COMMON_HELPERS: &str = "\
message Ternary {
  string value = 1;
  string mask = 2;
}

message Lpm {
  string value = 1;
  uint32 prefix_length = 2;
}

message Optional {
  string value = 1;
}

message BytesMeterConfig {
  int64 cir = 1;
  int64 cburst = 2;
}

message PacketsMeterConfig {
  int64 cir = 1;
  int64 cburst = 2;
}
";

fn sorted_tables(info: &InfoManager) -> Vec<&TableDef> {
    info.tables_by_id.values().sorted_by_key(|t| t.id).collect()
}

fn sorted_actions(info: &InfoManager) -> Vec<&crate::info::ActionDef> {
    info.actions_by_id.values().sorted_by_key(|a| a.id).collect()
}

fn write_match_message(out: &mut String, table: &TableDef) {
    let mut fields: Vec<&crate::info::MatchFieldDef> = table.match_fields_by_id.values().collect();
    fields.sort_by_key(|f| f.id);
    writeln!(out, "  message Match {{").unwrap();
    for field in fields {
        let field_name = p4_name_to_pd_field_name(&field.name, EntityKind::Action);
        let type_name = match field.match_type {
            MatchKind::Exact => "string".to_string(),
            MatchKind::Lpm => "Lpm".to_string(),
            MatchKind::Ternary => "Ternary".to_string(),
            MatchKind::Optional => "Optional".to_string(),
            MatchKind::Range => "Range".to_string(),
        };
        writeln!(out, "    {} {} = {};", type_name, field_name, field.id).unwrap();
    }
    writeln!(out, "  }}").unwrap();
}

fn write_action_message(out: &mut String, action: &crate::info::ActionDef) {
    let message_name = p4_name_to_pd_message_name(&action.name, EntityKind::Action);
    writeln!(out, "message {} {{", message_name).unwrap();
    for param in action.ordered_params() {
        writeln!(out, "  string {} = {};", param.name, param.id).unwrap();
    }
    writeln!(out, "}}\n").unwrap();
}

fn write_table_message(out: &mut String, info: &InfoManager, table: &TableDef) {
    let message_name = p4_name_to_pd_message_name(&table.name, EntityKind::Table);
    writeln!(out, "message {} {{", message_name).unwrap();
    write_match_message(out, table);
    writeln!(out, "  Match match = 1;").unwrap();

    let mut action_ids = table.action_ids.clone();
    action_ids.sort_unstable();
    writeln!(out, "  message Action {{").unwrap();
    writeln!(out, "    oneof action {{").unwrap();
    for (idx, action_id) in action_ids.iter().enumerate() {
        if let Ok(action) = info.action_by_id(*action_id) {
            let message_name = p4_name_to_pd_message_name(&action.name, EntityKind::Action);
            let field_name = p4_name_to_pd_field_name(&action.name, EntityKind::Action);
            writeln!(out, "      {} {} = {};", message_name, field_name, idx + 1).unwrap();
        }
    }
    writeln!(out, "    }}").unwrap();
    writeln!(out, "  }}").unwrap();

    if table.uses_oneshot {
        writeln!(out, "  repeated ActionSetMember actions = 2;").unwrap();
    } else {
        writeln!(out, "  Action action = 2;").unwrap();
    }

    if table.requires_priority {
        writeln!(out, "  int32 priority = 3;").unwrap();
    }

    if let Some(unit) = table.meter {
        let type_name = match unit {
            MeterUnit::Packets => "PacketsMeterConfig",
            _ => "BytesMeterConfig",
        };
        writeln!(out, "  {} meter_config = 4;", type_name).unwrap();
    }

    if let Some(unit) = table.counter {
        match unit {
            MeterUnit::Bytes => {
                writeln!(out, "  int64 byte_counter = 5;").unwrap();
            }
            MeterUnit::Packets => {
                writeln!(out, "  int64 packet_counter = 6;").unwrap();
            }
            MeterUnit::Both => {
                writeln!(out, "  int64 byte_counter = 5;").unwrap();
                writeln!(out, "  int64 packet_counter = 6;").unwrap();
            }
        }
    }

    writeln!(out, "}}\n").unwrap();
}

fn write_table_entry_oneof(out: &mut String, info: &InfoManager) {
    writeln!(out, "message TableEntry {{").unwrap();
    writeln!(out, "  oneof entry {{").unwrap();
    for table in sorted_tables(info) {
        let message_name = p4_name_to_pd_message_name(&table.name, EntityKind::Table);
        let field_name = p4_name_to_pd_field_name(&table.name, EntityKind::Table);
        let tag = table.id & 0x00ff_ffff;
        writeln!(out, "    {} {} = {};", message_name, field_name, tag).unwrap();
    }
    writeln!(out, "  }}").unwrap();
    writeln!(out, "}}\n").unwrap();
}

fn write_packet_metadata_message(
    out: &mut String,
    message_name: &str,
    by_id: &std::collections::HashMap<u32, crate::info::PacketMetadataDef>,
) {
    let mut metas: Vec<&crate::info::PacketMetadataDef> = by_id.values().collect();
    metas.sort_by_key(|m| m.id);
    writeln!(out, "message {} {{", message_name).unwrap();
    writeln!(out, "  bytes payload = 1;").unwrap();
    for meta in metas {
        writeln!(out, "  string {} = {};", meta.name, meta.id + 1).unwrap();
    }
    writeln!(out, "}}\n").unwrap();
}

const ENVELOPE_MESSAGES: &str = "\
message Update {
  UpdateType type = 1;
  TableEntry table_entry = 2;
}

message WriteRequest {
  uint64 device_id = 1;
  repeated Update updates = 2;
}

message UpdateStatus {
  StatusCode code = 1;
  string message = 2;
}

message WriteResponse {
  repeated UpdateStatus statuses = 1;
}

message WriteRpcStatus {
  StatusCode code = 1;
  string message = 2;
  repeated UpdateStatus statuses = 3;
}

message ReadRequest {
  uint64 device_id = 1;
  repeated string table_names = 2;
}

message ReadResponse {
  repeated TableEntry entities = 1;
}
";

/// Emits the full PD schema text for `info`. Deterministic: the same
/// `InfoManager` always yields the same bytes.
pub fn generate_schema(info: &InfoManager) -> String {
    let mut out = String::new();
    out.push_str(COMMON_HELPERS);
    out.push('\n');

    for action in sorted_actions(info) {
        write_action_message(&mut out, action);
    }

    for table in sorted_tables(info) {
        write_table_message(&mut out, info, table);
    }

    write_table_entry_oneof(&mut out, info);

    write_packet_metadata_message(&mut out, "PacketIn", &info.packet_in_by_id);
    write_packet_metadata_message(&mut out, "PacketOut", &info.packet_out_by_id);

    out.push_str(ENVELOPE_MESSAGES);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::test_fixtures::seed_info;

    #[test]
    fn generates_deterministic_output() {
        let info = InfoManager::build(&seed_info()).unwrap();
        let first = generate_schema(&info);
        let second = generate_schema(&info);
        assert_eq!(first, second);
        assert!(first.contains("message Ternary"));
        assert!(first.contains("message IdTestTableEntry"));
        assert!(first.contains("message TableEntry"));
        assert!(first.contains("message WriteRequest"));
    }

    #[test]
    fn priority_field_only_on_tables_that_require_it() {
        let info = InfoManager::build(&seed_info()).unwrap();
        let schema = generate_schema(&info);
        let ternary_start = schema.find("message TernaryTableEntry").unwrap();
        let ternary_chunk = &schema[ternary_start..ternary_start + 400];
        assert!(ternary_chunk.contains("int32 priority"));
        let id_test_start = schema.find("message IdTestTableEntry").unwrap();
        let id_test_chunk = &schema[id_test_start..id_test_start + 400];
        assert!(!id_test_chunk.contains("int32 priority"));
    }
}
