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

//! Dependency-aware write sequencing: builds a "must-precede" graph
//! from foreign-key references between updates in a batch, then emits a
//! Kahn-style layered topological order so that each layer can be sent
//! to a switch as one atomic write batch.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::{P4Error, Result};
use crate::info::InfoManager;
use crate::ir::{IrMatchValue, IrUpdate, IrUpdateType, IrWriteRequest};

/// A reference to a specific field's value within one update's table
/// entry, restricted to match kinds usable as a referent: Exact and
/// Optional are the only kinds that identify a single row.
fn field_value_as_string(value: &IrMatchValue) -> Option<String> {
    match value {
        IrMatchValue::Exact(v) | IrMatchValue::Optional(v) => Some(match v {
            crate::ir::IrValue::Mac(s)
            | crate::ir::IrValue::Ipv4(s)
            | crate::ir::IrValue::Ipv6(s)
            | crate::ir::IrValue::Str(s)
            | crate::ir::IrValue::HexStr(s) => s.clone(),
        }),
        _ => None,
    }
}

/// Like [`field_value_as_string`], but also accepts the inner value of an
/// LPM or ternary match: a match field holding a foreign key is always on
/// the referring side, and referring fields may carry any match kind,
/// unlike the referent side they point at.
fn referring_value_as_string(value: &IrMatchValue) -> Option<String> {
    match value {
        IrMatchValue::Lpm { value: v, .. } | IrMatchValue::Ternary { value: v, .. } => {
            field_value_as_string(&IrMatchValue::Exact(v.clone()))
        }
        other => field_value_as_string(other),
    }
}

type ForeignKeyValue = (String, String, String);

/// Indexes every (table, match field, value) triple appearing in
/// `updates`' own exact/optional matches, mapping it to the set of
/// update indices that could serve as a referent for that triple.
fn index_referents(updates: &[IrUpdate]) -> HashMap<ForeignKeyValue, HashSet<usize>> {
    let mut indices: HashMap<ForeignKeyValue, HashSet<usize>> = HashMap::new();
    for (i, update) in updates.iter().enumerate() {
        for m in &update.table_entry.matches {
            if let Some(value) = field_value_as_string(&m.value) {
                indices
                    .entry((update.table_entry.table_name.clone(), m.name.clone(), value))
                    .or_default()
                    .insert(i);
            }
        }
    }
    indices
}

/// Builds the directed "must-precede" graph: an edge from `a` to `b`
/// means `a` must be sent in a batch no later than `b`.
fn build_dependency_graph(info: &InfoManager, updates: &[IrUpdate]) -> Result<Vec<HashSet<usize>>> {
    let indices = index_referents(updates);
    let mut successors: Vec<HashSet<usize>> = vec![HashSet::new(); updates.len()];

    for (i, update) in updates.iter().enumerate() {
        let table = info.table_by_name(&update.table_entry.table_name)?;

        // Referring foreign keys attached to this update's own match fields.
        for m in &update.table_entry.matches {
            let field = match table.match_field_by_name(&m.name) {
                Some(f) => f,
                None => continue,
            };
            let value = match referring_value_as_string(&m.value) {
                Some(v) => v,
                None => continue,
            };
            for fk in &field.foreign_keys {
                add_edges_for_reference(&indices, &mut successors, updates, i, update.update_type, fk, &value);
            }
        }

        // Referring foreign keys attached to the update's action params.
        if let Some(action) = &update.table_entry.action {
            if let crate::ir::IrActionResult::Action(invocation) = action {
                if let Ok(action_def) = info.action_by_name(&invocation.name) {
                    for (param_name, param_value) in &invocation.params {
                        let param_def = match action_def.param_by_name(param_name) {
                            Some(p) => p,
                            None => continue,
                        };
                        let value = match field_value_as_string(&IrMatchValue::Exact(param_value.clone())) {
                            Some(v) => v,
                            None => continue,
                        };
                        for fk in &param_def.foreign_keys {
                            add_edges_for_reference(&indices, &mut successors, updates, i, update.update_type, fk, &value);
                        }
                    }
                }
            }
        }
    }

    Ok(successors)
}

fn add_edges_for_reference(
    indices: &HashMap<ForeignKeyValue, HashSet<usize>>,
    successors: &mut [HashSet<usize>],
    updates: &[IrUpdate],
    update_index: usize,
    update_type: IrUpdateType,
    fk: &crate::info::ForeignKey,
    value: &str,
) {
    let key = (fk.table.clone(), fk.match_field.clone(), value.to_string());
    let referents = match indices.get(&key) {
        Some(r) => r,
        None => return,
    };
    for &referent_index in referents {
        if referent_index == update_index {
            continue;
        }
        let referent_type = updates[referent_index].update_type;
        match (update_type, referent_type) {
            (IrUpdateType::Insert, IrUpdateType::Insert) | (IrUpdateType::Modify, IrUpdateType::Insert) => {
                successors[referent_index].insert(update_index);
            }
            (IrUpdateType::Delete, IrUpdateType::Delete) => {
                successors[update_index].insert(referent_index);
            }
            _ => {}
        }
    }
}

/// Computes the dependency-ordered write batches for `updates`: a
/// Kahn-style layered topological sort, one `IrWriteRequest` per layer.
/// Fails with `InvalidArgument` if the dependency graph has a cycle,
/// since well-formed foreign keys never produce one.
pub fn sequence_updates(
    info: &InfoManager,
    device_id: u64,
    election_id: (u64, u64),
    updates: &[IrUpdate],
) -> Result<Vec<IrWriteRequest>> {
    let successors = build_dependency_graph(info, updates)?;
    let n = updates.len();
    let mut in_degree = vec![0usize; n];
    for succs in &successors {
        for &s in succs {
            in_degree[s] += 1;
        }
    }

    let mut emitted = vec![false; n];
    let mut requests = Vec::new();
    let mut emitted_count = 0;

    loop {
        let layer: Vec<usize> = (0..n).filter(|&i| !emitted[i] && in_degree[i] == 0).collect();
        if layer.is_empty() {
            break;
        }
        for &i in &layer {
            emitted[i] = true;
        }
        emitted_count += layer.len();

        requests.push(IrWriteRequest {
            device_id,
            election_id,
            updates: layer.iter().map(|&i| updates[i].clone()).collect(),
        });

        for &i in &layer {
            for &succ in &successors[i] {
                in_degree[succ] -= 1;
            }
        }
    }

    if emitted_count != n {
        warn!(
            total = n,
            emitted = emitted_count,
            "update sequencing found a dependency cycle"
        );
        return Err(P4Error::invalid_argument(
            "Foreign-key dependencies among the given updates form a cycle",
        ));
    }

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::test_fixtures::seed_info;
    use crate::info::{ForeignKey, InfoManager, MatchKind, MatchFieldInput, P4InfoInput};
    use crate::ir::{IrActionInvocation, IrActionResult, IrMatch, IrTableEntry, IrValue};

    fn info_with_fk() -> InfoManager {
        let mut seed = seed_info();
        // Make lpm1_table's match field a referrer into id_test_table's ipv4 field.
        seed.tables[2].match_fields[0] = MatchFieldInput {
            id: 1,
            name: "ipv4".to_string(),
            bitwidth: 32,
            match_type: MatchKind::Lpm,
            annotations: vec!["@format(IPV4_ADDRESS)".to_string()],
            type_name: None,
            foreign_keys: vec![ForeignKey {
                table: "id_test_table".to_string(),
                match_field: "ipv4".to_string(),
            }],
        };
        InfoManager::build(&seed).unwrap()
    }

    fn insert(table_entry: IrTableEntry) -> IrUpdate {
        IrUpdate { update_type: IrUpdateType::Insert, table_entry }
    }

    fn delete(table_entry: IrTableEntry) -> IrUpdate {
        IrUpdate { update_type: IrUpdateType::Delete, table_entry }
    }

    fn referent_entry() -> IrTableEntry {
        let mut entry = IrTableEntry::new("id_test_table");
        entry.matches.push(IrMatch { name: "ipv6".to_string(), value: IrMatchValue::Exact(IrValue::Ipv6("::1".to_string())) });
        entry.matches.push(IrMatch { name: "ipv4".to_string(), value: IrMatchValue::Exact(IrValue::Ipv4("10.0.0.1".to_string())) });
        entry.action = Some(IrActionResult::Action(IrActionInvocation {
            name: "do_thing_1".to_string(),
            params: vec![
                ("arg1".to_string(), IrValue::HexStr("0x00000001".to_string())),
                ("arg2".to_string(), IrValue::HexStr("0x00000002".to_string())),
            ],
        }));
        entry
    }

    fn referrer_entry() -> IrTableEntry {
        let mut entry = IrTableEntry::new("lpm1_table");
        entry.matches.push(IrMatch {
            name: "ipv4".to_string(),
            value: IrMatchValue::Lpm { value: IrValue::Ipv4("10.0.0.1".to_string()), prefix_length: 32 },
        });
        entry.action = Some(IrActionResult::Action(IrActionInvocation { name: "NoAction".to_string(), params: vec![] }));
        entry
    }

    #[test]
    fn insert_orders_referent_before_referrer() {
        let info = info_with_fk();
        let updates = vec![insert(referrer_entry()), insert(referent_entry())];
        let layers = sequence_updates(&info, 1, (0, 1), &updates).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].updates[0].table_entry.table_name, "id_test_table");
        assert_eq!(layers[1].updates[0].table_entry.table_name, "lpm1_table");
    }

    #[test]
    fn delete_orders_referrer_before_referent() {
        let info = info_with_fk();
        let updates = vec![delete(referent_entry()), delete(referrer_entry())];
        let layers = sequence_updates(&info, 1, (0, 1), &updates).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].updates[0].table_entry.table_name, "lpm1_table");
        assert_eq!(layers[1].updates[0].table_entry.table_name, "id_test_table");
    }

    #[test]
    fn independent_updates_share_a_single_layer() {
        let info = InfoManager::build(&seed_info()).unwrap();
        let updates = vec![insert(referent_entry()), insert(referrer_entry())];
        let layers = sequence_updates(&info, 1, (0, 1), &updates).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].updates.len(), 2);
    }

    /// Builds a genuine two-entry cycle: `lpm1_table`'s LPM `ipv4` field
    /// refers to `id_test_table.ipv4` (Exact, a valid referent), and
    /// `id_test_table`'s own `ipv4` field refers back to a second,
    /// Exact-typed field on `lpm1_table` (`tag`) so the return edge also
    /// has a valid referent to land on.
    fn info_with_mutual_fk() -> InfoManager {
        let mut seed = seed_info();
        seed.tables[0].match_fields[1] = MatchFieldInput {
            id: 2,
            name: "ipv4".to_string(),
            bitwidth: 32,
            match_type: MatchKind::Exact,
            annotations: vec!["@format(IPV4_ADDRESS)".to_string()],
            type_name: None,
            foreign_keys: vec![ForeignKey {
                table: "lpm1_table".to_string(),
                match_field: "tag".to_string(),
            }],
        };
        seed.tables[2].match_fields = vec![
            MatchFieldInput {
                id: 1,
                name: "ipv4".to_string(),
                bitwidth: 32,
                match_type: MatchKind::Lpm,
                annotations: vec!["@format(IPV4_ADDRESS)".to_string()],
                type_name: None,
                foreign_keys: vec![ForeignKey {
                    table: "id_test_table".to_string(),
                    match_field: "ipv4".to_string(),
                }],
            },
            MatchFieldInput {
                id: 2,
                name: "tag".to_string(),
                bitwidth: 32,
                match_type: MatchKind::Exact,
                annotations: vec!["@format(IPV4_ADDRESS)".to_string()],
                type_name: None,
                foreign_keys: vec![],
            },
        ];
        InfoManager::build(&seed).unwrap()
    }

    #[test]
    fn cycle_is_rejected() {
        let info = info_with_mutual_fk();
        let mut lpm_entry = referrer_entry();
        lpm_entry.matches.push(IrMatch {
            name: "tag".to_string(),
            value: IrMatchValue::Exact(IrValue::Ipv4("10.0.0.1".to_string())),
        });
        let updates = vec![insert(referent_entry()), insert(lpm_entry)];
        let err = sequence_updates(&info, 1, (0, 1), &updates).unwrap_err();
        assert!(err.message.contains("cycle"));
    }
}
