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

//! The on-wire, program-independent (PI) value types, and the validated
//! bidirectional translator between them and the IR.

use std::collections::HashSet;

use crate::error::{P4Error, Result};
use crate::info::{ActionDef, InfoManager, MatchKind, TableDef};
use crate::ir::*;
use crate::value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiFieldMatchLpm {
    pub value: Vec<u8>,
    pub prefix_len: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiFieldMatchTernary {
    pub value: Vec<u8>,
    pub mask: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PiFieldMatchValue {
    Exact(Vec<u8>),
    Lpm(PiFieldMatchLpm),
    Ternary(PiFieldMatchTernary),
    Optional(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiFieldMatch {
    pub field_id: u32,
    pub value: PiFieldMatchValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiActionParam {
    pub param_id: u32,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiAction {
    pub action_id: u32,
    pub params: Vec<PiActionParam>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiActionSetMember {
    pub action: PiAction,
    pub weight: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PiTableAction {
    Action(PiAction),
    ActionSet(Vec<PiActionSetMember>),
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PiMeterConfig {
    pub cir: i64,
    pub cburst: i64,
    pub pir: i64,
    pub pburst: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PiCounterData {
    pub byte_count: i64,
    pub packet_count: i64,
}

/// `priority == 0` means "absent", matching the P4Runtime wire
/// convention where priority is a plain (non-optional) field.
#[derive(Clone, Debug, PartialEq)]
pub struct PiTableEntry {
    pub table_id: u32,
    pub matches: Vec<PiFieldMatch>,
    pub priority: i32,
    pub action: Option<PiTableAction>,
    pub meter_config: Option<PiMeterConfig>,
    pub counter_data: Option<PiCounterData>,
}

impl PiTableEntry {
    pub fn new(table_id: u32) -> Self {
        PiTableEntry {
            table_id,
            matches: Vec::new(),
            priority: 0,
            action: None,
            meter_config: None,
            counter_data: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PiUpdateType {
    Insert,
    Modify,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PiUpdate {
    pub update_type: PiUpdateType,
    pub table_entry: PiTableEntry,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PiWriteRequest {
    pub device_id: u64,
    pub election_id: (u64, u64),
    pub updates: Vec<PiUpdate>,
}

/// Checks the LPM "no bits set outside the prefix" invariant shared by
/// the PI and PD directions of match-field translation.
pub(crate) fn validate_lpm_bits(
    table_name: &str,
    field_name: &str,
    bitwidth: u32,
    prefix_length: u32,
    normalized_value: &[u8],
) -> Result<()> {
    if prefix_length == 0 {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\", match \"{}\": LPM prefix length must be nonzero",
            table_name, field_name
        )));
    }
    let mask = value::prefix_len_to_mask(prefix_length, bitwidth)?;
    let outside = value::intersection(normalized_value, &value::complement(&mask))?;
    if !value::is_all_zeros(&outside) {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\", match \"{}\": LPM value has bits set outside the /{} prefix",
            table_name, field_name, prefix_length
        )));
    }
    Ok(())
}

/// Checks the ternary "mask nonzero" and "value ∧ ¬mask = 0" invariants
/// shared by the PI and PD directions of match-field translation.
pub(crate) fn validate_ternary_bits(
    table_name: &str,
    field_name: &str,
    normalized_value: &[u8],
    normalized_mask: &[u8],
) -> Result<()> {
    if value::is_all_zeros(normalized_mask) {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\", match \"{}\": ternary mask must be nonzero",
            table_name, field_name
        )));
    }
    let outside = value::intersection(normalized_value, &value::complement(normalized_mask))?;
    if !value::is_all_zeros(&outside) {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\", match \"{}\": ternary value sets bits the mask does not set",
            table_name, field_name
        )));
    }
    Ok(())
}

fn action_invocation_pi_to_ir(info: &InfoManager, table: &TableDef, pi_action: &PiAction) -> Result<IrActionInvocation> {
    let action_def = info.action_by_id(pi_action.action_id).map_err(|_| {
        P4Error::invalid_argument(format!(
            "Table \"{}\": action id {} not found",
            table.name, pi_action.action_id
        ))
    })?;
    if !table.allows_action(action_def.id) {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\" does not allow action \"{}\"",
            table.name, action_def.name
        )));
    }

    let mut seen = HashSet::new();
    let mut params = Vec::with_capacity(pi_action.params.len());
    for p in &pi_action.params {
        if !seen.insert(p.param_id) {
            return Err(P4Error::invalid_argument(format!(
                "Action \"{}\": duplicate param id {}",
                action_def.name, p.param_id
            )));
        }
        let param_def = action_def.params_by_id.get(&p.param_id).ok_or_else(|| {
            P4Error::invalid_argument(format!(
                "Action \"{}\": unknown param id {}",
                action_def.name, p.param_id
            ))
        })?;
        let ir_value = value::format_to_ir(param_def.format, param_def.bitwidth, &p.value)?;
        params.push((param_def.name.clone(), ir_value));
    }

    if params.len() != action_def.params_by_id.len() {
        return Err(P4Error::invalid_argument(format!(
            "Action \"{}\": expected {} params, got {}",
            action_def.name,
            action_def.params_by_id.len(),
            params.len()
        )));
    }

    Ok(IrActionInvocation {
        name: action_def.name.clone(),
        params,
    })
}

fn action_invocation_ir_to_pi(info: &InfoManager, table: &TableDef, ir_action: &IrActionInvocation) -> Result<PiAction> {
    let action_def = info.action_by_name(&ir_action.name).map_err(|_| {
        P4Error::invalid_argument(format!(
            "Table \"{}\": action \"{}\" not found",
            table.name, ir_action.name
        ))
    })?;
    if !table.allows_action(action_def.id) {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\" does not allow action \"{}\"",
            table.name, action_def.name
        )));
    }

    let mut seen = HashSet::new();
    let mut params = Vec::with_capacity(ir_action.params.len());
    for (name, value) in &ir_action.params {
        if !seen.insert(name.clone()) {
            return Err(P4Error::invalid_argument(format!(
                "Action \"{}\": duplicate param \"{}\"",
                action_def.name, name
            )));
        }
        let param_def = action_def.param_by_name(name).ok_or_else(|| {
            P4Error::invalid_argument(format!(
                "Action \"{}\": unknown param \"{}\"",
                action_def.name, name
            ))
        })?;
        let bytes = value::ir_to_bytes(value, param_def.format, param_def.bitwidth)?;
        params.push(PiActionParam {
            param_id: param_def.id,
            value: bytes,
        });
    }

    if params.len() != action_def.params_by_id.len() {
        return Err(P4Error::invalid_argument(format!(
            "Action \"{}\": expected {} params, got {}",
            action_def.name,
            action_def.params_by_id.len(),
            params.len()
        )));
    }

    Ok(PiAction {
        action_id: action_def.id,
        params,
    })
}

fn table_action_pi_to_ir(info: &InfoManager, table: &TableDef, action: &PiTableAction) -> Result<IrActionResult> {
    match (table.uses_oneshot, action) {
        (false, PiTableAction::Action(a)) => {
            Ok(IrActionResult::Action(action_invocation_pi_to_ir(info, table, a)?))
        }
        (true, PiTableAction::ActionSet(members)) => {
            let mut out = Vec::with_capacity(members.len());
            for m in members {
                if m.weight < 1 {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\": action set member weight must be >= 1, got {}",
                        table.name, m.weight
                    )));
                }
                out.push(IrActionSetMember {
                    action: action_invocation_pi_to_ir(info, table, &m.action)?,
                    weight: m.weight,
                });
            }
            Ok(IrActionResult::ActionSet(out))
        }
        (false, PiTableAction::ActionSet(_)) => Err(P4Error::invalid_argument(format!(
            "Table \"{}\" is not a one-shot table but an action set was supplied",
            table.name
        ))),
        (true, PiTableAction::Action(_)) => Err(P4Error::invalid_argument(format!(
            "Table \"{}\" is a one-shot table but a single action was supplied",
            table.name
        ))),
    }
}

fn table_action_ir_to_pi(info: &InfoManager, table: &TableDef, action: &IrActionResult) -> Result<PiTableAction> {
    match (table.uses_oneshot, action) {
        (false, IrActionResult::Action(a)) => {
            Ok(PiTableAction::Action(action_invocation_ir_to_pi(info, table, a)?))
        }
        (true, IrActionResult::ActionSet(members)) => {
            let mut out = Vec::with_capacity(members.len());
            for m in members {
                if m.weight < 1 {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\": action set member weight must be >= 1, got {}",
                        table.name, m.weight
                    )));
                }
                out.push(PiActionSetMember {
                    action: action_invocation_ir_to_pi(info, table, &m.action)?,
                    weight: m.weight,
                });
            }
            Ok(PiTableAction::ActionSet(out))
        }
        (false, IrActionResult::ActionSet(_)) => Err(P4Error::invalid_argument(format!(
            "Table \"{}\" is not a one-shot table but an action set was supplied",
            table.name
        ))),
        (true, IrActionResult::Action(_)) => Err(P4Error::invalid_argument(format!(
            "Table \"{}\" is a one-shot table but a single action was supplied",
            table.name
        ))),
    }
}

/// Converts a PI table entry into its IR form, validating structure and
/// semantics.
pub fn table_entry_pi_to_ir(info: &InfoManager, pi: &PiTableEntry) -> Result<IrTableEntry> {
    let table = info
        .table_by_id(pi.table_id)
        .map_err(|_| P4Error::invalid_argument(format!("Table id {} not found", pi.table_id)))?;

    let mut seen_field_ids = HashSet::new();
    let mut exact_match_count = 0usize;
    let mut matches = Vec::with_capacity(pi.matches.len());

    for m in &pi.matches {
        if !seen_field_ids.insert(m.field_id) {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\": duplicate match field id {}",
                table.name, m.field_id
            )));
        }
        let field = table.match_fields_by_id.get(&m.field_id).ok_or_else(|| {
            P4Error::invalid_argument(format!(
                "Table \"{}\": unknown match field id {}",
                table.name, m.field_id
            ))
        })?;

        let ir_value = match (field.match_type, &m.value) {
            (MatchKind::Exact, PiFieldMatchValue::Exact(bytes)) => {
                exact_match_count += 1;
                IrMatchValue::Exact(value::format_to_ir(field.format, field.bitwidth, bytes)?)
            }
            (MatchKind::Lpm, PiFieldMatchValue::Lpm(lpm)) => {
                if !matches!(field.format, value::Format::Ipv4 | value::Format::Ipv6) {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\", match \"{}\": LPM match requires IPV4 or IPV6 format",
                        table.name, field.name
                    )));
                }
                let normalized = value::normalize(&lpm.value, field.bitwidth)?;
                validate_lpm_bits(&table.name, &field.name, field.bitwidth, lpm.prefix_len, &normalized)?;
                IrMatchValue::Lpm {
                    value: value::format_to_ir(field.format, field.bitwidth, &normalized)?,
                    prefix_length: lpm.prefix_len,
                }
            }
            (MatchKind::Ternary, PiFieldMatchValue::Ternary(t)) => {
                let normalized_mask = value::normalize(&t.mask, field.bitwidth)?;
                let normalized_value = value::normalize(&t.value, field.bitwidth)?;
                validate_ternary_bits(&table.name, &field.name, &normalized_value, &normalized_mask)?;
                IrMatchValue::Ternary {
                    value: value::format_to_ir(field.format, field.bitwidth, &normalized_value)?,
                    mask: value::format_to_ir(field.format, field.bitwidth, &normalized_mask)?,
                }
            }
            (MatchKind::Optional, PiFieldMatchValue::Optional(bytes)) => {
                IrMatchValue::Optional(value::format_to_ir(field.format, field.bitwidth, bytes)?)
            }
            (MatchKind::Range, _) => {
                return Err(P4Error::unimplemented(format!(
                    "Table \"{}\", match \"{}\": RANGE matches are not implemented",
                    table.name, field.name
                )))
            }
            (declared, _) => {
                return Err(P4Error::invalid_argument(format!(
                    "Table \"{}\", match \"{}\": PI match kind does not agree with declared {:?} match",
                    table.name, field.name, declared
                )))
            }
        };

        matches.push(IrMatch {
            name: field.name.clone(),
            value: ir_value,
        });
    }

    if exact_match_count != table.exact_match_count {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\": expected {} exact matches, got {}",
            table.name, table.exact_match_count, exact_match_count
        )));
    }

    let priority = if table.requires_priority {
        if pi.priority <= 0 {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\" requires a strictly positive priority",
                table.name
            )));
        }
        Some(pi.priority)
    } else {
        if pi.priority != 0 {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\" does not use priority but one was supplied",
                table.name
            )));
        }
        None
    };

    let action = match &pi.action {
        Some(a) => Some(table_action_pi_to_ir(info, table, a)?),
        None => {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\": entry is missing an action",
                table.name
            )))
        }
    };

    Ok(IrTableEntry {
        table_name: table.name.clone(),
        matches,
        priority,
        action,
        meter_config: pi.meter_config.as_ref().map(|m| IrMeterConfig {
            cir: m.cir,
            pir: m.pir,
            cburst: m.cburst,
            pburst: m.pburst,
        }),
        counter_data: pi.counter_data.as_ref().map(|c| IrCounterData {
            byte_count: c.byte_count,
            packet_count: c.packet_count,
        }),
    })
}

/// Converts an IR table entry back into PI form, performing the
/// symmetric checks of [`table_entry_pi_to_ir`].
pub fn table_entry_ir_to_pi(info: &InfoManager, ir: &IrTableEntry) -> Result<PiTableEntry> {
    let table = info.table_by_name(&ir.table_name)?;

    let mut exact_match_count = 0usize;
    let mut matches = Vec::with_capacity(ir.matches.len());
    let mut seen_names = HashSet::new();

    for m in &ir.matches {
        if !seen_names.insert(m.name.clone()) {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\": duplicate match field \"{}\"",
                table.name, m.name
            )));
        }
        let field = table.match_field_by_name(&m.name).ok_or_else(|| {
            P4Error::invalid_argument(format!(
                "Table \"{}\": unknown match field \"{}\"",
                table.name, m.name
            ))
        })?;

        let pi_value = match (field.match_type, &m.value) {
            (MatchKind::Exact, IrMatchValue::Exact(v)) => {
                exact_match_count += 1;
                PiFieldMatchValue::Exact(value::ir_to_bytes(v, field.format, field.bitwidth)?)
            }
            (MatchKind::Lpm, IrMatchValue::Lpm { value: v, prefix_length }) => {
                if !matches!(field.format, value::Format::Ipv4 | value::Format::Ipv6) {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\", match \"{}\": LPM match requires IPV4 or IPV6 format",
                        table.name, field.name
                    )));
                }
                let bytes = value::ir_to_bytes(v, field.format, field.bitwidth)?;
                validate_lpm_bits(&table.name, &field.name, field.bitwidth, *prefix_length, &bytes)?;
                PiFieldMatchValue::Lpm(PiFieldMatchLpm {
                    value: bytes,
                    prefix_len: *prefix_length,
                })
            }
            (MatchKind::Ternary, IrMatchValue::Ternary { value: v, mask }) => {
                let mask_bytes = value::ir_to_bytes(mask, field.format, field.bitwidth)?;
                let value_bytes = value::ir_to_bytes(v, field.format, field.bitwidth)?;
                validate_ternary_bits(&table.name, &field.name, &value_bytes, &mask_bytes)?;
                PiFieldMatchValue::Ternary(PiFieldMatchTernary {
                    value: value_bytes,
                    mask: mask_bytes,
                })
            }
            (MatchKind::Optional, IrMatchValue::Optional(v)) => {
                PiFieldMatchValue::Optional(value::ir_to_bytes(v, field.format, field.bitwidth)?)
            }
            (declared, _) => {
                return Err(P4Error::invalid_argument(format!(
                    "Table \"{}\", match \"{}\": IR match does not agree with declared {:?} match",
                    table.name, field.name, declared
                )))
            }
        };

        matches.push(PiFieldMatch {
            field_id: field.id,
            value: pi_value,
        });
    }

    if exact_match_count != table.exact_match_count {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\": expected {} exact matches, got {}",
            table.name, table.exact_match_count, exact_match_count
        )));
    }

    let priority = if table.requires_priority {
        match ir.priority {
            Some(p) if p > 0 => p,
            _ => {
                return Err(P4Error::invalid_argument(format!(
                    "Table \"{}\" requires a strictly positive priority",
                    table.name
                )))
            }
        }
    } else {
        if ir.priority.is_some() {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\" does not use priority but one was supplied",
                table.name
            )));
        }
        0
    };

    let action = match &ir.action {
        Some(a) => Some(table_action_ir_to_pi(info, table, a)?),
        None => {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\": entry is missing an action",
                table.name
            )))
        }
    };

    Ok(PiTableEntry {
        table_id: table.id,
        matches,
        priority,
        action,
        meter_config: ir.meter_config.as_ref().map(|m| PiMeterConfig {
            cir: m.cir,
            pir: m.pir,
            cburst: m.cburst,
            pburst: m.pburst,
        }),
        counter_data: ir.counter_data.as_ref().map(|c| PiCounterData {
            byte_count: c.byte_count,
            packet_count: c.packet_count,
        }),
    })
}

fn update_type_pi_to_ir(t: PiUpdateType) -> IrUpdateType {
    match t {
        PiUpdateType::Insert => IrUpdateType::Insert,
        PiUpdateType::Modify => IrUpdateType::Modify,
        PiUpdateType::Delete => IrUpdateType::Delete,
    }
}

fn update_type_ir_to_pi(t: IrUpdateType) -> PiUpdateType {
    match t {
        IrUpdateType::Insert => PiUpdateType::Insert,
        IrUpdateType::Modify => PiUpdateType::Modify,
        IrUpdateType::Delete => PiUpdateType::Delete,
    }
}

pub fn update_pi_to_ir(info: &InfoManager, pi: &PiUpdate) -> Result<IrUpdate> {
    Ok(IrUpdate {
        update_type: update_type_pi_to_ir(pi.update_type),
        table_entry: table_entry_pi_to_ir(info, &pi.table_entry)?,
    })
}

pub fn update_ir_to_pi(info: &InfoManager, ir: &IrUpdate) -> Result<PiUpdate> {
    Ok(PiUpdate {
        update_type: update_type_ir_to_pi(ir.update_type),
        table_entry: table_entry_ir_to_pi(info, &ir.table_entry)?,
    })
}

pub fn write_request_pi_to_ir(info: &InfoManager, pi: &PiWriteRequest) -> Result<IrWriteRequest> {
    Ok(IrWriteRequest {
        device_id: pi.device_id,
        election_id: pi.election_id,
        updates: pi
            .updates
            .iter()
            .map(|u| update_pi_to_ir(info, u))
            .collect::<Result<Vec<_>>>()?,
    })
}

pub fn write_request_ir_to_pi(info: &InfoManager, ir: &IrWriteRequest) -> Result<PiWriteRequest> {
    Ok(PiWriteRequest {
        device_id: ir.device_id,
        election_id: ir.election_id,
        updates: ir
            .updates
            .iter()
            .map(|u| update_ir_to_pi(info, u))
            .collect::<Result<Vec<_>>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::test_fixtures::seed_info;

    fn info() -> InfoManager {
        InfoManager::build(&seed_info()).unwrap()
    }

    fn valid_exact_entry() -> PiTableEntry {
        let mut entry = PiTableEntry::new(33554433);
        entry.matches.push(PiFieldMatch {
            field_id: 1,
            value: PiFieldMatchValue::Exact(vec![0x00; 14].into_iter().chain(vec![0xff, 0x22]).collect()),
        });
        entry.matches.push(PiFieldMatch {
            field_id: 2,
            value: PiFieldMatchValue::Exact(vec![0x10, 0x24, 0x32, 0x52]),
        });
        entry.action = Some(PiTableAction::Action(PiAction {
            action_id: 16777217,
            params: vec![
                PiActionParam { param_id: 1, value: vec![0x00, 0x00, 0x00, 0x08] },
                PiActionParam { param_id: 2, value: vec![0x00, 0x00, 0x00, 0x09] },
            ],
        }));
        entry
    }

    #[test]
    fn valid_exact_pi_to_ir() {
        let ir = table_entry_pi_to_ir(&info(), &valid_exact_entry()).unwrap();
        assert_eq!(ir.table_name, "id_test_table");
        assert_eq!(ir.match_value("ipv6").unwrap(), &IrMatchValue::Exact(IrValue::Ipv6("::ff22".to_string())));
        assert_eq!(ir.match_value("ipv4").unwrap(), &IrMatchValue::Exact(IrValue::Ipv4("16.36.50.82".to_string())));
        match &ir.action {
            Some(IrActionResult::Action(a)) => {
                assert_eq!(a.name, "do_thing_1");
                assert_eq!(a.params[0], ("arg1".to_string(), IrValue::HexStr("0x00000008".to_string())));
            }
            _ => panic!("expected a single action"),
        }
    }

    #[test]
    fn pi_ir_pi_round_trips() {
        let i = info();
        let pi = valid_exact_entry();
        let ir = table_entry_pi_to_ir(&i, &pi).unwrap();
        let pi2 = table_entry_ir_to_pi(&i, &ir).unwrap();
        assert_eq!(pi, pi2);
    }

    #[test]
    fn invalid_lpm_prefix_length() {
        let i = info();
        let mut entry = PiTableEntry::new(33554436);
        entry.matches.push(PiFieldMatch {
            field_id: 1,
            value: PiFieldMatchValue::Lpm(PiFieldMatchLpm {
                value: vec![0x10, 0x00, 0x00, 0x00],
                prefix_len: 40,
            }),
        });
        entry.action = Some(PiTableAction::Action(PiAction { action_id: 21257015, params: vec![] }));
        let err = table_entry_pi_to_ir(&i, &entry).unwrap_err();
        assert!(err.message.contains("Prefix length 40 is greater than bitwidth 32"));
    }

    #[test]
    fn lpm_rejects_masked_bits_set() {
        let i = info();
        let mut entry = PiTableEntry::new(33554436);
        entry.matches.push(PiFieldMatch {
            field_id: 1,
            value: PiFieldMatchValue::Lpm(PiFieldMatchLpm {
                value: vec![0x10, 0x43, 0x23, 0x12],
                prefix_len: 24,
            }),
        });
        entry.action = Some(PiTableAction::Action(PiAction { action_id: 21257015, params: vec![] }));
        assert!(table_entry_pi_to_ir(&i, &entry).is_err());
    }

    #[test]
    fn ternary_rejects_zero_mask() {
        let i = info();
        let mut entry = PiTableEntry::new(33554435);
        entry.priority = 1;
        entry.matches.push(PiFieldMatch {
            field_id: 1,
            value: PiFieldMatchValue::Ternary(PiFieldMatchTernary {
                value: vec![0x01, 0x00],
                mask: vec![0x00, 0x00],
            }),
        });
        entry.action = Some(PiTableAction::Action(PiAction { action_id: 16777219, params: vec![] }));
        assert!(table_entry_pi_to_ir(&i, &entry).is_err());
    }

    #[test]
    fn duplicate_match_field_id_rejected() {
        let i = info();
        let mut entry = valid_exact_entry();
        let dup = entry.matches[0].clone();
        entry.matches.push(dup);
        let err = table_entry_pi_to_ir(&i, &entry).unwrap_err();
        assert!(err.message.contains("duplicate match field id"));
    }

    #[test]
    fn missing_priority_on_ternary_table_rejected() {
        let i = info();
        let mut entry = PiTableEntry::new(33554435);
        entry.matches.push(PiFieldMatch {
            field_id: 1,
            value: PiFieldMatchValue::Ternary(PiFieldMatchTernary {
                value: vec![0x01, 0x00],
                mask: vec![0xff, 0x00],
            }),
        });
        entry.action = Some(PiTableAction::Action(PiAction { action_id: 16777219, params: vec![] }));
        assert!(table_entry_pi_to_ir(&i, &entry).is_err());
    }
}
