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

//! The program-dependent (PD) side: a reflective accessor trait standing
//! in for a schema-generated PD message, and the IR↔PD translator.
//!
//! All PD values flow as formatted strings; bit-widths and formats come
//! from the info manager, exactly as the IR's own typed values do, so
//! translation here is a matter of field lookup and structural
//! validation rather than byte-level codec work.

use std::collections::HashMap;

use crate::error::{P4Error, Result};
use crate::info::{InfoManager, MatchKind, TableDef};
use crate::ir::*;
use crate::pi::{validate_lpm_bits, validate_ternary_bits};
use crate::value::{self, Format};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdLpmValue {
    pub value: String,
    pub prefix_length: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdTernaryValue {
    pub value: String,
    pub mask: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PdMatchValue {
    Exact(String),
    Lpm(PdLpmValue),
    Ternary(PdTernaryValue),
    Optional(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PdActionInvocation {
    pub name: String,
    pub params: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdActionSetMember {
    pub action: PdActionInvocation,
    pub weight: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PdActionValue {
    Action(PdActionInvocation),
    ActionSet(Vec<PdActionSetMember>),
}

/// The schema exposes only one CIR/PIR pair: `BytesMeterConfig` or
/// `PacketsMeterConfig`, never both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PdMeterConfig {
    Bytes { cir: i64, cburst: i64 },
    Packets { cir: i64, cburst: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PdCounterData {
    pub byte_counter: Option<i64>,
    pub packet_counter: Option<i64>,
}

/// A reflective PD table-entry instance: typed getters/setters by field
/// name, the way a schema-generated message would expose its fields,
/// backed here by one concrete implementation rather than per-table
/// generated code.
pub trait PdTableEntry {
    fn table_name(&self) -> &str;
    fn match_field_names(&self) -> Vec<String>;
    fn match_field(&self, name: &str) -> Option<&PdMatchValue>;
    fn set_match_field(&mut self, name: &str, value: PdMatchValue) -> Result<()>;
    fn action(&self) -> Option<&PdActionValue>;
    fn set_action(&mut self, action: PdActionValue) -> Result<()>;
    fn meter(&self) -> Option<&PdMeterConfig>;
    fn set_meter(&mut self, meter: PdMeterConfig);
    fn counter(&self) -> Option<&PdCounterData>;
    fn set_counter(&mut self, counter: PdCounterData);
    fn priority(&self) -> Option<i32>;
    fn set_priority(&mut self, priority: i32);
}

/// The concrete reflective PD instance used throughout this crate: its
/// field set is fixed at construction time to the table's declared match
/// fields, so an unknown field name is rejected the same way a
/// schema-generated message would reject an out-of-schema field access.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct GenericPdTableEntry {
    table_name: String,
    known_fields: std::collections::HashSet<String>,
    matches: HashMap<String, PdMatchValue>,
    action: Option<PdActionValue>,
    meter: Option<PdMeterConfig>,
    counter: Option<PdCounterData>,
    priority: Option<i32>,
}

impl GenericPdTableEntry {
    pub fn for_table(table: &TableDef) -> Self {
        GenericPdTableEntry {
            table_name: table.name.clone(),
            known_fields: table.match_fields_by_name.keys().cloned().collect(),
            matches: HashMap::new(),
            action: None,
            meter: None,
            counter: None,
            priority: None,
        }
    }
}

impl PdTableEntry for GenericPdTableEntry {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn match_field_names(&self) -> Vec<String> {
        self.matches.keys().cloned().collect()
    }

    fn match_field(&self, name: &str) -> Option<&PdMatchValue> {
        self.matches.get(name)
    }

    fn set_match_field(&mut self, name: &str, value: PdMatchValue) -> Result<()> {
        if !self.known_fields.contains(name) {
            return Err(P4Error::invalid_argument(format!(
                "PD and P4Info out of sync: table \"{}\" has no match field \"{}\"",
                self.table_name, name
            )));
        }
        self.matches.insert(name.to_string(), value);
        Ok(())
    }

    fn action(&self) -> Option<&PdActionValue> {
        self.action.as_ref()
    }

    fn set_action(&mut self, action: PdActionValue) -> Result<()> {
        self.action = Some(action);
        Ok(())
    }

    fn meter(&self) -> Option<&PdMeterConfig> {
        self.meter.as_ref()
    }

    fn set_meter(&mut self, meter: PdMeterConfig) {
        self.meter = Some(meter);
    }

    fn counter(&self) -> Option<&PdCounterData> {
        self.counter.as_ref()
    }

    fn set_counter(&mut self, counter: PdCounterData) {
        self.counter = Some(counter);
    }

    fn priority(&self) -> Option<i32> {
        self.priority
    }

    fn set_priority(&mut self, priority: i32) {
        self.priority = Some(priority);
    }
}

fn ir_value_to_pd_string(v: &IrValue) -> String {
    match v {
        IrValue::Mac(s) | IrValue::Ipv4(s) | IrValue::Ipv6(s) | IrValue::Str(s) | IrValue::HexStr(s) => s.clone(),
    }
}

fn pd_string_to_ir_value(format: Format, s: &str) -> IrValue {
    match format {
        Format::Mac => IrValue::Mac(s.to_string()),
        Format::Ipv4 => IrValue::Ipv4(s.to_string()),
        Format::Ipv6 => IrValue::Ipv6(s.to_string()),
        Format::String => IrValue::Str(s.to_string()),
        Format::HexString => IrValue::HexStr(s.to_string()),
    }
}

fn action_invocation_ir_to_pd(ir_action: &IrActionInvocation) -> PdActionInvocation {
    PdActionInvocation {
        name: ir_action.name.clone(),
        params: ir_action
            .params
            .iter()
            .map(|(name, value)| (name.clone(), ir_value_to_pd_string(value)))
            .collect(),
    }
}

fn action_invocation_pd_to_ir(info: &InfoManager, pd_action: &PdActionInvocation) -> Result<IrActionInvocation> {
    let action_def = info.action_by_name(&pd_action.name)?;
    let mut params = Vec::with_capacity(action_def.param_order.len());
    for param_def in action_def.ordered_params() {
        let s = pd_action.params.get(&param_def.name).ok_or_else(|| {
            P4Error::invalid_argument(format!(
                "PD and P4Info out of sync: action \"{}\" has no param \"{}\"",
                action_def.name, param_def.name
            ))
        })?;
        params.push((param_def.name.clone(), pd_string_to_ir_value(param_def.format, s)));
    }
    Ok(IrActionInvocation {
        name: action_def.name.clone(),
        params,
    })
}

fn action_result_ir_to_pd(table: &TableDef, action: &IrActionResult) -> Result<PdActionValue> {
    match (table.uses_oneshot, action) {
        (false, IrActionResult::Action(a)) => Ok(PdActionValue::Action(action_invocation_ir_to_pd(a))),
        (true, IrActionResult::ActionSet(members)) => Ok(PdActionValue::ActionSet(
            members
                .iter()
                .map(|m| PdActionSetMember {
                    action: action_invocation_ir_to_pd(&m.action),
                    weight: m.weight,
                })
                .collect(),
        )),
        _ => Err(P4Error::invalid_argument(format!(
            "Table \"{}\": action/action-set shape does not match its one-shot declaration",
            table.name
        ))),
    }
}

fn action_value_pd_to_ir(info: &InfoManager, table: &TableDef, action: &PdActionValue) -> Result<IrActionResult> {
    match (table.uses_oneshot, action) {
        (false, PdActionValue::Action(a)) => Ok(IrActionResult::Action(action_invocation_pd_to_ir(info, a)?)),
        (true, PdActionValue::ActionSet(members)) => {
            let mut out = Vec::with_capacity(members.len());
            for m in members {
                if m.weight < 1 {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\": action set member weight must be >= 1, got {}",
                        table.name, m.weight
                    )));
                }
                out.push(IrActionSetMember {
                    action: action_invocation_pd_to_ir(info, &m.action)?,
                    weight: m.weight,
                });
            }
            Ok(IrActionResult::ActionSet(out))
        }
        _ => Err(P4Error::invalid_argument(format!(
            "Table \"{}\": action/action-set shape does not match its one-shot declaration",
            table.name
        ))),
    }
}

/// Writes `ir` into `pd` by looking up each field descriptor by name.
pub fn ir_to_pd(info: &InfoManager, ir: &IrTableEntry, pd: &mut dyn PdTableEntry) -> Result<()> {
    let table = info.table_by_name(&ir.table_name)?;
    if pd.table_name() != table.name {
        return Err(P4Error::invalid_argument(format!(
            "PD and P4Info out of sync: PD instance is for table \"{}\", IR entry is for \"{}\"",
            pd.table_name(),
            table.name
        )));
    }

    for m in &ir.matches {
        if table.match_field_by_name(&m.name).is_none() {
            return Err(P4Error::invalid_argument(format!(
                "PD and P4Info out of sync: no match field \"{}\"",
                m.name
            )));
        }
        let pd_value = match &m.value {
            IrMatchValue::Exact(v) => PdMatchValue::Exact(ir_value_to_pd_string(v)),
            IrMatchValue::Lpm { value: v, prefix_length } => PdMatchValue::Lpm(PdLpmValue {
                value: ir_value_to_pd_string(v),
                prefix_length: *prefix_length,
            }),
            IrMatchValue::Ternary { value: v, mask } => PdMatchValue::Ternary(PdTernaryValue {
                value: ir_value_to_pd_string(v),
                mask: ir_value_to_pd_string(mask),
            }),
            IrMatchValue::Optional(v) => PdMatchValue::Optional(ir_value_to_pd_string(v)),
        };
        pd.set_match_field(&m.name, pd_value)?;
    }

    if let Some(priority) = ir.priority {
        pd.set_priority(priority);
    }

    match &ir.action {
        Some(a) => pd.set_action(action_result_ir_to_pd(table, a)?)?,
        None => {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\": entry is missing an action",
                table.name
            )))
        }
    }

    if let Some(m) = &ir.meter_config {
        if m.cir != m.pir || m.cburst != m.pburst {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\": meter config must have CIR == PIR and CBURST == PBURST for the PD schema",
                table.name
            )));
        }
        let meter = match table.meter {
            Some(crate::info::MeterUnit::Packets) => PdMeterConfig::Packets { cir: m.cir, cburst: m.cburst },
            _ => PdMeterConfig::Bytes { cir: m.cir, cburst: m.cburst },
        };
        pd.set_meter(meter);
    }

    if let Some(c) = &ir.counter_data {
        let counter = match table.counter {
            Some(crate::info::MeterUnit::Bytes) => PdCounterData { byte_counter: Some(c.byte_count), packet_counter: None },
            Some(crate::info::MeterUnit::Packets) => PdCounterData { byte_counter: None, packet_counter: Some(c.packet_count) },
            _ => PdCounterData {
                byte_counter: Some(c.byte_count),
                packet_counter: Some(c.packet_count),
            },
        };
        pd.set_counter(counter);
    }

    Ok(())
}

/// Reads `pd` back into IR form, performing the same structural
/// validation as the PI direction on the recovered byte values.
pub fn pd_to_ir(info: &InfoManager, pd: &dyn PdTableEntry) -> Result<IrTableEntry> {
    let table = info.table_by_name(pd.table_name())?;

    let mut exact_match_count = 0usize;
    let mut matches = Vec::with_capacity(pd.match_field_names().len());
    for name in pd.match_field_names() {
        let field = table
            .match_field_by_name(&name)
            .ok_or_else(|| P4Error::invalid_argument(format!("PD and P4Info out of sync: no match field \"{}\"", name)))?;
        let pd_value = pd.match_field(&name).expect("name came from match_field_names");

        let ir_value = match (field.match_type, pd_value) {
            (MatchKind::Exact, PdMatchValue::Exact(s)) => {
                exact_match_count += 1;
                let ir = pd_string_to_ir_value(field.format, s);
                value::ir_to_bytes(&ir, field.format, field.bitwidth)?;
                IrMatchValue::Exact(ir)
            }
            (MatchKind::Lpm, PdMatchValue::Lpm(lpm)) => {
                if !matches!(field.format, Format::Ipv4 | Format::Ipv6) {
                    return Err(P4Error::invalid_argument(format!(
                        "Table \"{}\", match \"{}\": LPM match requires IPV4 or IPV6 format",
                        table.name, field.name
                    )));
                }
                let ir = pd_string_to_ir_value(field.format, &lpm.value);
                let bytes = value::ir_to_bytes(&ir, field.format, field.bitwidth)?;
                validate_lpm_bits(&table.name, &field.name, field.bitwidth, lpm.prefix_length, &bytes)?;
                IrMatchValue::Lpm {
                    value: ir,
                    prefix_length: lpm.prefix_length,
                }
            }
            (MatchKind::Ternary, PdMatchValue::Ternary(t)) => {
                let value_ir = pd_string_to_ir_value(field.format, &t.value);
                let mask_ir = pd_string_to_ir_value(field.format, &t.mask);
                let value_bytes = value::ir_to_bytes(&value_ir, field.format, field.bitwidth)?;
                let mask_bytes = value::ir_to_bytes(&mask_ir, field.format, field.bitwidth)?;
                validate_ternary_bits(&table.name, &field.name, &value_bytes, &mask_bytes)?;
                IrMatchValue::Ternary {
                    value: value_ir,
                    mask: mask_ir,
                }
            }
            (MatchKind::Optional, PdMatchValue::Optional(s)) => {
                let ir = pd_string_to_ir_value(field.format, s);
                value::ir_to_bytes(&ir, field.format, field.bitwidth)?;
                IrMatchValue::Optional(ir)
            }
            (declared, _) => {
                return Err(P4Error::invalid_argument(format!(
                    "Table \"{}\", match \"{}\": PD match does not agree with declared {:?} match",
                    table.name, field.name, declared
                )))
            }
        };

        matches.push(IrMatch { name, value: ir_value });
    }

    if exact_match_count != table.exact_match_count {
        return Err(P4Error::invalid_argument(format!(
            "Table \"{}\": expected {} exact matches, got {}",
            table.name, table.exact_match_count, exact_match_count
        )));
    }

    let action = match pd.action() {
        Some(a) => Some(action_value_pd_to_ir(info, table, a)?),
        None => {
            return Err(P4Error::invalid_argument(format!(
                "Table \"{}\": entry is missing an action",
                table.name
            )))
        }
    };

    let meter_config = pd.meter().map(|m| match *m {
        PdMeterConfig::Bytes { cir, cburst } => IrMeterConfig { cir, pir: cir, cburst, pburst: cburst },
        PdMeterConfig::Packets { cir, cburst } => IrMeterConfig { cir, pir: cir, cburst, pburst: cburst },
    });

    let counter_data = pd.counter().map(|c| IrCounterData {
        byte_count: c.byte_counter.unwrap_or(0),
        packet_count: c.packet_counter.unwrap_or(0),
    });

    Ok(IrTableEntry {
        table_name: table.name.clone(),
        matches,
        priority: pd.priority(),
        action,
        meter_config,
        counter_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::test_fixtures::seed_info;
    use crate::info::InfoManager;

    fn info() -> InfoManager {
        InfoManager::build(&seed_info()).unwrap()
    }

    #[test]
    fn ir_to_pd_to_ir_round_trips() {
        let i = info();
        let table = i.table_by_name("id_test_table").unwrap();

        let mut ir = IrTableEntry::new("id_test_table");
        ir.matches.push(IrMatch { name: "ipv6".to_string(), value: IrMatchValue::Exact(IrValue::Ipv6("::ff22".to_string())) });
        ir.matches.push(IrMatch { name: "ipv4".to_string(), value: IrMatchValue::Exact(IrValue::Ipv4("16.36.50.82".to_string())) });
        ir.action = Some(IrActionResult::Action(IrActionInvocation {
            name: "do_thing_1".to_string(),
            params: vec![
                ("arg1".to_string(), IrValue::HexStr("0x00000008".to_string())),
                ("arg2".to_string(), IrValue::HexStr("0x00000009".to_string())),
            ],
        }));

        let mut pd = GenericPdTableEntry::for_table(table);
        ir_to_pd(&i, &ir, &mut pd).unwrap();
        assert_eq!(pd.match_field("ipv6").unwrap(), &PdMatchValue::Exact("::ff22".to_string()));

        let ir2 = pd_to_ir(&i, &pd).unwrap();
        assert_eq!(ir2.match_value("ipv6"), ir.match_value("ipv6"));
        assert_eq!(ir2.match_value("ipv4"), ir.match_value("ipv4"));
        assert_eq!(ir2.action, ir.action);
    }

    #[test]
    fn set_match_field_rejects_unknown_field() {
        let i = info();
        let table = i.table_by_name("id_test_table").unwrap();
        let mut pd = GenericPdTableEntry::for_table(table);
        let err = pd.set_match_field("not_a_field", PdMatchValue::Exact("x".to_string())).unwrap_err();
        assert!(err.message.contains("PD and P4Info out of sync"));
    }

    #[test]
    fn priority_round_trips_for_tables_that_require_it() {
        let i = info();
        let table = i.table_by_name("ternary_table").unwrap();

        let mut ir = IrTableEntry::new("ternary_table");
        ir.matches.push(IrMatch {
            name: "normal".to_string(),
            value: IrMatchValue::Ternary {
                value: IrValue::HexStr("0x1234".to_string()),
                mask: IrValue::HexStr("0xffff".to_string()),
            },
        });
        ir.priority = Some(42);
        ir.action = Some(IrActionResult::Action(IrActionInvocation { name: "do_thing_3".to_string(), params: vec![] }));

        let mut pd = GenericPdTableEntry::for_table(table);
        ir_to_pd(&i, &ir, &mut pd).unwrap();
        assert_eq!(pd.priority(), Some(42));

        let ir2 = pd_to_ir(&i, &pd).unwrap();
        assert_eq!(ir2.priority, Some(42));
    }

    #[test]
    fn meter_invariant_rejects_asymmetric_cir_pir() {
        let i = info();
        let table = i.table_by_name("id_test_table").unwrap();
        let mut ir = IrTableEntry::new("id_test_table");
        ir.action = Some(IrActionResult::Action(IrActionInvocation {
            name: "do_thing_1".to_string(),
            params: vec![
                ("arg1".to_string(), IrValue::HexStr("0x00000008".to_string())),
                ("arg2".to_string(), IrValue::HexStr("0x00000009".to_string())),
            ],
        }));
        ir.meter_config = Some(IrMeterConfig { cir: 100, pir: 200, cburst: 10, pburst: 10 });
        let mut pd = GenericPdTableEntry::for_table(table);
        assert!(ir_to_pd(&i, &ir, &mut pd).is_err());
    }
}
