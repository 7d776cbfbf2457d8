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

//! End-to-end coverage of the seed P4Info described alongside this
//! crate: `id_test_table`, `ternary_table`, `lpm1_table`, plus a
//! foreign-key pair for the sequencer scenarios.

use p4rt_ir::info::{
    ActionInput, ActionParamInput, ForeignKey, InfoManager, MatchFieldInput, MatchKind,
    P4InfoInput, TableInput,
};
use p4rt_ir::ir::{IrMatch, IrMatchValue, IrTableEntry, IrUpdate, IrUpdateType, IrValue};
use p4rt_ir::pi::{
    PiFieldMatch, PiFieldMatchLpm, PiFieldMatchTernary, PiFieldMatchValue, PiTableEntry,
};
use p4rt_ir::sequencing::sequence_updates;
use p4rt_ir::status::{transport_to_ir, TransportStatus};
use p4rt_ir::ir::{IrUpdateStatus, RpcCode};

fn seed_info() -> InfoManager {
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
            foreign_keys: vec![ForeignKey {
                table: "id_test_table".to_string(),
                match_field: "ipv4".to_string(),
            }],
        }],
        action_ids: vec![21257015],
        size: 1024,
        meter: None,
        counter: None,
        uses_oneshot: false,
    };

    InfoManager::build(&P4InfoInput {
        tables: vec![id_test_table, ternary_table, lpm1_table],
        actions: vec![do_thing_1, do_thing_3, no_action],
        packet_in_metadata: vec![],
        packet_out_metadata: vec![],
    })
    .unwrap()
}

#[test]
fn valid_exact_entry_round_trips_through_pi_and_pd() {
    let info = seed_info();

    let mut pi = PiTableEntry::new(33554433);
    pi.matches.push(PiFieldMatch {
        field_id: 1,
        value: PiFieldMatchValue::Exact(vec![
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0x22,
        ]),
    });
    pi.matches.push(PiFieldMatch {
        field_id: 2,
        value: PiFieldMatchValue::Exact(vec![0x10, 0x24, 0x32, 0x52]),
    });
    pi.action = Some(p4rt_ir::pi::PiTableAction::Action(p4rt_ir::pi::PiAction {
        action_id: 16777217,
        params: vec![
            p4rt_ir::pi::PiActionParam { param_id: 1, value: vec![0, 0, 0, 8] },
            p4rt_ir::pi::PiActionParam { param_id: 2, value: vec![0, 0, 0, 9] },
        ],
    }));

    let ir = p4rt_ir::pi::table_entry_pi_to_ir(&info, &pi).unwrap();
    assert_eq!(ir.match_value("ipv6"), Some(&IrMatchValue::Exact(IrValue::Ipv6("::ff22".to_string()))));
    assert_eq!(
        ir.match_value("ipv4"),
        Some(&IrMatchValue::Exact(IrValue::Ipv4("16.36.50.82".to_string())))
    );

    let pi2 = p4rt_ir::pi::table_entry_ir_to_pi(&info, &ir).unwrap();
    assert_eq!(pi, pi2);

    let mut pd = p4rt_ir::pd::GenericPdTableEntry::for_table(info.table_by_name("id_test_table").unwrap());
    p4rt_ir::pd::ir_to_pd(&info, &ir, &mut pd).unwrap();
    let ir2 = p4rt_ir::pd::pd_to_ir(&info, &pd).unwrap();
    assert_eq!(ir, ir2);
}

#[test]
fn invalid_lpm_prefix_length_is_rejected() {
    let info = seed_info();
    let mut pi = PiTableEntry::new(33554436);
    pi.matches.push(PiFieldMatch {
        field_id: 1,
        value: PiFieldMatchValue::Lpm(PiFieldMatchLpm {
            value: vec![10, 0, 0, 0],
            prefix_len: 40,
        }),
    });
    pi.action = Some(p4rt_ir::pi::PiTableAction::Action(p4rt_ir::pi::PiAction {
        action_id: 21257015,
        params: vec![],
    }));

    let err = p4rt_ir::pi::table_entry_pi_to_ir(&info, &pi).unwrap_err();
    assert!(err.message.contains("40"));
    assert!(err.message.contains("32"));
}

#[test]
fn lpm_masked_bits_set_is_rejected() {
    let info = seed_info();
    let mut pi = PiTableEntry::new(33554436);
    pi.matches.push(PiFieldMatch {
        field_id: 1,
        value: PiFieldMatchValue::Lpm(PiFieldMatchLpm {
            value: vec![0x10, 0x43, 0x23, 0x12],
            prefix_len: 24,
        }),
    });
    pi.action = Some(p4rt_ir::pi::PiTableAction::Action(p4rt_ir::pi::PiAction {
        action_id: 21257015,
        params: vec![],
    }));

    assert!(p4rt_ir::pi::table_entry_pi_to_ir(&info, &pi).is_err());
}

#[test]
fn ternary_zero_mask_is_rejected() {
    let info = seed_info();
    let mut pi = PiTableEntry::new(33554435);
    pi.matches.push(PiFieldMatch {
        field_id: 1,
        value: PiFieldMatchValue::Ternary(PiFieldMatchTernary {
            value: vec![0x01, 0x00],
            mask: vec![0x00, 0x00],
        }),
    });
    pi.priority = 1;
    pi.action = Some(p4rt_ir::pi::PiTableAction::Action(p4rt_ir::pi::PiAction {
        action_id: 16777219,
        params: vec![],
    }));

    assert!(p4rt_ir::pi::table_entry_pi_to_ir(&info, &pi).is_err());
}

#[test]
fn duplicate_match_field_id_is_rejected() {
    let info = seed_info();
    let mut pi = PiTableEntry::new(33554433);
    pi.matches.push(PiFieldMatch { field_id: 1, value: PiFieldMatchValue::Exact(vec![0; 16]) });
    pi.matches.push(PiFieldMatch { field_id: 1, value: PiFieldMatchValue::Exact(vec![1; 16]) });
    pi.action = Some(p4rt_ir::pi::PiTableAction::Action(p4rt_ir::pi::PiAction {
        action_id: 16777217,
        params: vec![
            p4rt_ir::pi::PiActionParam { param_id: 1, value: vec![0, 0, 0, 1] },
            p4rt_ir::pi::PiActionParam { param_id: 2, value: vec![0, 0, 0, 2] },
        ],
    }));

    let err = p4rt_ir::pi::table_entry_pi_to_ir(&info, &pi).unwrap_err();
    assert!(err.message.contains("duplicate match field"));
}

fn exact_ipv4_entry(table_name: &str, value: &str) -> IrTableEntry {
    let mut entry = IrTableEntry::new(table_name);
    entry.matches.push(IrMatch {
        name: "ipv4".to_string(),
        value: IrMatchValue::Exact(IrValue::Ipv4(value.to_string())),
    });
    entry
}

fn lpm_ipv4_entry(value: &str, prefix_length: u32) -> IrTableEntry {
    let mut entry = IrTableEntry::new("lpm1_table");
    entry.matches.push(IrMatch {
        name: "ipv4".to_string(),
        value: IrMatchValue::Lpm { value: IrValue::Ipv4(value.to_string()), prefix_length },
    });
    entry
}

#[test]
fn sequencer_orders_insert_after_its_referent() {
    let info = seed_info();
    let referrer = IrUpdate {
        update_type: IrUpdateType::Insert,
        table_entry: lpm_ipv4_entry("10.0.0.1", 32),
    };
    let referent = IrUpdate {
        update_type: IrUpdateType::Insert,
        table_entry: exact_ipv4_entry("id_test_table", "10.0.0.1"),
    };

    let batches = sequence_updates(&info, 1, (0, 1), &[referrer, referent]).unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].updates[0].table_entry.table_name, "id_test_table");
    assert_eq!(batches[1].updates[0].table_entry.table_name, "lpm1_table");
}

#[test]
fn sequencer_orders_delete_before_its_referent() {
    let info = seed_info();
    let referrer = IrUpdate {
        update_type: IrUpdateType::Delete,
        table_entry: lpm_ipv4_entry("10.0.0.1", 32),
    };
    let referent = IrUpdate {
        update_type: IrUpdateType::Delete,
        table_entry: exact_ipv4_entry("id_test_table", "10.0.0.1"),
    };

    let batches = sequence_updates(&info, 1, (0, 1), &[referrer, referent]).unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].updates[0].table_entry.table_name, "lpm1_table");
    assert_eq!(batches[1].updates[0].table_entry.table_name, "id_test_table");
}

#[test]
fn status_mapping_scenarios() {
    let ok_with_message = TransportStatus {
        code: RpcCode::Ok,
        message: "should be empty".to_string(),
        details: None,
    };
    assert!(transport_to_ir(&ok_with_message).is_err());

    let bogus_details = vec![IrUpdateStatus { code: RpcCode::Ok, message: "nonempty".to_string() }];
    let unknown_with_bad_details = TransportStatus {
        code: RpcCode::Unknown,
        message: "irrelevant".to_string(),
        details: Some(bogus_details),
    };
    assert!(transport_to_ir(&unknown_with_bad_details).is_err());

    let mixed = vec![
        IrUpdateStatus { code: RpcCode::Ok, message: String::new() },
        IrUpdateStatus { code: RpcCode::NotFound, message: "missing".to_string() },
    ];
    let message = p4rt_ir::status::write_response_summary(&p4rt_ir::ir::IrWriteResponse {
        statuses: mixed.clone(),
    });
    let valid = TransportStatus { code: RpcCode::Unknown, message, details: Some(mixed) };
    let ir = transport_to_ir(&valid).unwrap();
    match ir {
        p4rt_ir::ir::IrWriteRpcStatus::RpcResponse(statuses) => assert_eq!(statuses.len(), 2),
        other => panic!("expected RpcResponse, got {:?}", other),
    }
}
