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

//! The typed, self-describing intermediate representation: table
//! entries, updates, read/write requests and responses, packet-in/out,
//! and RPC status, all addressed by name rather than numeric id.

/// A single typed P4Runtime value. Exactly one variant is populated,
/// matching the declared [`crate::value::Format`] of the field it fills.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrValue {
    Mac(String),
    Ipv4(String),
    Ipv6(String),
    Str(String),
    HexStr(String),
}

/// The match performed by a single named match field in a table entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrMatchValue {
    Exact(IrValue),
    Lpm { value: IrValue, prefix_length: u32 },
    Ternary { value: IrValue, mask: IrValue },
    Optional(IrValue),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrMatch {
    pub name: String,
    pub value: IrMatchValue,
}

/// A single (name, value) binding of an action parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrActionInvocation {
    pub name: String,
    pub params: Vec<(String, IrValue)>,
}

/// One member of a one-shot action set, with its relative weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrActionSetMember {
    pub action: IrActionInvocation,
    pub weight: i32,
}

/// Either a single action invocation (ordinary tables) or a weighted
/// action set (one-shot tables) — never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrActionResult {
    Action(IrActionInvocation),
    ActionSet(Vec<IrActionSetMember>),
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct IrMeterConfig {
    pub cir: i64,
    pub pir: i64,
    pub cburst: i64,
    pub pburst: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct IrCounterData {
    pub byte_count: i64,
    pub packet_count: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrTableEntry {
    pub table_name: String,
    pub matches: Vec<IrMatch>,
    pub priority: Option<i32>,
    pub action: Option<IrActionResult>,
    pub meter_config: Option<IrMeterConfig>,
    pub counter_data: Option<IrCounterData>,
}

impl IrTableEntry {
    pub fn new(table_name: impl Into<String>) -> Self {
        IrTableEntry {
            table_name: table_name.into(),
            matches: Vec::new(),
            priority: None,
            action: None,
            meter_config: None,
            counter_data: None,
        }
    }

    pub fn match_value(&self, name: &str) -> Option<&IrMatchValue> {
        self.matches.iter().find(|m| m.name == name).map(|m| &m.value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrUpdateType {
    Insert,
    Modify,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrUpdate {
    pub update_type: IrUpdateType,
    pub table_entry: IrTableEntry,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrWriteRequest {
    pub device_id: u64,
    pub election_id: (u64, u64),
    pub updates: Vec<IrUpdate>,
}

/// What a read request asks for: currently only table entries are
/// modeled, matching this crate's scope.
#[derive(Clone, Debug, PartialEq)]
pub enum IrReadEntity {
    TableEntry(IrTableEntry),
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct IrReadRequest {
    pub device_id: u64,
    pub table_names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct IrReadResponse {
    pub entities: Vec<IrReadEntity>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrPacketMetadata {
    pub name: String,
    pub value: IrValue,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct IrPacketIn {
    pub payload: Vec<u8>,
    pub metadata: Vec<IrPacketMetadata>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct IrPacketOut {
    pub payload: Vec<u8>,
    pub metadata: Vec<IrPacketMetadata>,
}

/// A single update's outcome within a batch write response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrUpdateStatus {
    pub code: RpcCode,
    pub message: String,
}

/// The closed gRPC-style code space carried on status translation
/// boundaries (distinct from [`crate::error::ErrorKind`], which is this
/// crate's own internal error taxonomy).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpcCode {
    Ok,
    Unknown,
    InvalidArgument,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
    ResourceExhausted,
    DeadlineExceeded,
    Cancelled,
}

/// The write-response status: either a single RPC-wide error, or a
/// per-update breakdown.
#[derive(Clone, Debug, PartialEq)]
pub enum IrWriteRpcStatus {
    Ok,
    RpcWideError { code: RpcCode, message: String },
    RpcResponse(Vec<IrUpdateStatus>),
}

/// A batch of updates together with their per-index statuses, as
/// produced after executing an [`IrWriteRequest`].
#[derive(Clone, Debug, PartialEq)]
pub struct IrWriteResponse {
    pub statuses: Vec<IrUpdateStatus>,
}
