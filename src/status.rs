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

//! Translation between a transport-level status envelope and
//! [`IrWriteRpcStatus`], plus validation and human-readable summary
//! helpers for batch write responses.

use crate::error::{P4Error, Result};
use crate::ir::{IrUpdateStatus, IrWriteRpcStatus, IrWriteResponse, RpcCode};

/// A transport-level status: `(code, message, details)`, where `details`
/// optionally carries the per-update breakdown of a batch write.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportStatus {
    pub code: RpcCode,
    pub message: String,
    pub details: Option<Vec<IrUpdateStatus>>,
}

/// Validates a single update's status: OK must carry an empty message;
/// non-OK must carry a non-empty message and a recognized code.
pub fn validate_update_status(status: &IrUpdateStatus) -> Result<()> {
    match status.code {
        RpcCode::Ok => {
            if !status.message.is_empty() {
                return Err(P4Error::invalid_argument(
                    "OK update status must have an empty message",
                ));
            }
        }
        _ => {
            if status.message.is_empty() {
                return Err(P4Error::invalid_argument(
                    "Non-OK update status must have a non-empty message",
                ));
            }
        }
    }
    Ok(())
}

/// Converts a transport status into [`IrWriteRpcStatus`].
pub fn transport_to_ir(status: &TransportStatus) -> Result<IrWriteRpcStatus> {
    match (&status.details, status.code) {
        (None, RpcCode::Ok) => {
            if !status.message.is_empty() {
                return Err(P4Error::invalid_argument("OK status must have an empty message"));
            }
            Ok(IrWriteRpcStatus::Ok)
        }
        (None, code) => {
            if status.message.is_empty() {
                return Err(P4Error::invalid_argument(
                    "Non-OK status with no per-update details must have a non-empty message",
                ));
            }
            Ok(IrWriteRpcStatus::RpcWideError {
                code,
                message: status.message.clone(),
            })
        }
        (Some(updates), code) => {
            if code != RpcCode::Unknown {
                return Err(P4Error::invalid_argument(
                    "A status carrying per-update details must have transport code UNKNOWN",
                ));
            }
            if updates.is_empty() {
                return Err(P4Error::invalid_argument(
                    "A status carrying per-update details must have at least one update",
                ));
            }
            let mut saw_non_ok = false;
            for u in updates {
                validate_update_status(u)?;
                if u.code != RpcCode::Ok {
                    saw_non_ok = true;
                }
            }
            if !saw_non_ok {
                return Err(P4Error::invalid_argument(
                    "A status carrying per-update details must have at least one non-OK update",
                ));
            }
            let expected_message = write_response_summary(&IrWriteResponse { statuses: updates.clone() });
            if status.message != expected_message {
                return Err(P4Error::invalid_argument(
                    "Top-level message must equal the per-update sub-status summary message",
                ));
            }
            Ok(IrWriteRpcStatus::RpcResponse(updates.clone()))
        }
    }
}

/// Converts an [`IrWriteRpcStatus`] back into a transport status,
/// synthesizing the top-level message the same way the forward direction
/// validates it.
pub fn ir_to_transport(status: &IrWriteRpcStatus) -> Result<TransportStatus> {
    match status {
        IrWriteRpcStatus::Ok => Ok(TransportStatus {
            code: RpcCode::Ok,
            message: String::new(),
            details: None,
        }),
        IrWriteRpcStatus::RpcWideError { code, message } => {
            if *code == RpcCode::Ok {
                return Err(P4Error::invalid_argument(
                    "RPC-wide error status cannot carry code OK",
                ));
            }
            if message.is_empty() {
                return Err(P4Error::invalid_argument(
                    "RPC-wide error status must have a non-empty message",
                ));
            }
            Ok(TransportStatus {
                code: *code,
                message: message.clone(),
                details: None,
            })
        }
        IrWriteRpcStatus::RpcResponse(updates) => {
            if updates.is_empty() {
                return Err(P4Error::invalid_argument(
                    "Per-update write status must have at least one update",
                ));
            }
            let mut saw_non_ok = false;
            for u in updates {
                validate_update_status(u)?;
                if u.code != RpcCode::Ok {
                    saw_non_ok = true;
                }
            }
            if !saw_non_ok {
                return Err(P4Error::invalid_argument(
                    "Per-update write status must have at least one non-OK update",
                ));
            }
            Ok(TransportStatus {
                code: RpcCode::Unknown,
                message: write_response_summary(&IrWriteResponse { statuses: updates.clone() }),
                details: Some(updates.clone()),
            })
        }
    }
}

/// A human-readable rendering of a batch write response: used by
/// callers for logging, not by the translator itself.
pub fn write_response_summary(response: &IrWriteResponse) -> String {
    let failed: Vec<String> = response
        .statuses
        .iter()
        .enumerate()
        .filter(|(_, s)| s.code != RpcCode::Ok)
        .map(|(i, s)| format!("update {} failed with {:?}: {}", i, s.code, s.message))
        .collect();
    if failed.is_empty() {
        format!("All {} updates succeeded", response.statuses.len())
    } else {
        format!(
            "{} of {} updates failed:\n{}",
            failed.len(),
            response.statuses.len(),
            failed.join("\n")
        )
    }
}
