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

//! Canonicalization, parsing, and rendering of P4Runtime typed values.
//!
//! There are three flavors of byte string in play here: a *normalized*
//! byte string has exactly `ceil(bitwidth/8)` bytes; a *canonical* byte
//! string is the shortest string that fits the value (P4Runtime's wire
//! form); an *arbitrary* byte string is anything in between (extra
//! leading zeros allowed). Functions here generally accept arbitrary
//! byte strings and produce normalized or canonical ones, as documented
//! per function.

use byteorder::{BigEndian, WriteBytesExt};

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{P4Error, Result};
use crate::ir::IrValue;

pub const BITS_IN_MAC: u32 = 48;
pub const BYTES_IN_MAC: usize = (BITS_IN_MAC / 8) as usize;
pub const BITS_IN_IPV4: u32 = 32;
pub const BYTES_IN_IPV4: usize = (BITS_IN_IPV4 / 8) as usize;
pub const BITS_IN_IPV6: u32 = 128;
pub const BYTES_IN_IPV6: usize = (BITS_IN_IPV6 / 8) as usize;

/// The closed set of value formats a match field or action parameter can
/// declare, each with an associated canonical string rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    HexString,
    Mac,
    Ipv4,
    Ipv6,
    String,
}

impl Format {
    /// Validates the (format, bitwidth) combination: MAC implies 48 bits,
    /// IPV4 implies 32, IPV6 implies 128.
    pub fn validate_bitwidth(&self, bitwidth: u32) -> Result<()> {
        match self {
            Format::Mac if bitwidth != BITS_IN_MAC => Err(P4Error::invalid_argument(format!(
                "Only {}-bit values can be formatted as a MAC address, got {}",
                BITS_IN_MAC, bitwidth
            ))),
            Format::Ipv4 if bitwidth != BITS_IN_IPV4 => Err(P4Error::invalid_argument(format!(
                "Only {}-bit values can be formatted as an IPv4 address, got {}",
                BITS_IN_IPV4, bitwidth
            ))),
            Format::Ipv6 if bitwidth != BITS_IN_IPV6 => Err(P4Error::invalid_argument(format!(
                "Only {}-bit values can be formatted as an IPv6 address, got {}",
                BITS_IN_IPV6, bitwidth
            ))),
            _ => Ok(()),
        }
    }
}

/// Returns the number of bits used by `bytes` interpreted as an unsigned
/// integer (leading zero bytes/bits do not count).
pub fn bitwidth_of_bytes(bytes: &[u8]) -> u32 {
    let first_nonzero = bytes.iter().position(|&b| b != 0);
    match first_nonzero {
        None => 0,
        Some(idx) => {
            let trailing_bytes = (bytes.len() - idx - 1) as u32 * 8;
            let msb = bytes[idx];
            trailing_bytes + (8 - msb.leading_zeros())
        }
    }
}

/// True iff every byte in `bytes` is zero (including the empty string).
pub fn is_all_zeros(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}

/// Strips leading zero bytes then left-pads with zeros to exactly
/// `ceil(bitwidth/8)` bytes. Fails if the stripped value would not fit.
pub fn normalize(bytes: &[u8], bitwidth: u32) -> Result<Vec<u8>> {
    // Strip leading zero bytes, but keep a single trailing byte so the
    // all-zero case normalizes to a zero byte rather than an empty string.
    let stripped: &[u8] = match bytes.iter().position(|&b| b != 0) {
        Some(idx) => &bytes[idx..],
        None if bytes.is_empty() => &[],
        None => &bytes[bytes.len() - 1..],
    };

    let actual_bits = bitwidth_of_bytes(stripped);
    if actual_bits > bitwidth {
        return Err(P4Error::invalid_argument(format!(
            "Bytestring of length {} bits does not fit in {} bits",
            actual_bits, bitwidth
        )));
    }

    let total_bytes = ((bitwidth + 7) / 8) as usize;
    let mut out = vec![0u8; total_bytes];
    if !stripped.is_empty() {
        let start = total_bytes - stripped.len();
        out[start..].copy_from_slice(stripped);
    }
    Ok(out)
}

/// Drops leading zero bytes except keeps a single zero for the all-zero
/// case: the P4Runtime canonical byte-string form.
pub fn bytes_to_canonical(bytes: &[u8]) -> Vec<u8> {
    match bytes.iter().position(|&b| b != 0) {
        Some(idx) => bytes[idx..].to_vec(),
        None => vec![0],
    }
}

/// Big-endian, right-sized encoding of `value` as a normalized byte
/// string. Fails for bitwidth outside `1..=64`.
pub fn uint_to_bytes(value: u64, bitwidth: u32) -> Result<Vec<u8>> {
    if bitwidth == 0 || bitwidth > 64 {
        return Err(P4Error::invalid_argument(format!(
            "Cannot convert value with bitwidth {} to a byte string",
            bitwidth
        )));
    }
    let mut full = Vec::with_capacity(8);
    full.write_u64::<BigEndian>(value)
        .map_err(|e| P4Error::internal(format!("failed to encode {}: {}", value, e)))?;
    let total_bytes = ((bitwidth + 7) / 8) as usize;
    Ok(full[8 - total_bytes..].to_vec())
}

/// Converts an (arbitrary) byte string into a `u64`. Fails if
/// `bitwidth > 64` or the normalized value would not fit in a u64
/// (unreachable for bitwidth<=64 other than the explicit check, but kept
/// explicit to mirror the source's defensive check).
pub fn bytes_to_uint(bytes: &[u8], bitwidth: u32) -> Result<u64> {
    if bitwidth > 64 {
        return Err(P4Error::invalid_argument(format!(
            "Cannot convert value with bitwidth {} to uint",
            bitwidth
        )));
    }
    let normalized = normalize(bytes, bitwidth)?;
    let mut full = [0u8; 8];
    full[8 - normalized.len()..].copy_from_slice(&normalized);
    Ok(u64::from_be_bytes(full))
}

/// Renders a 6-byte normalized byte string as a lower-case
/// colon-separated MAC address.
pub fn bytes_to_mac(bytes: &[u8]) -> Result<String> {
    if bytes.len() != BYTES_IN_MAC {
        return Err(P4Error::invalid_argument(format!(
            "MAC address must be {} bytes, got {}",
            BYTES_IN_MAC,
            bytes.len()
        )));
    }
    Ok(bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Parses a colon-separated MAC address into a 6-byte normalized byte
/// string.
pub fn mac_to_bytes(mac: &str) -> Result<Vec<u8>> {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != BYTES_IN_MAC {
        return Err(P4Error::invalid_argument(format!(
            "String cannot be parsed as a MAC address: {}",
            mac
        )));
    }
    let mut out = Vec::with_capacity(BYTES_IN_MAC);
    for part in parts {
        let byte = u8::from_str_radix(part, 16)
            .map_err(|_| P4Error::invalid_argument(format!("String cannot be parsed as a MAC address: {}", mac)))?;
        out.push(byte);
    }
    Ok(out)
}

/// Renders a 4-byte normalized byte string as a dotted-decimal IPv4
/// address.
pub fn bytes_to_ipv4(bytes: &[u8]) -> Result<String> {
    if bytes.len() != BYTES_IN_IPV4 {
        return Err(P4Error::invalid_argument(format!(
            "IPv4 address must be {} bytes, got {}",
            BYTES_IN_IPV4,
            bytes.len()
        )));
    }
    Ok(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]).to_string())
}

/// Parses a dotted-decimal IPv4 address into a 4-byte normalized byte
/// string.
pub fn ipv4_to_bytes(ipv4: &str) -> Result<Vec<u8>> {
    let addr = Ipv4Addr::from_str(ipv4)
        .map_err(|_| P4Error::invalid_argument(format!("Invalid IPv4 address: {}", ipv4)))?;
    Ok(addr.octets().to_vec())
}

/// Renders a 16-byte normalized byte string as a canonical (RFC 5952)
/// lower-case IPv6 address.
pub fn bytes_to_ipv6(bytes: &[u8]) -> Result<String> {
    if bytes.len() != BYTES_IN_IPV6 {
        return Err(P4Error::invalid_argument(format!(
            "IPv6 address must be {} bytes, got {}",
            BYTES_IN_IPV6,
            bytes.len()
        )));
    }
    let mut octets = [0u8; 16];
    octets.copy_from_slice(bytes);
    Ok(Ipv6Addr::from(octets).to_string())
}

/// Parses an IPv6 address (canonical or compressed form) into a 16-byte
/// normalized byte string.
pub fn ipv6_to_bytes(ipv6: &str) -> Result<Vec<u8>> {
    let addr = Ipv6Addr::from_str(ipv6)
        .map_err(|_| P4Error::invalid_argument(format!("Invalid IPv6 address: {}", ipv6)))?;
    Ok(addr.octets().to_vec())
}

/// Dispatches on `format`, normalizing `bytes` first, and builds the
/// corresponding IR typed value.
pub fn format_to_ir(format: Format, bitwidth: u32, bytes: &[u8]) -> Result<IrValue> {
    let normalized = normalize(bytes, bitwidth)?;
    Ok(match format {
        Format::Mac => IrValue::Mac(bytes_to_mac(&normalized)?),
        Format::Ipv4 => IrValue::Ipv4(bytes_to_ipv4(&normalized)?),
        Format::Ipv6 => IrValue::Ipv6(bytes_to_ipv6(&normalized)?),
        Format::String => IrValue::Str(String::from_utf8_lossy(&normalized).into_owned()),
        Format::HexString => IrValue::HexStr(format!("0x{}", hex_lower(&normalized))),
    })
}

/// Renders an already-normalized byte string as a hex string body
/// (lower-case, no "0x" prefix).
fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Inverse of [`format_to_ir`]: converts an IR value back to a normalized
/// byte string. Rejects hex strings without a "0x" prefix or with
/// non-hex characters, and rejects a variant that disagrees with the
/// expected format.
pub fn ir_to_bytes(ir_value: &IrValue, format: Format, bitwidth: u32) -> Result<Vec<u8>> {
    let bytes = match (ir_value, format) {
        (IrValue::Mac(s), Format::Mac) => mac_to_bytes(s)?,
        (IrValue::Ipv4(s), Format::Ipv4) => ipv4_to_bytes(s)?,
        (IrValue::Ipv6(s), Format::Ipv6) => ipv6_to_bytes(s)?,
        (IrValue::Str(s), Format::String) => s.as_bytes().to_vec(),
        (IrValue::HexStr(s), Format::HexString) => hex_str_to_bytes(s)?,
        (value, format) => {
            return Err(P4Error::invalid_argument(format!(
                "IR value {:?} does not match declared format {:?}",
                value, format
            )))
        }
    };
    normalize(&bytes, bitwidth)
}

fn hex_str_to_bytes(s: &str) -> Result<Vec<u8>> {
    let body = s
        .strip_prefix("0x")
        .ok_or_else(|| P4Error::invalid_argument(format!("Hex string {} is missing \"0x\" prefix", s)))?;
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(P4Error::invalid_argument(format!(
            "Hex string {} contains non-hex characters",
            s
        )));
    }
    let padded = if body.len() % 2 == 1 {
        format!("0{}", body)
    } else {
        body.to_string()
    };
    let mut out = Vec::with_capacity(padded.len() / 2);
    for chunk in padded.as_bytes().chunks(2) {
        let byte_str = std::str::from_utf8(chunk).unwrap();
        out.push(u8::from_str_radix(byte_str, 16).unwrap());
    }
    Ok(out)
}

/// Bitwise intersection of two normalized byte strings of equal length.
pub fn intersection(left: &[u8], right: &[u8]) -> Result<Vec<u8>> {
    if left.len() != right.len() {
        return Err(P4Error::internal(format!(
            "cannot intersect byte strings of differing length ({} vs {})",
            left.len(),
            right.len()
        )));
    }
    Ok(left.iter().zip(right.iter()).map(|(a, b)| a & b).collect())
}

/// Returns the normalized `bitwidth`-bit mask with the top `prefix_len`
/// bits set.
pub fn prefix_len_to_mask(prefix_len: u32, bitwidth: u32) -> Result<Vec<u8>> {
    if prefix_len > bitwidth {
        return Err(P4Error::invalid_argument(format!(
            "Prefix length {} is greater than bitwidth {}",
            prefix_len, bitwidth
        )));
    }
    let total_bytes = ((bitwidth + 7) / 8) as usize;
    let mut mask = vec![0u8; total_bytes];
    let mut remaining = prefix_len;
    for byte in mask.iter_mut() {
        if remaining >= 8 {
            *byte = 0xff;
            remaining -= 8;
        } else if remaining > 0 {
            *byte = (0xffu16 << (8 - remaining)) as u8;
            remaining = 0;
        } else {
            break;
        }
    }
    Ok(mask)
}

/// Bitwise NOT of a normalized byte string.
pub fn complement(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|b| !b).collect()
}
