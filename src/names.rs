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

//! Translation between P4 identifiers and PD schema message/field names.

use crate::error::{P4Error, Result};

/// The kind of P4 object a name belongs to, which determines the message
/// and field suffixes applied during PD name generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Table,
    Action,
}

impl EntityKind {
    fn message_suffix(&self) -> &'static str {
        match self {
            EntityKind::Table => "Entry",
            EntityKind::Action => "Action",
        }
    }

    fn field_suffix(&self) -> &'static str {
        match self {
            EntityKind::Table => "_entry",
            EntityKind::Action => "",
        }
    }
}

/// Flattens bracket-and-dot characters in a P4 name: `[` -> `_`, `]` is
/// removed, `.` -> `_`.
fn flatten_p4_name(p4_name: &str) -> String {
    let mut out = String::with_capacity(p4_name.len());
    for c in p4_name.chars() {
        match c {
            '[' => out.push('_'),
            ']' => {}
            '.' => out.push('_'),
            other => out.push(other),
        }
    }
    out
}

/// Converts a flattened P4 name (snake_case or CamelCase segments) to
/// snake_case.
fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn snake_to_pascal(name: &str) -> String {
    name.split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Translates a P4 identifier into the PD message name for `kind`, e.g.
/// `my_table` -> `MyTableEntry`.
pub fn p4_name_to_pd_message_name(p4_name: &str, kind: EntityKind) -> String {
    let flattened = flatten_p4_name(p4_name);
    let snake = camel_to_snake(&flattened);
    format!("{}{}", snake_to_pascal(&snake), kind.message_suffix())
}

/// Translates a P4 identifier into the PD field name for `kind`, e.g.
/// `my_table` -> `my_table_entry`.
pub fn p4_name_to_pd_field_name(p4_name: &str, kind: EntityKind) -> String {
    let flattened = flatten_p4_name(p4_name);
    let snake = camel_to_snake(&flattened);
    format!("{}{}", snake, kind.field_suffix())
}

/// Reverses [`p4_name_to_pd_field_name`]: strips the field suffix,
/// failing if it is absent.
pub fn pd_field_name_to_p4_name(pd_field_name: &str, kind: EntityKind) -> Result<String> {
    let suffix = kind.field_suffix();
    if suffix.is_empty() {
        return Ok(pd_field_name.to_string());
    }
    pd_field_name
        .strip_suffix(suffix)
        .map(|s| s.to_string())
        .ok_or_else(|| {
            P4Error::invalid_argument(format!(
                "PD field name \"{}\" is missing the \"{}\" suffix",
                pd_field_name, suffix
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_message_name() {
        assert_eq!(
            p4_name_to_pd_message_name("my_table", EntityKind::Table),
            "MyTableEntry"
        );
    }

    #[test]
    fn action_message_name() {
        assert_eq!(
            p4_name_to_pd_message_name("do_thing_1", EntityKind::Action),
            "DoThing1Action"
        );
    }

    #[test]
    fn field_name_round_trip() {
        let field = p4_name_to_pd_field_name("my_table", EntityKind::Table);
        assert_eq!(field, "my_table_entry");
        assert_eq!(
            pd_field_name_to_p4_name(&field, EntityKind::Table).unwrap(),
            "my_table"
        );
    }

    #[test]
    fn field_name_round_trip_fails_without_suffix() {
        assert!(pd_field_name_to_p4_name("my_table", EntityKind::Table).is_err());
    }

    #[test]
    fn flattens_brackets_and_dots() {
        assert_eq!(
            p4_name_to_pd_field_name("hdr.vlan[0].vid", EntityKind::Action),
            "hdr_vlan_0_vid"
        );
    }
}
