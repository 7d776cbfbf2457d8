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

//! Parsing of `@label` and `@label(args)` annotations attached to P4
//! objects.

use crate::error::{P4Error, Result};

/// The parsed components of a single annotation: its label, and its
/// parenthesized body if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationComponents {
    pub label: String,
    pub body: Option<String>,
}

/// Parses `@<label>` or `@<label>(<body>)`, tolerating surrounding
/// whitespace.
pub fn parse_annotation(annotation: &str) -> Result<AnnotationComponents> {
    let trimmed = annotation.trim();
    let without_at = trimmed
        .strip_prefix('@')
        .ok_or_else(|| P4Error::invalid_argument(format!("Annotation \"{}\" is malformed", annotation)))?;

    if let Some(paren_idx) = without_at.find('(') {
        let label = without_at[..paren_idx].trim_end();
        let rest = without_at[paren_idx + 1..].trim_end();
        let body = rest
            .strip_suffix(')')
            .ok_or_else(|| P4Error::invalid_argument(format!("Annotation \"{}\" is malformed", annotation)))?;
        if label.is_empty() || label.contains(char::is_whitespace) {
            return Err(P4Error::invalid_argument(format!(
                "Annotation \"{}\" is malformed",
                annotation
            )));
        }
        return Ok(AnnotationComponents {
            label: label.to_string(),
            body: Some(body.to_string()),
        });
    }

    if without_at.is_empty() || without_at.contains(char::is_whitespace) {
        return Err(P4Error::invalid_argument(format!(
            "Annotation \"{}\" is malformed",
            annotation
        )));
    }
    Ok(AnnotationComponents {
        label: without_at.to_string(),
        body: None,
    })
}

/// Splits an annotation body into a comma-delimited argument list.
/// Allowed characters are `[A-Za-z0-9_/, \t]`; anything else rejects the
/// whole body. Returned arguments have whitespace stripped.
pub fn parse_as_arg_list(value: &str) -> Result<Vec<String>> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | ',' | ' ' | '\t');
    if !value.chars().all(allowed) {
        return Err(P4Error::invalid_argument(
            "Argument string contains invalid characters for argument list parsing. \
             Valid characters: [a-zA-Z0-9_/, \\t]."
                .to_string(),
        ));
    }
    let no_space: String = value.chars().filter(|c| *c != ' ' && *c != '\t').collect();
    if no_space.is_empty() {
        return Ok(Vec::new());
    }
    Ok(no_space.split(',').map(|s| s.to_string()).collect())
}
