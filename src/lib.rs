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

//! P4Runtime control-plane translation: PI (program-independent wire
//! form) to IR (typed intermediate representation) to PD
//! (program-dependent schema), plus a dependency-aware write
//! sequencer. Pure and synchronous — no RPC transport, no entry
//! caching, no connection ownership.

pub mod annotation;
pub mod error;
pub mod info;
pub mod ir;
pub mod names;
pub mod pd;
pub mod pdgen;
pub mod pi;
pub mod sequencing;
pub mod status;
pub mod value;

pub use error::{ErrorKind, P4Error, Result};
pub use info::{InfoManager, P4InfoInput};
