// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! # ONCODE
//! ONCODE is an incremental graph decoder for Online Codes, a family of
//! rateless erasure codes. The encoder keeps emitting *check blocks*, each
//! being the XOR of a pseudo-random subset of the message and auxiliary
//! blocks; the decoder feeds every received check block into a tripartite
//! decoding graph (message <-> auxiliary <-> check) and runs a
//! belief-propagation style resolver over it until every message block is
//! reconstructed.
//!
//! The crate deliberately works on the *structure* of the decode only: it
//! never touches block payloads. For every block it solves, it emits a
//! symbolic XOR recipe (the list of source blocks whose payloads XOR to the
//! solved block), leaving the actual byte crunching, the sampling codec and
//! the packet I/O to the surrounding application.
//!
//! ## Example
//! ```
//! use oncode::{CodeParameters, Graph, NodeIndex};
//!
//! // two message blocks, both belonging to one auxiliary block (node 2)
//! let params = CodeParameters::builder()
//!     .mblocks(2).ablocks(1).q(1).fudge(1.5)
//!     .build().unwrap();
//! let aux_map   = vec![NodeIndex(2), NodeIndex(2)];
//! let mut graph = Graph::new(&params, &aux_map).unwrap();
//!
//! // a check block covering both messages cannot fire on its own
//! graph.add_check_block(vec![NodeIndex(0), NodeIndex(1)]).unwrap();
//! assert!(!graph.resolve().done);
//!
//! // one more check block pinning message 0 unlocks everything
//! graph.add_check_block(vec![NodeIndex(0)]).unwrap();
//! let outcome = graph.resolve();
//! assert!(outcome.done);
//! assert_eq!(vec![NodeIndex(0), NodeIndex(1)], outcome.solved);
//!
//! // message 1 = check 3 (+) message 0
//! assert_eq!(Some(&[NodeIndex(3), NodeIndex(0)][..]), graph.recipe(NodeIndex(1)));
//! ```
pub mod common;
pub mod pool;
pub mod metrics;
pub mod graph;
pub mod resolver;

#[cfg(test)]
pub mod test_utils;

pub use crate::common::{CodeParameters, CodeParametersBuilder, GraphError, NodeIndex};
pub use crate::graph::Graph;
pub use crate::metrics::Metrics;
pub use crate::pool::{BlockPool, CellIndex, UniCell};
pub use crate::resolver::Resolution;
