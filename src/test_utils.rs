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

//! This module provides the shared fixtures and structural audits used by
//! the unit tests of the crate. The audits verify the invariants that must
//! hold in every reachable state of a decoding graph, whatever sequence of
//! ingests and resolutions produced it.

use metrohash::MetroHashMap;

use crate::common::{CodeParameters, NodeIndex};
use crate::graph::Graph;
use crate::pool::UniCell;

/// The parameters of the standard test scenario: four message blocks, two
/// auxiliary blocks, each message belonging to two auxiliaries.
pub fn scenario_params() -> CodeParameters {
    CodeParameters::builder()
        .mblocks(4).ablocks(2).q(2)
        .build().unwrap()
}
/// The auxiliary map of the standard test scenario. Message 1 belongs to
/// auxiliary 4 twice and message 3 to auxiliary 5 twice, so each auxiliary
/// block ends up with four down edges (duplicates included).
pub fn scenario_map() -> Vec<NodeIndex> {
    vec![
        NodeIndex(4), NodeIndex(5), // message 0
        NodeIndex(4), NodeIndex(4), // message 1
        NodeIndex(5), NodeIndex(4), // message 2
        NodeIndex(5), NodeIndex(5), // message 3
    ]
}
/// Parameters of a two-message code with a single auxiliary block covering
/// both messages. The fudge factor is left to the caller so capacity
/// boundaries can be placed precisely.
pub fn tiny_params(fudge: f64) -> CodeParameters {
    CodeParameters::builder()
        .mblocks(2).ablocks(1).q(1).fudge(fudge)
        .build().unwrap()
}
/// The auxiliary map going with [`tiny_params`]: both messages belong to
/// auxiliary block 2.
pub fn tiny_map() -> Vec<NodeIndex> {
    vec![NodeIndex(2), NodeIndex(2)]
}
/// Parameters of a four-message code where each message belongs to exactly
/// one auxiliary block.
pub fn chain_params() -> CodeParameters {
    CodeParameters::builder()
        .mblocks(4).ablocks(2).q(1)
        .build().unwrap()
}
/// The auxiliary map going with [`chain_params`]: messages 0 and 1 belong
/// to auxiliary 4, messages 2 and 3 to auxiliary 5.
pub fn chain_map() -> Vec<NodeIndex> {
    vec![NodeIndex(4), NodeIndex(4), NodeIndex(5), NodeIndex(5)]
}

/// Collects the up-edge chain of the given lower node into a vector of
/// plain node ids (head of the chain first).
pub fn n_list(g: &Graph, lower: usize) -> Vec<usize> {
    let mut out    = vec![];
    let mut cursor = g.n_edges[lower];
    while let Some(cell) = cursor {
        let UniCell { value, next } = g.pool.cells[cell.0];
        out.push(value.0);
        cursor = next;
    }
    out
}

/// Runs every structural audit on the given graph.
pub fn audit(g: &Graph) {
    check_reciprocity(g);
    check_edge_counts(g);
    check_unsolved_count(g);
}

/// Every down edge `upper -> lower` must be matched by exactly one cell
/// naming `upper` in the up-edge chain of `lower`, and vice versa
/// (multiplicities included).
pub fn check_reciprocity(g: &Graph) {
    let mut balance: MetroHashMap<(usize, usize), isize> = MetroHashMap::default();

    for (slot, down) in g.v_edges.iter().enumerate() {
        if let Some(down) = down {
            let upper = g.mblocks + slot;
            for lower in down.iter() {
                *balance.entry((upper, lower.0)).or_insert(0) += 1;
            }
        }
    }
    for lower in 0..g.coblocks {
        let mut cursor = g.n_edges[lower];
        while let Some(cell) = cursor {
            let UniCell { value, next } = g.pool.cells[cell.0];
            *balance.entry((value.0, lower)).or_insert(0) -= 1;
            cursor = next;
        }
    }
    for ((upper, lower), count) in balance.iter() {
        assert_eq!(0, *count, "edge {} -> {} is not reciprocal", lower, upper);
    }
}

/// The unsolved edge count of every live upper node must equal the number
/// of unsolved entries in its down-edge list.
pub fn check_edge_counts(g: &Graph) {
    for (slot, down) in g.v_edges.iter().enumerate() {
        if let Some(down) = down {
            let unsolved = down.iter().filter(|d| !g.is_solved(**d)).count();
            assert_eq!(unsolved, g.edge_count[slot],
                       "wrong edge count for node {}", g.mblocks + slot);
        }
    }
}

/// The global unsolved counter must equal the number of message blocks
/// whose solved bit is off, and a done graph has no unsolved message left.
pub fn check_unsolved_count(g: &Graph) {
    let unsolved = (0..g.mblocks).filter(|m| !g.solved[*m]).count();
    assert_eq!(unsolved, g.unsolved_count);
    if g.done {
        assert_eq!(0, g.unsolved_count);
    }
}
