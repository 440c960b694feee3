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

//! This module implements the decoding graph of an Online Code receiver.
//!
//! It is a graph-like data structure whose implementation relies on indices
//! that are used as pseudo pointers. This structure was chosen because it
//! makes it easy to design a tripartite graph (message, auxiliary and check
//! blocks) that can safely be traversed in both directions while nodes and
//! edges keep appearing and disappearing during resolution.
//!
//! Every check or auxiliary node knows the list of lower blocks it XORs
//! together (its *down edges*), and every lower block knows the chained list
//! of upper nodes currently referencing it (its *up edges*). The two
//! families of edges are strictly reciprocal, and that redundancy is the
//! central invariant of the structure.

use bitset_fixed::BitSet;
use tracing::{debug, trace, warn};

use crate::common::{CodeParameters, GraphError, NodeIndex};
use crate::metrics::Metrics;
use crate::pool::{BlockPool, CellIndex, UniCell};

/// This is the struct that represents the decoding graph.
///
/// It is organized as follows: one single integer namespace covers all the
/// blocks taking part in the decode. Message blocks occupy `[0, mblocks)`,
/// auxiliary blocks occupy `[mblocks, coblocks)` and check blocks are
/// appended starting at `coblocks` as they are received. A node is said to
/// be *upper* when it owns down edges (auxiliary and check blocks) and
/// *lower* when it may appear as a dependency of an upper node (message and
/// auxiliary blocks).
///
/// The arrays spanning upper nodes (`v_edges`, `edge_count`) are indexed
/// with `node - mblocks`; the arrays spanning lower nodes (`n_edges`,
/// `solved`) are indexed with the node id itself; `xor_list` spans the whole
/// namespace.
///
/// # Warning
///
/// The structure is not thread safe: one decoding graph is meant to be
/// driven by one single thread, from initialisation to completion.
#[derive(Debug, Clone)]
pub struct Graph {
    /// The number of message blocks (the unknowns of the decode).
    pub mblocks : usize,
    /// The number of auxiliary blocks.
    pub ablocks : usize,
    /// The number of composite blocks (`mblocks + ablocks`).
    pub coblocks: usize,
    /// The number of nodes currently present in the graph. Because message
    /// and auxiliary blocks exist from the start, this is also the id of
    /// the next check block to be ingested.
    pub nodes: usize,
    /// The total size of the node namespace; no node id may ever reach it.
    pub node_space: usize,
    /// The number of message blocks that remain unsolved. The decode is
    /// over when this figure drops to zero.
    pub unsolved_count: usize,
    /// True iff every message block has been solved.
    pub done: bool,
    /// One bit per composite block telling whether the block has been
    /// solved. Check blocks carry their own payload and are implicitly
    /// solved, hence they are not tracked here.
    pub solved: BitSet,
    /// The down-edge lists of the upper nodes (indexed by `node - mblocks`).
    /// A `None` slot belongs to a node that was decommissioned (or to a
    /// check slot that has not been used yet).
    pub v_edges: Vec<Option<Vec<NodeIndex>>>,
    /// The heads of the chained up-edge lists of the lower nodes. The cells
    /// of the chains live in the `pool`.
    pub n_edges: Vec<Option<CellIndex>>,
    /// The number of *unsolved* down edges of each upper node (indexed by
    /// `node - mblocks`). This is the trigger metric of the resolver.
    pub edge_count: Vec<usize>,
    /// The XOR recipe of each solved node: the list of source nodes whose
    /// payloads XOR to the payload of this node. This is the value of the
    /// whole computation.
    pub xor_list: Vec<Option<Vec<NodeIndex>>>,
    /// If present, the head of the pending queue.
    pub phead: Option<CellIndex>,
    /// If present, the tail of the pending queue.
    pub ptail: Option<CellIndex>,
    /// The pool of universal cells backing `n_edges` and the pending queue.
    pub pool: BlockPool,
    /// The instrumentation counters of this graph.
    pub metrics: Metrics,
}

impl Graph {
    /// This creates a new decoding graph for the given code parameters and
    /// auxiliary mapping. The mapping is the flat `mblocks * q` array
    /// produced by the codec: entry `msg * q + j` names the j-th auxiliary
    /// block which message `msg` belongs to.
    ///
    /// The auxiliary <-> message edges are seeded in three passes: the
    /// memberships are counted first, then the down-edge lists are allocated
    /// with their exact capacity, and finally the reciprocal edges are
    /// created.
    pub fn new(params: &CodeParameters, aux_map: &[NodeIndex]) -> Result<Graph, GraphError> {
        params.check()?;

        let mblocks     = params.mblocks;
        let ablocks     = params.ablocks;
        let coblocks    = params.coblocks();
        let check_space = params.check_space();
        let node_space  = coblocks + check_space;

        if aux_map.len() != mblocks * params.q {
            return Err(GraphError::InvalidAuxMapping(format!(
                "auxiliary map has {} entries instead of mblocks * q = {}",
                aux_map.len(), mblocks * params.q)));
        }
        if let Some(aux) = aux_map.iter().find(|a| a.0 < mblocks || a.0 >= coblocks) {
            return Err(GraphError::InvalidAuxMapping(format!(
                "auxiliary map names node {} outside of the auxiliary range [{}, {})",
                aux.0, mblocks, coblocks)));
        }

        let mut graph = Graph {
            mblocks, ablocks, coblocks,
            nodes         : coblocks,
            node_space,
            unsolved_count: mblocks,
            done          : false,
            solved        : BitSet::new(coblocks),
            v_edges       : vec![None; ablocks + check_space],
            n_edges       : vec![None; coblocks],
            edge_count    : vec![0; ablocks + check_space],
            xor_list      : vec![None; node_space],
            phead         : None,
            ptail         : None,
            pool          : BlockPool::new(),
            metrics       : Metrics::default(),
        };

        // 1st pass: count the memberships of each auxiliary block
        for aux in aux_map {
            graph.edge_count[aux.0 - mblocks] += 1;
        }
        // 2nd pass: allocate the down-edge lists with their exact capacity
        for aux in 0..ablocks {
            graph.v_edges[aux] = Some(Vec::with_capacity(graph.edge_count[aux]));
        }
        // 3rd pass: create the message up-edges and fill the down-edge lists
        for (msg, auxes) in aux_map.chunks(params.q).enumerate() {
            for &aux in auxes {
                graph.create_n_edge(aux, NodeIndex(msg));
                if let Some(down) = graph.v_edges[aux.0 - mblocks].as_mut() {
                    down.push(NodeIndex(msg));
                }
            }
        }

        debug!(mblocks, ablocks, check_space, "decoding graph initialised");
        Ok(graph)
    }

    /// Returns true iff the given node is a message block.
    pub fn is_message(&self, node: NodeIndex) -> bool {
        node.0 < self.mblocks
    }
    /// Returns true iff the given node is an auxiliary block.
    pub fn is_aux(&self, node: NodeIndex) -> bool {
        node.0 >= self.mblocks && node.0 < self.coblocks
    }
    /// Returns true iff the given node is a check block.
    pub fn is_check(&self, node: NodeIndex) -> bool {
        node.0 >= self.coblocks
    }
    /// Returns true iff the given node has a known payload. Check blocks
    /// are received off the wire and are therefore always solved; message
    /// and auxiliary blocks become solved during resolution.
    pub fn is_solved(&self, node: NodeIndex) -> bool {
        node.0 >= self.coblocks || self.solved[node.0]
    }
    /// Returns true iff every message block has been solved.
    pub fn is_done(&self) -> bool {
        self.done
    }
    /// Returns the XOR recipe of the given node if that node has one: the
    /// payloads of the nodes named by the recipe XOR to the payload of
    /// `node`. Source indices may themselves be check blocks or previously
    /// solved blocks; it is up to the downstream executor to resolve them.
    pub fn recipe(&self, node: NodeIndex) -> Option<&[NodeIndex]> {
        self.xor_list.get(node.0).and_then(|recipe| recipe.as_deref())
    }

    /// Installs a new check block into the graph. The `edges` vector names
    /// the lower blocks whose payloads were XORed together by the encoder
    /// to produce this check block; its ownership transfers to the graph.
    ///
    /// Down edges towards already solved blocks are pruned on the spot and
    /// folded into the initial XOR recipe of the node (which always starts
    /// with the node itself). The remaining down edges get their reciprocal
    /// up edges, and the node is queued for resolution.
    ///
    /// # Example
    /// ```
    /// # use oncode::common::{CodeParameters, NodeIndex};
    /// # use oncode::graph::Graph;
    /// let params = CodeParameters::builder()
    ///     .mblocks(2).ablocks(1).q(1).fudge(1.5)
    ///     .build().unwrap();
    /// let aux_map   = vec![NodeIndex(2), NodeIndex(2)];
    /// let mut graph = Graph::new(&params, &aux_map).unwrap();
    ///
    /// let node = graph.add_check_block(vec![NodeIndex(0), NodeIndex(1)]).unwrap();
    /// assert_eq!(NodeIndex(3), node);
    /// ```
    pub fn add_check_block(&mut self, mut edges: Vec<NodeIndex>) -> Result<NodeIndex, GraphError> {
        if self.nodes >= self.node_space {
            return Err(GraphError::CapacityExhausted {
                nodes     : self.nodes,
                node_space: self.node_space,
            });
        }
        if let Some(bad) = edges.iter().find(|e| e.0 >= self.coblocks) {
            return Err(GraphError::InvalidCheckBlock {
                node    : bad.0,
                coblocks: self.coblocks,
            });
        }

        let node = NodeIndex(self.nodes);
        self.nodes += 1;

        // Solved blocks go to the xor list, unsolved blocks have up edges
        // created for them.
        let mut recipe = vec![node];
        let mut i = 0;
        while i < edges.len() {
            let lower = edges[i];
            if self.is_solved(lower) {
                recipe.push(edges.swap_remove(i));
            } else {
                self.create_n_edge(node, lower);
                i += 1;
            }
        }

        trace!(node = node.0, unsolved = edges.len(), pruned = recipe.len() - 1,
               "ingested check block");

        let slot = node.0 - self.mblocks;
        self.edge_count[slot] = edges.len();
        self.v_edges[slot]    = Some(edges);
        self.xor_list[node.0] = Some(recipe);

        self.push_pending(node);
        Ok(node)
    }

    /// Creates the up edge `lower -> upper`, reciprocal of the down edge
    /// `upper -> lower` which the caller is responsible for maintaining.
    pub(crate) fn create_n_edge(&mut self, upper: NodeIndex, lower: NodeIndex) {
        debug_assert!(upper.0 > lower.0, "up edges always point upwards");
        debug_assert!(upper.0 >= self.mblocks);
        trace!(lower = lower.0, upper = upper.0, "adding n edge");

        let head = self.n_edges[lower.0];
        self.n_edges[lower.0] = Some(self.pool.acquire(upper, head));
    }

    /// Deletes the up edge `lower -> upper`, unlinking the first cell of
    /// the lower node's chain whose value equals `upper` and returning that
    /// cell to the pool. When `decrement` is set, the unsolved edge count
    /// of `upper` is decremented as well.
    ///
    /// A missing edge is a logic error: it trips an assertion in debug
    /// builds and degrades to a warning in release builds.
    pub(crate) fn delete_n_edge(&mut self, upper: NodeIndex, lower: NodeIndex, decrement: bool) {
        debug_assert!(upper.0 > lower.0);
        debug_assert!(upper.0 >= self.mblocks);
        trace!(lower = lower.0, upper = upper.0, "deleting n edge");

        self.metrics.delete_n_calls += 1;

        if decrement {
            let slot = upper.0 - self.mblocks;
            debug_assert!(self.edge_count[slot] > 0, "edge count of {} exhausted", upper.0);
            self.edge_count[slot] = self.edge_count[slot].saturating_sub(1);
        }

        let mut hops   = 0;
        let mut prev   : Option<CellIndex> = None;
        let mut cursor = self.n_edges[lower.0];
        while let Some(cell) = cursor {
            let UniCell { value, next } = self.pool.cells[cell.0];
            if value == upper {
                match prev {
                    Some(p) => self.pool.cells[p.0].next = next,
                    None    => self.n_edges[lower.0]     = next,
                }
                self.metrics.delete_n_seek_length += hops;
                self.metrics.delete_n_max_seek = self.metrics.delete_n_max_seek.max(hops);
                self.pool.release(cell);
                return;
            }
            prev   = Some(cell);
            cursor = next;
            hops  += 1;
        }

        debug_assert!(false, "up edge {} -> {} did not exist", lower.0, upper.0);
        warn!(lower = lower.0, upper = upper.0, "up edge did not exist");
    }

    /// Retires a node whose information is exhausted: every remaining
    /// reciprocal up edge is deleted (without touching the unsolved edge
    /// counts) and the down-edge list is freed. Nodes may be decommissioned
    /// twice; the second call is a no-op.
    pub(crate) fn decommission(&mut self, node: NodeIndex) {
        debug_assert!(node.0 >= self.mblocks);

        let down = match self.v_edges[node.0 - self.mblocks].take() {
            Some(down) => down,
            None       => return,
        };
        trace!(node = node.0, edges = down.len(), "decommissioning node");

        for &lower in down.iter() {
            self.delete_n_edge(node, lower, false);
        }
    }

    /// Works up from the newly solved block `node`: the unsolved edge count
    /// of every upper node referencing it is decremented, and any upper
    /// node whose count drops below two is queued for resolution (a count
    /// of one makes it a propagation candidate, a count of zero an
    /// auxiliary-rule or decommission candidate).
    pub(crate) fn cascade(&mut self, node: NodeIndex) {
        debug_assert!(node.0 < self.coblocks);
        trace!(node = node.0, "cascading from node");

        let mut cursor = self.n_edges[node.0];
        while let Some(cell) = cursor {
            let UniCell { value: to, next } = self.pool.cells[cell.0];
            debug_assert!(to != node);

            let slot = to.0 - self.mblocks;
            debug_assert!(self.edge_count[slot] > 0, "edge count of {} exhausted", to.0);
            self.edge_count[slot] = self.edge_count[slot].saturating_sub(1);
            if self.edge_count[slot] < 2 {
                self.push_pending(to);
            }
            cursor = next;
        }
    }

    /// Appends the given node at the tail of the pending queue. Membership
    /// is advisory: a queued node may well turn out to be unresolvable (or
    /// already retired) by the time it is popped.
    pub(crate) fn push_pending(&mut self, node: NodeIndex) {
        self.metrics.push_pending_calls += 1;
        self.metrics.pending_fill_level += 1;
        self.metrics.pending_max_full =
            self.metrics.pending_max_full.max(self.metrics.pending_fill_level);

        let cell = self.pool.acquire(node, None);
        match self.ptail {
            Some(tail) => self.pool.cells[tail.0].next = Some(cell),
            None       => self.phead = Some(cell),
        }
        self.ptail = Some(cell);
    }

    /// Removes and returns the node at the head of the pending queue (its
    /// cell goes straight back to the pool). Returns `None` when the queue
    /// is empty.
    pub(crate) fn shift_pending(&mut self) -> Option<NodeIndex> {
        let head = self.phead?;
        let UniCell { value, next } = self.pool.cells[head.0];

        self.phead = next;
        if next.is_none() {
            self.ptail = None;
        }
        self.metrics.pending_fill_level -= 1;
        self.pool.release(head);
        Some(value)
    }

    /// Drains whatever is left of the pending queue, returning the cells to
    /// the pool. Used once the decode completes: any still-queued node is
    /// stale by definition.
    pub(crate) fn flush_pending(&mut self) {
        while self.shift_pending().is_some() {}
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
