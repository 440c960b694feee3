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

//! This module implements the resolver of the decoding graph: the worker
//! that drains the pending queue and applies the two local reduction rules
//! of Online Codes decoding until every message block is solved.
//!
//! - The *auxiliary rule* solves an unsolved auxiliary block once all of its
//!   down edges are solved: its down-edge list becomes its XOR recipe.
//! - The *propagation rule* lets a solved check or auxiliary block with
//!   exactly one unsolved down edge solve that remaining edge: the recipe of
//!   the newly solved block is the recipe of its solver plus the solver's
//!   other (solved) down edges.
//!
//! Each newly solved block *cascades*: the unsolved edge counts of the upper
//! nodes referencing it are decremented, which may queue more work. The
//! queue being FIFO, a deterministic input sequence of check blocks yields a
//! deterministic emission order of solved blocks.

use tracing::{debug, trace};

use crate::common::NodeIndex;
use crate::graph::Graph;

/// The outcome of one resolver run: whether the decode is complete, and the
/// blocks newly solved during this call (in emission order, each carrying
/// its XOR recipe in the graph).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Resolution {
    /// True iff every message block is now solved.
    pub done: bool,
    /// The nodes solved during this call, in the order they were solved.
    pub solved: Vec<NodeIndex>,
}

impl Graph {
    /// Drains the pending queue, resolving nodes until the queue empties or
    /// every message block is solved. Returns the list of newly solved
    /// blocks; when it comes back non-`done` with an empty queue, the
    /// caller needs to supply another check block.
    pub fn resolve(&mut self) -> Resolution {
        self.run_resolver(false)
    }

    /// Same as [`resolve`](Graph::resolve), but returns after at most one
    /// newly solved block. This lets the caller process payloads
    /// incrementally instead of receiving solved blocks in batches.
    pub fn resolve_step(&mut self) -> Resolution {
        self.run_resolver(true)
    }

    fn run_resolver(&mut self, stepping: bool) -> Resolution {
        let mut newly_solved = vec![];

        if self.unsolved_count == 0 {
            self.done = true;
        }

        while !self.done {
            let from = match self.shift_pending() {
                Some(node) => node,
                None       => break,
            };
            debug_assert!(from.0 >= self.mblocks, "only upper nodes get queued");

            let unsolved_edges = self.edge_count[from.0 - self.mblocks];
            trace!(from = from.0, unsolved_edges, "starting resolution");

            if unsolved_edges > 1 {
                // cannot fire yet; the cascade will queue it again if it
                // ever becomes resolvable
                continue;
            }

            if unsolved_edges == 0 {
                // The first test matches check blocks, the second matches a
                // previously solved auxiliary block. In either case the node
                // carries no new information and can leave the graph.
                if self.is_check(from) || self.solved[from.0] {
                    self.decommission(from);
                    continue;
                }
                self.aux_rule(from);
                newly_solved.push(from);
                self.cascade(from);
            } else {
                // An unsolved auxiliary block carries one unknown but has
                // not been solved itself: it cannot propagate anything yet.
                if self.is_aux(from) && !self.solved[from.0] {
                    continue;
                }

                let to = self.propagation_rule(from);
                newly_solved.push(to);

                if self.is_message(to) {
                    self.unsolved_count -= 1;
                    if self.unsolved_count == 0 {
                        self.done = true;
                        self.flush_pending();
                        break;
                    }
                } else {
                    // a solved auxiliary block may have more to give:
                    // queue it for another look
                    self.push_pending(to);
                }
                self.cascade(to);
            }

            if stepping {
                break;
            }
        }

        if self.done {
            debug!("decoding complete\n{}", self.metrics);
        }
        Resolution { done: self.done, solved: newly_solved }
    }

    /// The auxiliary rule: `aux` is an unsolved auxiliary block none of
    /// whose down edges remain unsolved. The block is marked solved and its
    /// down-edge list *becomes* its XOR recipe (an auxiliary block is, by
    /// construction, the XOR of its members). The reciprocal up edges are
    /// deleted without decrementing this node's own edge count: the node is
    /// being retired, so the count no longer matters.
    fn aux_rule(&mut self, aux: NodeIndex) {
        debug_assert!(self.is_aux(aux));
        debug_assert!(!self.solved[aux.0], "auxiliary rule fired twice on {}", aux.0);
        trace!(node = aux.0, "auxiliary rule");

        self.solved.set(aux.0, true);

        let recipe = self.v_edges[aux.0 - self.mblocks].take()
            .expect("auxiliary rule fired on a decommissioned node");
        for &lower in recipe.iter() {
            self.delete_n_edge(aux, lower, false);
        }
        self.xor_list[aux.0] = Some(recipe);
    }

    /// The propagation rule: `from` is a solved check or auxiliary block
    /// with exactly one unsolved down edge `to`. Solving `to` captures the
    /// identity `to = from XOR (other down edges of from)`, where `from`
    /// itself equals the XOR of its recipe. The `from` node is spent
    /// afterwards and gets decommissioned.
    fn propagation_rule(&mut self, from: NodeIndex) -> NodeIndex {
        let slot = from.0 - self.mblocks;
        let mut edges = self.v_edges[slot].take()
            .expect("propagation rule fired on a decommissioned node");

        let mut found = None;
        for (i, &lower) in edges.iter().enumerate() {
            if !self.is_solved(lower) {
                found = Some((i, lower));
                break;
            }
        }
        let (pos, to) = found.expect("propagation rule fired without an unsolved down edge");

        edges.swap_remove(pos);
        self.delete_n_edge(from, to, true);

        let from_recipe = self.xor_list[from.0].as_ref()
            .expect("solved node has no xor recipe");
        let mut recipe = Vec::with_capacity(from_recipe.len() + edges.len());
        recipe.extend_from_slice(from_recipe);
        recipe.extend_from_slice(&edges);

        trace!(from = from.0, to = to.0, "propagation rule");

        debug_assert!(!self.solved[to.0], "node {} solved twice", to.0);
        debug_assert!(self.xor_list[to.0].is_none(), "node {} already has a recipe", to.0);
        self.solved.set(to.0, true);
        self.xor_list[to.0] = Some(recipe);

        // put the (now depleted) down edges back so decommission can clean
        // up their reciprocals
        self.v_edges[slot] = Some(edges);
        self.decommission(from);

        to
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_resolver {
    use crate::common::NodeIndex;
    use crate::graph::Graph;
    use crate::test_utils::{
        audit, chain_map, chain_params, scenario_map, scenario_params, tiny_map, tiny_params,
    };

    #[test]
    fn resolve_on_an_empty_queue_is_not_done() {
        let mut g = Graph::new(&scenario_params(), &scenario_map()).unwrap();
        let outcome = g.resolve();
        assert!(!outcome.done);
        assert!(outcome.solved.is_empty());
    }
    #[test]
    fn a_degree_one_check_block_solves_its_message_directly() {
        let mut g = Graph::new(&scenario_params(), &scenario_map()).unwrap();

        let node = g.add_check_block(vec![NodeIndex(0)]).unwrap();
        let outcome = g.resolve();

        assert!(!outcome.done);
        assert_eq!(vec![NodeIndex(0)], outcome.solved);
        assert_eq!(Some(&[node][..]), g.recipe(NodeIndex(0)));
        assert!(g.is_solved(NodeIndex(0)));
        audit(&g);
    }
    #[test]
    fn four_degree_one_check_blocks_solve_everything() {
        let mut g = Graph::new(&scenario_params(), &scenario_map()).unwrap();

        let mut emitted = vec![];
        for m in 0..4 {
            let _ = g.add_check_block(vec![NodeIndex(m)]).unwrap();
            let outcome = g.resolve();
            emitted.extend(outcome.solved);
            assert_eq!(m == 3, outcome.done);
            audit(&g);
        }

        assert!(g.is_done());
        // the third message cascades the auxiliary rule on node 4
        assert_eq!(vec![NodeIndex(0), NodeIndex(1), NodeIndex(2), NodeIndex(4), NodeIndex(3)],
                   emitted);
        assert_eq!(Some(&[NodeIndex(6)][..]), g.recipe(NodeIndex(0)));
        assert_eq!(Some(&[NodeIndex(7)][..]), g.recipe(NodeIndex(1)));
        assert_eq!(Some(&[NodeIndex(8)][..]), g.recipe(NodeIndex(2)));
        assert_eq!(Some(&[NodeIndex(9)][..]), g.recipe(NodeIndex(3)));
        // the auxiliary recipe lists its members, duplicates included
        assert_eq!(Some(&[NodeIndex(0), NodeIndex(1), NodeIndex(1), NodeIndex(2)][..]),
                   g.recipe(NodeIndex(4)));
    }
    #[test]
    fn the_auxiliary_rule_fires_when_the_last_member_gets_solved() {
        let mut g = Graph::new(&chain_params(), &chain_map()).unwrap();

        g.add_check_block(vec![NodeIndex(0)]).unwrap();
        let outcome = g.resolve();
        assert_eq!(vec![NodeIndex(0)], outcome.solved);

        g.add_check_block(vec![NodeIndex(1)]).unwrap();
        let outcome = g.resolve();
        assert_eq!(vec![NodeIndex(1), NodeIndex(4)], outcome.solved);
        assert_eq!(Some(&[NodeIndex(0), NodeIndex(1)][..]), g.recipe(NodeIndex(4)));
        assert!(!outcome.done);
        audit(&g);
    }
    #[test]
    fn a_check_block_over_a_solved_auxiliary_brings_no_information() {
        let mut g = Graph::new(&chain_params(), &chain_map()).unwrap();

        g.add_check_block(vec![NodeIndex(0)]).unwrap();
        g.add_check_block(vec![NodeIndex(1)]).unwrap();
        g.resolve();
        assert!(g.is_solved(NodeIndex(4)));

        g.add_check_block(vec![NodeIndex(4)]).unwrap();
        let outcome = g.resolve();
        assert!(outcome.solved.is_empty());
        assert_eq!(2, g.unsolved_count);
        audit(&g);
    }
    #[test]
    fn the_propagation_rule_solves_the_last_unknown_of_a_check_block() {
        let mut g = Graph::new(&tiny_params(1.5), &tiny_map()).unwrap();

        g.add_check_block(vec![NodeIndex(0), NodeIndex(1)]).unwrap();
        let outcome = g.resolve();
        assert!(!outcome.done);
        assert!(outcome.solved.is_empty());

        g.add_check_block(vec![NodeIndex(0)]).unwrap();
        let outcome = g.resolve();
        assert!(outcome.done);
        assert_eq!(vec![NodeIndex(0), NodeIndex(1)], outcome.solved);
        assert_eq!(Some(&[NodeIndex(4)][..]), g.recipe(NodeIndex(0)));
        assert_eq!(Some(&[NodeIndex(3), NodeIndex(0)][..]), g.recipe(NodeIndex(1)));
        audit(&g);
    }
    #[test]
    fn a_solved_auxiliary_propagates_to_its_last_unsolved_member() {
        let mut g = Graph::new(&tiny_params(1.5), &tiny_map()).unwrap();

        // a check block covering only the auxiliary solves it by propagation
        g.add_check_block(vec![NodeIndex(2)]).unwrap();
        let outcome = g.resolve();
        assert_eq!(vec![NodeIndex(2)], outcome.solved);
        assert_eq!(Some(&[NodeIndex(3)][..]), g.recipe(NodeIndex(2)));
        assert!(!outcome.done);
        audit(&g);

        // solving message 0 leaves the auxiliary with one unknown: message 1
        g.add_check_block(vec![NodeIndex(0)]).unwrap();
        let outcome = g.resolve();
        assert!(outcome.done);
        assert_eq!(vec![NodeIndex(0), NodeIndex(1)], outcome.solved);
        assert_eq!(Some(&[NodeIndex(3), NodeIndex(0)][..]), g.recipe(NodeIndex(1)));
        audit(&g);
    }
    #[test]
    fn stale_pending_entries_are_discarded_without_a_duplicate_solve() {
        // three messages all belonging to the same auxiliary block
        let params = crate::common::CodeParameters::builder()
            .mblocks(3).ablocks(1).q(1)
            .build().unwrap();
        let map = vec![NodeIndex(3), NodeIndex(3), NodeIndex(3)];
        let mut g = Graph::new(&params, &map).unwrap();

        // node 4 gets queued once at ingest and twice more by cascades;
        // by the time the stale entries surface it has been decommissioned
        g.add_check_block(vec![NodeIndex(0), NodeIndex(1)]).unwrap();
        g.add_check_block(vec![NodeIndex(0)]).unwrap();
        g.add_check_block(vec![NodeIndex(1)]).unwrap();

        let outcome = g.resolve();
        assert!(!outcome.done);
        assert_eq!(vec![NodeIndex(0), NodeIndex(1)], outcome.solved);
        assert_eq!(1, g.unsolved_count);
        assert!(g.v_edges[NodeIndex(4).0 - g.mblocks].is_none());
        assert!(g.phead.is_none());
        audit(&g);
    }
    #[test]
    fn resolve_step_emits_at_most_one_solved_block_per_call() {
        let mut g = Graph::new(&tiny_params(1.5), &tiny_map()).unwrap();

        g.add_check_block(vec![NodeIndex(0), NodeIndex(1)]).unwrap();
        g.add_check_block(vec![NodeIndex(0)]).unwrap();

        let outcome = g.resolve_step();
        assert!(!outcome.done);
        assert_eq!(vec![NodeIndex(0)], outcome.solved);

        let outcome = g.resolve_step();
        assert!(outcome.done);
        assert_eq!(vec![NodeIndex(1)], outcome.solved);

        let outcome = g.resolve_step();
        assert!(outcome.done);
        assert!(outcome.solved.is_empty());
    }
    #[test]
    fn resolving_a_finished_graph_stays_done_and_solves_nothing() {
        let mut g = Graph::new(&tiny_params(1.5), &tiny_map()).unwrap();

        g.add_check_block(vec![NodeIndex(0)]).unwrap();
        g.add_check_block(vec![NodeIndex(1)]).unwrap();
        assert!(g.resolve().done);

        let outcome = g.resolve();
        assert!(outcome.done);
        assert!(outcome.solved.is_empty());
    }
    #[test]
    fn a_fully_solved_check_block_leaves_the_progress_unchanged() {
        let mut g = Graph::new(&tiny_params(1.5), &tiny_map()).unwrap();

        g.add_check_block(vec![NodeIndex(0)]).unwrap();
        let outcome = g.resolve();
        assert_eq!(vec![NodeIndex(0)], outcome.solved);

        // same check block again: its only edge is already solved
        g.add_check_block(vec![NodeIndex(0)]).unwrap();
        let outcome = g.resolve();
        assert!(outcome.solved.is_empty());
        assert!(!outcome.done);
        assert_eq!(1, g.unsolved_count);
        audit(&g);
    }
    #[test]
    fn termination_flushes_the_pending_queue() {
        let mut g = Graph::new(&scenario_params(), &scenario_map()).unwrap();

        for m in 0..4 {
            g.add_check_block(vec![NodeIndex(m)]).unwrap();
        }
        let outcome = g.resolve();
        assert!(outcome.done);
        assert!(g.phead.is_none());
        assert!(g.ptail.is_none());
        assert_eq!(0, g.metrics.pending_fill_level);
    }
}
