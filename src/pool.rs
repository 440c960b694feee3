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

//! This module implements the pool of universal cells underlying the up-edge
//! lists and the pending queue of a decoding graph.
//!
//! Cells are stored in one single arena and addressed with indices that are
//! used as pseudo pointers. This structure was chosen because it makes it
//! easy to design chained lists that can safely be traversed and spliced
//! without touching the allocator: the cells of deleted edges and consumed
//! queue entries return to an internal free list and are handed out again by
//! later acquisitions.

use crate::common::NodeIndex;

/// This is a type safe abstraction of a cell index. It serves as a
/// pseudo-pointer to fetch the information (`UniCell`) associated with some
/// cell of the `BlockPool` arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CellIndex(pub usize);

/// One universal cell. The same `(value, next)` pair serves two purposes:
/// as an entry of some lower node's up-edge list (in which case `value`
/// names the upper node of the edge), and as an entry of the pending queue
/// (in which case `value` names the node awaiting resolution). Cells on the
/// free list only use their `next` field.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniCell {
    /// The payload of the cell (an upper node or a pending node).
    pub value: NodeIndex,
    /// If present, the index of the next cell of the chain this cell
    /// belongs to.
    pub next : Option<CellIndex>,
}

/// The pool of universal cells used by a decoding graph. `acquire` pops a
/// recycled cell from the head of the free list and only grows the arena
/// when the free list is empty; `release` appends the cell at the tail of
/// the free list, so cells are reused in FIFO order.
///
/// Each graph instance owns its pool, and the pool is not required for
/// correctness: it merely spares the allocator the edge and queue churn of
/// the resolution inner loop.
#[derive(Debug, Clone, Default)]
pub struct BlockPool {
    /// This is the complete list with all the cells of the pool. The
    /// position a `CellIndex` refers to is to be understood as a position
    /// in this vector.
    pub cells: Vec<UniCell>,
    /// If present, the index of the first recyclable cell.
    pub free_head: Option<CellIndex>,
    /// If present, the index of the last recyclable cell.
    pub free_tail: Option<CellIndex>,
}

impl BlockPool {
    /// This creates a new empty pool.
    pub fn new() -> Self {
        Self::default()
    }
    /// Hands out a cell holding the given `value` and `next` fields. The
    /// cell is recycled off the free list whenever possible and freshly
    /// appended to the arena otherwise.
    pub fn acquire(&mut self, value: NodeIndex, next: Option<CellIndex>) -> CellIndex {
        match self.free_head {
            Some(head) => {
                self.free_head = self.cells[head.0].next;
                if self.free_head.is_none() {
                    self.free_tail = None;
                }
                self.cells[head.0] = UniCell { value, next };
                head
            }
            None => {
                let idx = CellIndex(self.cells.len());
                self.cells.push(UniCell { value, next });
                idx
            }
        }
    }
    /// Returns the given cell to the free list. The cell must no longer be
    /// referenced by any chain of the graph.
    pub fn release(&mut self, cell: CellIndex) {
        self.cells[cell.0].next = None;
        match self.free_tail {
            Some(tail) => self.cells[tail.0].next = Some(cell),
            None       => self.free_head = Some(cell),
        }
        self.free_tail = Some(cell);
    }
    /// Returns the total number of cells held in the arena (free cells
    /// included).
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    /// Returns true iff the arena holds no cell at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    /// Counts the cells currently sitting on the free list.
    pub fn free_count(&self) -> usize {
        let mut count  = 0;
        let mut cursor = self.free_head;
        while let Some(cell) = cursor {
            count += 1;
            cursor = self.cells[cell.0].next;
        }
        count
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
