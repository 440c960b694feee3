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

//! This module holds the measurements relating to the key bottlenecks of the
//! decoder: the linear scans performed when up-edges are deleted, and the
//! fill level of the pending queue. The counters are purely informative and
//! play no part in the decoding itself.

use std::fmt;

/// Measurements accumulated over the lifetime of a decoding graph. The
/// structure implements `Display` so the whole report can be dumped as
/// free-form text once decoding terminates.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Metrics {
    /// The number of calls to the up-edge deletion routine.
    pub delete_n_calls: usize,
    /// The total number of hops performed while seeking edges to delete.
    pub delete_n_seek_length: usize,
    /// The longest single seek performed by the up-edge deletion routine.
    pub delete_n_max_seek: usize,
    /// The number of entries ever pushed onto the pending queue.
    pub push_pending_calls: usize,
    /// The current number of entries sitting in the pending queue.
    pub pending_fill_level: usize,
    /// The highest fill level ever reached by the pending queue.
    pub pending_max_full: usize,
}

impl Metrics {
    /// The average number of hops per up-edge deletion (0 when no deletion
    /// ever took place).
    pub fn avg_seek_length(&self) -> f64 {
        if self.delete_n_calls == 0 {
            0.0
        } else {
            self.delete_n_seek_length as f64 / self.delete_n_calls as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Information on up-edge deletion:")?;
        writeln!(f, "  Total Calls = {}", self.delete_n_calls)?;
        writeln!(f, "  Total Seeks = {}", self.delete_n_seek_length)?;
        writeln!(f, "  Avg.  Seeks = {}", self.avg_seek_length())?;
        writeln!(f, "  Max.  Seek  = {}", self.delete_n_max_seek)?;
        writeln!(f)?;
        writeln!(f, "Information on pending queue:")?;
        writeln!(f, "  Total push calls = {}", self.push_pending_calls)?;
        write!  (f, "  Max. Fill Level  = {}", self.pending_max_full)
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
