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

//! This module defines the most basic data types that are used throughout all
//! the code of our library. These are also the types your client code is
//! likely to work with.
//!
//! In particular, this module comprises the definition of the following types:
//! - `NodeIndex`
//! - `CodeParameters` (+ associated `CodeParametersBuilder`)
//! - `GraphError`

use derive_builder::Builder;
use thiserror::Error;

// ----------------------------------------------------------------------------
// --- NODE INDEX -------------------------------------------------------------
// ----------------------------------------------------------------------------
/// This is a type safe abstraction of a node index. All the blocks taking
/// part in a decoding session live in one single integer namespace: message
/// blocks come first (`[0, mblocks)`), then auxiliary blocks
/// (`[mblocks, coblocks)`) and finally the check blocks which are appended
/// to the namespace as they are received (`[coblocks, coblocks+check_space)`).
///
/// A `NodeIndex` serves as a pseudo-pointer to fetch the information
/// associated with some node in the decoding `Graph`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeIndex(pub usize);
impl NodeIndex {
    #[inline]
    /// This function returns the id (numeric value) of the node index.
    ///
    /// # Examples:
    /// ```
    /// # use oncode::common::NodeIndex;
    /// assert_eq!(0, NodeIndex(0).id());
    /// assert_eq!(1, NodeIndex(1).id());
    /// assert_eq!(2, NodeIndex(2).id());
    /// ```
    pub fn id(self) -> usize {
        self.0
    }
}

// ----------------------------------------------------------------------------
// --- CODE PARAMETERS --------------------------------------------------------
// ----------------------------------------------------------------------------
/// The parameters of an Online Code, as agreed upon between the encoder and
/// the decoder. These fully determine the shape of the decoding graph: the
/// number of message and auxiliary blocks, the per-message auxiliary degree
/// `q`, the overhead factor `e` and the `fudge` multiplier which scales the
/// space reserved for incoming check blocks.
///
/// The `q`, `e` and `fudge` fields default to the classic Online Codes
/// values (`q = 3`, `e = 0.01`, `fudge = 1.2`), so in the common case only
/// the block counts need to be supplied.
///
/// # Example
/// ```
/// # use oncode::common::CodeParameters;
/// let params = CodeParameters::builder()
///     .mblocks(8)
///     .ablocks(2)
///     .q(2)
///     .build()
///     .unwrap();
///
/// assert_eq!(10, params.coblocks());
/// assert_eq!(10, params.check_space());
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct CodeParameters {
    /// The number of message blocks (the unknowns of the decoding problem).
    pub mblocks: usize,
    /// The number of auxiliary blocks interleaved with the message blocks.
    pub ablocks: usize,
    /// The number of auxiliary blocks each message block belongs to.
    #[builder(default = "3")]
    pub q: usize,
    /// The expected overhead of the code; with it, the expected number of
    /// check blocks required to decode is `(1 + q*e) * mblocks`.
    #[builder(default = "0.01")]
    pub e: f64,
    /// A multiplier (strictly greater than one) applied to the expected
    /// number of check blocks when sizing the check node space.
    #[builder(default = "1.2")]
    pub fudge: f64,
}

impl CodeParameters {
    /// Returns a builder to configure and validate a set of parameters.
    pub fn builder() -> CodeParametersBuilder {
        CodeParametersBuilder::default()
    }
    /// The number of *composite* blocks: message and auxiliary blocks
    /// together. Composite blocks are the possible down-edge targets of a
    /// check block.
    pub fn coblocks(&self) -> usize {
        self.mblocks + self.ablocks
    }
    /// The number of slots reserved for incoming check blocks, that is
    /// `ceil(fudge * (1 + q*e) * mblocks)`.
    pub fn check_space(&self) -> usize {
        (self.fudge * (1.0 + self.q as f64 * self.e) * self.mblocks as f64).ceil() as usize
    }
    /// The total size of the node namespace (`coblocks + check_space`).
    pub fn node_space(&self) -> usize {
        self.coblocks() + self.check_space()
    }
    /// Verifies that the parameters are usable for decoding. This is
    /// enforced by the builder, but parameters may also be assembled by
    /// hand, in which case the graph revalidates them at creation time.
    pub fn check(&self) -> Result<(), GraphError> {
        if self.mblocks < 1 {
            return Err(GraphError::InvalidParameters(format!(
                "mblocks ({}) invalid", self.mblocks)));
        }
        if self.ablocks < 1 {
            return Err(GraphError::InvalidParameters(format!(
                "ablocks ({}) invalid", self.ablocks)));
        }
        if self.q < 1 {
            return Err(GraphError::InvalidParameters(format!(
                "q ({}) invalid", self.q)));
        }
        if !(self.e > 0.0) {
            return Err(GraphError::InvalidParameters(format!(
                "e ({}) must be positive", self.e)));
        }
        if !(self.fudge > 1.0) {
            return Err(GraphError::InvalidParameters(format!(
                "fudge factor ({}) <= 1.0", self.fudge)));
        }
        Ok(())
    }
}

impl CodeParametersBuilder {
    /// Pre-build validation hook: rejects any value that would fail
    /// `CodeParameters::check` before the structure is even assembled.
    fn validate(&self) -> Result<(), String> {
        if let Some(mblocks) = self.mblocks {
            if mblocks < 1 {
                return Err(format!("mblocks ({}) invalid", mblocks));
            }
        }
        if let Some(ablocks) = self.ablocks {
            if ablocks < 1 {
                return Err(format!("ablocks ({}) invalid", ablocks));
            }
        }
        if let Some(q) = self.q {
            if q < 1 {
                return Err(format!("q ({}) invalid", q));
            }
        }
        if let Some(e) = self.e {
            if !(e > 0.0) {
                return Err(format!("e ({}) must be positive", e));
            }
        }
        if let Some(fudge) = self.fudge {
            if !(fudge > 1.0) {
                return Err(format!("fudge factor ({}) <= 1.0", fudge));
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// --- ERRORS -----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The errors related to the management of a decoding graph. Nothing is ever
/// retried internally: it is up to the caller to decide whether to fix the
/// inputs, supply more check blocks, or abandon the decode.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum GraphError {
    /// Occurs when the code parameters make no sense (zero block counts,
    /// fudge factor not greater than one, ...). Fatal for the instance.
    #[error("graph init: {0}")]
    InvalidParameters(String),
    /// Occurs when the auxiliary mapping does not have the advertised
    /// `mblocks * q` shape or names a node outside of the auxiliary range.
    #[error("graph init: {0}")]
    InvalidAuxMapping(String),
    /// Occurs when an incoming check block names a node outside of the
    /// composite range `[0, coblocks)`.
    #[error("check block names node {node} outside of the composite range (coblocks = {coblocks})")]
    InvalidCheckBlock {
        /// The offending node index.
        node: usize,
        /// The exclusive upper bound of the composite range.
        coblocks: usize,
    },
    /// Occurs when more check blocks are ingested than the graph has room
    /// for. The graph itself is left untouched: the caller may still drain
    /// the resolver, but no further check block can be accepted.
    #[error("no space left for check blocks ({nodes}/{node_space})")]
    CapacityExhausted {
        /// The number of nodes currently present in the graph.
        nodes: usize,
        /// The total size of the node namespace.
        node_space: usize,
    },
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
