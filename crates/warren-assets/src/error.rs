//! Asset loading errors.
//!
//! Every variant is a fatal construction error: the manager refuses to
//! start on malformed collision input rather than simulating with a
//! broken physics table.

use std::error::Error;
use std::fmt;

/// Errors from collision hull import and table construction.
#[derive(Clone, Debug, PartialEq)]
pub enum AssetError {
    /// A source line could not be parsed.
    MalformedLine {
        /// Object whose hull source failed.
        object: String,
        /// 1-based line number in the source.
        line: usize,
        /// What was wrong with the line.
        detail: String,
    },
    /// A vertex coordinate was NaN or infinite.
    NonFiniteVertex {
        /// Object whose hull source failed.
        object: String,
        /// 1-based line number in the source.
        line: usize,
    },
    /// A face referenced a vertex that does not exist.
    FaceIndexOutOfRange {
        /// Object whose hull source failed.
        object: String,
        /// 1-based line number in the source.
        line: usize,
        /// The offending 1-based index.
        index: i64,
        /// Number of vertices parsed so far.
        vertex_count: usize,
    },
    /// The hull has no usable volume: fewer than 4 vertices, all
    /// vertices coplanar, or no faces at all.
    DegenerateHull {
        /// Object whose hull is degenerate.
        object: String,
        /// Why the hull was rejected.
        reason: String,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine {
                object,
                line,
                detail,
            } => {
                write!(f, "collision hull '{object}' line {line}: {detail}")
            }
            Self::NonFiniteVertex { object, line } => {
                write!(
                    f,
                    "collision hull '{object}' line {line}: non-finite vertex coordinate"
                )
            }
            Self::FaceIndexOutOfRange {
                object,
                line,
                index,
                vertex_count,
            } => {
                write!(
                    f,
                    "collision hull '{object}' line {line}: face index {index} \
                     out of range (have {vertex_count} vertices)"
                )
            }
            Self::DegenerateHull { object, reason } => {
                write!(f, "collision hull '{object}' is degenerate: {reason}")
            }
        }
    }
}

impl Error for AssetError {}
