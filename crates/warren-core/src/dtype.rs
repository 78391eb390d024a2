//! Tensor element types and shapes.

use smallvec::SmallVec;
use std::fmt;

/// Element type of an exported tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// 32-bit IEEE float.
    F32,
    /// 32-bit signed integer.
    I32,
    /// Unsigned byte (checkpoint blobs).
    U8,
}

impl Dtype {
    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            Dtype::F32 | Dtype::I32 => 4,
            Dtype::U8 => 1,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dtype::F32 => f.write_str("f32"),
            Dtype::I32 => f.write_str("i32"),
            Dtype::U8 => f.write_str("u8"),
        }
    }
}

/// A tensor shape as row-major dimensions.
///
/// Inline up to 4 dimensions, which covers every exported tensor; deeper
/// shapes spill to the heap transparently.
pub type Shape = SmallVec<[i64; 4]>;

/// Total element count of a shape (product of dimensions).
pub fn elem_count(shape: &Shape) -> usize {
    shape.iter().product::<i64>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn element_sizes() {
        assert_eq!(Dtype::F32.size_bytes(), 4);
        assert_eq!(Dtype::I32.size_bytes(), 4);
        assert_eq!(Dtype::U8.size_bytes(), 1);
    }

    #[test]
    fn elem_count_is_product() {
        let shape: Shape = smallvec![8, 30, 2];
        assert_eq!(elem_count(&shape), 480);
        let scalar: Shape = smallvec![4, 1];
        assert_eq!(elem_count(&scalar), 4);
    }
}
