//! 切片方向规范化.

use crate::error::{Error, Result};
use crate::Idx3d;
use ndarray::Array3;
use std::fmt;
use std::str::FromStr;

/// 切片所在的解剖平面.
///
/// 规范化后, 切片总是沿第 0 轴排列.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Orientation {
    /// 冠状面, 轴置换 `(2, 0, 1)`.
    Coronal,

    /// 轴状面, 轴置换 `(1, 2, 0)`.
    Axial,

    /// 矢状面, 不改变轴序.
    Sagittal,
}

impl Orientation {
    /// 全部方向.
    pub const ALL: [Orientation; 3] = [Self::Coronal, Self::Axial, Self::Sagittal];

    /// 该方向对应的轴置换. 新的第 `n` 轴是原来的第 `permutation()[n]` 轴.
    #[inline]
    pub const fn permutation(self) -> [usize; 3] {
        match self {
            Self::Coronal => [2, 0, 1],
            Self::Axial => [1, 2, 0],
            Self::Sagittal => [0, 1, 2],
        }
    }

    /// 命令行中使用的三字母缩写.
    #[inline]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Coronal => "COR",
            Self::Axial => "AXI",
            Self::Sagittal => "SAG",
        }
    }

    /// 原形状为 `shape` 的体数据经过置换后的形状.
    #[inline]
    pub fn permuted_shape(self, shape: Idx3d) -> Idx3d {
        let dims = [shape.0, shape.1, shape.2];
        let [a, b, c] = self.permutation();
        (dims[a], dims[b], dims[c])
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Orientation {
    type Err = Error;

    /// 接受 `COR`/`coronal`, `AXI`/`axial`, `SAG`/`sagittal`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "COR" | "coronal" => Ok(Self::Coronal),
            "AXI" | "axial" => Ok(Self::Axial),
            "SAG" | "sagittal" => Ok(Self::Sagittal),
            other => Err(Error::InvalidOrientation(other.to_string())),
        }
    }
}

/// 将扫描和标注按 `orientation` 做同一轴置换, 使切片沿第 0 轴排列.
///
/// 两者形状必须一致, 否则返回 [`Error::ShapeMismatch`]. 该操作不复制数据.
pub fn normalize<A, B>(
    image: Array3<A>,
    label: Array3<B>,
    orientation: Orientation,
) -> Result<(Array3<A>, Array3<B>)> {
    if image.dim() != label.dim() {
        return Err(Error::shape_mismatch_3d(image.dim(), label.dim()));
    }
    let perm = orientation.permutation();
    Ok((image.permuted_axes(perm), label.permuted_axes(perm)))
}
