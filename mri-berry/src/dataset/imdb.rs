//! 可索引的 2D 切片数据集, 供训练端按下标取样本.

use crate::error::{Error, Result};
use crate::Idx2d;
use ndarray::{s, Array3, Array4, ArrayD, ArrayView2, ArrayView3, Axis, Ix4};

/// 单个样本. 所有部分都是底层数据集的视图.
#[derive(Clone, Debug)]
pub struct Sample<'a> {
    /// 扫描切片, `(C, H, W)`.
    pub image: ArrayView3<'a, f32>,

    /// 类别, `(H, W)`.
    pub label: ArrayView2<'a, u8>,

    /// 像素权重, `(H, W)`.
    pub weight: ArrayView2<'a, u32>,
}

/// 有序、不可变的切片数据集.
#[derive(Clone, Debug)]
pub struct SliceDataset {
    images: Array4<f32>,
    labels: Array3<u8>,
    weights: Array3<u32>,
}

impl SliceDataset {
    /// 由扫描、类别和像素权重创建数据集.
    ///
    /// `images` 为 `(N, H, W)` 时自动在第 1 轴插入单通道, 为 `(N, C, H, W)` 时原样接受,
    /// 其他维度返回 [`Error::BadShape`]. 三者的 `N`, `H`, `W` 不一致时返回
    /// [`Error::ShapeMismatch`].
    pub fn new(images: ArrayD<f32>, labels: Array3<u8>, weights: Array3<u32>) -> Result<Self> {
        let images = match images.ndim() {
            3 => images.insert_axis(Axis(1)),
            4 => images,
            _ => {
                return Err(Error::BadShape {
                    name: "images".to_string(),
                    shape: images.shape().to_vec(),
                })
            }
        };
        let images = images.into_dimensionality::<Ix4>()?;

        let (n, _, h, w) = images.dim();
        for other in [labels.dim(), weights.dim()] {
            if other != (n, h, w) {
                return Err(Error::shape_mismatch_3d((n, h, w), other));
            }
        }
        Ok(Self {
            images,
            labels,
            weights,
        })
    }

    /// 样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len_of(Axis(0))
    }

    /// 是否没有样本.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 通道数.
    #[inline]
    pub fn channels(&self) -> usize {
        self.images.len_of(Axis(1))
    }

    /// 单张切片的 `(H, W)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.labels.dim();
        (h, w)
    }

    /// 获取第 `index` 个样本. 越界时返回 `None`.
    pub fn get(&self, index: usize) -> Option<Sample<'_>> {
        (index < self.len()).then(|| self.sample(index))
    }

    /// 按顺序迭代所有样本.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Sample<'_>> + '_ {
        (0..self.len()).map(move |i| self.sample(i))
    }

    fn sample(&self, index: usize) -> Sample<'_> {
        Sample {
            image: self.images.slice(s![index, .., .., ..]),
            label: self.labels.index_axis(Axis(0), index),
            weight: self.weights.index_axis(Axis(0), index),
        }
    }
}
