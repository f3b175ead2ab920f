//! 体数据到 2D 切片数据集的预处理流水线.
//!
//! 每个体数据依次经过: 方向规范化 ([`orient`]) -> 强度 min-max 归一化 ->
//! 切片筛选 ([`select`]) -> 标签重映射 ([`remap`]) -> 类别权重估计 ([`weight`]).
//! 所有体数据的结果最后沿第 0 轴拼接为 [`PreparedSet`].

use std::path::Path;

use log::{info, warn};
use ndarray::{concatenate, Array2, Array3, ArrayView3, Axis};

use crate::consts::DEFAULT_SKIP_FRAMES;
use crate::data::window::normalize_min_max;
use crate::data::MriData3d;
use crate::dataset::generic::{default_label_path, default_scan_path, read_volume_list, volume_loader};
use crate::error::{Error, Result};
use crate::Idx2d;

pub mod orient;
pub mod remap;
pub mod select;
pub mod weight;

pub use orient::Orientation;
pub use remap::{PreMerge, RemapRegistry, RemapScheme, RemapTable};

/// 流水线配置.
#[derive(Clone, Debug)]
pub struct PrepConfig {
    table: RemapTable,
    orientation: Orientation,
    skip_frames: usize,
}

impl PrepConfig {
    /// 使用默认的首尾跳过切片数 [`DEFAULT_SKIP_FRAMES`] 创建配置.
    pub fn new(table: RemapTable, orientation: Orientation) -> Self {
        Self {
            table,
            orientation,
            skip_frames: DEFAULT_SKIP_FRAMES,
        }
    }

    /// 修改首尾跳过的切片数.
    #[inline]
    pub fn with_skip_frames(mut self, skip_frames: usize) -> Self {
        self.skip_frames = skip_frames;
        self
    }

    /// 重映射表.
    #[inline]
    pub fn table(&self) -> &RemapTable {
        &self.table
    }

    /// 切片方向.
    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// 首尾跳过的切片数.
    #[inline]
    pub fn skip_frames(&self) -> usize {
        self.skip_frames
    }
}

/// 单个体数据经过流水线后得到的切片堆.
#[derive(Clone, Debug)]
pub struct VolumeSlices {
    /// 归一化到 `[0, 1]` 的扫描切片, `(N, H, W)`.
    pub data: Array3<f32>,

    /// 重映射后的类别, `(N, H, W)`.
    pub labels: Array3<u8>,

    /// 像素权重图, `(N, H, W)`.
    pub class_weights: Array3<u32>,

    /// 该体数据的逐类别权重, 下标即类别. 长度为出现过的最大类别 + 1.
    pub weights: Vec<u32>,
}

impl VolumeSlices {
    /// 切片个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// 是否一张切片都没有保留.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 单张切片的 `(H, W)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.data.dim();
        (h, w)
    }
}

/// 对单个体数据运行整个流水线.
///
/// 强度恒定的体数据归一化为全 0 并记录一条警告.
pub fn prepare_volume(volume: MriData3d, config: &PrepConfig) -> Result<VolumeSlices> {
    let MriData3d { scan, label } = volume;
    let (image, label) =
        orient::normalize(scan.into_data(), label.into_data(), config.orientation)?;

    let (image, window) = normalize_min_max(&image);
    match window {
        Some(w) if !w.is_flat() => {}
        Some(w) => warn!("constant intensity {}, slices normalized to 0", w.lower()),
        None => warn!("no finite intensity, slices normalized to 0"),
    }

    let (data, label) = select::select(image.view(), label.view(), config.skip_frames)?;
    let labels = config.table.remap(&label);
    let (class_weights, weights) = weight::estimate_weights(labels.view());

    Ok(VolumeSlices {
        data,
        labels,
        class_weights,
        weights,
    })
}

/// 多个体数据拼接后的完整数据集.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedSet {
    /// 扫描切片, `(N, H, W)`.
    pub data: Array3<f32>,

    /// 类别, `(N, H, W)`.
    pub labels: Array3<u8>,

    /// 像素权重图, `(N, H, W)`.
    pub class_weights: Array3<u32>,

    /// 逐体数据的类别权重, `(V, num_classes)`.
    pub weights: Array2<u32>,
}

impl PreparedSet {
    /// 按顺序拼接多个体数据的切片堆.
    ///
    /// 逐类别权重向量补 0 (或截断) 到 `num_classes`. 各体数据的切片 `(H, W)`
    /// 不一致时返回 [`Error::ShapeMismatch`].
    pub fn from_volumes(volumes: &[VolumeSlices], num_classes: usize) -> Result<Self> {
        let Some(first) = volumes.first() else {
            return Ok(Self {
                data: Array3::zeros((0, 0, 0)),
                labels: Array3::zeros((0, 0, 0)),
                class_weights: Array3::zeros((0, 0, 0)),
                weights: Array2::zeros((0, num_classes)),
            });
        };

        let (h, w) = first.slice_shape();
        if let Some(other) = volumes.iter().find(|v| v.slice_shape() != (h, w)) {
            let (oh, ow) = other.slice_shape();
            return Err(Error::ShapeMismatch {
                left: vec![h, w],
                right: vec![oh, ow],
            });
        }

        let data = stack(volumes.iter().map(|v| v.data.view()))?;
        let labels = stack(volumes.iter().map(|v| v.labels.view()))?;
        let class_weights = stack(volumes.iter().map(|v| v.class_weights.view()))?;

        let mut weights = Array2::zeros((volumes.len(), num_classes));
        for (mut row, v) in weights.rows_mut().into_iter().zip(volumes) {
            for (dst, src) in row.iter_mut().zip(&v.weights) {
                *dst = *src;
            }
        }

        Ok(Self {
            data,
            labels,
            class_weights,
            weights,
        })
    }

    /// 切片总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// 是否没有任何切片.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 体数据个数.
    #[inline]
    pub fn volumes(&self) -> usize {
        self.weights.nrows()
    }

    /// 类别数, 包括背景.
    #[inline]
    pub fn num_classes(&self) -> usize {
        self.weights.ncols()
    }

    /// 单张切片的 `(H, W)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.data.dim();
        (h, w)
    }

    /// 每个类别在所有切片中的像素个数. 长度至少为 [`PreparedSet::num_classes`].
    pub fn class_histogram(&self) -> Vec<usize> {
        let mut hist = vec![0usize; self.num_classes()];
        for &c in self.labels.iter() {
            let c = c as usize;
            if c >= hist.len() {
                hist.resize(c + 1, 0);
            }
            hist[c] += 1;
        }
        hist
    }
}

fn stack<'a, A: Clone + 'a>(parts: impl Iterator<Item = ArrayView3<'a, A>>) -> Result<Array3<A>> {
    let parts: Vec<_> = parts.collect();
    Ok(concatenate(Axis(0), &parts)?)
}

/// 读取体数据列表 `list_file`, 按默认文件布局加载每个体数据, 运行流水线并拼接.
///
/// 任意一个体数据出错即返回该错误. 列表为空时返回 [`Error::EmptyVolumeList`].
pub fn convert(
    data_dir: impl AsRef<Path>,
    label_dir: impl AsRef<Path>,
    list_file: impl AsRef<Path>,
    config: &PrepConfig,
) -> Result<PreparedSet> {
    let ids = read_volume_list(list_file)?;
    let loader = volume_loader(
        ids,
        data_dir,
        default_scan_path,
        label_dir,
        default_label_path,
    );

    let total = loader.len();
    let mut volumes = Vec::with_capacity(total);
    for (n, (id, volume)) in loader.enumerate() {
        let slices = prepare_volume(volume?, config)?;
        info!(
            "[{}/{total}] volume `{id}`: {} slices kept",
            n + 1,
            slices.len()
        );
        volumes.push(slices);
    }
    PreparedSet::from_volumes(&volumes, config.table.num_classes())
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 借助 `rayon` 并行处理每个体数据. 结果 (包括体数据顺序) 与 [`convert`] 完全一致.
///
/// 多个体数据出错时返回其中任意一个错误.
#[cfg(feature = "rayon")]
pub fn par_convert(
    data_dir: impl AsRef<Path>,
    label_dir: impl AsRef<Path>,
    list_file: impl AsRef<Path>,
    config: &PrepConfig,
) -> Result<PreparedSet> {
    let ids = read_volume_list(list_file)?;
    let (data_dir, label_dir) = (data_dir.as_ref(), label_dir.as_ref());

    let volumes = ids
        .par_iter()
        .map(|id| -> Result<VolumeSlices> {
            let volume = MriData3d::open(
                default_scan_path(data_dir, id),
                default_label_path(label_dir, id),
            )?;
            let slices = prepare_volume(volume, config)?;
            info!("volume `{id}`: {} slices kept", slices.len());
            Ok(slices)
        })
        .collect::<Result<Vec<_>>>()?;
    PreparedSet::from_volumes(&volumes, config.table.num_classes())
}
