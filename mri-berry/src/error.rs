//! 运行时错误.

use crate::data::mgh::MghError;
use crate::Idx3d;
use thiserror::Error;

/// 预处理流水线、数据集读写与训练日志的统一错误.
#[derive(Debug, Error)]
pub enum Error {
    /// 切片方向名称不合法. 合法值为 `COR`, `AXI`, `SAG` (或其全称).
    #[error("invalid orientation `{0}`, expected one of COR, AXI, SAG")]
    InvalidOrientation(String),

    /// 重映射方案名称未注册.
    #[error("invalid remap scheme `{0}`, only FS and Neo are available")]
    InvalidRemapScheme(String),

    /// 重映射表自身不合法 (重复的原始标签值, 或类别数超出 `u8` 表示范围).
    #[error("invalid remap table `{name}`: {reason}")]
    InvalidRemapTable {
        /// 表名.
        name: String,
        /// 原因.
        reason: String,
    },

    /// 两组本应形状一致的数据形状不一致.
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        /// 左侧形状.
        left: Vec<usize>,
        /// 右侧形状.
        right: Vec<usize>,
    },

    /// 数据维度不符合约定.
    #[error("array `{name}` has unexpected shape {shape:?}")]
    BadShape {
        /// 数组名.
        name: String,
        /// 实际形状.
        shape: Vec<usize>,
    },

    /// 数组拼接或变形失败.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// 容器格式名称不合法. 合法值为 `h5` (或 `hdf5`) 与 `npz`.
    #[error("invalid container `{0}`, expected h5 or npz")]
    InvalidContainer(String),

    /// 体数据列表为空.
    #[error("volume list `{0}` contains no volume id")]
    EmptyVolumeList(String),

    /// 无法根据文件名判断体数据格式.
    #[error("unsupported volume file `{0}`")]
    UnsupportedFormat(String),

    /// mgh/mgz 解析错误.
    #[error(transparent)]
    Mgh(#[from] MghError),

    /// nifti 解析错误.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 读取 npz 错误.
    #[error(transparent)]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),

    /// 写入 npz 错误.
    #[error(transparent)]
    WriteNpz(#[from] ndarray_npy::WriteNpzError),

    /// 读写 HDF5 错误.
    #[cfg(feature = "hdf5")]
    #[error(transparent)]
    Hdf5(#[from] hdf5::Error),

    /// 图像编码错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// 绘图错误.
    #[cfg(feature = "plot")]
    #[error("plot error: {0}")]
    Plot(String),

    /// json 序列化错误.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// 混淆矩阵累加器还未通过 `start_epoch` 开启.
    #[error("confusion accumulator used before `start_epoch`")]
    AccumulatorNotStarted,

    /// 预测或真值中出现了超出类别数的值.
    #[error("class {class} out of range, only {num_class} classes configured")]
    ClassOutOfRange {
        /// 出现的类别值.
        class: u8,
        /// 配置的类别数.
        num_class: usize,
    },
}

impl Error {
    /// 由两个三维形状构造 [`Error::ShapeMismatch`].
    #[inline]
    pub(crate) fn shape_mismatch_3d(left: Idx3d, right: Idx3d) -> Self {
        Self::ShapeMismatch {
            left: vec![left.0, left.1, left.2],
            right: vec![right.0, right.1, right.2],
        }
    }
}

/// 本 crate 的 `Result` 别名.
pub type Result<T> = std::result::Result<T, Error>;
