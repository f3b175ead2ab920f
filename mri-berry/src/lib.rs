#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 将 3D 脑部 MRI 体数据 (FreeSurfer mgz 或 nifti) 转换为 2D 切片分割数据集,
//! 并提供训练日志 (标量, 样例图像, 混淆矩阵) 的写入工具.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 按 OASIS 数据集的目录组织方式 (`<id>/mri/orig.mgz` 与 `<id>_glm.mgz`)
//!   提供默认加载器, 其他组织方式可通过自定义路径构造器接入.
//! 2. 所有可恢复的错误都通过 [`Error`] 返回, 不会 panic.
//!
//! # 开发计划
//!
//! ### mgh/mgz 读写 ✅
//!
//! 大端 header + Fortran 序体素数据, gzip 通过 magic bytes 识别.
//!
//! 实现位于 `mri-berry/src/data/mgh.rs`.
//!
//! ### 切片方向规范化与切片筛选 ✅
//!
//! 冠状面/轴状面/矢状面三种轴置换; 奇偶 + 首尾跳过的切片掩码.
//!
//! 实现位于 `mri-berry/src/prep/orient.rs` 与 `mri-berry/src/prep/select.rs`.
//!
//! ### 标签重映射 ✅
//!
//! 冻结的、带版本号的有序重映射表 (`FS`, `Neo`), `Neo` 带奇偶预合并.
//! 新方案通过 `RemapRegistry` 注册.
//!
//! 实现位于 `mri-berry/src/prep/remap.rs`.
//!
//! ### 中值频率平衡类别权重 ✅
//!
//! 边界像素 (`numpy.gradient` 规则) 额外加权.
//!
//! 实现位于 `mri-berry/src/prep/weight.rs`.
//!
//! ### 数据集持久化 ✅
//!
//! 每个划分 4 个文件, 默认 HDF5 (`hdf5` feature), 也可选 npz; 读取端为可索引的 `SliceDataset`.
//!
//! 实现位于 `mri-berry/src/dataset`.
//!
//! ### 训练日志 ✅
//!
//! 1. 标量写入 TensorBoard 事件文件. ✅
//! 2. 预测/真值并排图像. ✅
//! 3. 混淆矩阵累加器 (显式生命周期), 热力图 + json. ✅
//! 4. 带类别名与数值标注的热力图, 需打开 `plot` feature. ✅
//!
//! 实现位于 `mri-berry/src/summary`.
//!
//! ### 多体数据并行处理 ✅
//!
//! 打开 `rayon` feature 后可用 `prep::par_convert`.

/// 二维索引.
pub type Idx2d = (usize, usize);

/// 三维索引.
pub type Idx3d = (usize, usize, usize);

/// 3D MRI 体数据基础数据结构.
pub mod data;

pub use data::{IntensityWindow, MriData3d, MriLabel, MriScan, VolumeAttr, VolumeFormat};

pub mod consts;
pub mod dataset;
pub mod error;
pub mod prelude;
pub mod prep;
pub mod summary;

pub use error::{Error, Result};
