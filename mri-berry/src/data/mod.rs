use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use crate::error::{Error, Result};
use crate::Idx3d;

pub mod mgh;
pub mod window;

pub use window::IntensityWindow;

/// 体数据文件格式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VolumeFormat {
    /// FreeSurfer `.mgh` / `.mgz`.
    Mgh,

    /// `.nii` / `.nii.gz`.
    Nifti,
}

impl VolumeFormat {
    /// 根据文件名 (忽略大小写) 判断格式. 无法识别时返回 [`Error::UnsupportedFormat`].
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if name.ends_with(".mgz") || name.ends_with(".mgh") {
            Ok(Self::Mgh)
        } else if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Ok(Self::Nifti)
        } else {
            Err(Error::UnsupportedFormat(path.display().to_string()))
        }
    }
}

/// 扫描与标注共用的精简 header.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VolumeHeader {
    dims: Idx3d,
    voxel_size: [f32; 3],
    format: VolumeFormat,
}

/// 读取任意受支持格式的体数据, 数组按文件中的 `(i, j, k)` 索引.
fn read_volume(path: &Path) -> Result<(VolumeHeader, Array3<f32>)> {
    let format = VolumeFormat::from_path(path)?;
    let (voxel_size, data) = match format {
        VolumeFormat::Mgh => {
            let (header, data) = mgh::read_mgh(path)?;
            (header.voxel_size, data)
        }
        VolumeFormat::Nifti => {
            let obj = ReaderOptions::new().read_file(path)?;
            let [_, pi, pj, pk, ..] = obj.header().pixdim;
            let data = obj.into_volume().into_ndarray::<f32>()?;
            let shape = data.shape().to_vec();

            // 单帧 4D 文件 (x, y, z, 1) 在这里退化为 3D.
            let data = if shape.len() == 4 && shape[3] == 1 {
                data.index_axis_move(Axis(3), 0)
            } else {
                data
            };
            let data = data
                .into_dimensionality::<Ix3>()
                .map_err(|_| Error::BadShape {
                    name: path.display().to_string(),
                    shape,
                })?;
            ([pi, pj, pk], data)
        }
    };
    let header = VolumeHeader {
        dims: data.dim(),
        voxel_size,
        format,
    };
    Ok((header, data))
}

/// 3D 体数据 header 的共用属性.
pub trait VolumeAttr {
    /// 获取 header 部分.
    fn header(&self) -> &VolumeHeader;

    /// 获取数据形状大小, 按文件中的 `(i, j, k)` 顺序.
    #[inline]
    fn shape(&self) -> Idx3d {
        self.header().dims
    }

    /// 获取单个体素分辨率, 以毫米为单位, 与 [`VolumeAttr::shape`] 的轴序一致.
    #[inline]
    fn voxel_size(&self) -> [f32; 3] {
        self.header().voxel_size
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [i, j, k] = self.voxel_size();
        i == j && i == k
    }

    /// 来源文件格式.
    #[inline]
    fn format(&self) -> VolumeFormat {
        self.header().format
    }
}

/// 3D MRI 扫描. 强度以 `f32` 保存, 尚未归一化.
#[derive(Debug, Clone)]
pub struct MriScan {
    header: VolumeHeader,
    data: Array3<f32>,
}

impl VolumeAttr for MriScan {
    #[inline]
    fn header(&self) -> &VolumeHeader {
        &self.header
    }
}

impl Index<Idx3d> for MriScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl MriScan {
    /// 打开 mgh/mgz/nii/nii.gz 格式的 3D 扫描. 如果打开成功, 则返回 `Ok(Self)`,
    /// 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (header, data) = read_volume(path.as_ref())?;
        Ok(Self { header, data })
    }

    /// 由内存中的数组直接创建扫描. `data` 按 `(i, j, k)` 索引.
    pub fn from_array(data: Array3<f32>, voxel_size: [f32; 3]) -> Self {
        let header = VolumeHeader {
            dims: data.dim(),
            voxel_size,
            format: VolumeFormat::Mgh,
        };
        Self { header, data }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<f32> {
        self.data
    }
}

/// 3D 分割标注. 原始标签值以 `i32` 保存.
#[derive(Debug, Clone)]
pub struct MriLabel {
    header: VolumeHeader,
    data: Array3<i32>,
}

impl VolumeAttr for MriLabel {
    #[inline]
    fn header(&self) -> &VolumeHeader {
        &self.header
    }
}

impl Index<Idx3d> for MriLabel {
    type Output = i32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl MriLabel {
    /// 打开 mgh/mgz/nii/nii.gz 格式的 3D 标注. 体素值四舍五入为整数标签.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (header, data) = read_volume(path.as_ref())?;
        let data = data.mapv(|v| v.round() as i32);
        Ok(Self { header, data })
    }

    /// 由内存中的数组直接创建标注. `data` 按 `(i, j, k)` 索引.
    pub fn from_array(data: Array3<i32>, voxel_size: [f32; 3]) -> Self {
        let header = VolumeHeader {
            dims: data.dim(),
            voxel_size,
            format: VolumeFormat::Mgh,
        };
        Self { header, data }
    }

    /// 获取 3D 标注中值为 `code` 的体素个数.
    #[inline]
    pub fn count(&self, code: i32) -> usize {
        self.data.iter().filter(|p| **p == code).count()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, i32> {
        self.data.view()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<i32> {
        self.data
    }
}

/// 3D MRI 扫描与对应的标注.
///
/// 该结构完全透明, 仅包含两个公开的 `scan` 和 `label` 子结构.
/// 通过 [`MriData3d::new`] 或 [`MriData3d::open`] 构造时保证二者形状一致.
#[derive(Debug, Clone)]
pub struct MriData3d {
    /// 3D 扫描.
    pub scan: MriScan,

    /// 3D 标注.
    pub label: MriLabel,
}

impl MriData3d {
    /// 组合扫描与标注. 若两者形状不一致, 则返回 [`Error::ShapeMismatch`].
    pub fn new(scan: MriScan, label: MriLabel) -> Result<Self> {
        if scan.shape() != label.shape() {
            return Err(Error::shape_mismatch_3d(scan.shape(), label.shape()));
        }
        Ok(Self { scan, label })
    }

    /// 分别打开 3D 扫描和对应标注. 任一文件打开失败, 或两者形状不一致时返回 `Err`.
    pub fn open(scan_path: impl AsRef<Path>, label_path: impl AsRef<Path>) -> Result<Self> {
        let scan = MriScan::open(scan_path.as_ref())?;
        let label = MriLabel::open(label_path.as_ref())?;
        Self::new(scan, label)
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.label.shape()
    }
}

#[cfg(test)]
mod tests {
    use super::mgh::{write_mgh, MghType};
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            VolumeFormat::from_path(Path::new("a/orig.mgz")).unwrap(),
            VolumeFormat::Mgh
        );
        assert_eq!(
            VolumeFormat::from_path(Path::new("x.MGH")).unwrap(),
            VolumeFormat::Mgh
        );
        assert_eq!(
            VolumeFormat::from_path(Path::new("seg.nii.gz")).unwrap(),
            VolumeFormat::Nifti
        );
        assert!(matches!(
            VolumeFormat::from_path(Path::new("seg.npy")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_open_pair_and_reject_mismatched_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let scan_path = dir.path().join("orig.mgz");
        let label_path = dir.path().join("seg.mgz");
        let bad_path = dir.path().join("bad.mgz");

        let scan = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (i * j + k) as f32);
        let label = Array3::from_shape_fn((2, 3, 4), |(i, _, _)| (i * 151) as f32);
        write_mgh(&scan_path, scan.view(), MghType::UChar, [1.0; 3]).unwrap();
        write_mgh(&label_path, label.view(), MghType::Int, [1.0; 3]).unwrap();
        write_mgh(&bad_path, label.t(), MghType::Int, [1.0; 3]).unwrap();

        let data = MriData3d::open(&scan_path, &label_path).unwrap();
        assert_eq!(data.shape(), (2, 3, 4));
        assert!(data.scan.is_isotropic());
        assert_eq!(data.label.count(151), 12);
        assert_eq!(data.label[(1, 2, 3)], 151);
        assert_eq!(data.scan[(1, 2, 3)], 5.0);

        let err = MriData3d::open(&scan_path, &bad_path).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MriScan::open(dir.path().join("missing.mgz")).unwrap_err();
        assert!(matches!(err, Error::Mgh(mgh::MghError::Io(_))));
    }
}
