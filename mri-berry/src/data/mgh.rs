//! FreeSurfer mgh/mgz 体数据的读写.
//!
//! mgh 文件由 284 字节的大端序 header 和紧随其后的体素数据组成, 体素按 `(i, j, k)`
//! 列优先 (第一维变化最快) 存储. mgz 即 gzip 压缩后的 mgh.
//!
//! 这里只支持单帧体数据, 以及 `UCHAR`, `INT`, `FLOAT`, `SHORT` 四种体素类型,
//! 这已覆盖 FreeSurfer 输出的 `orig.mgz` 与各类分割标签文件.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array3, ArrayView3, ShapeBuilder};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// header 块的总长度, 体素数据从该偏移开始.
const HEADER_LEN: usize = 284;

/// header 中实际使用的字节数: 7 个 i32, 1 个 i16, 15 个 f32.
const USED_HEADER_LEN: usize = 7 * 4 + 2 + 15 * 4;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const MGH_VERSION: i32 = 1;

/// FreeSurfer 标准 (LIA) 方向余弦矩阵, 按列 (x, y, z) 存储.
const CONFORMED_DIRECTION: [f32; 9] = [-1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0];

/// mgh 编解码错误.
#[derive(Debug, Error)]
pub enum MghError {
    /// 不支持的格式版本.
    #[error("unsupported mgh version {0}")]
    Version(i32),

    /// 不支持的体素类型.
    #[error("unsupported mgh voxel type {0}")]
    VoxelType(i32),

    /// 多帧体数据.
    #[error("mgh volume has {0} frames, only single-frame volumes are supported")]
    Frames(i32),

    /// 非法的体数据尺寸.
    #[error("invalid mgh dimensions {0:?}")]
    Dimensions([i32; 3]),

    /// 体数据过大, 无法写入 header 或在内存中寻址.
    #[error("mgh volume of shape {0:?} is too large")]
    TooLarge([usize; 3]),

    /// 文件被截断.
    #[error("mgh data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// 期望的字节数.
        expected: usize,
        /// 实际的字节数.
        actual: usize,
    },

    /// 待写入的体素值无法用目标体素类型表示.
    #[error("voxel value {value} cannot be stored as {ty:?}")]
    ValueOutOfRange {
        /// 体素值.
        value: f32,
        /// 目标类型.
        ty: MghType,
    },

    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// mgh 体素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MghType {
    /// `MRI_UCHAR`, 常见于 `orig.mgz` 和标签文件.
    UChar,
    /// `MRI_INT`.
    Int,
    /// `MRI_FLOAT`.
    Float,
    /// `MRI_SHORT`.
    Short,
}

impl MghType {
    fn from_code(code: i32) -> Result<Self, MghError> {
        match code {
            0 => Ok(Self::UChar),
            1 => Ok(Self::Int),
            3 => Ok(Self::Float),
            4 => Ok(Self::Short),
            other => Err(MghError::VoxelType(other)),
        }
    }

    /// 类型在文件中的编码.
    #[inline]
    pub const fn code(self) -> i32 {
        match self {
            Self::UChar => 0,
            Self::Int => 1,
            Self::Float => 3,
            Self::Short => 4,
        }
    }

    /// 单个体素占用的字节数.
    #[inline]
    pub const fn width(self) -> usize {
        match self {
            Self::UChar => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
        }
    }
}

/// mgh header 中与体数据处理相关的部分.
#[derive(Clone, Debug, PartialEq)]
pub struct MghHeader {
    /// 体素个数 `(width, height, depth)`.
    pub dims: [usize; 3],
    /// 体素类型.
    pub voxel_type: MghType,
    /// 体素分辨率, 以毫米为单位. `good_ras` 为假时恒为 1.
    pub voxel_size: [f32; 3],
    /// 方向余弦矩阵与中心坐标是否有效.
    pub good_ras: bool,
    /// 方向余弦矩阵, 按列存储.
    pub direction: [f32; 9],
    /// 体数据中心的 RAS 坐标.
    pub center_ras: [f32; 3],
}

/// 读取 mgh 或 mgz 文件. 是否压缩由文件头的 gzip magic 判断, 与扩展名无关.
///
/// 返回的数组按 `(i, j, k)` 索引, 与文件中的体素顺序一致.
pub fn read_mgh<P: AsRef<Path>>(path: P) -> Result<(MghHeader, Array3<f32>), MghError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    let mut raw = Vec::new();
    if compressed {
        MultiGzDecoder::new(reader).read_to_end(&mut raw)?;
    } else {
        reader.read_to_end(&mut raw)?;
    }
    decode(&raw)
}

fn decode(raw: &[u8]) -> Result<(MghHeader, Array3<f32>), MghError> {
    if raw.len() < HEADER_LEN {
        return Err(MghError::Truncated {
            expected: HEADER_LEN,
            actual: raw.len(),
        });
    }
    let mut fields = &raw[..USED_HEADER_LEN];

    let version = fields.read_i32::<BigEndian>()?;
    if version != MGH_VERSION {
        return Err(MghError::Version(version));
    }
    let mut raw_dims = [0i32; 3];
    fields.read_i32_into::<BigEndian>(&mut raw_dims)?;
    let frames = fields.read_i32::<BigEndian>()?;
    let voxel_type = MghType::from_code(fields.read_i32::<BigEndian>()?)?;
    let _dof = fields.read_i32::<BigEndian>()?;
    let good_ras = fields.read_i16::<BigEndian>()? > 0;
    let mut voxel_size = [0f32; 3];
    fields.read_f32_into::<BigEndian>(&mut voxel_size)?;
    let mut direction = [0f32; 9];
    fields.read_f32_into::<BigEndian>(&mut direction)?;
    let mut center_ras = [0f32; 3];
    fields.read_f32_into::<BigEndian>(&mut center_ras)?;

    if raw_dims.iter().any(|d| *d <= 0) {
        return Err(MghError::Dimensions(raw_dims));
    }
    if frames != 1 {
        return Err(MghError::Frames(frames));
    }
    let dims = raw_dims.map(|d| d as usize);

    // 损坏的 header 可能给出乘积溢出的尺寸.
    let expected = dims
        .iter()
        .try_fold(voxel_type.width(), |acc, d| acc.checked_mul(*d))
        .ok_or(MghError::TooLarge(dims))?;
    let count = expected / voxel_type.width();
    let body = &raw[HEADER_LEN..];
    if body.len() < expected {
        return Err(MghError::Truncated {
            expected,
            actual: body.len(),
        });
    }
    let body = &body[..expected];

    let values: Vec<f32> = match voxel_type {
        MghType::UChar => body.iter().map(|&b| b as f32).collect(),
        MghType::Short => {
            let mut buf = vec![0i16; count];
            BigEndian::read_i16_into(body, &mut buf);
            buf.into_iter().map(f32::from).collect()
        }
        MghType::Int => {
            let mut buf = vec![0i32; count];
            BigEndian::read_i32_into(body, &mut buf);
            buf.into_iter().map(|v| v as f32).collect()
        }
        MghType::Float => {
            let mut buf = vec![0f32; count];
            BigEndian::read_f32_into(body, &mut buf);
            buf
        }
    };

    // 第一维变化最快, 即列优先.
    let [w, h, d] = dims;
    let data = Array3::from_shape_vec((w, h, d).f(), values)
        .map_err(|_| MghError::Dimensions(raw_dims))?;

    let header = MghHeader {
        dims,
        voxel_type,
        voxel_size: if good_ras { voxel_size } else { [1.0; 3] },
        good_ras,
        direction,
        center_ras,
    };
    Ok((header, data))
}

/// 将 `data` 以 `voxel_type` 写为 mgh 文件. 路径以 `.mgz` 结尾时进行 gzip 压缩.
///
/// 整数类型的体素值会先四舍五入; 无法表示的值返回 [`MghError::ValueOutOfRange`].
pub fn write_mgh<P: AsRef<Path>>(
    path: P,
    data: ArrayView3<f32>,
    voxel_type: MghType,
    voxel_size: [f32; 3],
) -> Result<(), MghError> {
    let path = path.as_ref();
    let (w, h, d) = data.dim();
    let too_large = || MghError::TooLarge([w, h, d]);
    let dims = [w, h, d]
        .map(i32::try_from)
        .map(|r| r.map_err(|_| too_large()));
    let mut buf = Vec::with_capacity(HEADER_LEN + data.len() * voxel_type.width());

    buf.write_i32::<BigEndian>(MGH_VERSION)?;
    for dim in dims {
        buf.write_i32::<BigEndian>(dim?)?;
    }
    // frames, type, dof
    for v in [1, voxel_type.code(), 0] {
        buf.write_i32::<BigEndian>(v)?;
    }
    buf.write_i16::<BigEndian>(1)?;
    for v in voxel_size
        .iter()
        .chain(CONFORMED_DIRECTION.iter())
        .chain([0.0f32; 3].iter())
    {
        buf.write_f32::<BigEndian>(*v)?;
    }
    buf.resize(HEADER_LEN, 0);

    // `t()` 反转轴序, 其逻辑行优先迭代即原数组的列优先迭代.
    for &value in data.t().iter() {
        let out_of_range = || MghError::ValueOutOfRange {
            value,
            ty: voxel_type,
        };
        match voxel_type {
            MghType::UChar => {
                buf.write_u8(num::cast::<f32, u8>(value.round()).ok_or_else(out_of_range)?)?;
            }
            MghType::Short => {
                let v = num::cast::<f32, i16>(value.round()).ok_or_else(out_of_range)?;
                buf.write_i16::<BigEndian>(v)?;
            }
            MghType::Int => {
                let v = num::cast::<f32, i32>(value.round()).ok_or_else(out_of_range)?;
                buf.write_i32::<BigEndian>(v)?;
            }
            MghType::Float => buf.write_f32::<BigEndian>(value)?,
        }
    }

    let file = BufWriter::new(File::create(path)?);
    let gzip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mgz"));
    if gzip {
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(&buf)?;
        enc.finish()?.flush()?;
    } else {
        let mut file = file;
        file.write_all(&buf)?;
        file.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// 仅包含开头若干个 i32 字段的 header.
    fn header_with(fields: &[i32]) -> Vec<u8> {
        let mut raw = vec![0u8; HEADER_LEN];
        BigEndian::write_i32_into(fields, &mut raw[..fields.len() * 4]);
        raw
    }

    fn ramp(w: usize, h: usize, d: usize) -> Array3<f32> {
        Array3::from_shape_fn((w, h, d), |(i, j, k)| (i + 10 * j + 100 * k) as f32)
    }

    #[test]
    fn test_mgz_round_trip_keeps_voxel_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol.mgz");
        let data = ramp(3, 4, 5);
        write_mgh(&path, data.view(), MghType::Short, [1.0, 1.5, 2.0]).unwrap();

        let (header, back) = read_mgh(&path).unwrap();
        assert_eq!(header.dims, [3, 4, 5]);
        assert_eq!(header.voxel_type, MghType::Short);
        assert_eq!(header.voxel_size, [1.0, 1.5, 2.0]);
        assert!(header.good_ras);
        assert_eq!(back, data);
        assert_eq!(back[[2, 3, 4]], 432.0);
    }

    #[test]
    fn test_plain_mgh_is_read_without_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol.mgh");
        let data = ramp(2, 2, 2).mapv(|v| v / 4.0);
        write_mgh(&path, data.view(), MghType::Float, [1.0; 3]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(!bytes.starts_with(&GZIP_MAGIC));
        assert_eq!(bytes.len(), HEADER_LEN + 8 * 4);

        let (_, back) = read_mgh(&path).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_uchar_rejects_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol.mgz");
        let data = Array3::from_elem((1, 1, 2), 300.0f32);
        let err = write_mgh(&path, data.view(), MghType::UChar, [1.0; 3]).unwrap_err();
        assert!(matches!(err, MghError::ValueOutOfRange { .. }));
    }

    #[test]
    fn test_truncated_and_multi_frame_files_are_rejected() {
        assert!(matches!(
            decode(&[0u8; 10]),
            Err(MghError::Truncated { expected: 284, .. })
        ));

        let mut raw = header_with(&[1, 2, 2, 2, 3, 0]);
        assert!(matches!(decode(&raw), Err(MghError::Frames(3))));

        BigEndian::write_i32(&mut raw[0..4], 2);
        assert!(matches!(decode(&raw), Err(MghError::Version(2))));
    }

    #[test]
    fn test_overflowing_dimensions_are_rejected() {
        let side = 1 << 30;
        let raw = header_with(&[1, side, side, side, 1, 0]);
        assert!(matches!(
            decode(&raw),
            Err(MghError::TooLarge(dims)) if dims == [1 << 30; 3]
        ));

        // 乘积不溢出但数据不足.
        let raw = header_with(&[1, 1 << 10, 1 << 10, 4, 1, 3]);
        assert!(matches!(
            decode(&raw),
            Err(MghError::Truncated { expected, actual: 0 }) if expected == 16 << 20
        ));
    }
}
