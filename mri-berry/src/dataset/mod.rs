//! 数据集操作.
//!
//! 每个划分 (`train` / `test`) 持久化为 4 个文件, 每个文件只包含一个数组.
//! 容器格式见 [`Container`], 默认为 HDF5 (`.h5`):
//!
//! | 文件                  | 数组名                     | 内容                    |
//! |-----------------------|----------------------------|-------------------------|
//! | `Data_{s}.h5`         | `OASIS_data_{s}`           | `f32 (N, H, W)`         |
//! | `Label_{s}.h5`        | `OASIS_label_{s}`          | `u8 (N, H, W)`          |
//! | `Class_Weight_{s}.h5` | `OASIS_class_weights_{s}`  | `u32 (N, H, W)` 权重图  |
//! | `Weight_{s}.h5`       | `OASIS_weights_{s}`        | `u32 (V, C)` 逐类别权重 |

use crate::consts::layout::ARRAY_PREFIX;
use crate::error::{Error, Result};
use crate::prep::PreparedSet;
use ndarray::{Array, Array2, Array3, ArrayBase, Data, Dimension, Ix2, Ix3, IxDyn};
use ndarray_npy::{ReadableElement, WritableElement};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod generic;
#[cfg(feature = "hdf5")]
mod h5_database;
pub mod imdb;
mod npz_database;

pub use imdb::{Sample, SliceDataset};

cfg_if::cfg_if! {
    if #[cfg(feature = "hdf5")] {
        /// 可以持久化到任一容器格式的元素类型.
        pub trait Element: ReadableElement + WritableElement + hdf5::H5Type {}

        impl<T: ReadableElement + WritableElement + hdf5::H5Type> Element for T {}
    } else {
        /// 可以持久化到任一容器格式的元素类型.
        pub trait Element: ReadableElement + WritableElement {}

        impl<T: ReadableElement + WritableElement> Element for T {}
    }
}

/// 持久化容器格式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Container {
    /// HDF5, 每个文件一个数据集. 需要 `hdf5` feature.
    #[cfg(feature = "hdf5")]
    #[default]
    Hdf5,

    /// numpy npz, 每个归档一个 `{name}.npy` 条目.
    #[cfg_attr(not(feature = "hdf5"), default)]
    Npz,
}

impl Container {
    /// 文件扩展名 (不含 `.`).
    #[inline]
    pub const fn extension(self) -> &'static str {
        match self {
            #[cfg(feature = "hdf5")]
            Self::Hdf5 => "h5",
            Self::Npz => "npz",
        }
    }

    /// 将单个数组以名称 `name` 写入 `path` 处新建的文件. 已有文件会被覆盖.
    pub fn write_array<P, A, S, D>(self, path: P, name: &str, array: &ArrayBase<S, D>) -> Result<()>
    where
        P: AsRef<Path>,
        A: Element,
        S: Data<Elem = A>,
        D: Dimension,
    {
        match self {
            #[cfg(feature = "hdf5")]
            Self::Hdf5 => h5_database::write_array(path, name, array),
            Self::Npz => npz_database::write_array(path, name, array),
        }
    }

    /// 从 `path` 处的文件读取名为 `name` 的数组.
    pub fn read_array<P, A, D>(self, path: P, name: &str) -> Result<Array<A, D>>
    where
        P: AsRef<Path>,
        A: Element,
        D: Dimension,
    {
        match self {
            #[cfg(feature = "hdf5")]
            Self::Hdf5 => h5_database::read_array(path, name),
            Self::Npz => npz_database::read_array(path, name),
        }
    }

    /// 获取文件包含的所有数组名.
    pub fn array_names<P: AsRef<Path>>(self, path: P) -> Result<Vec<String>> {
        match self {
            #[cfg(feature = "hdf5")]
            Self::Hdf5 => h5_database::array_names(path),
            Self::Npz => npz_database::array_names(path),
        }
    }
}

impl FromStr for Container {
    type Err = Error;

    /// 接受 `h5` / `hdf5` 与 `npz`, 忽略大小写.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            #[cfg(feature = "hdf5")]
            "h5" | "hdf5" => Ok(Self::Hdf5),
            "npz" => Ok(Self::Npz),
            _ => Err(Error::InvalidContainer(s.to_string())),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 数据集划分.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Split {
    /// 训练集.
    Train,

    /// 测试集.
    Test,
}

impl Split {
    /// 全部划分.
    pub const ALL: [Split; 2] = [Self::Train, Self::Test];

    /// 文件名与数组名中使用的后缀.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 每个划分持久化的数组种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ArrayKind {
    /// 扫描切片.
    Data,

    /// 类别.
    Label,

    /// 像素权重图.
    ClassWeights,

    /// 逐体数据的类别权重.
    Weights,
}

impl ArrayKind {
    /// 全部种类, 按写入顺序.
    pub const ALL: [ArrayKind; 4] = [Self::Data, Self::Label, Self::ClassWeights, Self::Weights];

    /// 文件名, 如 `Class_Weight_train.h5`.
    pub fn file_name(self, split: Split, container: Container) -> String {
        let stem = match self {
            Self::Data => "Data",
            Self::Label => "Label",
            Self::ClassWeights => "Class_Weight",
            Self::Weights => "Weight",
        };
        format!("{stem}_{split}.{}", container.extension())
    }

    /// 数组名, 如 `OASIS_class_weights_train`.
    pub fn array_name(self, split: Split) -> String {
        let key = match self {
            Self::Data => "data",
            Self::Label => "label",
            Self::ClassWeights => "class_weights",
            Self::Weights => "weights",
        };
        format!("{ARRAY_PREFIX}_{key}_{split}")
    }

    /// `dir` 下该种类数组的完整路径.
    #[inline]
    pub fn path_in(self, dir: &Path, split: Split, container: Container) -> PathBuf {
        dir.join(self.file_name(split, container))
    }
}

/// 将一个划分写入 `dir` 下的 4 个文件, 返回写入的文件路径.
pub fn write_split<P: AsRef<Path>>(
    dir: P,
    split: Split,
    set: &PreparedSet,
    container: Container,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::with_capacity(ArrayKind::ALL.len());
    for kind in ArrayKind::ALL {
        let path = kind.path_in(dir, split, container);
        let name = kind.array_name(split);
        match kind {
            ArrayKind::Data => container.write_array(&path, &name, &set.data)?,
            ArrayKind::Label => container.write_array(&path, &name, &set.labels)?,
            ArrayKind::ClassWeights => container.write_array(&path, &name, &set.class_weights)?,
            ArrayKind::Weights => container.write_array(&path, &name, &set.weights)?,
        }
        log::debug!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// 读取 `dir` 下一个划分的扫描、类别和像素权重图, 组成 [`SliceDataset`].
pub fn load_split<P: AsRef<Path>>(dir: P, split: Split, container: Container) -> Result<SliceDataset> {
    let dir = dir.as_ref();
    let locate = |kind: ArrayKind| (kind.path_in(dir, split, container), kind.array_name(split));

    let (path, name) = locate(ArrayKind::Data);
    let images = container.read_array::<_, f32, IxDyn>(path, &name)?;
    let (path, name) = locate(ArrayKind::Label);
    let labels: Array3<u8> = container.read_array::<_, u8, Ix3>(path, &name)?;
    let (path, name) = locate(ArrayKind::ClassWeights);
    let weights: Array3<u32> = container.read_array::<_, u32, Ix3>(path, &name)?;

    SliceDataset::new(images, labels, weights)
}

/// 读取 `dir` 下一个划分的逐体数据类别权重, `(V, C)`.
pub fn load_class_weights<P: AsRef<Path>>(
    dir: P,
    split: Split,
    container: Container,
) -> Result<Array2<u32>> {
    let kind = ArrayKind::Weights;
    container.read_array::<_, u32, Ix2>(
        kind.path_in(dir.as_ref(), split, container),
        &kind.array_name(split),
    )
}

/// 读取 `dir` 下的 (训练集, 测试集).
pub fn load_splits<P: AsRef<Path>>(
    dir: P,
    container: Container,
) -> Result<(SliceDataset, SliceDataset)> {
    let dir = dir.as_ref();
    Ok((
        load_split(dir, Split::Train, container)?,
        load_split(dir, Split::Test, container)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array3, Axis};

    fn tiny_set() -> PreparedSet {
        PreparedSet {
            data: Array3::from_shape_fn((3, 2, 2), |(i, j, k)| (i + j + k) as f32 / 4.0),
            labels: Array3::from_shape_fn((3, 2, 2), |(i, _, _)| i as u8),
            class_weights: Array3::from_shape_fn((3, 2, 2), |(_, j, k)| (j * 2 + k) as u32),
            weights: arr2(&[[0, 1, 4], [2, 2, 0]]),
        }
    }

    fn check_round_trip(container: Container) {
        let dir = tempfile::tempdir().unwrap();
        let set = tiny_set();

        let written = write_split(dir.path(), Split::Train, &set, container).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.is_file()));
        assert_eq!(
            container.array_names(&written[0]).unwrap(),
            ["OASIS_data_train"]
        );

        let ds = load_split(dir.path(), Split::Train, container).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.channels(), 1);
        for (i, sample) in ds.iter().enumerate() {
            let image = sample.image.index_axis(Axis(0), 0);
            assert_eq!(image, set.data.index_axis(Axis(0), i));
            assert_eq!(sample.label, set.labels.index_axis(Axis(0), i));
            assert_eq!(sample.weight, set.class_weights.index_axis(Axis(0), i));
        }
        assert_eq!(
            load_class_weights(dir.path(), Split::Train, container).unwrap(),
            set.weights
        );

        // 测试集尚未写入.
        assert!(load_splits(dir.path(), container).is_err());
        write_split(dir.path(), Split::Test, &set, container).unwrap();
        let (train, test) = load_splits(dir.path(), container).unwrap();
        assert_eq!(train.len(), test.len());
    }

    #[test]
    fn test_names() {
        let npz = Container::Npz;
        assert_eq!(ArrayKind::Data.file_name(Split::Train, npz), "Data_train.npz");
        assert_eq!(
            ArrayKind::ClassWeights.file_name(Split::Test, npz),
            "Class_Weight_test.npz"
        );
        assert_eq!(ArrayKind::Weights.file_name(Split::Test, npz), "Weight_test.npz");
        assert_eq!(ArrayKind::Label.array_name(Split::Train), "OASIS_label_train");
        assert_eq!(
            ArrayKind::ClassWeights.array_name(Split::Train),
            "OASIS_class_weights_train"
        );
        assert_eq!(ArrayKind::Weights.array_name(Split::Test), "OASIS_weights_test");
    }

    #[test]
    fn test_container_from_str() {
        assert_eq!("npz".parse::<Container>().unwrap(), Container::Npz);
        assert_eq!("NPZ".parse::<Container>().unwrap(), Container::Npz);
        assert!(matches!(
            "mat".parse::<Container>(),
            Err(Error::InvalidContainer(s)) if s == "mat"
        ));
    }

    #[test]
    fn test_npz_split_round_trip() {
        check_round_trip(Container::Npz);
    }

    #[cfg(feature = "hdf5")]
    #[test]
    fn test_h5_names_and_default() {
        assert_eq!(Container::default(), Container::Hdf5);
        assert_eq!("h5".parse::<Container>().unwrap(), Container::Hdf5);
        assert_eq!("HDF5".parse::<Container>().unwrap(), Container::Hdf5);

        let names: Vec<String> = ArrayKind::ALL
            .iter()
            .flat_map(|k| Split::ALL.map(|s| k.file_name(s, Container::Hdf5)))
            .collect();
        assert_eq!(
            names,
            [
                "Data_train.h5",
                "Data_test.h5",
                "Label_train.h5",
                "Label_test.h5",
                "Class_Weight_train.h5",
                "Class_Weight_test.h5",
                "Weight_train.h5",
                "Weight_test.h5",
            ]
        );
    }

    #[cfg(feature = "hdf5")]
    #[test]
    fn test_h5_split_round_trip() {
        check_round_trip(Container::Hdf5);
    }
}
