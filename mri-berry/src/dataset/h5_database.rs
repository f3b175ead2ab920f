use crate::error::Result;
use hdf5::{File, H5Type};
use ndarray::{Array, ArrayBase, Data, Dimension};
use std::path::Path;

/// 将单个数组以数据集名 `name` 写入 `path` 处新建的 HDF5 文件. 已有文件会被覆盖.
pub fn write_array<P, A, S, D>(path: P, name: &str, array: &ArrayBase<S, D>) -> Result<()>
where
    P: AsRef<Path>,
    A: H5Type,
    S: Data<Elem = A>,
    D: Dimension,
{
    let array = array.as_standard_layout();
    let file = File::create(path.as_ref())?;
    file.new_dataset_builder()
        .with_data(array.view())
        .create(name)?;
    Ok(())
}

/// 从 `path` 处的 HDF5 文件读取名为 `name` 的数据集.
pub fn read_array<P, A, D>(path: P, name: &str) -> Result<Array<A, D>>
where
    P: AsRef<Path>,
    A: H5Type,
    D: Dimension,
{
    let file = File::open(path.as_ref())?;
    let array = file.dataset(name)?.read::<A, D>()?;
    Ok(array)
}

/// 获取 HDF5 文件根组下的所有成员名.
pub fn array_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(path.as_ref())?;
    Ok(file.member_names()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::{arr2, Array2, Array3, Ix2, Ix3};

    #[test]
    fn test_single_dataset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Label_train.h5");
        let labels = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 12 + j * 4 + k) as u8);
        write_array(&path, "OASIS_label_train", &labels).unwrap();

        assert_eq!(array_names(&path).unwrap(), ["OASIS_label_train"]);
        let back: Array3<u8> = read_array::<_, u8, Ix3>(&path, "OASIS_label_train").unwrap();
        assert_eq!(back, labels);
    }

    #[test]
    fn test_transposed_input_is_written_in_logical_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.h5");
        let w = arr2(&[[1u32, 2, 3], [4, 5, 6]]);
        write_array(&path, "w", &w.t()).unwrap();

        let back: Array2<u32> = read_array::<_, u32, Ix2>(&path, "w").unwrap();
        assert_eq!(back, arr2(&[[1, 4], [2, 5], [3, 6]]));
    }

    #[test]
    fn test_missing_dataset_or_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.h5");
        write_array(&path, "a", &arr2(&[[1u8]])).unwrap();

        assert!(matches!(
            read_array::<_, u8, Ix2>(&path, "b"),
            Err(Error::Hdf5(_))
        ));
        assert!(matches!(
            read_array::<_, u8, Ix3>(&path, "a"),
            Err(Error::Hdf5(_))
        ));
        assert!(matches!(
            read_array::<_, u8, Ix2>(dir.path().join("none.h5"), "a"),
            Err(Error::Hdf5(_))
        ));
    }
}
