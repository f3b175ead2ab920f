//! 通用 MRI scan/label 数据加载器.
//!
//! 提供迭代器风格的数据集获取模式.

use crate::consts::layout::{LABEL_SUFFIX, SCAN_RELATIVE};
use crate::error::{Error, Result};
use crate::MriData3d;
use std::fs;
use std::path::{Path, PathBuf};

/// 路径构造器. 接受根目录和体数据编号, 获得完整文件路径.
pub type PathBuilder = fn(&Path, &str) -> PathBuf;

/// 默认扫描路径: `data_dir/<id>/mri/orig.mgz`.
pub fn default_scan_path(data_dir: &Path, id: &str) -> PathBuf {
    let mut ans = data_dir.join(id);
    ans.extend(SCAN_RELATIVE);
    ans
}

/// 默认标注路径: `label_dir/<id>_glm.mgz`.
pub fn default_label_path(label_dir: &Path, id: &str) -> PathBuf {
    label_dir.join(format!("{id}{LABEL_SUFFIX}"))
}

/// 读取体数据列表文件. 每行一个编号, 忽略首尾空白和空行.
///
/// 列表中没有任何编号时返回 [`Error::EmptyVolumeList`].
pub fn read_volume_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let ids: Vec<String> = fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if ids.is_empty() {
        return Err(Error::EmptyVolumeList(path.display().to_string()));
    }
    Ok(ids)
}

/// 从体数据编号、路径、路径构造器来创建通用的 MRI data 加载器.
///
/// # 注意
///
/// `ids` 的所有取值 `id` 必须在 `scan_dir` 下有 `scan_builder(scan_dir, id)`,
/// 在 `label_dir` 下有 `label_builder(label_dir, id)`, 否则加载器在迭代时会返回 `Err`.
pub fn volume_loader<I, S>(
    ids: I,
    scan_dir: impl AsRef<Path>,
    scan_builder: PathBuilder,
    label_dir: impl AsRef<Path>,
    label_builder: PathBuilder,
) -> VolumeLoader
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
    ids.reverse();

    VolumeLoader {
        scan_dir: scan_dir.as_ref().to_owned(),
        scan_builder,
        label_dir: label_dir.as_ref().to_owned(),
        label_builder,
        ids_rev: ids,
    }
}

/// 3D MRI 数据集 (scan + label) 加载器, 并在内部自动转换文件名.
#[derive(Debug)]
pub struct VolumeLoader {
    scan_dir: PathBuf,
    scan_builder: PathBuilder,
    label_dir: PathBuf,
    label_builder: PathBuilder,
    ids_rev: Vec<String>,
}

impl Iterator for VolumeLoader {
    type Item = (String, Result<MriData3d>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids_rev.pop()?;

        let scan = (self.scan_builder)(&self.scan_dir, &id);
        let label = (self.label_builder)(&self.label_dir, &id);
        let data = MriData3d::open(scan, label);

        Some((id, data))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ids_rev.len(), Some(self.ids_rev.len()))
    }
}

impl ExactSizeIterator for VolumeLoader {
    #[inline]
    fn len(&self) -> usize {
        self.ids_rev.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mgh::{write_mgh, MghType};
    use ndarray::Array3;

    #[test]
    fn test_default_layout() {
        let root = Path::new("/data");
        assert_eq!(
            default_scan_path(root, "OAS1_0001_MR1"),
            Path::new("/data/OAS1_0001_MR1/mri/orig.mgz")
        );
        assert_eq!(
            default_label_path(root, "OAS1_0001_MR1"),
            Path::new("/data/OAS1_0001_MR1_glm.mgz")
        );
    }

    #[test]
    fn test_read_volume_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("train.txt");
        fs::write(&list, "  a01 \n\nb02\r\n   \n").unwrap();
        assert_eq!(read_volume_list(&list).unwrap(), ["a01", "b02"]);

        fs::write(&list, "\n \n").unwrap();
        assert!(matches!(
            read_volume_list(&list),
            Err(Error::EmptyVolumeList(_))
        ));
        assert!(matches!(
            read_volume_list(dir.path().join("missing.txt")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_loader_yields_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let arr = Array3::<f32>::zeros((2, 2, 2));
        for id in ["v1", "v2"] {
            let scan = default_scan_path(dir.path(), id);
            fs::create_dir_all(scan.parent().unwrap()).unwrap();
            write_mgh(&scan, arr.view(), MghType::UChar, [1.0; 3]).unwrap();
            write_mgh(
                default_label_path(dir.path(), id),
                arr.view(),
                MghType::Int,
                [1.0; 3],
            )
            .unwrap();
        }

        let mut loader = volume_loader(
            ["v1", "missing", "v2"],
            dir.path(),
            default_scan_path,
            dir.path(),
            default_label_path,
        );
        assert_eq!(loader.len(), 3);

        let (id, data) = loader.next().unwrap();
        assert_eq!(id, "v1");
        assert_eq!(data.unwrap().shape(), (2, 2, 2));
        let (id, data) = loader.next().unwrap();
        assert_eq!(id, "missing");
        assert!(data.is_err());
        assert_eq!(loader.next().unwrap().0, "v2");
        assert!(loader.next().is_none());
    }
}
