use crate::error::Result;
use ndarray::{Array, ArrayBase, Data, Dimension, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter, ReadableElement, WritableElement};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// npz 归档内的条目名: `{name}.npy`, 与 `numpy.savez` 保持一致.
#[inline]
fn entry_name(name: &str) -> String {
    format!("{name}.npy")
}

/// 将单个数组以名称 `name` 写入 `path` 处新建的 (未压缩) npz 文件. 已有文件会被覆盖.
pub fn write_array<P, A, S, D>(path: P, name: &str, array: &ArrayBase<S, D>) -> Result<()>
where
    P: AsRef<Path>,
    A: WritableElement,
    S: Data<Elem = A>,
    D: Dimension,
{
    let file = File::create(path.as_ref())?;
    let mut npz = NpzWriter::new(BufWriter::new(file));
    npz.add_array(entry_name(name), array)?;
    npz.finish()?;
    Ok(())
}

/// 从 `path` 处的 npz 文件读取名为 `name` 的数组.
pub fn read_array<P, A, D>(path: P, name: &str) -> Result<Array<A, D>>
where
    P: AsRef<Path>,
    A: ReadableElement,
    D: Dimension,
{
    let file = OpenOptions::new().read(true).open(path.as_ref())?;
    let mut npz = NpzReader::new(BufReader::new(file))?;
    Ok(npz.by_name::<OwnedRepr<A>, D>(&entry_name(name))?)
}

/// 获取 npz 文件包含的所有数组名 (不含 `.npy` 后缀).
pub fn array_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = OpenOptions::new().read(true).open(path.as_ref())?;
    let mut npz = NpzReader::new(BufReader::new(file))?;
    Ok(npz
        .names()?
        .into_iter()
        .map(|n| match n.strip_suffix(".npy") {
            Some(s) => s.to_string(),
            None => n,
        })
        .collect())
}
