//! 标签重映射.
//!
//! 原始分割标签是稀疏的解剖编码 (如 FreeSurfer 的 2, 3, 4, ..., 60),
//! 网络需要的是从 0 开始的连续类别编号. [`RemapTable`] 描述一种映射:
//! 有序编码表中第 `i` 个 (从 1 开始) 编码映射为类别 `i`, 其余编码映射为背景 0.

use crate::consts::remap::*;
use crate::consts::BACKGROUND_CLASS;
use crate::error::{Error, Result};
use ndarray::{Array, ArrayBase, Data, Dimension};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// 查表前对原始编码进行的预处理.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PreMerge {
    /// 所有 `>= threshold` 的编码按奇偶合并为 `even` 或 `odd`.
    Parity {
        /// 参与合并的最小编码.
        threshold: i32,
        /// 偶数编码的目标值.
        even: i32,
        /// 奇数编码的目标值.
        odd: i32,
    },
}

impl PreMerge {
    /// 对单个原始编码应用预处理.
    #[inline]
    pub fn apply(&self, code: i32) -> i32 {
        match *self {
            Self::Parity {
                threshold,
                even,
                odd,
            } => {
                if code < threshold {
                    code
                } else if code % 2 == 0 {
                    even
                } else {
                    odd
                }
            }
        }
    }
}

/// 冻结的、带版本号的有序重映射表.
#[derive(Clone, Debug)]
pub struct RemapTable {
    name: String,
    version: u32,
    codes: Vec<i32>,
    premerge: Option<PreMerge>,
    lookup: HashMap<i32, u8>,
}

impl PartialEq for RemapTable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.codes == other.codes
            && self.premerge == other.premerge
    }
}

impl RemapTable {
    /// 构建重映射表.
    ///
    /// `codes` 不能包含重复编码, 且长度不超过 255 (类别以 `u8` 存储),
    /// 否则返回 [`Error::InvalidRemapTable`].
    pub fn new(
        name: impl Into<String>,
        version: u32,
        codes: Vec<i32>,
        premerge: Option<PreMerge>,
    ) -> Result<Self> {
        let name = name.into();
        if codes.len() > u8::MAX as usize {
            return Err(Error::InvalidRemapTable {
                reason: format!("{} codes exceed the u8 class range", codes.len()),
                name,
            });
        }
        let table = Self::build(name, version, codes, premerge);
        if table.lookup.len() != table.codes.len() {
            return Err(Error::InvalidRemapTable {
                reason: "duplicate codes".to_string(),
                name: table.name,
            });
        }
        Ok(table)
    }

    /// 不做校验地构建. 仅用于内置表.
    fn build(name: String, version: u32, codes: Vec<i32>, premerge: Option<PreMerge>) -> Self {
        let lookup = codes
            .iter()
            .enumerate()
            .map(|(i, &code)| (code, (i + 1) as u8))
            .collect();
        Self {
            name,
            version,
            codes,
            premerge,
            lookup,
        }
    }

    /// 表名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 表版本.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// 有序编码表.
    #[inline]
    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    /// 查表前的预处理.
    #[inline]
    pub fn premerge(&self) -> Option<PreMerge> {
        self.premerge
    }

    /// 类别总数, 包括背景.
    #[inline]
    pub fn num_classes(&self) -> usize {
        self.codes.len() + 1
    }

    /// 求单个原始编码对应的类别.
    #[inline]
    pub fn class_of(&self, code: i32) -> u8 {
        let code = match self.premerge {
            Some(p) => p.apply(code),
            None => code,
        };
        self.lookup.get(&code).copied().unwrap_or(BACKGROUND_CLASS)
    }

    /// 将原始标签逐体素映射为类别. 输出形状与输入一致.
    pub fn remap<S, D>(&self, labels: &ArrayBase<S, D>) -> Array<u8, D>
    where
        S: Data<Elem = i32>,
        D: Dimension,
    {
        labels.map(|&code| self.class_of(code))
    }
}

static FS_TABLE: Lazy<RemapTable> =
    Lazy::new(|| RemapTable::build("FS".into(), BUILTIN_VERSION, FS_CODES.to_vec(), None));

static NEO_TABLE: Lazy<RemapTable> = Lazy::new(|| {
    RemapTable::build(
        "Neo".into(),
        BUILTIN_VERSION,
        NEO_CODES.to_vec(),
        Some(PreMerge::Parity {
            threshold: NEO_MERGE_THRESHOLD,
            even: NEO_MERGE_EVEN,
            odd: NEO_MERGE_ODD,
        }),
    )
});

/// 内置重映射方案.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RemapScheme {
    /// FreeSurfer 标签.
    Fs,

    /// Neuromorphometrics 标签, 带奇偶预合并.
    Neo,
}

impl RemapScheme {
    /// 方案名.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fs => "FS",
            Self::Neo => "Neo",
        }
    }

    /// 方案对应的内置表.
    #[inline]
    pub fn table(self) -> &'static RemapTable {
        match self {
            Self::Fs => Lazy::force(&FS_TABLE),
            Self::Neo => Lazy::force(&NEO_TABLE),
        }
    }
}

impl fmt::Display for RemapScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RemapScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FS" => Ok(Self::Fs),
            "Neo" => Ok(Self::Neo),
            other => Err(Error::InvalidRemapScheme(other.to_string())),
        }
    }
}

/// 按名称索引的重映射表集合. 新方案通过 [`RemapRegistry::register`] 加入,
/// 不需要改动流水线.
#[derive(Clone, Debug)]
pub struct RemapRegistry {
    tables: BTreeMap<String, RemapTable>,
}

impl Default for RemapRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RemapRegistry {
    /// 仅包含内置 `FS` 与 `Neo` 的集合.
    pub fn builtin() -> Self {
        let mut ans = Self {
            tables: BTreeMap::new(),
        };
        for scheme in [RemapScheme::Fs, RemapScheme::Neo] {
            ans.register(scheme.table().clone());
        }
        ans
    }

    /// 注册一张表. 同名的旧表会被替换并返回.
    pub fn register(&mut self, table: RemapTable) -> Option<RemapTable> {
        self.tables.insert(table.name().to_string(), table)
    }

    /// 按名称查找表. 未注册时返回 [`Error::InvalidRemapScheme`].
    pub fn get(&self, name: &str) -> Result<&RemapTable> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::InvalidRemapScheme(name.to_string()))
    }

    /// 已注册的表名, 升序.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

/// 按方案名重映射. 方案名不在内置集合中时返回 [`Error::InvalidRemapScheme`].
pub fn remap<S, D>(labels: &ArrayBase<S, D>, scheme: &str) -> Result<Array<u8, D>>
where
    S: Data<Elem = i32>,
    D: Dimension,
{
    Ok(scheme.parse::<RemapScheme>()?.table().remap(labels))
}
