//! 通用常量.

/// 默认跳过的首尾切片个数. 首尾的这些切片大概率只包含背景.
pub const DEFAULT_SKIP_FRAMES: usize = 40;

/// 标签边界像素在类别权重之上额外叠加的权重.
pub const BOUNDARY_WEIGHT: u32 = 2;

/// 类别 0 代表背景. 所有未出现在重映射表中的原始标签值都会落到这里.
pub const BACKGROUND_CLASS: u8 = 0;

/// 重映射表.
pub mod remap {
    /// FreeSurfer 风格的 32 个原始标签值. 顺序即类别编号 (从 1 开始).
    ///
    /// 已训练模型的类别语义依赖该顺序, 不要改动.
    pub const FS_CODES: [i32; 32] = [
        2, 3, 4, 5, 7, 8, 10, 11, 12, 13, 14, 15, 16, 17, 18, 24, 26, 28, 41, 42, 43, 44, 46, 47,
        49, 50, 51, 52, 53, 54, 58, 60,
    ];

    /// Neuromorphometrics 风格的 32 个原始标签值. 顺序即类别编号 (从 1 开始).
    ///
    /// 其中 210 和 211 是预合并后的皮层标签: 所有 `>= 100` 的原始值按奇偶性分别合并为
    /// 211 (奇) 与 210 (偶).
    pub const NEO_CODES: [i32; 32] = [
        45, 211, 52, 50, 41, 39, 60, 37, 58, 56, 4, 11, 35, 48, 32, 46, 30, 62, 44, 210, 51, 49,
        40, 38, 59, 36, 57, 55, 47, 31, 23, 61,
    ];

    /// Neo 预合并阈值. 大于等于该值的原始标签参与奇偶合并.
    pub const NEO_MERGE_THRESHOLD: i32 = 100;

    /// Neo 预合并后偶数标签的目标值.
    pub const NEO_MERGE_EVEN: i32 = 210;

    /// Neo 预合并后奇数标签的目标值.
    pub const NEO_MERGE_ODD: i32 = 211;

    /// 内置表的版本号. 改动任何内置表时必须同时递增.
    pub const BUILTIN_VERSION: u32 = 1;
}

/// 磁盘上的文件名约定.
pub mod layout {
    /// 扫描体数据相对于 `data_dir/<volume_id>` 的路径.
    pub const SCAN_RELATIVE: [&str; 2] = ["mri", "orig.mgz"];

    /// 标签体数据文件名后缀, 完整形式为 `label_dir/<volume_id>_glm.mgz`.
    pub const LABEL_SUFFIX: &str = "_glm.mgz";

    /// 持久化数组名的前缀.
    pub const ARRAY_PREFIX: &str = "OASIS";
}
