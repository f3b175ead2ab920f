//! 切片筛选.

use crate::error::{Error, Result};
use ndarray::{Array3, ArrayView3, Axis};

/// 生成长度为 `n` 的切片保留掩码.
///
/// 1. 保留偶数下标, 丢弃奇数下标;
/// 2. 强制丢弃前 `skip_frames` 个下标;
/// 3. 强制丢弃 `[n - skip_frames, n - 1)` (下界截断到 0). 最后一张切片不受该规则影响,
///    只受奇偶规则约束. `skip_frames == 0` 时该区间为 `[0, n - 1)`.
///
/// 规则 3 中首尾的不对称是既定行为, 已训练模型依赖于该切片集合, 不要 "修复" 它.
pub fn keep_mask(n: usize, skip_frames: usize) -> Vec<bool> {
    let mut mask: Vec<bool> = (0..n).map(|i| i % 2 == 0).collect();
    mask[..skip_frames.min(n)].fill(false);

    let tail_start = if skip_frames == 0 {
        0
    } else {
        n.saturating_sub(skip_frames)
    };
    let tail_end = n.saturating_sub(1);
    if tail_start < tail_end {
        mask[tail_start..tail_end].fill(false);
    }
    mask
}

/// 长度为 `n` 时被保留的切片下标, 升序.
pub fn kept_indices(n: usize, skip_frames: usize) -> Vec<usize> {
    keep_mask(n, skip_frames)
        .into_iter()
        .enumerate()
        .filter_map(|(i, keep)| keep.then_some(i))
        .collect()
}

/// 用同一掩码沿第 0 轴筛选扫描和标注切片.
///
/// 两者形状必须一致, 否则返回 [`Error::ShapeMismatch`]. 结果可能为空 (`n <= 2 * skip_frames`
/// 时), 这不是错误.
pub fn select<A: Clone, B: Clone>(
    image: ArrayView3<A>,
    label: ArrayView3<B>,
    skip_frames: usize,
) -> Result<(Array3<A>, Array3<B>)> {
    if image.dim() != label.dim() {
        return Err(Error::shape_mismatch_3d(image.dim(), label.dim()));
    }
    let indices = kept_indices(image.len_of(Axis(0)), skip_frames);
    Ok((
        image.select(Axis(0), &indices),
        label.select(Axis(0), &indices),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_small_mask() {
        assert_eq!(
            keep_mask(10, 2),
            [false, false, true, false, true, false, true, false, false, false]
        );
        assert_eq!(kept_indices(10, 2), [2, 4, 6]);
    }

    #[test]
    fn test_default_skip_on_100_slices() {
        let kept = kept_indices(100, 40);
        assert_eq!(kept, (40..60).step_by(2).collect::<Vec<_>>());
        assert_eq!(kept.len(), 10);
    }

    #[test]
    fn test_last_slice_only_obeys_parity() {
        // n = 11: 下标 10 是偶数, 不在尾部强制丢弃区间 [9, 10) 内.
        assert_eq!(kept_indices(11, 2), [2, 4, 6, 8, 10]);
        assert_eq!(kept_indices(9, 1), [2, 4, 6, 8]);
    }

    #[test]
    fn test_degenerate_skips() {
        // 与 `mask[-0:-1] = 0` 一致: 只剩最后一张 (若为偶数下标).
        assert_eq!(kept_indices(5, 0), [4]);
        assert_eq!(kept_indices(4, 0), Vec::<usize>::new());
        assert!(kept_indices(6, 3).is_empty());
        assert!(kept_indices(3, 40).is_empty());
        assert!(kept_indices(0, 40).is_empty());
    }

    #[test]
    fn test_select_keeps_slice_label_pairs() {
        let image = Array3::from_shape_fn((10, 2, 3), |(s, _, _)| s as f32);
        let label = Array3::from_shape_fn((10, 2, 3), |(s, _, _)| s as i32);
        let (image, label) = select(image.view(), label.view(), 2).unwrap();
        assert_eq!(image.dim(), (3, 2, 3));
        assert_eq!(label.dim(), (3, 2, 3));
        for (s, expected) in [2, 4, 6].into_iter().enumerate() {
            assert!(image.index_axis(Axis(0), s).iter().all(|v| *v == expected as f32));
            assert!(label.index_axis(Axis(0), s).iter().all(|v| *v == expected));
        }
    }

    #[test]
    fn test_select_may_be_empty() {
        let image = Array3::<f32>::zeros((4, 5, 6));
        let label = Array3::<i32>::zeros((4, 5, 6));
        let (image, label) = select(image.view(), label.view(), 40).unwrap();
        assert_eq!(image.dim(), (0, 5, 6));
        assert_eq!(label.dim(), (0, 5, 6));
    }
}
