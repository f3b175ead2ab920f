//! 中值频率平衡类别权重, 叠加标签边界强调.
//!
//! 稀有类别 (像素少) 获得更大的权重, 分割边界上的像素在此基础上再加
//! [`BOUNDARY_WEIGHT`], 以对抗损失函数中的类别不平衡和边界像素占比过低.

use crate::consts::BOUNDARY_WEIGHT;
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, ArrayView3, ArrayViewMut1, Axis, Zip};

/// 统计每个类别出现的像素个数. 下标即类别.
fn class_counts<'a, I: IntoIterator<Item = &'a u8>>(labels: I) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &l in labels {
        counts[l as usize] += 1;
    }
    counts
}

/// 中位数. 偶数个元素时取中间两个的平均. `values` 为空时返回 `None`.
fn median(values: &mut [usize]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid] as f64)
    } else {
        Some((values[mid - 1] + values[mid]) as f64 / 2.0)
    }
}

/// 中值频率平衡的逐类别权重: `floor(median / count)`.
///
/// 返回向量长度为出现过的最大类别 + 1, 未出现的类别权重为 0. 没有任何像素时返回空向量.
fn median_frequency_weights(counts: &[usize; 256]) -> Vec<u32> {
    let mut present: Vec<usize> = counts.iter().copied().filter(|c| *c > 0).collect();
    let Some(median_freq) = median(&mut present) else {
        return Vec::new();
    };
    let Some(max_label) = counts.iter().rposition(|c| *c > 0) else {
        return Vec::new();
    };
    counts[..=max_label]
        .iter()
        .map(|&c| {
            if c == 0 {
                0
            } else {
                (median_freq / c as f64).floor() as u32
            }
        })
        .collect()
}

/// 按 `numpy.gradient` 的规则标记一维标签序列中梯度非零的位置:
/// 两端用单侧差分, 中间用中心差分. 长度小于 2 时梯度视为 0.
fn mark_gradient(lane: ArrayView1<u8>, mut edge: ArrayViewMut1<bool>) {
    let n = lane.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let (lo, hi) = match i {
            0 => (0, 1),
            i if i == n - 1 => (n - 2, n - 1),
            i => (i - 1, i + 1),
        };
        if lane[lo] != lane[hi] {
            edge[i] = true;
        }
    }
}

/// 标签切片堆 `(N, H, W)` 中每张切片的平面内边界: 高或宽方向上任一梯度非零.
///
/// 不沿切片轴求梯度, 相邻切片的标签不影响边界.
pub fn boundary_mask(labels: ArrayView3<u8>) -> Array3<bool> {
    let mut edges = Array3::from_elem(labels.raw_dim(), false);
    for axis in [Axis(1), Axis(2)] {
        Zip::from(labels.lanes(axis))
            .and(edges.lanes_mut(axis))
            .for_each(mark_gradient);
    }
    edges
}

/// 为已重映射的标签切片堆 `(N, H, W)` 估计像素权重.
///
/// 类别频率在整个切片堆上统计 (每个体数据一份逐类别权重), 边界在每张切片的平面内计算.
/// 返回 (像素权重图, 逐类别权重向量). 背景类别不做特殊处理.
pub fn estimate_weights(labels: ArrayView3<u8>) -> (Array3<u32>, Vec<u32>) {
    let counts = class_counts(labels.iter());
    let weights = median_frequency_weights(&counts);

    // 出现过的类别一定在 `weights` 范围内.
    let mut class_weights = labels.mapv(|l| weights[l as usize]);
    Zip::from(&mut class_weights)
        .and(&boundary_mask(labels))
        .for_each(|w, &edge| {
            if edge {
                *w += BOUNDARY_WEIGHT;
            }
        });
    (class_weights, weights)
}

/// 为单张已重映射的标签切片 `(H, W)` 估计像素权重. 规则同 [`estimate_weights`].
pub fn estimate_slice_weights(labels: ArrayView2<u8>) -> (Array2<u32>, Vec<u32>) {
    let (map, weights) = estimate_weights(labels.insert_axis(Axis(0)));
    (map.index_axis_move(Axis(0), 0), weights)
}
