//! 强度窗口与 min-max 归一化.

use itertools::{Itertools, MinMaxResult};
use ndarray::{Array, ArrayBase, Data, Dimension};
use ordered_float::OrderedFloat;

/// 强度窗口, 包含下限和上限.
///
/// 用于把 MRI 原始强度线性映射到 `[0, 1]`. 该窗口是只读的.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntensityWindow {
    lower: f32,
    upper: f32,
}

impl IntensityWindow {
    /// 构建强度窗口.
    ///
    /// `lower` 和 `upper` 必须有限且 `lower <= upper`, 否则返回 `None`.
    pub fn new(lower: f32, upper: f32) -> Option<Self> {
        (lower.is_finite() && upper.is_finite() && lower <= upper).then_some(Self { lower, upper })
    }

    /// 以 `it` 中所有有限值的最小值和最大值构建窗口. 没有有限值时返回 `None`.
    pub fn from_values<I: IntoIterator<Item = f32>>(it: I) -> Option<Self> {
        match it
            .into_iter()
            .filter(|v| v.is_finite())
            .map(OrderedFloat)
            .minmax()
        {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Some(Self {
                lower: v.0,
                upper: v.0,
            }),
            MinMaxResult::MinMax(lo, hi) => Some(Self {
                lower: lo.0,
                upper: hi.0,
            }),
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower(&self) -> f32 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper(&self) -> f32 {
        self.upper
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }

    /// 窗宽是否为 0, 即所有取值都相同.
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.width() == 0.0
    }

    /// 求 `v` 在窗口中的相对位置, 窗口外的值会被截断到 `[0, 1]`.
    ///
    /// 窗宽为 0 时恒返回 `Some(0.0)`. 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_f32(&self, v: f32) -> Option<f32> {
        if !v.is_finite() {
            return None;
        }
        if self.is_flat() {
            return Some(0.0);
        }
        Some(((v - self.lower) / self.width()).clamp(0.0, 1.0))
    }
}

/// 使用数据自身的最小值和最大值将其线性归一化到 `[0, 1]`.
///
/// 返回归一化结果和所用窗口. 数据中没有有限值时窗口为 `None`, 结果全为 0.
/// 非有限值 (NaN, inf) 归一化为 0.
pub fn normalize_min_max<S, D>(data: &ArrayBase<S, D>) -> (Array<f32, D>, Option<IntensityWindow>)
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let window = IntensityWindow::from_values(data.iter().copied());
    let out = match window {
        Some(w) => data.mapv(|v| w.eval_f32(v).unwrap_or(0.0)),
        None => Array::zeros(data.raw_dim()),
    };
    (out, window)
}
