//! 按 epoch 累加的混淆矩阵.
//!
//! 生命周期: [`ConfusionAccumulator::start_epoch`] -> 若干次
//! [`ConfusionAccumulator::accumulate`] -> [`ConfusionAccumulator::finalize`].
//! [`ConfusionAccumulator::reset`] 回到未开启状态.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayBase, Axis, Data, Dimension};

#[derive(Clone, Debug)]
enum State {
    Idle,
    Accumulating {
        epoch: usize,
        sum: Array2<f64>,
        iterations: usize,
    },
}

/// 混淆矩阵累加器. 行对应真值类别, 列对应预测类别.
#[derive(Clone, Debug)]
pub struct ConfusionAccumulator {
    num_class: usize,
    state: State,
}

impl ConfusionAccumulator {
    /// 创建未开启的累加器.
    pub fn new(num_class: usize) -> Self {
        Self {
            num_class,
            state: State::Idle,
        }
    }

    /// 类别数.
    #[inline]
    pub fn num_class(&self) -> usize {
        self.num_class
    }

    /// 开始新的 epoch. 之前未完成的累加会被丢弃.
    pub fn start_epoch(&mut self, epoch: usize) {
        self.state = State::Accumulating {
            epoch,
            sum: Array2::zeros((self.num_class, self.num_class)),
            iterations: 0,
        };
    }

    /// 是否已开启.
    #[inline]
    pub fn is_started(&self) -> bool {
        matches!(self.state, State::Accumulating { .. })
    }

    /// 当前 epoch. 未开启时返回 `None`.
    #[inline]
    pub fn epoch(&self) -> Option<usize> {
        match self.state {
            State::Idle => None,
            State::Accumulating { epoch, .. } => Some(epoch),
        }
    }

    /// 本 epoch 已累加的迭代次数.
    #[inline]
    pub fn iterations(&self) -> usize {
        match self.state {
            State::Idle => 0,
            State::Accumulating { iterations, .. } => iterations,
        }
    }

    /// 累加一次迭代的预测与真值.
    ///
    /// 两者形状必须一致, 所有值必须小于类别数. 出错时累加器状态不变.
    pub fn accumulate<S, T, D>(
        &mut self,
        predicted: &ArrayBase<S, D>,
        truth: &ArrayBase<T, D>,
    ) -> Result<()>
    where
        S: Data<Elem = u8>,
        T: Data<Elem = u8>,
        D: Dimension,
    {
        let num_class = self.num_class;
        let State::Accumulating {
            sum, iterations, ..
        } = &mut self.state
        else {
            return Err(Error::AccumulatorNotStarted);
        };
        if predicted.shape() != truth.shape() {
            return Err(Error::ShapeMismatch {
                left: predicted.shape().to_vec(),
                right: truth.shape().to_vec(),
            });
        }

        let mut counts = Array2::<f64>::zeros((num_class, num_class));
        for (&p, &t) in predicted.iter().zip(truth.iter()) {
            for class in [p, t] {
                if class as usize >= num_class {
                    return Err(Error::ClassOutOfRange { class, num_class });
                }
            }
            counts[[t as usize, p as usize]] += 1.0;
        }
        *sum += &counts;
        *iterations += 1;
        Ok(())
    }

    /// 求本 epoch 各次迭代混淆矩阵的平均.
    ///
    /// `normalized` 时再按行归一化, 没有样本的行保持为 0. 没有任何迭代时返回全 0 矩阵.
    pub fn finalize(&self, normalized: bool) -> Result<ConfusionMatrix> {
        let State::Accumulating {
            epoch,
            sum,
            iterations,
        } = &self.state
        else {
            return Err(Error::AccumulatorNotStarted);
        };

        let mut values = if *iterations == 0 {
            sum.clone()
        } else {
            sum / *iterations as f64
        };
        if normalized {
            for mut row in values.axis_iter_mut(Axis(0)) {
                let total = row.sum();
                if total > 0.0 {
                    row /= total;
                }
            }
        }
        Ok(ConfusionMatrix {
            values,
            epoch: *epoch,
            iterations: *iterations,
            normalized,
        })
    }

    /// 回到未开启状态, 丢弃已累加的数据.
    #[inline]
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}

/// 一个 epoch 的混淆矩阵结果.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfusionMatrix {
    values: Array2<f64>,
    epoch: usize,
    iterations: usize,
    normalized: bool,
}

impl ConfusionMatrix {
    /// 矩阵值. 行对应真值类别, 列对应预测类别.
    #[inline]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// 真值为 `truth`、预测为 `predicted` 的单元格.
    #[inline]
    pub fn get(&self, truth: usize, predicted: usize) -> Option<f64> {
        self.values.get([truth, predicted]).copied()
    }

    /// 所属 epoch.
    #[inline]
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// 参与平均的迭代次数.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// 是否已按行归一化.
    #[inline]
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// 按行导出, 用于序列化.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.rows().into_iter().map(|r| r.to_vec()).collect()
    }
}
