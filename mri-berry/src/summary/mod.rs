//! 训练日志.
//!
//! 目录布局:
//!
//! ```text
//! log_dir/
//! ├── train/
//! │   ├── events.out.tfevents.*
//! │   └── confusion_matrix/epoch_0001.json
//! └── val/
//!     └── ...
//! ```
//!
//! 标量、预测样例与混淆矩阵热力图写入 TensorBoard 事件文件, 混淆矩阵数值另存一份 json.

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::info;
use ndarray::{ArrayBase, ArrayView2, Data, Dimension};
use serde::Serialize;
use tensorboard_rs::summary_writer::SummaryWriter;

use crate::error::{Error, Result};

pub mod confusion;
pub mod render;

pub use confusion::{ConfusionAccumulator, ConfusionMatrix};

/// 热力图单元格边长, 以像素为单位.
#[cfg(not(feature = "plot"))]
const CM_CELL: u32 = 16;

/// 并排图像之间的空白宽度.
const SAMPLE_GAP: u32 = 4;

/// 日志所属阶段.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// 训练.
    Train,

    /// 验证.
    Val,
}

impl Phase {
    /// 全部阶段.
    pub const ALL: [Phase; 2] = [Self::Train, Self::Val];

    /// 子目录名.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
        }
    }

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::Train => 0,
            Self::Val => 1,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct ConfusionRecord<'a> {
    phase: &'a str,
    epoch: usize,
    iterations: usize,
    normalized: bool,
    classes: Vec<String>,
    matrix: Vec<Vec<f64>>,
}

/// 在驼峰式类别名的单词之间插入空格, 如 `LeftCSF` -> `Left CSF`,
/// `ThirdVentricle` -> `Third Ventricle`.
pub fn split_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut ans = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        ans.push(c);
        let next = chars.get(i + 1).copied();
        let after = chars.get(i + 2).copied();
        let boundary = match (next, after) {
            (Some(n), _) if c.is_lowercase() && n.is_uppercase() => true,
            (Some(n), Some(a)) => c.is_uppercase() && n.is_uppercase() && a.is_lowercase(),
            _ => false,
        };
        if boundary {
            ans.push(' ');
        }
    }
    ans
}

/// 写入一张 RGB 图像. `tensorboard_rs` 要求交错的 RGB 字节与 `[3, width, height]`.
fn put_image(writer: &mut SummaryWriter, tag: &str, img: &RgbImage, step: usize) {
    let dim = [3, img.width() as usize, img.height() as usize];
    writer.add_image(tag, img.as_raw(), &dim, step);
}

/// 训练日志写入器. 每个阶段一个 TensorBoard 写入器和一个混淆矩阵累加器.
pub struct LogWriter {
    log_dir: PathBuf,
    num_class: usize,
    normalized: bool,
    writers: [SummaryWriter; 2],
    cms: [ConfusionAccumulator; 2],
}

impl fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogWriter")
            .field("log_dir", &self.log_dir)
            .field("num_class", &self.num_class)
            .field("normalized", &self.normalized)
            .field("cms", &self.cms)
            .finish_non_exhaustive()
    }
}

impl LogWriter {
    /// 在 `log_dir` 下创建 `train/` 和 `val/` 子目录, 各自写入新的事件文件.
    ///
    /// 混淆矩阵默认按行归一化.
    pub fn new<P: AsRef<Path>>(log_dir: P, num_class: usize) -> Result<Self> {
        let log_dir = log_dir.as_ref().to_owned();
        let open = |phase: Phase| -> Result<SummaryWriter> {
            let dir = log_dir.join(phase.as_str());
            fs::create_dir_all(&dir)?;
            Ok(SummaryWriter::new(&dir))
        };
        let writers = [open(Phase::Train)?, open(Phase::Val)?];
        Ok(Self {
            log_dir,
            num_class,
            normalized: true,
            writers,
            cms: [
                ConfusionAccumulator::new(num_class),
                ConfusionAccumulator::new(num_class),
            ],
        })
    }

    /// 修改混淆矩阵是否按行归一化.
    #[inline]
    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// 类别数.
    #[inline]
    pub fn num_class(&self) -> usize {
        self.num_class
    }

    /// 某阶段的日志子目录.
    #[inline]
    pub fn phase_dir(&self, phase: Phase) -> PathBuf {
        self.log_dir.join(phase.as_str())
    }

    /// 某阶段的混淆矩阵累加器.
    #[inline]
    pub fn confusion(&self, phase: Phase) -> &ConfusionAccumulator {
        &self.cms[phase.index()]
    }

    /// 写入一个标量.
    pub fn add_scalar(&mut self, phase: Phase, tag: &str, value: f64, step: usize) {
        self.writers[phase.index()].add_scalar(tag, value as f32, step);
    }

    /// 记录训练阶段单次迭代的损失, 标签为 `loss/per_iteration`.
    pub fn loss_per_iter(&mut self, loss: f64, iteration: usize) {
        info!("train : [iteration : {iteration}] : {loss}");
        self.add_scalar(Phase::Train, "loss/per_iteration", loss, iteration);
    }

    /// 同时记录训练与验证阶段的 epoch 损失, 标签为 `loss/per_epoch`.
    pub fn loss_per_epoch(&mut self, train_loss: f64, val_loss: f64, epoch: usize, num_epochs: usize) {
        self.add_scalar(Phase::Train, "loss/per_epoch", train_loss, epoch);
        self.add_scalar(Phase::Val, "loss/per_epoch", val_loss, epoch);
        info!("[Epoch : {epoch}/{num_epochs}] : train loss = {train_loss}, val loss = {val_loss}");
    }

    /// 将预测与真值按 `jet` 色图并排 (左预测, 右真值) 写入 `sample_prediction` 图像.
    pub fn image_per_epoch(
        &mut self,
        prediction: ArrayView2<u8>,
        ground_truth: ArrayView2<u8>,
        phase: Phase,
        epoch: usize,
    ) -> Result<()> {
        let pred = render::label_to_rgb(prediction, self.num_class);
        let truth = render::label_to_rgb(ground_truth, self.num_class);
        let img = render::side_by_side(&pred, &truth, SAMPLE_GAP)?;
        put_image(
            &mut self.writers[phase.index()],
            "sample_prediction",
            &img,
            epoch,
        );
        Ok(())
    }

    /// 开启某阶段新 epoch 的混淆矩阵累加.
    #[inline]
    pub fn start_epoch(&mut self, phase: Phase, epoch: usize) {
        self.cms[phase.index()].start_epoch(epoch);
    }

    /// 累加一次迭代的混淆矩阵. 须先调用 [`LogWriter::start_epoch`].
    pub fn update_cm_per_iter<S, T, D>(
        &mut self,
        predicted: &ArrayBase<S, D>,
        truth: &ArrayBase<T, D>,
        phase: Phase,
    ) -> Result<()>
    where
        S: Data<Elem = u8>,
        T: Data<Elem = u8>,
        D: Dimension,
    {
        self.cms[phase.index()].accumulate(predicted, truth)
    }

    /// 求某阶段本 epoch 的平均混淆矩阵, 写入 `confusion_matrix` 热力图并另存 json,
    /// 返回该矩阵.
    ///
    /// `class_names` 个数须与类别数一致.
    pub fn cm_per_epoch<N: AsRef<str>>(
        &mut self,
        class_names: &[N],
        phase: Phase,
        epoch: usize,
    ) -> Result<ConfusionMatrix> {
        if class_names.len() != self.num_class {
            return Err(Error::ShapeMismatch {
                left: vec![self.num_class],
                right: vec![class_names.len()],
            });
        }
        let cm = self.cms[phase.index()].finalize(self.normalized)?;
        info!("{phase} confusion matrix of epoch {epoch}: {:?}", cm.values().dim());
        let classes: Vec<String> = class_names
            .iter()
            .map(|n| split_camel_case(n.as_ref()))
            .collect();

        #[cfg(feature = "plot")]
        let img = render::labelled_confusion_heatmap(
            cm.values().view(),
            &classes,
            &format!("{phase} confusion matrix, epoch {epoch}"),
        )?;
        #[cfg(not(feature = "plot"))]
        let img = render::confusion_heatmap(cm.values().view(), CM_CELL);
        put_image(
            &mut self.writers[phase.index()],
            "confusion_matrix",
            &img,
            epoch,
        );

        let dir = self.phase_dir(phase).join("confusion_matrix");
        fs::create_dir_all(&dir)?;
        let record = ConfusionRecord {
            phase: phase.as_str(),
            epoch,
            iterations: cm.iterations(),
            normalized: cm.is_normalized(),
            classes,
            matrix: cm.to_rows(),
        };
        let file = File::create(dir.join(format!("epoch_{epoch:04}.json")))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &record)?;
        Ok(cm)
    }

    /// 丢弃所有阶段已累加的混淆矩阵.
    pub fn reset_cms(&mut self) {
        self.cms.iter_mut().for_each(ConfusionAccumulator::reset);
    }

    /// 刷新所有写入器.
    pub fn flush(&mut self) {
        self.writers.iter_mut().for_each(SummaryWriter::flush);
    }

    /// 刷新并关闭.
    pub fn close(mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_split_camel_case() {
        assert_eq!(split_camel_case("LeftCSF"), "Left CSF");
        assert_eq!(split_camel_case("ThirdVentricle"), "Third Ventricle");
        assert_eq!(split_camel_case("CSFSpace"), "CSF Space");
        assert_eq!(split_camel_case("background"), "background");
        assert_eq!(split_camel_case(""), "");
    }

    /// `dir` 下的 TensorBoard 事件文件.
    fn event_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("events.out.tfevents"))
            })
            .collect()
    }

    fn total_len(files: &[PathBuf]) -> u64 {
        files.iter().map(|f| fs::metadata(f).unwrap().len()).sum()
    }

    #[test]
    fn test_each_phase_gets_an_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = LogWriter::new(dir.path(), 3).unwrap();
        log.flush();
        let train = event_files(&dir.path().join("train"));
        let val = event_files(&dir.path().join("val"));
        assert_eq!(train.len(), 1);
        assert_eq!(val.len(), 1);
        let (train_before, val_before) = (total_len(&train), total_len(&val));

        log.loss_per_iter(0.5, 1);
        log.loss_per_epoch(0.4, 0.6, 1, 10);
        log.close();

        assert!(total_len(&train) > train_before);
        assert!(total_len(&val) > val_before);
    }

    #[test]
    fn test_images_and_confusion_matrices() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = LogWriter::new(dir.path(), 2).unwrap();
        log.flush();
        let val = event_files(&dir.path().join("val"));
        let before = total_len(&val);

        let pred = arr2(&[[0u8, 1], [1, 1]]);
        let truth = arr2(&[[0u8, 1], [0, 1]]);
        log.image_per_epoch(pred.view(), truth.view(), Phase::Val, 3)
            .unwrap();
        log.flush();
        assert!(total_len(&val) > before);

        assert!(matches!(
            log.update_cm_per_iter(&pred, &truth, Phase::Train),
            Err(Error::AccumulatorNotStarted)
        ));
        log.start_epoch(Phase::Train, 3);
        log.update_cm_per_iter(&pred, &truth, Phase::Train).unwrap();
        assert!(log.cm_per_epoch(&["a"], Phase::Train, 3).is_err());

        let cm = log
            .cm_per_epoch(&["Background", "LeftHippocampus"], Phase::Train, 3)
            .unwrap();
        assert_eq!(cm.get(0, 0), Some(0.5));
        assert_eq!(cm.get(0, 1), Some(0.5));
        assert_eq!(cm.get(1, 1), Some(1.0));

        let json_path = dir.path().join("train/confusion_matrix/epoch_0003.json");
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["classes"][1], "Left Hippocampus");
        assert_eq!(json["matrix"][1][1], 1.0);

        log.reset_cms();
        assert!(!log.confusion(Phase::Train).is_started());
        log.close();
    }
}
