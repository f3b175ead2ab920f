//! 🧠欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Error, Idx2d, Idx3d, Result};

pub use crate::data::window::IntensityWindow;
pub use crate::data::{MriData3d, MriLabel, MriScan, VolumeAttr};

pub use crate::consts::DEFAULT_SKIP_FRAMES;

pub use crate::prep::{
    convert, prepare_volume, Orientation, PrepConfig, PreparedSet, RemapRegistry, RemapScheme,
    RemapTable,
};

#[cfg(feature = "rayon")]
pub use crate::prep::par_convert;

pub use crate::dataset::{
    self, load_split, load_splits, write_split, Container, SliceDataset, Split,
};

pub use crate::summary::{ConfusionAccumulator, LogWriter, Phase};
