//! 程序运行函数.

use crate::cli::Cli;
use crate::report::{ConversionReport, SplitSummary};
use anyhow::Context;
use log::info;
use mri_berry::dataset::{self, Split};
use mri_berry::prep::{self, PrepConfig};
use std::fs;
use std::time::Instant;

/// 实际运行: 依次转换训练集与测试集, 每个划分写出 4 个数据文件.
pub fn run(cli: &Cli) -> anyhow::Result<ConversionReport> {
    let config = PrepConfig::new(cli.remap_config.table().clone(), cli.orientation)
        .with_skip_frames(cli.skip_frames);
    let destination = cli.destination();
    fs::create_dir_all(&destination)
        .with_context(|| format!("creating destination `{}`", destination.display()))?;

    info!(
        "remap `{}` v{}, orientation {}, skipping {} frames, writing {} files",
        config.table().name(),
        config.table().version(),
        config.orientation(),
        config.skip_frames(),
        cli.format
    );

    let mut report = ConversionReport::default();
    for (split, list) in [
        (Split::Train, &cli.train_volumes),
        (Split::Test, &cli.test_volumes),
    ] {
        info!("converting {split} volumes listed in `{}`", list.display());
        let start = Instant::now();
        let set = prep::par_convert(&cli.data_dir, &cli.label_dir, list, &config)
            .with_context(|| format!("converting {split} volumes"))?;
        let files = dataset::write_split(&destination, split, &set, cli.format)
            .with_context(|| format!("writing {split} split"))?;
        report.push(SplitSummary::new(split, &set, files, start.elapsed()));
    }
    Ok(report)
}
