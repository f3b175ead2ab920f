//! `oasis2slices`: 将 OASIS 格式的 mgz 体数据转换为 HDF5 (或 npz) 切片数据集.

mod cli;
mod report;
mod runner;

use log::LevelFilter;
use simple_logger::SimpleLogger;

/// 获得可并行核心数.
fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse_env();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    let jobs = cli.jobs.unwrap_or_else(cpus);
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()?;
    log::debug!("using {jobs} worker threads");

    let report = runner::run(&cli)?;
    report.analyze()?;
    Ok(())
}
