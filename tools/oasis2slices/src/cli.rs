//! 命令行参数.

use clap::Parser;
use mri_berry::consts::DEFAULT_SKIP_FRAMES;
use mri_berry::dataset::Container;
use mri_berry::prep::{Orientation, RemapScheme};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// 多字母短参数到长参数的改写表. clap 只支持单字符短参数.
const SHORT_ALIASES: [(&str, &str); 7] = [
    ("-dd", "--data_dir"),
    ("-ld", "--label_dir"),
    ("-trv", "--train_volumes"),
    ("-tev", "--test_volumes"),
    ("-rc", "--remap_config"),
    ("-df", "--destination_folder"),
    ("-sf", "--skip_frames"),
];

/// 将 mgz 体数据转换为训练/测试切片数据集.
#[derive(Parser, Debug)]
#[command(name = "oasis2slices", version, about)]
pub struct Cli {
    /// 扫描根目录, 其下为 `<id>/mri/orig.mgz`. 短参数 `-dd`.
    #[arg(long = "data_dir")]
    pub data_dir: PathBuf,

    /// 标签根目录, 其下为 `<id>_glm.mgz`. 短参数 `-ld`.
    #[arg(long = "label_dir")]
    pub label_dir: PathBuf,

    /// 训练集体数据列表, 每行一个编号. 短参数 `-trv`.
    #[arg(long = "train_volumes")]
    pub train_volumes: PathBuf,

    /// 测试集体数据列表, 每行一个编号. 短参数 `-tev`.
    #[arg(long = "test_volumes")]
    pub test_volumes: PathBuf,

    /// 标签重映射方案, `FS` 或 `Neo`. 短参数 `-rc`.
    #[arg(long = "remap_config", value_parser = remap_scheme)]
    pub remap_config: RemapScheme,

    /// 切片方向, `COR`, `AXI` 或 `SAG`.
    #[arg(long = "orientation", short = 'o', value_parser = orientation)]
    pub orientation: Orientation,

    /// 输出目录, 不存在时自动创建. 默认为当前目录. 短参数 `-df`.
    #[arg(long = "destination_folder")]
    pub destination_folder: Option<PathBuf>,

    /// 首尾跳过的切片数. 短参数 `-sf`.
    #[arg(long = "skip_frames", default_value_t = DEFAULT_SKIP_FRAMES)]
    pub skip_frames: usize,

    /// 输出容器, `h5` 或 `npz`.
    #[arg(long = "format", short = 'f', value_parser = container, default_value_t = Container::default())]
    pub format: Container,

    /// 并行处理体数据的线程数. 默认为可用核心数.
    #[arg(long = "jobs", short = 'j', value_parser = jobs_in_range)]
    pub jobs: Option<usize>,

    /// 输出调试日志.
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// 解析进程参数, 先改写多字母短参数.
    pub fn parse_env() -> Self {
        Self::parse_from(expand_short_aliases(std::env::args_os()))
    }

    /// 输出目录.
    pub fn destination(&self) -> PathBuf {
        self.destination_folder
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn remap_scheme(s: &str) -> Result<RemapScheme, String> {
    s.parse().map_err(|e: mri_berry::Error| e.to_string())
}

fn orientation(s: &str) -> Result<Orientation, String> {
    s.parse().map_err(|e: mri_berry::Error| e.to_string())
}

fn container(s: &str) -> Result<Container, String> {
    s.parse().map_err(|e: mri_berry::Error| e.to_string())
}

fn jobs_in_range(s: &str) -> Result<usize, String> {
    let jobs: usize = s
        .parse()
        .map_err(|_| format!("`{s}` is not a legal thread count"))?;
    if jobs == 0 {
        return Err("thread count must be positive".to_string());
    }
    Ok(jobs)
}

fn expand_one(arg: &OsStr) -> Option<OsString> {
    let s = arg.to_str()?;
    let (flag, value) = match s.split_once('=') {
        Some((f, v)) => (f, Some(v)),
        None => (s, None),
    };
    let (_, long) = SHORT_ALIASES.iter().find(|(short, _)| *short == flag)?;
    Some(match value {
        Some(v) => format!("{long}={v}").into(),
        None => OsString::from(*long),
    })
}

/// 将 `-dd`, `-trv` 等多字母短参数改写为对应的长参数. `--` 之后的参数保持不变.
pub fn expand_short_aliases<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    let mut raw = false;
    args.into_iter()
        .map(|arg| {
            if raw {
                return arg;
            }
            if arg == "--" {
                raw = true;
                return arg;
            }
            expand_one(&arg).unwrap_or(arg)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<OsString> {
        v.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_expand_short_aliases() {
        let expanded =
            expand_short_aliases(args(&["oasis2slices", "-dd", "/d", "-rc=Neo", "-o", "COR"]));
        assert_eq!(
            expanded,
            args(&["oasis2slices", "--data_dir", "/d", "--remap_config=Neo", "-o", "COR"])
        );
        assert_eq!(
            expand_short_aliases(args(&["x", "--", "-dd"])),
            args(&["x", "--", "-dd"])
        );
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::parse_from(expand_short_aliases(args(&[
            "oasis2slices", "-dd", "data", "-ld", "labels", "-trv", "train.txt", "-tev",
            "test.txt", "-rc", "FS", "-o", "SAG", "-sf", "5", "-j", "2",
        ])));
        assert_eq!(cli.data_dir, PathBuf::from("data"));
        assert_eq!(cli.test_volumes, PathBuf::from("test.txt"));
        assert_eq!(cli.remap_config, RemapScheme::Fs);
        assert_eq!(cli.orientation, Orientation::Sagittal);
        assert_eq!(cli.skip_frames, 5);
        assert_eq!(cli.jobs, Some(2));
        assert!(!cli.verbose);
        assert_eq!(cli.destination(), PathBuf::from("."));
        assert_eq!(cli.format, Container::default());
    }

    #[test]
    fn test_reject_bad_values() {
        const BASE: [&str; 9] = [
            "oasis2slices", "--data_dir", "d", "--label_dir", "l", "--train_volumes", "a",
            "--test_volumes", "b",
        ];
        fn with(extra: &[&str]) -> Result<Cli, clap::Error> {
            let mut v: Vec<&str> = BASE.to_vec();
            v.extend_from_slice(extra);
            Cli::try_parse_from(expand_short_aliases(args(&v)))
        }

        assert!(with(&["-rc", "Neo", "-o", "AXI"]).is_ok());
        assert!(with(&["-rc", "fs", "-o", "AXI"]).is_err());
        assert!(with(&["-rc", "Neo", "-o", "XYZ"]).is_err());
        assert!(with(&["-rc", "Neo", "-o", "AXI", "-j", "0"]).is_err());
        assert!(with(&["-rc", "Neo"]).is_err());
        assert!(with(&["-rc", "Neo", "-o", "AXI", "--format", "mat"]).is_err());
        assert_eq!(
            with(&["-rc", "Neo", "-o", "AXI", "-f", "NPZ"]).unwrap().format,
            Container::Npz
        );
        assert_eq!(
            with(&["-rc", "Neo", "-o", "AXI"]).unwrap().skip_frames,
            DEFAULT_SKIP_FRAMES
        );
    }
}
