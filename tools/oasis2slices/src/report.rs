//! 转换结果.

use mri_berry::dataset::Split;
use mri_berry::prep::PreparedSet;
use mri_berry::Idx2d;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

const RULE: &str = "--------------------------------------------------------";

/// 单个划分的转换摘要.
pub struct SplitSummary {
    split: Split,
    slices: usize,
    volumes: usize,
    slice_shape: Idx2d,
    histogram: Vec<usize>,
    files: Vec<PathBuf>,
    elapsed: Duration,
}

impl SplitSummary {
    /// 从转换结果和写入的文件生成摘要.
    pub fn new(split: Split, set: &PreparedSet, files: Vec<PathBuf>, elapsed: Duration) -> Self {
        Self {
            split,
            slices: set.len(),
            volumes: set.volumes(),
            slice_shape: set.slice_shape(),
            histogram: set.class_histogram(),
            files,
            elapsed,
        }
    }
}

/// 将 `s` 的结果写进 `w` 中.
fn describe_into<W: Write>(s: &SplitSummary, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Split `{}`:", s.split)?;
    writeln!(w, "{S4}Volumes: {}", s.volumes)?;
    writeln!(w, "{S4}Slices: {}", s.slices)?;
    writeln!(w, "{S4}Slice shape: {:?}", s.slice_shape)?;

    let total: usize = s.histogram.iter().sum();
    let present = s.histogram.iter().filter(|c| **c > 0).count();
    writeln!(
        w,
        "{S4}Classes present: {present}/{}",
        s.histogram.len()
    )?;
    for (class, &count) in s.histogram.iter().enumerate().filter(|(_, c)| **c > 0) {
        let ratio = count as f64 / total as f64 * 100.0;
        writeln!(w, "{S4}{S4}class {class:>3}: {count:>10} px ({ratio:.3}%)")?;
    }
    for f in s.files.iter() {
        writeln!(w, "{S4}Wrote {}", f.display())?;
    }
    write!(w, "{S4}Time: {} ms", s.elapsed.as_millis())?;
    Ok(())
}

/// 转换最终结果.
#[derive(Default)]
pub struct ConversionReport {
    data: Vec<SplitSummary>,
}

impl ConversionReport {
    /// 追加一个划分的摘要.
    pub fn push(&mut self, summary: SplitSummary) {
        self.data.push(summary);
    }

    /// 将所有摘要写进 `w` 中, 以分隔线隔开.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "{RULE}")?;
        writeln!(w, "Conversion finished.")?;
        for summary in self.data.iter() {
            describe_into(summary, w)?;
            writeln!(w)?;
            writeln!(w, "{RULE}")?;
        }
        Ok(())
    }

    /// 打印转换结果.
    pub fn analyze(&self) -> io::Result<()> {
        let stdout = io::stdout();
        self.write_to(&mut stdout.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_report_lists_present_classes() {
        let set = PreparedSet {
            data: Array3::zeros((2, 2, 2)),
            labels: Array3::from_shape_fn((2, 2, 2), |(i, _, _)| (i * 3) as u8),
            class_weights: Array3::zeros((2, 2, 2)),
            weights: Array2::zeros((1, 5)),
        };
        let mut report = ConversionReport::default();
        report.push(SplitSummary::new(
            Split::Test,
            &set,
            vec![PathBuf::from("Data_test.h5")],
            Duration::from_millis(12),
        ));

        let mut buf = Vec::new();
        report.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(&format!("{RULE}\nConversion finished.\nSplit `test`:")));
        assert!(text.ends_with(&format!("Time: 12 ms\n{RULE}\n")));
        assert!(text.contains("Classes present: 2/5"));
        assert!(text.contains("class   3:          4 px (50.000%)"));
        assert!(text.contains("Wrote Data_test.h5"));
    }
}
