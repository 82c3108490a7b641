use anyhow::Context;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub lines: usize,
    pub warnings: usize,
    pub errors: usize,
}

pub fn read(path: &Path) -> anyhow::Result<LogStats> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    Ok(count(&text))
}

pub fn count(text: &str) -> LogStats {
    text.lines().fold(LogStats::default(), |mut stats, line| {
        stats.lines += 1;
        if line.contains(" WARN ") {
            stats.warnings += 1;
        } else if line.contains(" ERROR ") {
            stats.errors += 1;
        }
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_levels_by_marker() {
        let log = "\
2024-03-05T14:07:09.000Z  INFO collected 3 documents
2024-03-05T14:07:10.000Z  WARN cannot extract text from \"a.pdf\": damaged
2024-03-05T14:07:11.000Z ERROR report directory \"out\" does not exist
";
        assert_eq!(
            count(log),
            LogStats {
                lines: 3,
                warnings: 1,
                errors: 1
            }
        );
    }
}
