//! Extraction of single articles from trace files.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{article_file_name, write_page_trace, PageTraceReader, TraceError};

/// Outcome of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Extracted titles and the files they were written to.
    pub extracted: Vec<(String, PathBuf)>,
    /// Titles not found in any trace.
    pub missing: Vec<String>,
}

/// Copy the traces of `titles` out of `traces` into `out_dir`, one file per
/// article. Stops reading as soon as every title has been found.
pub fn extract_articles(
    traces: &[PathBuf],
    titles: &[String],
    out_dir: &Path,
) -> Result<ExtractSummary, TraceError> {
    let mut wanted: BTreeSet<&str> = titles.iter().map(String::as_str).collect();
    let mut summary = ExtractSummary::default();

    'files: for trace in traces {
        if wanted.is_empty() {
            break;
        }
        for page in PageTraceReader::open(trace)? {
            let page = page?;
            if !wanted.remove(page.title.as_str()) {
                continue;
            }

            let path = out_dir.join(article_file_name(&page.title));
            let mut out = BufWriter::new(File::create(&path)?);
            write_page_trace(&page, &mut out)?;
            out.flush()?;
            info!(title = %page.title, path = %path.display(), "Extracted article");
            summary.extracted.push((page.title, path));

            if wanted.is_empty() {
                break 'files;
            }
        }
    }

    for title in wanted {
        warn!(title, "Could not extract article");
        summary.missing.push(title.to_string());
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::PageTraceReader;

    #[test]
    fn test_extracts_requested_articles() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("light-dump-x.txt");
        std::fs::write(
            &trace,
            "Anarchism\n^^^_2002-01-01T00:00:00Z 1 1 B\n^^^_2001-01-01T00:00:00Z 0 1 A\n\
             Barack Obama\n^^^_2003-01-01T00:00:00Z 0 1 C\n\
             Other\n^^^_2004-01-01T00:00:00Z 0 1 D\n",
        )
        .unwrap();

        let titles = vec!["Barack Obama".to_string(), "Anarchism".to_string(), "Nowhere".to_string()];
        let summary = extract_articles(&[trace], &titles, dir.path()).unwrap();

        assert_eq!(summary.extracted.len(), 2);
        assert_eq!(summary.missing, vec!["Nowhere".to_string()]);

        let obama = dir.path().join("light-dump-Barack-Obama.txt");
        assert_eq!(
            std::fs::read_to_string(&obama).unwrap(),
            "Barack Obama\n^^^_2003-01-01T00:00:00Z 0 1 C\n"
        );

        // Extracted files are valid single-page traces, newest-first on disk.
        let anarchism = PageTraceReader::open(&dir.path().join("light-dump-Anarchism.txt"))
            .unwrap()
            .single_page()
            .unwrap();
        assert_eq!(anarchism.events[0].editor.as_str(), "A");
        assert!(anarchism.events[1].reverted);
    }

    #[test]
    fn test_title_with_slash_stays_in_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("light-dump-x.txt");
        std::fs::write(
            &trace,
            "AC/DC\n^^^_2001-01-01T00:00:00Z 0 1 A\nTCP/IP\n^^^_2002-01-01T00:00:00Z 0 1 B\n",
        )
        .unwrap();

        let titles = vec!["AC/DC".to_string(), "TCP/IP".to_string()];
        let summary = extract_articles(&[trace], &titles, dir.path()).unwrap();
        assert!(summary.missing.is_empty());

        let acdc = dir.path().join("light-dump-AC%2FDC.txt");
        let page = PageTraceReader::open(&acdc).unwrap().single_page().unwrap();
        assert_eq!(page.title, "AC/DC");
        assert!(dir.path().join("light-dump-TCP%2FIP.txt").is_file());
    }
}
