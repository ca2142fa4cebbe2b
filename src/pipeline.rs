//! File-level drivers for each pipeline stage.
//!
//! ```text
//! <data_dir>/temp/<dump>            --process-->  <data_dir>/out/light-dump-<dump>.txt
//! <data_dir>/out/light-dump-*.txt   --extract-->  <data_dir>/out/light-dump-<Title>.txt
//! <data_dir>/out/light-dump-*.txt   --m-stat--->  <data_dir>/out_m_stat/m-stat-*.jsonl
//! <data_dir>/out/light-dump-<T>.txt --over-time-> <data_dir>/out_m_stat/overtime-<T>.jsonl
//! ```
//!
//! Files are processed one after another; each owns its output file.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span};

use crate::config::{ConfigError, OutputFormat, PipelineConfig, ProcessParams};
use crate::dump::{BatchEncoder, CompactEncoder, DumpError, DumpReader, EncodeStats, TabularEncoder};
use crate::mstat::{score_trace_stream, write_time_series, ScoreSummary};
use crate::trace::{
    extract_articles, m_stat_file_name, over_time_file_name, trace_file_name, ExtractSummary,
    PageTraceReader, TraceError, TraceStore,
};
use crate::PROGRESS_INTERVAL;

/// Input buffer size for dump files.
const DUMP_READ_BUFFER: usize = 1 << 20;

/// Error type for pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid parameters.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Dump conversion failed; the output file is invalid.
    #[error("Failed to convert {path}: {source}")]
    Dump {
        /// Dump file.
        path: PathBuf,
        /// Cause.
        source: DumpError,
    },
    /// A trace file could not be read or an output row written.
    #[error("Failed on trace {path}: {source}")]
    Trace {
        /// Trace file.
        path: PathBuf,
        /// Cause.
        source: TraceError,
    },
    /// File could not be opened or created.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory.
        path: PathBuf,
        /// Cause.
        source: std::io::Error,
    },
}

impl PipelineError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io { path: path.to_path_buf(), source }
    }

    fn trace(path: &Path) -> impl FnOnce(TraceError) -> Self + '_ {
        move |source| Self::Trace { path: path.to_path_buf(), source }
    }
}

/// A pipeline stage selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Target {
    /// Convert dumps to traces (or rows).
    Process,
    /// Extract single articles from traces.
    Extract,
    /// Score every page of each trace.
    MStat,
    /// Running score of single-article traces.
    OverTime,
}

impl Target {
    /// Parse target from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "process" => Some(Self::Process),
            "extract" => Some(Self::Extract),
            "m-stat" | "m_stat" => Some(Self::MStat),
            "over-time" | "over_time" => Some(Self::OverTime),
            _ => None,
        }
    }
}

/// Outcome of converting one dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    /// Written trace (or rows) file.
    pub output: PathBuf,
    /// Encoder counters.
    pub stats: EncodeStats,
}

/// Convert a dump stream into `store`, one batch of `page_chunk` pages at
/// a time.
pub fn convert_dump<R: BufRead>(
    input: R,
    store: &mut TraceStore,
    params: &ProcessParams,
) -> Result<EncodeStats, DumpError> {
    let mut encoder: Box<dyn BatchEncoder> = match params.out_format {
        OutputFormat::Compact => Box::new(CompactEncoder::new(params.missing_editor)),
        OutputFormat::Tabular => Box::new(TabularEncoder::new(&params.tags)),
    };

    let mut stats = EncodeStats::default();
    for batch in DumpReader::new(input).batches(params.page_chunk) {
        let batch = batch?;
        let (first, last) = (batch.first_page, batch.last_page());
        stats.merge(store.append_batch(batch, encoder.as_mut())?);
        if last / PROGRESS_INTERVAL > first / PROGRESS_INTERVAL {
            info!(pages = last, "Converted pages");
        }
    }
    Ok(stats)
}

/// Convert one dump file into `out_dir`.
pub fn convert_dump_file(
    dump: &Path,
    out_dir: &Path,
    params: &ProcessParams,
) -> Result<ConvertSummary, PipelineError> {
    let name = dump
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = out_dir.join(match params.out_format {
        OutputFormat::Compact => trace_file_name(&name),
        OutputFormat::Tabular => tabular_file_name(&name),
    });

    let input = File::open(dump).map_err(PipelineError::io(dump))?;
    let mut store = TraceStore::create(&output).map_err(PipelineError::io(&output))?;

    let started = Instant::now();
    info!(dump = %dump.display(), output = %output.display(), page_chunk = params.page_chunk, "Converting dump");
    let stats = convert_dump(BufReader::with_capacity(DUMP_READ_BUFFER, input), &mut store, params)
        .map_err(|source| PipelineError::Dump { path: dump.to_path_buf(), source })?;
    store.finish().map_err(PipelineError::io(&output))?;

    info!(
        dump = %dump.display(),
        pages = stats.pages,
        revisions = stats.revisions,
        unknown_editors = stats.unknown_editors,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Done converting dump"
    );
    Ok(ConvertSummary { output, stats })
}

fn tabular_file_name(dump_file: &str) -> String {
    format!("rows-{}.jsonl", dump_file.replace('.', "-"))
}

/// `process` stage: convert every configured dump.
pub fn process_data(config: &PipelineConfig) -> Result<Vec<ConvertSummary>, PipelineError> {
    config.validate()?;
    let out_dir = ensure_dir(config.out_dir())?;
    let temp_dir = config.temp_dir();

    let _span = info_span!("process").entered();
    config
        .process
        .fps
        .iter()
        .map(|fp| convert_dump_file(&temp_dir.join(fp), &out_dir, &config.process))
        .collect()
}

/// `m-stat` stage: score every page of every configured trace.
///
/// Page indices run on across files.
pub fn m_stat_data(config: &PipelineConfig) -> Result<Vec<ScoreSummary>, PipelineError> {
    let out_dir = config.out_dir();
    let m_stat_dir = ensure_dir(config.m_stat_dir())?;

    let _span = info_span!("m_stat").entered();
    let mut next_index = 0;
    let mut summaries = Vec::with_capacity(config.m_stat.fps.len());
    for fp in &config.m_stat.fps {
        let trace = out_dir.join(fp);
        let output = m_stat_dir.join(m_stat_file_name(fp));

        let reader = PageTraceReader::open(&trace).map_err(PipelineError::trace(&trace))?;
        let mut out = BufWriter::new(File::create(&output).map_err(PipelineError::io(&output))?);
        let summary = score_trace_stream(reader, &mut out, next_index, config.m_stat.extra_stats)
            .map_err(PipelineError::trace(&trace))?;

        next_index += summary.pages;
        info!(
            trace = %trace.display(),
            pages = summary.pages,
            conflicted_pages = summary.conflicted_pages,
            "Done scoring trace"
        );
        summaries.push(summary);
    }
    Ok(summaries)
}

/// `extract` stage: copy the configured articles out of the traces.
pub fn extract_data(config: &PipelineConfig) -> Result<ExtractSummary, PipelineError> {
    let out_dir = ensure_dir(config.out_dir())?;
    let traces: Vec<PathBuf> = config.extract.fps.iter().map(|fp| out_dir.join(fp)).collect();

    let _span = info_span!("extract").entered();
    extract_articles(&traces, &config.extract.desired_articles, &out_dir)
        .map_err(PipelineError::trace(&out_dir))
}

/// `over-time` stage: running score of each single-article trace.
pub fn over_time_data(config: &PipelineConfig) -> Result<Vec<PathBuf>, PipelineError> {
    let out_dir = config.out_dir();
    let m_stat_dir = ensure_dir(config.m_stat_dir())?;

    let _span = info_span!("over_time").entered();
    let mut outputs = Vec::with_capacity(config.over_time.fps.len());
    for fp in &config.over_time.fps {
        let trace = out_dir.join(fp);
        let output = m_stat_dir.join(over_time_file_name(fp));

        let reader = PageTraceReader::open(&trace).map_err(PipelineError::trace(&trace))?;
        let mut out = BufWriter::new(File::create(&output).map_err(PipelineError::io(&output))?);
        let rows = write_time_series(reader, &mut out).map_err(PipelineError::trace(&trace))?;

        info!(trace = %trace.display(), rows, "Done with time series");
        outputs.push(output);
    }
    Ok(outputs)
}

/// Run targets in pipeline order, whatever order they were given in.
pub fn run(config: &PipelineConfig, targets: &[Target]) -> Result<(), PipelineError> {
    let mut targets = targets.to_vec();
    targets.sort();
    targets.dedup();

    for target in targets {
        match target {
            Target::Process => {
                process_data(config)?;
            }
            Target::Extract => {
                extract_data(config)?;
            }
            Target::MStat => {
                m_stat_data(config)?;
            }
            Target::OverTime => {
                over_time_data(config)?;
            }
        }
    }
    Ok(())
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, PipelineError> {
    std::fs::create_dir_all(&dir).map_err(PipelineError::io(&dir))?;
    Ok(dir)
}
