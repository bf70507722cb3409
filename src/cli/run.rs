use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bio::io::fasta;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use super::args::SearchArgs;
use crate::config::NuclScoring;
use crate::engine::{ProgressSink, SearchCoordinator, SearchInputs};
use crate::extension::NoGappedAligner;
use crate::lookup::{WordEncoding, WordLookup};
use crate::ranker::ResultHitlist;
use crate::sequence::{InMemorySource, QuerySet, SequenceSource};
use crate::stats::CutoffCalculator;
use crate::utils::matrix::ScoringMatrix;

struct BarProgress {
    bar: ProgressBar,
}

impl ProgressSink for BarProgress {
    fn on_progress(&self, subjects_done: usize, positive_hits: usize) {
        self.bar.set_position(subjects_done as u64);
        self.bar.set_message(format!("{} with hits", positive_hits));
    }

    fn on_heartbeat(&self, subjects_done: usize, idle: Duration) {
        self.bar.tick();
        info!("still scanning: {} subjects done, {:.0?} since last progress", subjects_done, idle);
    }
}

fn first_word(id: &str) -> String {
    id.split_whitespace().next().unwrap_or("unknown").to_string()
}

fn read_sequences(args: &SearchArgs) -> Result<(QuerySet, InMemorySource)> {
    let query_reader = fasta::Reader::from_file(&args.query)
        .with_context(|| format!("Failed to open query file {}", args.query.display()))?;
    let mut queries = QuerySet::new();
    for record in query_reader.records() {
        let record = record.context("Failed to parse query FASTA")?;
        queries.push_nucleotide(&first_word(record.id()), record.seq(), !args.plus_only);
    }

    let subject_reader = fasta::Reader::from_file(&args.subject)
        .with_context(|| format!("Failed to open subject file {}", args.subject.display()))?;
    let mut subjects = InMemorySource::new();
    for record in subject_reader.records() {
        let record = record.context("Failed to parse subject FASTA")?;
        subjects.push_nucleotide(&first_word(record.id()), record.seq());
    }
    Ok((queries, subjects))
}

pub fn run(args: SearchArgs) -> Result<()> {
    let config = args.to_config();
    let scoring = NuclScoring::new(args.reward, args.penalty);

    let (queries, subjects) = read_sequences(&args)?;
    if queries.is_empty() {
        bail!("No query sequences in {}", args.query.display());
    }
    info!(
        "{} query contexts, {} subjects ({} residues)",
        queries.len(),
        subjects.num_sequences(),
        subjects.total_length()
    );

    let lookup = WordLookup::build(&queries, WordEncoding::nucleotide(config.seed.word_width)?);
    let matrix = ScoringMatrix::nucleotide(args.reward, args.penalty);
    let calculator = CutoffCalculator::nucleotide(&scoring, config.extension.gapped)?;
    let coordinator = SearchCoordinator::new(
        config,
        SearchInputs {
            queries: &queries,
            lookup: &lookup,
            source: &subjects,
            scorer: &matrix,
            aligner: &NoGappedAligner,
            calculator,
        },
    )?;

    let bar = ProgressBar::new(subjects.num_sequences() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?,
    );
    let progress = BarProgress { bar };
    let outcome = coordinator.run_with_progress(&progress);
    progress.bar.finish_and_clear();

    if outcome.timed_out {
        warn!("Time limit reached; results are partial");
    }
    write_hits(&outcome.hits, &queries, args.out.as_ref())
}

/// One tab-separated line per HSP. Query coordinates of minus-strand
/// contexts are reported on the plus strand, start > end.
fn write_hits(hits: &[ResultHitlist], queries: &QuerySet, out_path: Option<&PathBuf>) -> Result<()> {
    let stdout = io::stdout();
    let mut writer: Box<dyn Write> = if let Some(path) = out_path {
        Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ))
    } else {
        Box::new(BufWriter::new(stdout.lock()))
    };

    for hit in hits {
        for hsp in &hit.hsps {
            let ctx = queries.context(hsp.context);
            let (q_from, q_to) = if ctx.frame() < 0 {
                (ctx.len() - hsp.q_start, ctx.len() - hsp.q_end + 1)
            } else {
                (hsp.q_start + 1, hsp.q_end)
            };
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.1}\t{:.2e}\t{}",
                ctx.query_id,
                hit.subject_id,
                q_from,
                q_to,
                hsp.s_start + 1,
                hsp.s_end,
                hsp.score,
                hsp.bit_score,
                hsp.effective_evalue(),
                hsp.link.num.max(1)
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}
