//! The per-subject pipeline run by every worker.

use std::ops::Range;
use std::sync::PoisonError;

use log::trace;

use super::diagnostics::SearchCounters;
use super::split::{drop_distant, merge_windows, plan_windows};
use super::{RunState, SearchCoordinator, WorkerLocal};
use crate::error::SearchWarning;
use crate::extension::{rescore_ungapped, GappedAligner, Rescored, UngappedExtender};
use crate::hsp::{chain_members, retain_hsps, Hsp, LinkInfo};
use crate::lookup::LookupIndex;
use crate::ranker::ResultHitlist;
use crate::seed::{ScanMode, Seed, SeedOutcome, WordFinder};
use crate::sequence::SequenceSource;
use crate::stats::{calculate_statistics, LinkStrategy, StatisticalContext};
use crate::utils::matrix::Scorer;

/// Set bit score and individual E-value from each HSP's context
fn assign_statistics(hsps: &mut [Hsp], contexts: &[StatisticalContext]) {
    for hsp in hsps {
        let ctx = &contexts[hsp.context];
        let (bits, evalue) = calculate_statistics(hsp.score, &ctx.params, &ctx.search_space);
        hsp.bit_score = bits;
        hsp.evalue = evalue;
    }
}

impl<'a, L, D, S, A> SearchCoordinator<'a, L, D, S, A>
where
    L: LookupIndex + ?Sized,
    D: SequenceSource + ?Sized,
    S: Scorer + ?Sized,
    A: GappedAligner,
{
    /// Run subject `oid` through the whole pipeline. `None` when nothing
    /// passes the E-value threshold.
    pub(crate) fn process_subject(
        &self,
        oid: usize,
        local: &mut WorkerLocal,
        run: &RunState,
    ) -> Option<ResultHitlist> {
        let counters = &run.counters;
        let subject_len = self.source.length(oid);
        if subject_len < self.config.seed.word_width {
            trace!("subject {} shorter than a word; skipped", oid);
            SearchCounters::bump(&counters.subjects_skipped, 1);
            return None;
        }
        SearchCounters::bump(&counters.subjects_scanned, 1);

        let engine = &self.config.engine;
        let windows = plan_windows(subject_len, engine.max_subject_window, engine.split_overlap);
        if windows.len() > 1 {
            trace!("subject {} ({} residues) in {} windows", oid, subject_len, windows.len());
            SearchCounters::bump(&counters.subjects_split, 1);
        }

        if self.config.seed.prescreen && !self.prescreen(oid, &windows, local) {
            SearchCounters::bump(&counters.subjects_prescreened_out, 1);
            return None;
        }

        let split = windows.len() > 1;
        let mut exhausted = false;
        let mut per_window = Vec::with_capacity(windows.len());
        for window in windows {
            let hsps = self.scan_window(oid, &window, split, local, run);
            exhausted |= local.store.take_warning();
            per_window.push((window, hsps));
        }
        if exhausted {
            run.warn(SearchWarning::CapacityExhausted {
                subject: self.source.id(oid).to_string(),
                cap: self.config.store.hard_cap,
            });
        }

        let mut hsps = if per_window.len() == 1 {
            per_window.pop().map(|(_, h)| h).unwrap_or_default()
        } else {
            self.merge_split(oid, subject_len, per_window, run)
        };
        if hsps.is_empty() {
            return None;
        }

        self.rescore_ambiguous(oid, &mut hsps, run);
        assign_statistics(&mut hsps, &self.ungapped);
        self.reap(&mut hsps);
        if hsps.is_empty() {
            return None;
        }

        let summary = self.linker.link(&mut hsps, &self.ungapped, subject_len);
        SearchCounters::bump(&counters.hsps_linked, summary.linked_hsps);
        SearchCounters::bump(&counters.chains, summary.chains);

        self.refine_gapped(oid, subject_len, &mut hsps, run);

        let threshold = self.config.stats.evalue;
        retain_hsps(&mut hsps, |_, h| h.effective_evalue() <= threshold);
        SearchCounters::bump(&counters.hsps_reported, hsps.len());
        ResultHitlist::new(oid, self.source.id(oid), subject_len, hsps)
    }

    /// Extend one seed and decide whether the result is kept
    fn try_extend(
        &self,
        extender: &UngappedExtender<'_, S>,
        subject: &[u8],
        seed: &Seed,
    ) -> (SeedOutcome, Option<Hsp>) {
        let ctx = &self.ungapped[seed.context];
        let query = self.queries.context(seed.context);
        let Some(ext) = extender.extend(query.residues(), subject, seed, ctx.xdrop_ungapped) else {
            return (SeedOutcome::rejected(seed), None);
        };
        let score = self.calculator.adjust_score(ext.score);
        let stored = score >= ctx.extension_cutoff;
        let outcome = SeedOutcome {
            reach: ext.s_reach,
            stored,
        };
        if !stored {
            return (outcome, None);
        }
        let mut hsp = Hsp::from_extension(seed.context, query.frame(), &ext);
        hsp.score = score;
        (outcome, Some(hsp))
    }

    /// Exploratory pass: does any window hold at least one keepable HSP?
    fn prescreen(&self, oid: usize, windows: &[Range<usize>], local: &mut WorkerLocal) -> bool {
        let finder = WordFinder::new(self.lookup, self.config.seed.two_hit_window);
        let extender = UngappedExtender::new(self.scorer);
        windows.iter().any(|window| {
            let bytes = self.source.bytes(oid, window.start, window.len());
            local.tracker.reset();
            let report = finder.scan(&bytes, &mut local.tracker, ScanMode::Exploratory, |seed| {
                self.try_extend(&extender, &bytes, &seed).0
            });
            report.stored > 0
        })
    }

    /// Exhaustive scan of one window; HSPs come back in subject coordinates,
    /// in subject order for a split subject and best first otherwise
    fn scan_window(
        &self,
        oid: usize,
        window: &Range<usize>,
        split: bool,
        local: &mut WorkerLocal,
        run: &RunState,
    ) -> Vec<Hsp> {
        let bytes = self.source.bytes(oid, window.start, window.len());
        let finder = WordFinder::new(self.lookup, self.config.seed.two_hit_window);
        let extender = UngappedExtender::new(self.scorer);
        let WorkerLocal { tracker, store } = local;
        tracker.reset();
        store.clear();

        let report = finder.scan(&bytes, tracker, ScanMode::Exhaustive, |seed| {
            let (outcome, hsp) = self.try_extend(&extender, &bytes, &seed);
            if let Some(mut hsp) = hsp {
                hsp.shift_subject(window.start);
                store.append(hsp);
            }
            outcome
        });
        run.counters.add_scan(&report);
        trace!(
            "subject {} window {:?}: {} seeds, {} extensions, {} kept",
            oid,
            window,
            report.seeds,
            report.extensions,
            store.len()
        );
        if split {
            store.sort_by_position();
        } else {
            store.sort_by_score();
        }
        store.drain()
    }

    fn merge_split(
        &self,
        oid: usize,
        subject_len: usize,
        mut per_window: Vec<(Range<usize>, Vec<Hsp>)>,
        run: &RunState,
    ) -> Vec<Hsp> {
        for (_, hsps) in per_window.iter_mut() {
            assign_statistics(hsps, &self.ungapped);
        }
        let relaxed = self.config.stats.evalue * self.config.stats.split_relaxation;
        let overlap = self.config.engine.split_overlap;
        let dropped = drop_distant(&mut per_window, overlap, subject_len, relaxed);

        let (merged, folded) = merge_windows(per_window, |joined| self.rescore_span(oid, joined));
        trace!(
            "subject {}: {} window HSPs dropped, {} merged, {} left",
            oid,
            dropped,
            folded,
            merged.len()
        );
        SearchCounters::bump(&run.counters.hsps_merged, folded);
        merged
    }

    /// Best-scoring part of a joined span, or `None` below the cutoff
    fn rescore_span(&self, oid: usize, mut hsp: Hsp) -> Option<Hsp> {
        let bytes = self.source.bytes(oid, hsp.s_start, hsp.s_len());
        let query = self.queries.context(hsp.context).residues();
        let cutoff = self.ungapped[hsp.context].extension_cutoff;
        let rescored = rescore_ungapped(self.scorer, query, &bytes, hsp.q_start, 0, hsp.q_len(), cutoff)?;
        self.apply_rescore(&mut hsp, &rescored);
        Some(hsp)
    }

    fn apply_rescore(&self, hsp: &mut Hsp, rescored: &Rescored) {
        let s_start = hsp.s_start + rescored.s_offset;
        hsp.q_start = rescored.q_offset;
        hsp.q_end = rescored.q_offset + rescored.len;
        hsp.s_start = s_start;
        hsp.s_end = s_start + rescored.len;
        hsp.score = self.calculator.adjust_score(rescored.score);
    }

    /// Rescore every HSP over the true residues of an ambiguous subject
    fn rescore_ambiguous(&self, oid: usize, hsps: &mut Vec<Hsp>, run: &RunState) {
        if !self.source.has_ambiguities(oid) {
            return;
        }
        let _guard = run.reevaluation.lock().unwrap_or_else(PoisonError::into_inner);
        let before = hsps.len();
        hsps.retain_mut(|hsp| {
            let Some(exact) = self.source.true_bytes(oid, hsp.s_start, hsp.s_len()) else {
                return true;
            };
            let query = self.queries.context(hsp.context).residues();
            let cutoff = self.ungapped[hsp.context].extension_cutoff;
            match rescore_ungapped(self.scorer, query, &exact, hsp.q_start, 0, hsp.q_len(), cutoff) {
                Some(rescored) => {
                    self.apply_rescore(hsp, &rescored);
                    true
                }
                None => false,
            }
        });
        SearchCounters::bump(&run.counters.hsps_rescore_rejected, before - hsps.len());
    }

    /// Without linking the individual E-value decides; with linking weak
    /// HSPs stay as long as they reach the extension cutoff.
    fn reap(&self, hsps: &mut Vec<Hsp>) {
        match self.linker.strategy() {
            LinkStrategy::Disabled => {
                let threshold = self.config.stats.evalue;
                hsps.retain(|h| h.evalue <= threshold);
            }
            _ => hsps.retain(|h| h.score >= self.ungapped[h.context].extension_cutoff),
        }
    }

    /// Hand chains and singletons scoring at least the gap trigger to the
    /// gapped aligner. A refined chain collapses into one gapped HSP.
    fn refine_gapped(&self, oid: usize, subject_len: usize, hsps: &mut Vec<Hsp>, run: &RunState) {
        if !self.config.extension.gapped || !self.aligner.is_available() || hsps.is_empty() {
            return;
        }
        let contexts = self.gapped.as_deref().unwrap_or(&self.ungapped);
        let mut removed = vec![false; hsps.len()];
        let mut refined = 0;

        for head in 0..hsps.len() {
            if removed[head] || !hsps[head].link.head {
                continue;
            }
            let members = chain_members(hsps, head);
            let context = hsps[head].context;
            let total: i32 = members.iter().map(|&m| hsps[m].score).sum();
            if total < self.ungapped[context].gap_trigger {
                continue;
            }

            let q_start = members.iter().map(|&m| hsps[m].q_start).min().unwrap_or(0);
            let q_end = members.iter().map(|&m| hsps[m].q_end).max().unwrap_or(0);
            let s_start = members.iter().map(|&m| hsps[m].s_start).min().unwrap_or(0);
            let s_end = members.iter().map(|&m| hsps[m].s_end).max().unwrap_or(0);

            let query = self.queries.context(context).residues();
            let lo = s_start.saturating_sub(query.len());
            let hi = (s_end + query.len()).min(subject_len);
            let subject = self.source.bytes(oid, lo, hi - lo);
            let ctx = &contexts[context];
            let Some(aln) = self.aligner.refine(
                query,
                &subject,
                q_start..q_end,
                (s_start - lo)..(s_end - lo),
                ctx.xdrop_gapped,
                self.scorer,
            ) else {
                continue;
            };

            let (bit_score, evalue) = calculate_statistics(aln.score, &ctx.params, &ctx.search_space);
            let hsp = &mut hsps[head];
            hsp.q_start = aln.q_range.start;
            hsp.q_end = aln.q_range.end;
            hsp.s_start = aln.s_range.start + lo;
            hsp.s_end = aln.s_range.end + lo;
            hsp.score = aln.score;
            hsp.bit_score = bit_score;
            hsp.evalue = evalue;
            hsp.edits = Some(aln.edits);
            hsp.link = LinkInfo {
                num: 1,
                evalue: Some(evalue),
                head: true,
                chain: Some(head),
                ..LinkInfo::default()
            };
            for &m in members.iter().skip(1) {
                removed[m] = true;
            }
            refined += 1;
        }

        retain_hsps(hsps, |i, _| !removed[i]);
        SearchCounters::bump(&run.counters.hsps_refined, refined);
    }
}
