pub mod cutoffs;
pub mod karlin;
pub mod karlin_calc;
pub mod length_adjustment;
pub mod search_space;
pub mod sum_statistics;
pub mod tables;

pub use cutoffs::{
    link_cutoffs, CutoffCalculator, LinkCutoffs, LinkInputs, LinkRegime, LinkStrategy,
    StatisticalContext, StatsMode,
};
pub use karlin::{bit_score, calculate_statistics, evalue, raw_score_from_bit_score, raw_score_from_evalue};
pub use search_space::SearchSpace;
pub use tables::KarlinParams;
