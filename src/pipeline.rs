use std::time::{Duration, Instant};

use log::info;

use crate::error::Result;
use crate::factor::{FittedFactors, WnmfConfig, WnmfModel};
use crate::reconstruction::{summarize, ObservedPrediction, Reconstruction, ReconstructionSummary};
use crate::sparse::{IndexStrictness, RatingTriple, SparseRatingMatrix, SparseRatingMatrixBuilder};

/// Timing and bookkeeping for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub build_duration: Duration,
    pub fit_duration: Duration,
    pub report_duration: Duration,
    pub total_duration: Duration,
    pub rejected_triples: usize,
    pub overwritten_triples: usize,
    /// Zero-valued cells dropped as unobserved
    pub zero_ratings: usize,
    /// Reviews whose user or business id is missing from the index tables
    pub unresolved_reviews: usize,
}

pub struct PipelineOutput {
    pub ratings: SparseRatingMatrix,
    pub factors: FittedFactors,
    pub predictions: Vec<ObservedPrediction>,
    pub summary: ReconstructionSummary,
    pub stats: PipelineStats,
}

/// Build R and W from resolved triples, fit WNMF, report the observed cells
pub struct RatingPipeline {
    config: WnmfConfig,
    strictness: IndexStrictness,
}

impl RatingPipeline {
    pub fn new(config: WnmfConfig, strictness: IndexStrictness) -> Self {
        Self { config, strictness }
    }

    pub fn run<I>(&self, triples: I, n_users: usize, n_items: usize) -> Result<PipelineOutput>
    where
        I: IntoIterator<Item = RatingTriple>,
    {
        let start = Instant::now();
        let mut stats = PipelineStats::default();

        let phase = Instant::now();
        let mut builder = SparseRatingMatrixBuilder::new(n_users, n_items, self.strictness);
        builder.extend(triples)?;
        stats.rejected_triples = builder.rejected();
        stats.overwritten_triples = builder.overwritten();
        stats.zero_ratings = builder.zero_ratings();
        let ratings = builder.build()?;
        stats.build_duration = phase.elapsed();
        info!(
            "Built {}x{} rating matrix with {} observed cells in {:?} ({} rejected, {} overwritten)",
            n_users,
            n_items,
            ratings.nnz(),
            stats.build_duration,
            stats.rejected_triples,
            stats.overwritten_triples
        );

        let phase = Instant::now();
        let factors = WnmfModel::with_config(self.config.clone()).fit(&ratings)?;
        stats.fit_duration = phase.elapsed();
        info!("Fitted factors in {:?}", stats.fit_duration);

        let phase = Instant::now();
        let predictions = Reconstruction::new(&factors.u, &factors.v)
            .with_parallel(self.config.parallel)
            .observed_pairs(&ratings);
        let summary = summarize(&predictions);
        stats.report_duration = phase.elapsed();
        info!(
            "Reconstruction over {} cells: RMSE {:.4}, MAE {:.4}",
            summary.count, summary.rmse, summary.mae
        );

        stats.total_duration = start.elapsed();
        Ok(PipelineOutput {
            ratings,
            factors,
            predictions,
            summary,
            stats,
        })
    }
}
