use crate::types::{FailureEntry, PlanSummary, StageResult};

/// Fold every stage's completions into totals. Elapsed is the sum of the
/// stage wall times, which never overlap.
pub fn summarize(results: &[StageResult]) -> PlanSummary {
    let procs = results.iter().flat_map(|r| r.procs.iter());
    let (total, passed) = procs.fold((0, 0), |(total, passed), p| {
        (total + 1, passed + usize::from(p.passed()))
    });
    PlanSummary {
        total,
        passed,
        elapsed: results.iter().map(|r| r.elapsed).sum(),
    }
}

/// One entry per failing completion, in stage then worker order.
pub fn failures(results: &[StageResult]) -> Vec<FailureEntry> {
    results
        .iter()
        .flat_map(|r| {
            r.procs
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.passed())
                .map(move |(worker, p)| FailureEntry {
                    stage: r.name.clone(),
                    worker,
                    return_code: p.return_code,
                    elapsed: p.elapsed,
                    argv: p.argv.clone(),
                    output: p.output.clone(),
                })
        })
        .collect()
}
