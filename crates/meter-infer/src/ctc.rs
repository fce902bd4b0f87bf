//! Greedy CTC decoding of per-step class scores

use meter_core::Label;

use crate::config::ScoreKind;

/// Decode `steps x classes` row-major scores into labels
///
/// Takes the best class of every step, merges consecutive repeats and drops
/// the blank (last class). Each emitted label carries the probability of the
/// first step of its run.
pub fn greedy_decode(scores: &[f32], classes: usize, kind: ScoreKind) -> Vec<Label> {
    if classes == 0 {
        return Vec::new();
    }
    let blank = classes - 1;

    let mut labels = Vec::new();
    let mut previous: Option<usize> = None;

    for row in scores.chunks_exact(classes) {
        let (best, probability) = best_class(row, kind);
        if previous != Some(best) && best != blank {
            labels.push(Label::with_probability(best as i64, probability));
        }
        previous = Some(best);
    }

    labels
}

/// Index and probability of the highest-scoring class of one step
fn best_class(row: &[f32], kind: ScoreKind) -> (usize, f32) {
    let (best, max) = row
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });

    let probability = match kind {
        ScoreKind::Probabilities => max,
        ScoreKind::Logits => {
            // softmax(max) = 1 / sum(exp(v - max))
            let denominator: f32 = row.iter().map(|v| (v - max).exp()).sum();
            1.0 / denominator
        }
    };

    (best, probability)
}
