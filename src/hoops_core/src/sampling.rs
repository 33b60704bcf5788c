//! Weighted selection with exclusions.

use rand::Rng;

/// Pick one candidate with probability proportional to `weight`.
///
/// Candidates for which `excluded` returns true never win. Negative or
/// non-finite weights count as zero. When every eligible candidate has zero
/// weight the pick falls back to uniform among the eligible ones, so this
/// only returns `None` when nothing is eligible.
pub fn weighted_pick<T, R, W, X>(rng: &mut R, candidates: &[T], weight: W, excluded: X) -> Option<T>
where
    T: Copy,
    R: Rng + ?Sized,
    W: Fn(T) -> f64,
    X: Fn(T) -> bool,
{
    let eligible: Vec<(T, f64)> = candidates
        .iter()
        .copied()
        .filter(|&c| !excluded(c))
        .map(|c| {
            let w = weight(c);
            (c, if w.is_finite() && w > 0.0 { w } else { 0.0 })
        })
        .collect();

    if eligible.is_empty() {
        return None;
    }

    let total: f64 = eligible.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        tracing::debug!(candidates = eligible.len(), "zero total weight, picking uniformly");
        let i = rng.gen_range(0..eligible.len());
        return Some(eligible[i].0);
    }

    let mut target = rng.gen::<f64>() * total;
    for &(c, w) in &eligible {
        if target < w {
            return Some(c);
        }
        target -= w;
    }
    // Rounding can leave a sliver past the last bucket
    eligible.iter().rev().find(|(_, w)| *w > 0.0).map(|(c, _)| *c)
}

/// Pick uniformly among the candidates that are not excluded.
pub fn uniform_pick<T, R, X>(rng: &mut R, candidates: &[T], excluded: X) -> Option<T>
where
    T: Copy,
    R: Rng + ?Sized,
    X: Fn(T) -> bool,
{
    weighted_pick(rng, candidates, |_| 1.0, excluded)
}

/// Bernoulli draw against `p`.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen::<f64>() < p
}
