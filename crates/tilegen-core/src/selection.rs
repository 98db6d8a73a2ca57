//! Template selection policies.
//!
//! All policies work over a pool of catalog indices that already passed the
//! allowed-type filter, in catalog order.

use crate::catalog::TileCatalog;
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};

/// How a template is drawn from the filtered pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Every matching template is equally likely.
    #[default]
    Uniform,
    /// Legacy running-sum scan. Biased and can select nothing; kept so levels
    /// generated with it can be reproduced. A single-template pool selects
    /// only when the draw lands exactly on its weight, so in practice never.
    CumulativeScan,
    /// Proper weighted draw proportional to template weight.
    Weighted,
}

/// Pick one index out of `pool`. `None` means no template was selected.
pub fn select_template<R: RandomSource + ?Sized>(
    catalog: &TileCatalog,
    pool: &[usize],
    policy: SelectionPolicy,
    rng: &mut R,
) -> Option<usize> {
    if pool.is_empty() {
        return None;
    }
    match policy {
        SelectionPolicy::Uniform => Some(pool[rng.pick(pool.len())]),
        SelectionPolicy::CumulativeScan => cumulative_scan(catalog, pool, rng),
        SelectionPolicy::Weighted => weighted(catalog, pool, rng),
    }
}

fn weight_of(catalog: &TileCatalog, index: usize) -> f32 {
    catalog.get(index).map(|t| t.weight.max(0.0)).unwrap_or(0.0)
}

/// Each template compares its own weight against a fresh draw in
/// `[0, running_sum]`; the last one whose weight fits wins.
fn cumulative_scan<R: RandomSource + ?Sized>(
    catalog: &TileCatalog,
    pool: &[usize],
    rng: &mut R,
) -> Option<usize> {
    let mut selected = None;
    let mut sum = 0.0;
    for &index in pool {
        let weight = weight_of(catalog, index);
        sum += weight;
        if weight <= rng.range_f32_inclusive(0.0, sum) {
            selected = Some(index);
        }
    }
    selected
}

fn weighted<R: RandomSource + ?Sized>(
    catalog: &TileCatalog,
    pool: &[usize],
    rng: &mut R,
) -> Option<usize> {
    let total: f32 = pool.iter().map(|&i| weight_of(catalog, i)).sum();
    if total <= 0.0 {
        return None;
    }
    let draw = rng.range_f32(0.0, total);
    let mut upper = 0.0;
    let mut last_positive = None;
    for &index in pool {
        let weight = weight_of(catalog, index);
        if weight <= 0.0 {
            continue;
        }
        upper += weight;
        last_positive = Some(index);
        if draw < upper {
            return Some(index);
        }
    }
    // float accumulation can leave draw == total
    last_positive
}
