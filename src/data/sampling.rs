use rand::Rng;
use rand::seq::SliceRandom;

/// Randomly drops majority-class rows until the majority class holds at most
/// `ratio` times as many rows as the minority class.
///
/// Returns the kept row indices in their original order. When only one class
/// is present nothing is dropped.
pub fn undersample_indices<R: Rng + ?Sized>(targets: &[f64], ratio: f64, rng: &mut R) -> Vec<usize> {
    let (positives, negatives): (Vec<usize>, Vec<usize>) =
        (0..targets.len()).partition(|&i| targets[i] >= 0.5);

    if positives.is_empty() || negatives.is_empty() {
        return (0..targets.len()).collect();
    }

    let (minority, mut majority) = if positives.len() <= negatives.len() {
        (positives, negatives)
    } else {
        (negatives, positives)
    };

    let keep = ((minority.len() as f64 * ratio.max(1.0)).round() as usize).min(majority.len());
    majority.shuffle(rng);
    majority.truncate(keep);

    let mut kept: Vec<usize> = minority.into_iter().chain(majority).collect();
    kept.sort_unstable();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn balances_classes_at_ratio_one() {
        let mut targets = vec![0.0; 90];
        targets.extend(vec![1.0; 10]);
        let kept = undersample_indices(&targets, 1.0, &mut StdRng::seed_from_u64(1));
        let pos = kept.iter().filter(|&&i| targets[i] == 1.0).count();
        assert_eq!(pos, 10);
        assert_eq!(kept.len(), 20);
    }

    #[test]
    fn ratio_keeps_more_majority_rows() {
        let mut targets = vec![0.0; 90];
        targets.extend(vec![1.0; 10]);
        let kept = undersample_indices(&targets, 3.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(kept.len(), 40);
    }

    #[test]
    fn single_class_is_untouched() {
        let targets = vec![0.0; 5];
        let kept = undersample_indices(&targets, 1.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(kept, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn different_seeds_pick_different_subsets() {
        let mut targets = vec![0.0; 200];
        targets.extend(vec![1.0; 5]);
        let a = undersample_indices(&targets, 1.0, &mut StdRng::seed_from_u64(1));
        let b = undersample_indices(&targets, 1.0, &mut StdRng::seed_from_u64(2));
        assert_ne!(a, b);
    }
}
