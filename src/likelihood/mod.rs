//! Phred/probability conversions and the triangular genotype-likelihood layout.
//!
//! Diploid likelihood vectors store genotype `(i, j)` with `i <= j` at index
//! `j * (j + 1) / 2 + i`, i.e. `0/0 0/1 1/1 0/2 1/2 2/2 ...`. Every read or
//! write of a likelihood cell goes through [`likelihood_index`].

/// Largest phred value emitted; also used for zero-probability genotypes.
pub const MAX_PHRED: i32 = 255;

/// Inverse phred transform: `10^(-p/10)`.
#[inline]
pub fn unphred(phred: i32) -> f64 {
    10f64.powf(-f64::from(phred) / 10.0)
}

/// Phred transform `-10 * log10(p)`, rounded and clamped to `[0, MAX_PHRED]`.
///
/// Non-positive probabilities (including underflow to zero) map to `MAX_PHRED`.
#[inline]
pub fn phred(probability: f64) -> i32 {
    if !(probability > 0.0) {
        return MAX_PHRED;
    }
    let q = (-10.0 * probability.log10()).round();
    q.clamp(0.0, f64::from(MAX_PHRED)) as i32
}

/// Phred of the product of two phred-scaled likelihoods.
#[inline]
pub fn combine_phred(a: i32, b: i32) -> i32 {
    phred(unphred(a) * unphred(b))
}

/// Triangular index of genotype `(i, j)` for a site with `num_allele` alleles.
///
/// Argument order does not matter. Panics if either allele is out of range.
#[inline]
pub fn likelihood_index(i: usize, j: usize, num_allele: usize) -> usize {
    assert!(
        i < num_allele && j < num_allele,
        "genotype ({i},{j}) out of range for {num_allele} alleles"
    );
    let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
    hi * (hi + 1) / 2 + lo
}

/// Number of genotype likelihoods for a call of the given ploidy.
#[inline]
pub fn num_likelihoods(ploidy: usize, num_allele: usize) -> usize {
    if ploidy == 1 {
        num_allele
    } else {
        num_allele * (num_allele + 1) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, 0)]
    #[test_case(0, 1, 1)]
    #[test_case(1, 1, 2)]
    #[test_case(0, 2, 3)]
    #[test_case(1, 2, 4)]
    #[test_case(2, 2, 5)]
    fn triangular_layout(i: usize, j: usize, expected: usize) {
        assert_eq!(likelihood_index(i, j, 3), expected);
        assert_eq!(likelihood_index(j, i, 3), expected);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_is_bounds_checked() {
        likelihood_index(0, 3, 3);
    }

    #[test]
    fn phred_saturates() {
        assert_eq!(phred(0.0), MAX_PHRED);
        assert_eq!(phred(-1.0), MAX_PHRED);
        assert_eq!(phred(1e-300), MAX_PHRED);
        assert_eq!(phred(1.0), 0);
        assert_eq!(phred(0.1), 10);
    }

    #[test]
    fn combining_adds_in_phred_space() {
        assert_eq!(combine_phred(10, 20), 30);
        assert_eq!(combine_phred(0, 7), 7);
    }

    #[test]
    fn likelihood_counts() {
        assert_eq!(num_likelihoods(2, 2), 3);
        assert_eq!(num_likelihoods(2, 4), 10);
        assert_eq!(num_likelihoods(1, 4), 4);
    }
}
