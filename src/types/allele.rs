use super::CallPosition;

/// Coarse variant class; doubles as the merge rank of an allele.
///
/// Declaration order is the tie-break order between records that start at
/// the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum VariantClass {
    /// Single-base substitution.
    Snv,
    /// Multi-base substitution of equal length.
    Mnv,
    /// Anchored insertion.
    Insertion,
    /// Anchored deletion.
    Deletion,
    /// Anything else (symbolic, unanchored, mixed).
    Complex,
}

/// Normalised identity of one alternate allele.
///
/// Shared trailing bases are trimmed (keeping at least one base on each
/// side) so that the same event written against references of different
/// length compares equal: `ACG>AG` and `AC>A` are one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlleleKey {
    position: CallPosition,
    reference: String,
    alternate: String,
}

impl AlleleKey {
    /// Build the normalised key for `reference > alternate` at `position`.
    pub fn new(position: CallPosition, reference: &str, alternate: &str) -> Self {
        let r = reference.as_bytes();
        let a = alternate.as_bytes();
        let mut shared = 0;
        while shared + 1 < r.len()
            && shared + 1 < a.len()
            && r[r.len() - 1 - shared].eq_ignore_ascii_case(&a[a.len() - 1 - shared])
        {
            shared += 1;
        }
        Self {
            position,
            reference: reference[..r.len() - shared].to_ascii_uppercase(),
            alternate: alternate[..a.len() - shared].to_ascii_uppercase(),
        }
    }

    /// Position of the key.
    pub fn position(&self) -> CallPosition {
        self.position
    }

    /// Trimmed reference allele.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Trimmed alternate allele.
    pub fn alternate(&self) -> &str {
        &self.alternate
    }

    /// Merge rank of this allele.
    pub fn rank(&self) -> VariantClass {
        if is_symbolic(&self.alternate) {
            return VariantClass::Complex;
        }
        let (r, a) = (self.reference.len(), self.alternate.len());
        let anchored = self.reference.as_bytes().first() == self.alternate.as_bytes().first();
        match (r, a) {
            (1, 1) => VariantClass::Snv,
            (r, a) if r == a => VariantClass::Mnv,
            (1, _) if anchored => VariantClass::Insertion,
            (_, 1) if anchored => VariantClass::Deletion,
            _ => VariantClass::Complex,
        }
    }
}

/// Symbolic or placeholder alleles (`<DEL>`, `<NON_REF>`, `*`, ...).
pub fn is_symbolic(allele: &str) -> bool {
    allele.starts_with('<') || allele == "*" || allele.contains('[') || allele.contains(']')
}
