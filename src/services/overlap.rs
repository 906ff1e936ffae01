//! Closed-interval overlap checks used to reject conflicting vacation requests.
//!
//! Ranges are inclusive on both ends: two ranges that only share a boundary day
//! overlap, a range ending the day before another starts does not.

/// True iff the closed ranges `a` and `b` share at least one point.
///
/// Inverted ranges (`start > end`) are taken as given and never overlap anything.
pub fn ranges_overlap<T: Ord>(a: (T, T), b: (T, T)) -> bool {
    let (a_start, a_end) = a;
    let (b_start, b_end) = b;
    a_start.max(b_start) <= a_end.min(b_end)
}

/// True iff `candidate` overlaps any of `existing`. Empty input never overlaps.
pub fn overlaps<T, I>(existing: I, candidate: (T, T)) -> bool
where
    T: Ord + Copy,
    I: IntoIterator<Item = (T, T)>,
{
    existing
        .into_iter()
        .any(|range| ranges_overlap(range, candidate))
}

/// First item of `existing` whose range overlaps `candidate`.
pub fn find_overlap<'a, T, R, F>(existing: &'a [R], candidate: (T, T), range_of: F) -> Option<&'a R>
where
    T: Ord + Copy,
    F: Fn(&R) -> (T, T),
{
    existing
        .iter()
        .find(|item| ranges_overlap(range_of(*item), candidate))
}
