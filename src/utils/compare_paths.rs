/// Relation between two tree paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRelation {
    Same,
    /// The first path is a strict prefix of the second one.
    Prefix,
    /// The second path is a strict prefix of the first one.
    Extension,
    /// The paths differ first at the given index.
    Differ(usize),
}

pub fn compare_paths(left: &[usize], right: &[usize]) -> PathRelation {
    let common = left
        .iter()
        .zip(right.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common < left.len() && common < right.len() {
        return PathRelation::Differ(common);
    }

    match left.len().cmp(&right.len()) {
        std::cmp::Ordering::Equal => PathRelation::Same,
        std::cmp::Ordering::Less => PathRelation::Prefix,
        std::cmp::Ordering::Greater => PathRelation::Extension,
    }
}
