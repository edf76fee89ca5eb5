/// Transforms two concurrent sequences against each other given the rule for
/// a single pair. `transform(x, y, is_strong)` must return `x` re-expressed to
/// follow `y`. Returns the transformed `a` and the transformed `b`.
pub fn transform_pairwise<T: Clone>(
    a: Vec<T>,
    b: Vec<T>,
    a_is_strong: bool,
    transform: &impl Fn(&T, &T, bool) -> Vec<T>,
) -> (Vec<T>, Vec<T>) {
    match (a.as_slice(), b.as_slice()) {
        ([], _) | (_, []) => (a, b),
        ([single_a], [single_b]) => (
            transform(single_a, single_b, a_is_strong),
            transform(single_b, single_a, !a_is_strong),
        ),
        ([first_a, rest_a @ ..], _) if !rest_a.is_empty() => {
            let rest_a = rest_a.to_vec();
            let (mut a_transformed, b_after_first) =
                transform_pairwise(vec![first_a.clone()], b, a_is_strong, transform);
            let (rest_transformed, b_transformed) =
                transform_pairwise(rest_a, b_after_first, a_is_strong, transform);

            a_transformed.extend(rest_transformed);
            (a_transformed, b_transformed)
        }
        (_, [first_b, rest_b @ ..]) => {
            let (first_b, rest_b) = (first_b.clone(), rest_b.to_vec());
            let (a_after_first, mut b_transformed) =
                transform_pairwise(a, vec![first_b], a_is_strong, transform);
            let (a_transformed, rest_transformed) =
                transform_pairwise(a_after_first, rest_b, a_is_strong, transform);

            b_transformed.extend(rest_transformed);
            (a_transformed, b_transformed)
        }
    }
}
