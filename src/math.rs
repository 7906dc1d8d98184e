use num_traits::Float;

/// Computes the dot-product of `a` and `b`.
pub fn dot<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b)
        .fold(T::zero(), |acc, (&ai, &bi)| acc + ai * bi)
}

/// Computes the infinity norm: `max(abs(a))`. Zero for an empty slice.
pub fn norm_inf<T: Float>(a: &[T]) -> T {
    a.iter().fold(T::zero(), |m, &v| m.max(v.abs()))
}

/// Returns the 2-norm (Euclidean) of `a`.
pub fn norm<T: Float>(a: &[T]) -> T {
    dot(a, a).sqrt()
}

/// Element-wise `a - b`.
pub fn sub<T: Float>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().zip(b).map(|(&ai, &bi)| ai - bi).collect()
}

/// Returns `t * a + (1 - t) * b`.
pub fn blend<T: Float>(t: T, a: &[T], b: &[T]) -> Vec<T> {
    a.iter()
        .zip(b)
        .map(|(&ai, &bi)| t * ai + (T::one() - t) * bi)
        .collect()
}
