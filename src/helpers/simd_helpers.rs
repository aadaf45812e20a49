#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{
    _mm256_add_pd, _mm256_loadu_pd, _mm256_mul_pd, _mm256_setzero_pd, _mm256_storeu_pd,
};

/// Sum over f64 values using AVX2 or scalar fallback
#[cfg(target_arch = "x86_64")]
pub fn sum_f64(values: &[f64]) -> f64 {
    if is_x86_feature_detected!("avx2") {
        unsafe { sum_f64_avx2(values) }
    } else {
        values.iter().sum()
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn sum_f64(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Dot product of two equal-length slices using AVX2 or scalar fallback
#[cfg(target_arch = "x86_64")]
pub fn dot_f64(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    if is_x86_feature_detected!("avx2") {
        unsafe { dot_f64_avx2(a, b) }
    } else {
        dot_f64_scalar(a, b)
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn dot_f64(a: &[f64], b: &[f64]) -> f64 {
    dot_f64_scalar(a, b)
}

fn dot_f64_scalar(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sum_f64_avx2(values: &[f64]) -> f64 {
    const LANES: usize = 4; // __m256d holds 4 f64s
    let mut sum = _mm256_setzero_pd();

    let chunks = values.chunks_exact(LANES);
    let remainder = chunks.remainder();

    for chunk in chunks {
        let v = unsafe { _mm256_loadu_pd(chunk.as_ptr()) };
        sum = _mm256_add_pd(sum, v);
    }

    // horizontal reduction
    let mut sum_arr = [0f64; LANES];
    unsafe { _mm256_storeu_pd(sum_arr.as_mut_ptr(), sum) };

    sum_arr.iter().sum::<f64>() + remainder.iter().sum::<f64>()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn dot_f64_avx2(a: &[f64], b: &[f64]) -> f64 {
    const LANES: usize = 4;
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);
    let mut acc = _mm256_setzero_pd();

    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let (a_rem, b_rem) = (a_chunks.remainder(), b_chunks.remainder());

    for (ca, cb) in a_chunks.zip(b_chunks) {
        let va = unsafe { _mm256_loadu_pd(ca.as_ptr()) };
        let vb = unsafe { _mm256_loadu_pd(cb.as_ptr()) };
        acc = _mm256_add_pd(acc, _mm256_mul_pd(va, vb));
    }

    let mut acc_arr = [0f64; LANES];
    unsafe { _mm256_storeu_pd(acc_arr.as_mut_ptr(), acc) };

    acc_arr.iter().sum::<f64>() + dot_f64_scalar(a_rem, b_rem)
}
