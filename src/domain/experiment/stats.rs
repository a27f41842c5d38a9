//! Descriptive statistics over metric samples

/// Calculate mean of a sample
pub fn mean(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    sample.iter().sum::<f64>() / sample.len() as f64
}

/// Calculate variance of a sample (n-1 denominator)
pub fn variance(sample: &[f64]) -> f64 {
    if sample.len() < 2 {
        return 0.0;
    }

    let m = mean(sample);
    sample.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (sample.len() - 1) as f64
}

/// Calculate standard deviation of a sample
pub fn std_dev(sample: &[f64]) -> f64 {
    variance(sample).sqrt()
}
