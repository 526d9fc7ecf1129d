use super::ComputeBackend;
use anyhow::Result;
use ndarray::Array2;
use rand::Rng;
use std::hint::black_box;

/// Host-side matrix multiply. Never touches the GPU, so it keeps the loop alive
/// but cannot raise device utilization.
pub struct CpuBackend {
    matrix_size: usize,
    a: Array2<f32>,
    b: Array2<f32>,
}

impl CpuBackend {
    pub fn new(matrix_size: usize) -> Self {
        Self {
            matrix_size,
            a: random_matrix(matrix_size),
            b: random_matrix(matrix_size),
        }
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn issue_batch(&mut self, matrix_size: usize, batch_size: usize) -> Result<()> {
        if matrix_size != self.matrix_size {
            *self = Self::new(matrix_size);
        }

        for _ in 0..batch_size {
            let c = self.a.dot(&self.b);
            let sum = c.sum();
            let mean = c.mean().unwrap_or(0.0);
            let std = c.std(0.0);
            black_box((sum, mean, std));
        }
        Ok(())
    }
}

fn random_matrix(n: usize) -> Array2<f32> {
    let mut rng = rand::thread_rng();
    Array2::from_shape_fn((n, n), |_| rng.gen_range(-1.0f32..1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_batch_small_matrix() {
        let mut backend = CpuBackend::new(16);
        backend.issue_batch(16, 3).unwrap();
        assert_eq!(backend.a.dim(), (16, 16));
    }

    #[test]
    fn test_resizes_on_new_matrix_size() {
        let mut backend = CpuBackend::new(4);
        backend.issue_batch(12, 1).unwrap();
        assert_eq!(backend.matrix_size, 12);
        assert_eq!(backend.b.dim(), (12, 12));
    }
}
