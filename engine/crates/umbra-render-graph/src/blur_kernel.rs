use umbra_render_interface::gpu_data::{BLUR_MAX_WIDTH, BlurParams};

/// 一维高斯模糊核，`2 * width + 1` 个权重，和为 1
#[derive(Debug, Clone, PartialEq)]
pub struct BlurKernel {
    width: usize,
    weights: Vec<f32>,
}
impl BlurKernel {
    /// 超过 [`BLUR_MAX_WIDTH`] 的宽度会被截断
    pub fn new(width: usize) -> Self {
        let width = width.min(BLUR_MAX_WIDTH);
        Self {
            width,
            weights: Self::gaussian(width),
        }
    }

    /// `weights[i] = exp(-0.5 * ((i - w) / (w / 2))^2)`，再归一化
    fn gaussian(width: usize) -> Vec<f32> {
        if width == 0 {
            return vec![1.0];
        }

        let sigma = width as f32 / 2.0;
        let mut weights = (0..=2 * width)
            .map(|i| {
                let x = (i as f32 - width as f32) / sigma;
                (-0.5 * x * x).exp()
            })
            .collect::<Vec<_>>();

        let sum: f32 = weights.iter().sum();
        weights.iter_mut().for_each(|w| *w /= sum);
        weights
    }

    /// 宽度发生变化时重新计算，返回是否重新计算
    pub fn set_width(&mut self, width: usize) -> bool {
        let width = width.min(BLUR_MAX_WIDTH);
        if width == self.width {
            return false;
        }
        log::debug!("blur kernel width {} -> {}", self.width, width);
        *self = Self::new(width);
        true
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// 上传给 compute shader 的常量
    #[inline]
    pub fn params(&self) -> BlurParams {
        BlurParams::new(&self.weights, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one_for_every_width() {
        for w in 0..=BLUR_MAX_WIDTH {
            let kernel = BlurKernel::new(w);
            assert_eq!(kernel.weights().len(), 2 * w + 1);
            let sum: f32 = kernel.weights().iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "width {w}: sum {sum}");
        }
    }

    #[test]
    fn zero_width_is_identity() {
        assert_eq!(BlurKernel::new(0).weights(), &[1.0]);
    }

    #[test]
    fn widening_from_4_to_8_recomputes() {
        let mut kernel = BlurKernel::new(4);
        assert!(!kernel.set_width(4));
        assert!(kernel.set_width(8));

        let nonzero = kernel.weights().iter().filter(|w| **w > 0.0).count();
        assert_eq!(nonzero, 17);
        let sum: f32 = kernel.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        // 对称，中心最大
        let weights = kernel.weights();
        for i in 0..8 {
            assert!((weights[i] - weights[16 - i]).abs() < 1e-7);
            assert!(weights[i] < weights[8]);
        }
    }

    #[test]
    fn width_is_clamped() {
        let kernel = BlurKernel::new(BLUR_MAX_WIDTH + 10);
        assert_eq!(kernel.width(), BLUR_MAX_WIDTH);
        assert_eq!(kernel.params().width, BLUR_MAX_WIDTH as i32);
    }
}
