//! Loss functions for GAN training
//!
//! Least-squares losses for LSGAN, Wasserstein scores and the gradient
//! penalty for WGAN-GP.

use tch::{Kind, Tensor};

/// Least-squares loss: 0.5 * mean((output - target)^2)
///
/// # Arguments
///
/// * `output` - Discriminator scores
/// * `target` - Label the scores are pulled towards
///
/// # Returns
///
/// Scalar loss tensor
pub fn lsgan_loss(output: &Tensor, target: f64) -> Tensor {
    (output - target).square().mean(Kind::Float) * 0.5
}

/// Discriminator loss for LSGAN
///
/// Real scores are pulled towards `b`, fake scores towards `a`.
pub fn lsgan_discriminator_loss(real_output: &Tensor, fake_output: &Tensor, a: f64, b: f64) -> Tensor {
    lsgan_loss(real_output, b) + lsgan_loss(fake_output, a)
}

/// Generator loss for LSGAN: fake scores pulled towards `c`
pub fn lsgan_generator_loss(fake_output: &Tensor, c: f64) -> Tensor {
    lsgan_loss(fake_output, c)
}

/// Mean critic score of a batch
pub fn critic_score(output: &Tensor) -> Tensor {
    output.mean(Kind::Float)
}

/// Wasserstein distance estimate reported for the critic: E[D(fake)] - E[D(real)]
pub fn wasserstein_distance(real_output: &Tensor, fake_output: &Tensor) -> Tensor {
    critic_score(fake_output) - critic_score(real_output)
}

/// Gradient penalty: coef * mean((||grad_x D(x_hat)|| - 1)^2)
///
/// `x_hat = u * real + (1 - u) * fake` is a fresh leaf tracking gradients,
/// and the gradient is taken with a graph so the penalty itself can be
/// backpropagated into the critic.
///
/// # Arguments
///
/// * `critic` - Scores a batch of images, one value per image
/// * `real` - Real batch
/// * `fake` - Fake batch of the same shape
/// * `u` - Interpolation weights in [0, 1], shape (batch, 1, 1, 1)
/// * `coef` - Penalty coefficient (lambda)
pub fn gradient_penalty<F>(critic: F, real: &Tensor, fake: &Tensor, u: &Tensor, coef: f64) -> Tensor
where
    F: Fn(&Tensor) -> Tensor,
{
    let interpolated = (u * real + (Tensor::ones_like(u) - u) * fake)
        .detach()
        .set_requires_grad(true);

    let scores = critic(&interpolated).sum(Kind::Float);
    let gradients = Tensor::run_backward(&[&scores], &[&interpolated], true, true);

    let norms = gradients[0]
        .flatten(1, -1)
        .norm_scalaropt_dim(2, [1], false);

    (norms - 1.0).square().mean(Kind::Float) * coef
}
