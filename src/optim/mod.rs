//! Optimizers and learning rate scheduling

mod adamw;
mod clip;
mod optimizer;
mod scheduler;

pub use adamw::AdamW;
pub use clip::clip_grad_norm;
pub use optimizer::Optimizer;
pub use scheduler::ReduceOnPlateau;
