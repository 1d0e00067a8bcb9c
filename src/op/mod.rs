pub mod binder;
pub mod conversion;
pub mod declare;
pub mod eta;
pub mod infer;
pub mod meta;
pub mod projection;
pub mod transform;
pub mod whnf;

pub use eta::{eta_struct, eta_struct_reduce};
pub use projection::generate_projections;
