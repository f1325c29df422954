pub use build::*;
pub use login::*;
pub use release::*;

mod build;
mod login;
mod release;
