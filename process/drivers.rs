//! Drivers wrap the external tools behind traits. The task
//! logic only deals with options structs and never builds
//! command lines itself.

pub use self::{goreleaser_driver::GoReleaserDriver, ko_driver::KoDriver, traits::*};

mod goreleaser_driver;
mod ko_driver;
pub mod ldflags;
pub mod opts;
mod traits;
