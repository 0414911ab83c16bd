mod base;
mod bus;
mod error;
mod fault;
mod line;
mod loadstudy;
mod locate;
mod network;
mod opt;
mod relay;
mod seq;
mod study;
mod transformer;

pub mod debug;
pub mod math;
pub mod report;
pub mod traits;


pub use base::*;
pub use bus::*;
pub use error::*;
pub use fault::*;
pub use line::*;
pub use loadstudy::*;
pub use locate::*;
pub use network::*;
pub use opt::*;
pub use relay::*;
pub use seq::*;
pub use study::*;
pub use transformer::*;
