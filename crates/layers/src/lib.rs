pub mod markers;
pub mod pins;
pub mod symbology;

pub use markers::*;
pub use pins::*;
pub use symbology::*;
