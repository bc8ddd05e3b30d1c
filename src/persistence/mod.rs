pub mod mapped;
pub mod positions;
pub mod region;

pub use mapped::MappedRegionFile;
pub use positions::*;
pub use region::{AlignedBuffer, AtomicBuffer, RegionError};
