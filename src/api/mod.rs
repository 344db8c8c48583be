pub mod attendance;
pub mod members;
pub mod notulensi;
pub mod piket;
pub mod sessions;
