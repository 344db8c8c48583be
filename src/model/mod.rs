pub mod attendance;
pub mod notulensi;
pub mod piket;
pub mod role;
pub mod session;
pub mod user;
