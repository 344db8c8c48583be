pub mod permissions;
pub mod wib;
