pub mod abaqus;
pub mod surface;
