pub mod charge;
pub mod dump;
pub mod pseudo;
pub mod serialization;
pub mod series;
pub mod wavefunction;
