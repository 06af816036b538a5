pub mod delivery;
pub mod publish;
pub mod refresh;
