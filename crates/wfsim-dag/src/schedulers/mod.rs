pub mod adaptive;
pub mod common;
pub mod equivalence;
pub mod greedy;
pub mod heft;
