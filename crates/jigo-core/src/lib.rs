//! Pure building blocks of the jigo proxy: parsing KataGo analysis lines,
//! choosing the smallest safe winning margin, and re-encoding analysis for
//! Leela Zero style clients.

pub mod analysis;
pub mod error;
pub mod selector;
pub mod translate;

pub use analysis::{parse_analysis, CandidateRecord};
pub use error::CoreError;
pub use selector::{select_move, SelectionMode, SelectionPolicy};
pub use translate::to_leela_zero;
