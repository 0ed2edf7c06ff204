pub mod alignment;
pub mod ats;
pub mod bundle;
pub mod distance;
pub mod error;
pub mod filter;
pub mod hfmut;
pub mod io;
pub mod pipeline;
pub mod reference;
pub mod search;
pub mod structure;
