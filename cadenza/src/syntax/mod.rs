//! Terms handed to the elaborator.
//!
//! Surface syntax is parsed elsewhere;
//! this module only defines the trees the parser produces.

pub mod location;
pub mod term;
