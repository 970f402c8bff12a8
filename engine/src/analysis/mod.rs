//
// Abstract domains and their transfer functions
//
pub mod generic;
pub mod operation;
pub mod bits;
pub mod range;
