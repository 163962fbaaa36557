// Graph Nodes Module
// The three diagnostic steps

pub mod generate;
pub mod retrieve;
pub mod validate;

pub use generate::GenerateNode;
pub use retrieve::RetrieveNode;
pub use validate::{check_report, ValidateNode, HIGH_SEVERITY_THRESHOLD, SAFETY_TERMS};

#[cfg(test)]
pub(crate) mod fakes;
