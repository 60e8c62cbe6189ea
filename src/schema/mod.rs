pub mod ir;
pub mod report;
pub mod symbols;
pub mod value;
