pub mod diagnosis_class;
pub mod enums;
pub mod exam;
pub mod patient;

pub use diagnosis_class::*;
pub use enums::*;
pub use exam::*;
pub use patient::*;
