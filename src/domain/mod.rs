pub mod calc;
pub mod validation;
