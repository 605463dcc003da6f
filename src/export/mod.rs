pub mod csv;
pub mod excel;
