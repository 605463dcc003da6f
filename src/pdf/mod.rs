pub mod eigenbeleg;
pub mod layout;
