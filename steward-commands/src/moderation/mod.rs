pub mod changenick;
pub mod sendms;
