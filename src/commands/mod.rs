pub mod access;
pub mod general;

pub use access::{access_button, button, ACCESS_BUTTON_ID};
pub use general::{help, ping};
