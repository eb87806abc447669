mod add;
mod choice;
mod remove;

pub use add::{add_gas, add_token};
pub use choice::{Asset, Quote};
pub use remove::{remove_gas, remove_token};
