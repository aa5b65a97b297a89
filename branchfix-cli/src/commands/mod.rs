pub mod check;
pub mod diff;
pub mod fix;
pub mod rules;
