pub mod distance;
pub mod run;
pub mod validate;
