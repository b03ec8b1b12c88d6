pub mod catalog;
pub mod edit;
pub mod generate;
pub mod review;
