pub mod cards;
pub mod contacts;
