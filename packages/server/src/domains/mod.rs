pub mod clients;
pub mod matching;
pub mod needs;
pub mod orders;
pub mod supply;
