pub mod chain;
pub mod cli;
pub mod client;
pub mod crypto;
pub mod log;
pub mod verify;

#[cfg(test)]
mod test;
