pub mod privatbank;

pub use privatbank::PrivatBankClient;
