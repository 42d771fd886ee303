pub mod apps;
pub mod delegation;
pub mod exchanges;
pub mod tokens;

pub use apps::{App, AppDirectory, AppDraft, AppStatus, NewApp};
pub use delegation::Delegation;
pub use exchanges::{Exchange, ExchangeLedger};
pub use tokens::{Token, TokenStore};
