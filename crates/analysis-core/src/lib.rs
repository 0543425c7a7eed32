pub mod error;
pub mod statements;
pub mod stats;
pub mod tickers;
pub mod traits;
pub mod types;

pub use error::*;
pub use statements::*;
pub use tickers::*;
pub use traits::*;
pub use types::*;
