pub mod candle_operations;
pub mod group_operations;
pub mod preference_operations;
pub mod system_operations;
pub mod token_operations;

pub use candle_operations::*;
pub use group_operations::*;
pub use preference_operations::*;
pub use system_operations::*;
pub use token_operations::*;
