//! Command implementations.

pub mod catch_up;
pub mod check;
pub mod history;
pub mod rebuild;

pub use self::catch_up::execute_catch_up;
pub use self::check::execute_check;
pub use self::history::execute_history;
pub use self::rebuild::execute_rebuild;
