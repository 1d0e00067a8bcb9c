pub mod declaration;
pub mod environment;
pub mod expr;
pub mod level;
pub mod local;
pub mod telescope;
