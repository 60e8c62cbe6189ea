pub mod compiler;
pub mod config;
pub mod expr;
pub mod line;
pub mod normalize;
pub mod resolve;
pub mod runtime;
pub mod template;
pub mod validator;
