//! Menu model: content definitions, the node tree and the controller
//! that drives it

pub mod content;
pub mod controller;
pub mod hierarchy;
pub mod key;
pub mod node;
