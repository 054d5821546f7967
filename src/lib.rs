//! shelf-count
//!
//! 棚やビンを撮影し、AIに対象物の個数と位置を答えさせて台帳に反映する。

pub mod ai_provider;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod ledger;
pub mod operator;
pub mod session;
pub mod transport;
