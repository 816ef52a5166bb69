//! Rule acquisition for rdx
//!
//! Rules are resolved per document through a [`RuleSource`] and held in a
//! [`RuleCache`] with a bounded age.

pub mod cache;
pub mod source;

pub use cache::{Clock, DEFAULT_TTL, RuleCache, SystemClock};
pub use source::{RuleSource, StaticRuleSource, StoreRuleSource};
