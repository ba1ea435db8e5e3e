pub mod expression;
pub mod platform;

#[cfg(feature = "reqwest")]
pub mod ee_collect;
