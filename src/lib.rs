// edugate: content moderation policy engine for an educational sharing platform
//
// This is the library root. The policy model and its store live in `policy`,
// the decision pipeline in `moderation`. Storage backends, the external
// toxicity scorer, and the optional HTTP surface sit around that core.

pub mod config;
pub mod db;
pub mod error;
pub mod moderation;
pub mod output;
pub mod policy;
pub mod status;
pub mod toxicity;

#[cfg(feature = "web")]
pub mod web;
