//! Secrets for a sync run: which ones are needed, and their values.
//!
//! [`aggregate_needs`] derives the secret requirements of a resolved plugin
//! set. [`resolve_values`] then fills them from the secret stores of those
//! plugins, asks for whatever is left in a single batched prompt and
//! validates the result.

pub mod error;
pub mod needs;
pub mod prompt;
pub mod values;

pub use {
    error::{Error, Result},
    needs::aggregate_needs,
    prompt::{NoPrompt, PromptRequest, SecretPrompt},
    values::{ValueOptions, forget_secrets, resolve_values},
};
