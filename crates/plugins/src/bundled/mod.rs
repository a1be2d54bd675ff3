//! Secret-store plugins shipped with envsync.

pub mod env;
pub mod secrets_file;
pub mod settings_secrets;

use std::sync::Arc;

use crate::loader::Factory;

/// Name and factory of every bundled plugin.
pub(crate) fn factories() -> Vec<(&'static str, Factory)> {
    let env: Factory = Arc::new(env::plugin);
    let secrets_file: Factory = Arc::new(secrets_file::plugin);
    let settings_secrets: Factory = Arc::new(settings_secrets::plugin);
    vec![
        (env::NAME, env),
        (secrets_file::NAME, secrets_file),
        (settings_secrets::NAME, settings_secrets),
    ]
}
