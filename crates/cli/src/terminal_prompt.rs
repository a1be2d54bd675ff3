use std::collections::HashMap;

use {
    anyhow::Context,
    async_trait::async_trait,
    envsync_secrets::{PromptRequest, SecretPrompt},
    secrecy::SecretString,
};

/// Asks for each secret on the terminal without echoing the input.
pub struct TerminalPrompt;

#[async_trait]
impl SecretPrompt for TerminalPrompt {
    async fn prompt(&self, requests: &[PromptRequest]) -> anyhow::Result<HashMap<String, SecretString>> {
        let requests = requests.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut answers = HashMap::with_capacity(requests.len());
            for request in requests {
                let value = rpassword::prompt_password(format!("{}: ", request.message))
                    .with_context(|| format!("failed to read secret \"{}\"", request.name))?;
                answers.insert(request.name, SecretString::new(value));
            }
            Ok::<_, anyhow::Error>(answers)
        })
        .await?
    }
}
