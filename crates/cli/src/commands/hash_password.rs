//! Hash-password command handler.

use clap::Args;
use explainer_core::{config::AppConfig, AppResult};
use explainer_knowledge::session::hash_password;

/// Print the SHA-256 hash of an admin password
#[derive(Args, Debug)]
pub struct HashPasswordCommand {
    /// Password to hash
    pub password: String,
}

impl HashPasswordCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let hash = hash_password(&self.password);

        println!("Hash: {}", hash);
        println!();
        println!("Set it in the environment to enable :admin in chat:");
        println!("export {}={}", config.limits.admin_password_hash_env, hash);

        Ok(())
    }
}
