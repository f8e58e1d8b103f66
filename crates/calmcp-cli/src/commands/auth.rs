use clap::Subcommand;

use calmcp_core::GoogleAuth;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Authorize a Google account in the browser
    Login {
        /// OAuth client ID (stored in the OS keyring)
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret (stored in the OS keyring)
        #[arg(long)]
        client_secret: Option<String>,
    },
    /// Remove stored tokens
    Logout,
    /// Check authentication status
    Status,
}

pub async fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Login {
            client_id,
            client_secret,
        } => {
            match (client_id, client_secret) {
                (Some(cid), Some(csec)) => GoogleAuth::set_credentials(&cid, &csec)?,
                (None, None) => {}
                _ => return Err("--client-id and --client-secret must be given together".into()),
            }
            let auth = GoogleAuth::new();
            if !auth.has_credentials() {
                return Err("--client-id and --client-secret required for the first login".into());
            }
            auth.login().await?;
            println!("Google authenticated");
        }
        AuthAction::Logout => {
            GoogleAuth::new().logout()?;
            println!("Google disconnected");
        }
        AuthAction::Status => {
            let auth = GoogleAuth::new();
            println!(
                "{}",
                if auth.is_authenticated() {
                    "authenticated"
                } else {
                    "not authenticated"
                }
            );
        }
    }
    Ok(())
}
