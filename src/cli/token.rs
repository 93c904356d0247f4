use clap::{Args, Subcommand};
use poshak_app::{
    auth::{AuthKey, AuthService, PgAuthService, UserUuid},
    database,
};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct TokenCommand {
    #[command(subcommand)]
    command: TokenSubcommand,
}

#[derive(Debug, Subcommand)]
enum TokenSubcommand {
    Issue(IssueTokenArgs),
}

pub(crate) async fn run(command: TokenCommand) -> Result<(), String> {
    match command.command {
        TokenSubcommand::Issue(args) => issue(args).await,
    }
}

#[derive(Debug, Args)]
struct IssueTokenArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Token signing key, 64 hex characters
    #[arg(long, env = "AUTH_KEY", hide_env_values = true)]
    auth_key: String,

    /// User UUID the token should authenticate
    #[arg(long)]
    user_uuid: Uuid,
}

async fn issue(args: IssueTokenArgs) -> Result<(), String> {
    let key = AuthKey::from_hex(&args.auth_key)
        .map_err(|error| format!("invalid auth key: {error}"))?;

    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let service = PgAuthService::new(pool, key);

    let token = service
        .issue_token(UserUuid::from_uuid(args.user_uuid))
        .await
        .map_err(|error| format!("failed to issue token: {error}"))?;

    println!("user_uuid: {}", args.user_uuid);
    println!("bearer_token: {token}");
    println!("tokens expire after 24 hours");

    Ok(())
}
