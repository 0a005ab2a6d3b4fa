use geocollab_tokens::{ClientId, ClientSecret, Credentials, Password, TokenManager, Username};

use clap::Parser;

#[derive(Debug, Parser)]
struct Opts {
    /// The identity provider's OpenID Connect base URL
    #[clap(short, long, env = "GEOCOLLAB_AUTH_URL")]
    auth_url: String,

    /// The client ID of the client
    #[clap(short, long, env = "GEOCOLLAB_CLIENT_ID")]
    client_id: ClientId,

    /// The client secret used to identify the client to the identity provider
    #[clap(short = 's', long, env = "GEOCOLLAB_CLIENT_SECRET", hide_env_values = true)]
    client_secret: ClientSecret,

    /// The user to request a token for
    #[clap(short, long, env = "GEOCOLLAB_USERNAME")]
    username: Username,

    /// The user's password
    #[clap(short, long, env = "GEOCOLLAB_PASSWORD", hide_env_values = true)]
    password: Password,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let manager = TokenManager::new(&opts.auth_url, opts.client_id, opts.client_secret)?;
    let credentials = Credentials::new(opts.username, opts.password);

    let token = manager.fetch_token(&credentials).await?;
    tracing::info!(
        token = format_args!("{:#?}", token),
        status = ?manager.token_status(),
        "first access token"
    );

    let again = manager.fetch_token(&credentials).await?;
    tracing::info!(same = (again == token), "second fetch served from cache");

    manager.disconnect().await?;
    tracing::info!(connected = manager.has_access_token(), "disconnected");

    Ok(())
}
