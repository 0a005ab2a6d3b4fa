use clap::Parser;
use geocollab::{ApiClient, ClientConfig, UserId};

/// Connects as a user and prints their profile and communities
///
/// The API and identity provider are configured through the
/// `GEOCOLLAB_*` environment variables, which may also be set in `.env`.
#[derive(Debug, Parser)]
struct Opts {
    /// The user to connect as
    #[clap(short, long, env = "GEOCOLLAB_USERNAME")]
    username: String,

    /// The user's password
    #[clap(short, long, env = "GEOCOLLAB_PASSWORD", hide_env_values = true)]
    password: String,

    /// Also list the tables of this database
    #[clap(short, long)]
    database: Option<u64>,
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

    let mut client = ApiClient::new(ClientConfig::from_env()?)?;
    client.set_credentials(&opts.username, &opts.password).await?;
    client.connect().await?;

    let me = client.get_user(UserId::Me, &[]).await?;
    println!("{:#}", me);

    let communities = client.all_communities(&[("limit", "5")]).await?;
    println!("{:#}", communities);

    if let Some(database) = opts.database {
        let tables = client.all_tables(database, &[("fields", "name,title")]).await?;
        println!("{:#}", tables);
    }

    client.disconnect().await?;
    tracing::info!(connected = client.is_connected(), "disconnected");

    Ok(())
}
