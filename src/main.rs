use budgeteer::{
    config::{self, AppConfig},
    core::{account, money, reconfigure, user},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_USER: &str = "budse";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Non-fatal, env vars can be set externally
    dotenv().ok();

    let app_config = AppConfig::from_env()?;
    let db = config::database::create_connection(&app_config.database_url).await?;
    config::database::create_tables(&db).await?;
    info!(url = %app_config.database_url, "database initialized");

    let user_name =
        std::env::var("BUDGETEER_USER").unwrap_or_else(|_| DEFAULT_USER.to_string());
    let user = match user::get_user_by_name(&db, &user_name).await? {
        Some(existing) => existing,
        None => user::create_user(&db, &user_name, true).await?,
    };
    let user = user::record_login(&db, user.id).await?;
    info!(user = %user.name, "logged in");

    if app_config.accounts_config.exists() {
        let seed = config::accounts::load_config(&app_config.accounts_config)?;
        config::accounts::seed_initial_accounts(&db, user.id, &seed).await?;
    }

    let check = reconfigure::check_for_whole_account(&db, user.id).await?;
    if !check.is_clean() {
        warn!(
            gross = check.gross_needs_fix,
            net = check.net_needs_fix,
            "percentage allocations need reconfiguring before whole account deposits"
        );
    }

    for account in account::get_active_accounts(&db, user.id).await? {
        info!(
            account = %account.name,
            total = %money::format_amount(account.total),
            "balance"
        );
    }

    Ok(())
}
