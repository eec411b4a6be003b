//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`. Table
//! creation uses `Schema::create_table_from_entity` so the schema is
//! generated straight from the entity definitions without manual SQL.

use crate::entities::{Account, Transaction, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from the `DATABASE_URL` environment variable,
/// falling back to a local `SQLite` file.
pub fn get_database_url() -> Result<String> {
    Ok(std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/budgeteer.sqlite".to_string()))
}

/// Establishes a connection to the `SQLite` database.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the user, account, and transaction tables from the entity
/// definitions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let user_table = schema.create_table_from_entity(User);
    let account_table = schema.create_table_from_entity(Account);
    let transaction_table = schema.create_table_from_entity(Transaction);

    db.execute(builder.build(&user_table)).await?;
    db.execute(builder.build(&account_table)).await?;
    db.execute(builder.build(&transaction_table)).await?;

    Ok(())
}
