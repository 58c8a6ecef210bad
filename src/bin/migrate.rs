use anyhow::bail;
use order_payment_settlement::db::{
    ORDER_MIGRATIONS, PAYMENT_MIGRATIONS, create_orm_conn, run_migrations,
};

/// Usage: `migrate <orders|payments>`, with `DATABASE_URL` pointing at that service's database.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let dir = match std::env::args().nth(1).as_deref() {
        Some("orders") => ORDER_MIGRATIONS,
        Some("payments") => PAYMENT_MIGRATIONS,
        _ => bail!("usage: migrate <orders|payments>"),
    };

    let database_url = std::env::var("DATABASE_URL")?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm, dir).await?;
    println!("Migrations applied from {dir}");
    Ok(())
}
