use quill_core::{op, Bindings, Connection, ConnectionConfig, Connector, Database, StatementKind};
use tracing_subscriber::EnvFilter;

fn main() -> quill_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    println!("Quill - basic usage\n");

    let mut connector = Connector::new(ConnectionConfig::sqlite_memory())?;
    println!("DSN: {}", connector.config().dsn());
    connector.execute(
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER)",
        &Bindings::new(),
    )?;

    let db = Database::new(connector);

    // 1. Insert and get the generated id back
    let ada = db.table("users").insert_get_id([("name", "Ada")])?;
    db.table("users").insert([("name", "Grace")])?;
    println!("1. Inserted Ada with id {ada}");

    // 2. Preview the SQL without running it
    {
        let mut query = db.table("users");
        query.where_("name", op::LIKE, "A%").or_where("users.id", "=", ada);
        println!("2. {}", query.to_sql(StatementKind::Select)?);
        let rows = query.get()?;
        println!("   -> {} row(s)", rows.len());
    }

    // 3. Update
    db.table("users").where_("id", "=", ada).update([("age", 36)])?;
    let rows = db.table("users").where_("id", "=", ada).get()?;
    println!("3. After update: {:?}", rows[0]);

    // 4. A transaction that is rolled back
    db.begin()?;
    db.table("users").delete()?;
    db.rollback()?;
    println!("4. Rows after rollback: {}", db.table("users").get()?.len());

    Ok(())
}
