//! Round-trip against a real database. Skipped unless `DATABASE_URL` is set.

use rawdb::{
    Condition, DbResult, PgProvider, Record, Repository, SchemaRegistry, TransactionScope,
    create_pool_from_url,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Record)]
#[orm(table = "rawdb_test_users")]
struct User {
    #[orm(id)]
    id: String,
    name: String,
    email: Option<String>,
}

#[tokio::test]
async fn insert_then_get_one_roundtrip() -> DbResult<()> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping insert_then_get_one_roundtrip");
            return Ok(());
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter("rawdb=debug")
        .with_test_writer()
        .try_init();

    let provider = PgProvider::new(create_pool_from_url(&database_url, 2)?);
    TransactionScope::new(&provider)
        .execute(
            "CREATE TABLE IF NOT EXISTS rawdb_test_users (id TEXT PRIMARY KEY, name TEXT NOT NULL, email TEXT)",
            &[],
        )
        .await?;

    let registry = Arc::new(SchemaRegistry::new().with::<User>());
    let mut users: Repository<User, _> = Repository::new(provider, registry);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let id = format!("u-{}-{nanos}", std::process::id());
    let user = User {
        id: id.clone(),
        name: "test".to_string(),
        email: Some("test@example.com".to_string()),
    };

    users.insert(user.clone(), false).await?;

    let found = users
        .get_one(Condition::new().with("id", id.as_str()), None)?
        .as_model()
        .await?;
    assert_eq!(found, Some(user));

    assert!(
        users
            .update([("email", rawdb::Value::Null)], [("id", id.as_str())], None)
            .await?
    );
    let dict = users
        .get_one([("id", id.as_str())], None)?
        .as_dict()
        .await?
        .expect("row still present");
    assert!(dict.get("email")?.is_null());

    assert!(users.delete([("id", id.as_str())], None).await?);
    assert!(!users.delete([("id", id.as_str())], None).await?);
    assert_eq!(users.get_one([("id", id.as_str())], None)?.as_model().await?, None);
    Ok(())
}
