mod common;

use common::{ScriptedProvider, row};
use rawdb::{DbError, ExecMode, Outcome, TransactionScope, Value};

#[tokio::test]
async fn execute_commits_and_returns_affected() {
    let provider = ScriptedProvider::new();
    provider.push_affected(3);

    let affected = TransactionScope::new(&provider)
        .execute("update usuarios set email = NULL where name = 'test';", &[])
        .await
        .unwrap();

    assert_eq!(affected, 3);
    assert_eq!((provider.begins(), provider.commits()), (1, 1));
    assert_eq!(provider.rollbacks(), 0);
}

#[tokio::test]
async fn run_dispatches_on_mode() {
    let provider = ScriptedProvider::new();
    provider.push_rows(vec![row([("n", Value::Int(1))])]);
    let scope = TransactionScope::new(&provider);

    let mode: ExecMode = "as_pd".parse().unwrap();
    match scope.run(mode, "select 1 as n", &[]).await.unwrap() {
        Outcome::Rows(rows) => assert_eq!(rows[0].get_as::<i64>("n").unwrap(), 1),
        other => panic!("expected rows, got {other:?}"),
    }

    let mode: ExecMode = "sql".parse().unwrap();
    assert_eq!(
        scope.run(mode, "delete from t", &[]).await.unwrap(),
        Outcome::Affected(1)
    );
    assert_eq!(provider.acquired(), 2);
}

#[tokio::test]
async fn params_reach_the_connection() {
    let provider = ScriptedProvider::new();

    TransactionScope::new(&provider)
        .execute("insert into t (a) values ($1)", &[Value::from("x")])
        .await
        .unwrap();

    assert_eq!(provider.statements()[0].params, vec![Value::from("x")]);
}

#[tokio::test]
async fn failure_rolls_back_exactly_once() {
    let provider = ScriptedProvider::new();
    provider.fail_next("syntax error");

    let err = TransactionScope::new(&provider)
        .fetch("selec 1", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Other(_)));
    assert_eq!(provider.rollbacks(), 1);
    assert_eq!(provider.commits(), 0);

    // The scope is reusable after a failure.
    TransactionScope::new(&provider)
        .execute("select 1", &[])
        .await
        .unwrap();
    assert_eq!(provider.commits(), 1);
}

#[tokio::test]
async fn failed_commit_is_rolled_back() {
    let provider = ScriptedProvider::new();
    provider.fail_commit("could not serialize access");

    let err = TransactionScope::new(&provider)
        .execute("update usuarios set name = 'x'", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Other(ref m) if m == "could not serialize access"));
    assert_eq!(provider.rollbacks(), 1);
    assert_eq!(provider.commits(), 0);
}

#[tokio::test]
async fn rollback_failure_is_folded_into_the_error() {
    let provider = ScriptedProvider::new();
    provider.fail_next("syntax error").fail_rollback("connection reset");

    let err = TransactionScope::new(&provider)
        .execute("delete form usuarios", &[])
        .await
        .unwrap_err();

    match err {
        DbError::Other(message) => {
            assert!(message.starts_with("syntax error"), "{message}");
            assert!(message.contains("(rollback failed: connection reset)"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(provider.rollbacks(), 1);
}

#[tokio::test]
async fn failed_commit_and_rollback_report_both() {
    let provider = ScriptedProvider::new();
    provider.fail_commit("commit lost").fail_rollback("socket closed");

    let err = TransactionScope::new(&provider)
        .fetch("select 1", &[])
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "commit lost (rollback failed: socket closed)"
    );
    assert_eq!(provider.rollbacks(), 1);
}
