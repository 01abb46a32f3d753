use sqlplay::store::Engine;
use sqlplay::table::Value;
use sqlplay::{classify, Error, Input, Outcome, Session, TableStore};
use tempfile::TempDir;

fn table_of(outcome: Outcome) -> sqlplay::table::Table {
    match outcome {
        Outcome::Table(t) => t,
        other => panic!("expected a table, got {:?}", other),
    }
}

fn names(session: &mut Session) -> Vec<String> {
    match session.execute("/list").result.unwrap() {
        Outcome::Names(names) => names,
        other => panic!("expected names, got {:?}", other),
    }
}

#[test]
fn test_orders_walkthrough() {
    let mut session = Session::in_memory().unwrap();
    session.execute("/create orders").result.unwrap();
    session
        .execute("orders.id = [1, 2, 3]\norders.amount = [10.0, 2.5, 7.5]")
        .result
        .unwrap();

    let sum = table_of(
        session
            .execute("SELECT SUM(amount) FROM orders;")
            .result
            .unwrap(),
    );
    assert_eq!(sum.row_count(), 1);
    assert_eq!(sum.column_count(), 1);

    session.execute("DROP TABLE orders;").result.unwrap();
    assert!(names(&mut session).is_empty());
    assert!(session.env().get("orders").is_none());
}

#[test]
fn test_script_sees_sql_changes() {
    let mut session = Session::in_memory().unwrap();
    session
        .execute("CREATE TABLE t (x INTEGER);\nINSERT INTO t VALUES (1), (2), (3);")
        .result
        .unwrap();

    let response = session.execute("sum(t.x)");
    match response.result.unwrap() {
        Outcome::Message(text) => assert_eq!(text, "6"),
        other => panic!("unexpected outcome {:?}", other),
    }

    session.execute("t.y = t.x * 2\nt = t[t.y > 2]").result.unwrap();
    let rows = table_of(session.execute("SELECT x, y FROM t ORDER BY x;").result.unwrap());
    assert_eq!(rows.row(0).unwrap(), vec![Value::Integer(2), Value::Integer(4)]);
    assert_eq!(rows.row_count(), 2);
}

#[test]
fn test_script_error_reports_line() {
    let mut session = Session::in_memory().unwrap();
    let response = session.execute("x = 1\ny = x / 0");
    match response.result {
        Err(Error::Script { trace, .. }) => assert!(trace.contains("line 2")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_control_command_errors() {
    let mut session = Session::in_memory().unwrap();
    session.execute("/create t").result.unwrap();

    assert!(matches!(
        session.execute("/create t").result,
        Err(Error::AlreadyExists(_))
    ));
    assert!(matches!(
        session.execute("/create 1bad").result,
        Err(Error::InvalidName(_))
    ));
    assert!(matches!(
        session.execute("/schema missing").result,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        session.execute("/nope").result,
        Err(Error::UnknownCommand(_))
    ));
    assert!(matches!(session.execute("/load").result, Err(Error::Usage(_))));
}

#[test]
fn test_exit_flush_then_load_round_trip() {
    let dir = TempDir::new().unwrap();

    let mut session = Session::new(TableStore::new(
        Engine::open_in_memory().unwrap(),
        dir.path(),
    ));
    session.execute("/create sales").result.unwrap();
    session.execute("sales.qty = [4, 5]").result.unwrap();
    assert!(session.execute("/exit").is_exit());
    assert!(dir.path().join("sales.json").is_file());

    let mut session = Session::new(TableStore::new(
        Engine::open_in_memory().unwrap(),
        dir.path(),
    ));
    session.execute("/load sales").result.unwrap();
    let rows = table_of(session.execute("SELECT SUM(qty) AS s FROM sales;").result.unwrap());
    assert_eq!(rows.row(0).unwrap(), vec![Value::Integer(9)]);
}

#[test]
fn test_classifier_rules() {
    assert!(matches!(classify("/list"), Input::Control(_)));
    assert!(matches!(classify("SELECT 1;"), Input::Sql(_)));
    assert!(matches!(classify("x = 1"), Input::Script(_)));
    assert!(matches!(classify("/list\n/help"), Input::Script(_)));
    assert_eq!(classify("   "), Input::Script(String::new()));
}
